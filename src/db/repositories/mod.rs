//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod article;
pub mod category;
pub mod contact;
pub mod event;
pub mod identity;
pub mod meta;
pub mod reference;
pub mod result;
pub mod session;

use anyhow::Result;
use async_trait::async_trait;

pub use article::SqlxArticleRepository;
pub use category::SqlxCategoryRepository;
pub use contact::{SqlxAppointmentRepository, SqlxContactRepository};
pub use event::SqlxEventRepository;
pub use identity::{IdentityRepository, SqlxMentorRepository, SqlxUserRepository};
pub use meta::{MetaRepository, SqlxMetaRepository};
pub use reference::{ReferenceRepository, SqlxReferenceRepository};
pub use result::SqlxResultRepository;
pub use session::{SessionRepository, SqlxSessionRepository};

/// CRUD operations shared by every stored resource.
#[async_trait]
pub trait Repository: Send + Sync {
    type Entity: Send + Sync;
    type Filter: Send + Sync;

    /// List entities matching the filter
    async fn list(&self, filter: &Self::Filter) -> Result<Vec<Self::Entity>>;

    /// Get entity by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Self::Entity>>;

    /// Insert a new entity, returning it with its assigned ID
    async fn create(&self, entity: &Self::Entity) -> Result<Self::Entity>;

    /// Persist every stored field of an existing entity
    async fn update(&self, entity: &Self::Entity) -> Result<Self::Entity>;

    /// Delete by ID. Returns `false` when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;
}
