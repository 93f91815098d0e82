//! Data models
//!
//! This module contains all data structures used throughout the Mentora backend.
//! Models represent:
//! - Identities (RegularUser, Mentor) and the sessions that authenticate them
//! - Content and activity records (Article, Category, Event, ContactMessage,
//!   MentorAppointment, AssessmentResult, MetaEntry)
//! - The field-map schema every writable record is validated through

pub mod fields;

mod article;
mod category;
mod contact;
mod event;
mod mentor;
mod meta;
mod principal;
mod result;
mod session;
mod user;

pub use article::{Article, ArticleFilter};
pub use category::Category;
pub use contact::{ContactMessage, MentorAppointment};
pub use event::{Event, EVENT_DATE_FORMAT};
pub use fields::{FieldMap, FieldSchema, Reference, ValidationErrors};
pub use mentor::{Mentor, MentorStatus};
pub use meta::MetaEntry;
pub use principal::{Identity, Principal, PrincipalKind, Profile};
pub use result::{AssessmentResult, RESULT_CATEGORIES};
pub use session::Session;
pub use user::{RegularUser, UserStatus};

/// Equality filter shared by the user and mentor lists.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct IdentityFilter {
    pub user_id: Option<i64>,
    pub status: Option<String>,
}

/// Filter for resources that can only be narrowed by id.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdFilter {
    pub id: Option<i64>,
}

/// Assessment result list filter. `result_id` wins over `user_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Deserialize)]
pub struct ResultFilter {
    pub result_id: Option<i64>,
    /// The result owned by this user
    pub user_id: Option<i64>,
}
