//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - `auth`: ordered backend chain and sessions
//! - `account`: registration and profile updates for users and mentors
//! - `resource`: validated CRUD for every other resource
//! - `merge`: partial-update merging shared by all PUT endpoints
//! - `password`: hashing and password rules

pub mod account;
pub mod auth;
pub mod merge;
pub mod password;
pub mod resource;

pub use account::{Account, AccountService, AccountServiceError};
pub use auth::{AuthBackend, AuthError, Authenticator, MentorBackend, UserBackend};
pub use merge::{merge_fields, merge_update};
pub use password::{hash_password, validate_password, verify_password};
pub use resource::{MetaService, ResourceError, ResourceService};
