//! Database layer
//!
//! SQLite storage for the Mentora backend.
//!
//! # Usage
//!
//! ```ignore
//! use mentora::config::DatabaseConfig;
//! use mentora::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool};
