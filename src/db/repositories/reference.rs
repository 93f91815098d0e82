//! Foreign key existence checks

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Tables an entity may reference.
const REFERENCEABLE_TABLES: &[&str] = &["users", "mentors", "results", "categories"];

/// Checks that referenced rows exist before a write.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn exists(&self, table: &str, id: i64) -> Result<bool>;
}

pub struct SqlxReferenceRepository {
    pool: SqlitePool,
}

impl SqlxReferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ReferenceRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReferenceRepository for SqlxReferenceRepository {
    async fn exists(&self, table: &str, id: i64) -> Result<bool> {
        // Table names cannot be bound, so only known ones are interpolated.
        if !REFERENCEABLE_TABLES.contains(&table) {
            bail!("Table is not referenceable: {}", table);
        }

        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", table);
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to check {} reference", table))?;

        Ok(exists)
    }
}
