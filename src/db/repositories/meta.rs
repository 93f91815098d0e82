//! Meta entry repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::Repository;
use crate::models::{IdFilter, MetaEntry};

/// Meta entries are also addressed by their unique key.
#[async_trait]
pub trait MetaRepository: Repository<Entity = MetaEntry, Filter = IdFilter> {
    async fn get_by_key(&self, key: &str) -> Result<Option<MetaEntry>>;

    /// Whether another entry already uses this key
    async fn key_taken(&self, key: &str, exclude_id: Option<i64>) -> Result<bool>;
}

pub struct SqlxMetaRepository {
    pool: SqlitePool,
}

impl SqlxMetaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn MetaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxMetaRepository {
    type Entity = MetaEntry;
    type Filter = IdFilter;

    async fn list(&self, filter: &IdFilter) -> Result<Vec<MetaEntry>> {
        let rows = sqlx::query("SELECT id, key, title, description FROM meta WHERE (? IS NULL OR id = ?) ORDER BY key")
            .bind(filter.id)
            .bind(filter.id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list meta entries")?;

        Ok(rows.iter().map(row_to_meta).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MetaEntry>> {
        let row = sqlx::query("SELECT id, key, title, description FROM meta WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get meta entry by ID")?;

        Ok(row.as_ref().map(row_to_meta))
    }

    async fn create(&self, entry: &MetaEntry) -> Result<MetaEntry> {
        let result = sqlx::query("INSERT INTO meta (key, title, description) VALUES (?, ?, ?)")
            .bind(&entry.key)
            .bind(&entry.title)
            .bind(&entry.description)
            .execute(&self.pool)
            .await
            .context("Failed to create meta entry")?;

        Ok(MetaEntry {
            id: result.last_insert_rowid(),
            ..entry.clone()
        })
    }

    async fn update(&self, entry: &MetaEntry) -> Result<MetaEntry> {
        sqlx::query("UPDATE meta SET key = ?, title = ?, description = ? WHERE id = ?")
            .bind(&entry.key)
            .bind(&entry.title)
            .bind(&entry.description)
            .bind(entry.id)
            .execute(&self.pool)
            .await
            .context("Failed to update meta entry")?;

        Ok(entry.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meta WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete meta entry")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MetaRepository for SqlxMetaRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<MetaEntry>> {
        let row = sqlx::query("SELECT id, key, title, description FROM meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get meta entry by key")?;

        Ok(row.as_ref().map(row_to_meta))
    }

    async fn key_taken(&self, key: &str, exclude_id: Option<i64>) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM meta WHERE key = ? AND (? IS NULL OR id != ?))",
        )
        .bind(key)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check meta key")?;

        Ok(taken)
    }
}

fn row_to_meta(row: &sqlx::sqlite::SqliteRow) -> MetaEntry {
    MetaEntry {
        id: row.get("id"),
        key: row.get("key"),
        title: row.get("title"),
        description: row.get("description"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_get_by_key_with_slashes() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxMetaRepository::new(pool);

        let entry = repo
            .create(&MetaEntry {
                id: 0,
                key: "docs/overview".into(),
                title: "Overview".into(),
                description: "All docs".into(),
            })
            .await
            .unwrap();

        let found = repo.get_by_key("docs/overview").await.unwrap().unwrap();
        assert_eq!(found, entry);
        assert!(repo.get_by_key("docs").await.unwrap().is_none());
        assert!(repo.key_taken("docs/overview", None).await.unwrap());
        assert!(!repo.key_taken("docs/overview", Some(entry.id)).await.unwrap());
    }
}
