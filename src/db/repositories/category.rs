//! Category repository
//!
//! Database operations for article categories.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::Repository;
use crate::models::{Category, IdFilter};

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: SqlitePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn Repository<Entity = Category, Filter = IdFilter>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxCategoryRepository {
    type Entity = Category;
    type Filter = IdFilter;

    async fn list(&self, filter: &IdFilter) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, title FROM categories WHERE (? IS NULL OR id = ?) ORDER BY id")
            .bind(filter.id)
            .bind(filter.id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list categories")?;

        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, title FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get category by ID")?;

        Ok(row.as_ref().map(row_to_category))
    }

    async fn create(&self, category: &Category) -> Result<Category> {
        let result = sqlx::query("INSERT INTO categories (title) VALUES (?)")
            .bind(&category.title)
            .execute(&self.pool)
            .await
            .context("Failed to create category")?;

        Ok(Category {
            id: result.last_insert_rowid(),
            title: category.title.clone(),
        })
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        sqlx::query("UPDATE categories SET title = ? WHERE id = ?")
            .bind(&category.title)
            .bind(category.id)
            .execute(&self.pool)
            .await
            .context("Failed to update category")?;

        Ok(category.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
    }
}
