//! Assessment result repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::Repository;
use crate::models::{AssessmentResult, ResultFilter};

const RESULT_COLUMNS: &str = "results.id, results.date, results.frontend, results.backend, \
     results.ux_ui, results.data_science, results.mobile_development, results.machine_learning";

pub struct SqlxResultRepository {
    pool: SqlitePool,
}

impl SqlxResultRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(
        pool: SqlitePool,
    ) -> Arc<dyn Repository<Entity = AssessmentResult, Filter = ResultFilter>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxResultRepository {
    type Entity = AssessmentResult;
    type Filter = ResultFilter;

    async fn list(&self, filter: &ResultFilter) -> Result<Vec<AssessmentResult>> {
        let rows = if let Some(result_id) = filter.result_id {
            let sql = format!("SELECT {} FROM results WHERE results.id = ?", RESULT_COLUMNS);
            sqlx::query(&sql).bind(result_id).fetch_all(&self.pool).await
        } else if let Some(user_id) = filter.user_id {
            let sql = format!(
                "SELECT {} FROM results JOIN users ON users.result_id = results.id WHERE users.id = ?",
                RESULT_COLUMNS
            );
            sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await
        } else {
            let sql = format!("SELECT {} FROM results ORDER BY results.id", RESULT_COLUMNS);
            sqlx::query(&sql).fetch_all(&self.pool).await
        }
        .context("Failed to list results")?;

        Ok(rows.iter().map(row_to_result).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AssessmentResult>> {
        let sql = format!("SELECT {} FROM results WHERE results.id = ?", RESULT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get result by ID")?;

        Ok(row.as_ref().map(row_to_result))
    }

    async fn create(&self, result: &AssessmentResult) -> Result<AssessmentResult> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO results (date, frontend, backend, ux_ui, data_science, mobile_development, machine_learning)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(result.date)
        .bind(&result.frontend)
        .bind(&result.backend)
        .bind(&result.ux_ui)
        .bind(&result.data_science)
        .bind(&result.mobile_development)
        .bind(&result.machine_learning)
        .execute(&self.pool)
        .await
        .context("Failed to create result")?;

        Ok(AssessmentResult {
            id: inserted.last_insert_rowid(),
            ..result.clone()
        })
    }

    async fn update(&self, result: &AssessmentResult) -> Result<AssessmentResult> {
        sqlx::query(
            r#"
            UPDATE results
            SET date = ?, frontend = ?, backend = ?, ux_ui = ?, data_science = ?,
                mobile_development = ?, machine_learning = ?
            WHERE id = ?
            "#,
        )
        .bind(result.date)
        .bind(&result.frontend)
        .bind(&result.backend)
        .bind(&result.ux_ui)
        .bind(&result.data_science)
        .bind(&result.mobile_development)
        .bind(&result.machine_learning)
        .bind(result.id)
        .execute(&self.pool)
        .await
        .context("Failed to update result")?;

        Ok(result.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM results WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete result")?;

        Ok(deleted.rows_affected() > 0)
    }
}

fn row_to_result(row: &sqlx::sqlite::SqliteRow) -> AssessmentResult {
    AssessmentResult {
        id: row.get("id"),
        date: row.get("date"),
        frontend: row.get("frontend"),
        backend: row.get("backend"),
        ux_ui: row.get("ux_ui"),
        data_science: row.get("data_science"),
        mobile_development: row.get("mobile_development"),
        machine_learning: row.get("machine_learning"),
    }
}
