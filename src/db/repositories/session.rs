//! Session repository
//!
//! Database operations for login sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite

use crate::models::{PrincipalKind, Session};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions of one principal
    async fn delete_by_principal(&self, kind: PrincipalKind, principal_id: i64) -> Result<()>;

    /// Delete expired sessions
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: SqlitePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, principal_kind, principal_id, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.principal_kind.to_string())
        .bind(session.principal_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, principal_kind, principal_id, expires_at, created_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get session by ID")?;

        match row {
            Some(row) => Ok(Some(row_to_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    async fn delete_by_principal(&self, kind: PrincipalKind, principal_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE principal_kind = ? AND principal_id = ?")
            .bind(kind.to_string())
            .bind(principal_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete sessions by principal")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;

        Ok(result.rows_affected() as i64)
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    let kind: String = row.get("principal_kind");

    Ok(Session {
        id: row.get("id"),
        principal_kind: PrincipalKind::from_str(&kind)?,
        principal_id: row.get("principal_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSessionRepository::new(pool)
    }

    fn create_test_session(kind: PrincipalKind, principal_id: i64, expires_in_days: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            principal_kind: kind,
            principal_id,
            expires_at: now + Duration::days(expires_in_days),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let repo = setup_test_repo().await;

        let session = create_test_session(PrincipalKind::Mentor, 1, 7);
        repo.create(&session).await.expect("Failed to create session");

        let found = repo
            .get_by_id(&session.id)
            .await
            .expect("Failed to get session")
            .expect("Session not found");

        assert_eq!(found.id, session.id);
        assert_eq!(found.principal_kind, PrincipalKind::Mentor);
        assert_eq!(found.principal_id, 1);
    }

    #[tokio::test]
    async fn test_get_session_by_id_not_found() {
        let repo = setup_test_repo().await;

        let found = repo
            .get_by_id("nonexistent-session-id")
            .await
            .expect("Failed to get session");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let repo = setup_test_repo().await;

        let session = create_test_session(PrincipalKind::User, 1, 7);
        repo.create(&session).await.expect("Failed to create session");
        repo.delete(&session.id)
            .await
            .expect("Failed to delete session");

        assert!(repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_principal_keeps_other_kind() {
        let repo = setup_test_repo().await;

        // Same numeric id in both identity tables
        let user_session = create_test_session(PrincipalKind::User, 1, 7);
        let mentor_session = create_test_session(PrincipalKind::Mentor, 1, 7);
        repo.create(&user_session).await.unwrap();
        repo.create(&mentor_session).await.unwrap();

        repo.delete_by_principal(PrincipalKind::User, 1)
            .await
            .expect("Failed to delete sessions by principal");

        assert!(repo.get_by_id(&user_session.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&mentor_session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let repo = setup_test_repo().await;

        let expired_session = create_test_session(PrincipalKind::User, 1, -1);
        let valid_session = create_test_session(PrincipalKind::User, 1, 7);
        repo.create(&expired_session).await.unwrap();
        repo.create(&valid_session).await.unwrap();

        let deleted_count = repo
            .delete_expired()
            .await
            .expect("Failed to delete expired sessions");

        assert_eq!(deleted_count, 1);
        assert!(repo.get_by_id(&expired_session.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&valid_session.id).await.unwrap().is_some());
    }
}
