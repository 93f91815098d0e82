//! Identity repositories
//!
//! Database operations for regular users and mentors. The two kinds live in
//! separate tables with their own username namespaces but share the profile
//! columns, so the row mapping helpers are common.
//!
//! This module provides:
//! - `IdentityRepository` trait adding username/email lookups to [`Repository`]
//! - `SqlxUserRepository` over the `users` table
//! - `SqlxMentorRepository` over the `mentors` table

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use super::Repository;
use crate::models::{IdentityFilter, Mentor, MentorStatus, Profile, RegularUser, UserStatus};

/// Lookups the authenticator and uniqueness checks need on top of CRUD.
#[async_trait]
pub trait IdentityRepository: Repository<Filter = IdentityFilter> {
    /// Get identity by exact username
    async fn get_by_username(&self, username: &str) -> Result<Option<Self::Entity>>;

    /// Whether another identity already uses this username
    async fn username_taken(&self, username: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Whether another identity already uses this email
    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Whether another identity already owns this assessment result.
    /// Tables without a result column never conflict.
    async fn result_taken(&self, _result_id: i64, _exclude_id: Option<i64>) -> Result<bool> {
        Ok(false)
    }
}

const PROFILE_COLUMNS: &str = "email, name, surname, patronymic, photo, telegram, about_me";

const USER_COLUMNS: &str = "id, username, password_hash, email, name, surname, patronymic, photo, \
     telegram, about_me, status, result_id, is_active, is_staff, is_superuser, date_joined";

const MENTOR_COLUMNS: &str = "id, username, password_hash, email, name, surname, patronymic, photo, \
     telegram, about_me, status, is_active, is_staff, is_superuser, date_joined";

/// SQLx-based repository over the `users` table
pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn IdentityRepository<Entity = RegularUser>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxUserRepository {
    type Entity = RegularUser;
    type Filter = IdentityFilter;

    async fn list(&self, filter: &IdentityFilter) -> Result<Vec<RegularUser>> {
        let sql = format!(
            "SELECT {} FROM users WHERE (? IS NULL OR id = ?) AND (? IS NULL OR status = ?) \
             ORDER BY surname, name, patronymic, id",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user_id)
            .bind(filter.user_id)
            .bind(&filter.status)
            .bind(&filter.status)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        rows.iter().map(row_to_user).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<RegularUser>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn create(&self, user: &RegularUser) -> Result<RegularUser> {
        let sql = format!(
            "INSERT INTO users (username, password_hash, {}, status, result_id, \
             is_active, is_staff, is_superuser, date_joined) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PROFILE_COLUMNS
        );
        let query = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.password_hash);
        let result = bind_profile(query, &user.profile)
            .bind(user.status.map(|s| s.to_string()))
            .bind(user.result)
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.date_joined)
            .execute(&self.pool)
            .await
            .context("Failed to create user")?;

        Ok(RegularUser {
            id: result.last_insert_rowid(),
            ..user.clone()
        })
    }

    async fn update(&self, user: &RegularUser) -> Result<RegularUser> {
        let sql = "UPDATE users SET username = ?, password_hash = ?, email = ?, name = ?, \
                   surname = ?, patronymic = ?, photo = ?, telegram = ?, about_me = ?, \
                   status = ?, result_id = ?, is_active = ?, is_staff = ?, is_superuser = ? \
                   WHERE id = ?";
        let query = sqlx::query(sql)
            .bind(&user.username)
            .bind(&user.password_hash);
        bind_profile(query, &user.profile)
            .bind(user.status.map(|s| s.to_string()))
            .bind(user.result)
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.id)
            .execute(&self.pool)
            .await
            .context("Failed to update user")?;

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IdentityRepository for SqlxUserRepository {
    async fn get_by_username(&self, username: &str) -> Result<Option<RegularUser>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by username")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn username_taken(&self, username: &str, exclude_id: Option<i64>) -> Result<bool> {
        value_taken(&self.pool, "users", "username", username, exclude_id).await
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool> {
        value_taken(&self.pool, "users", "email", email, exclude_id).await
    }

    async fn result_taken(&self, result_id: i64, exclude_id: Option<i64>) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE result_id = ? AND (? IS NULL OR id != ?))",
        )
        .bind(result_id)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check users result_id")?;

        Ok(taken)
    }
}

/// SQLx-based repository over the `mentors` table
pub struct SqlxMentorRepository {
    pool: SqlitePool,
}

impl SqlxMentorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn IdentityRepository<Entity = Mentor>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxMentorRepository {
    type Entity = Mentor;
    type Filter = IdentityFilter;

    async fn list(&self, filter: &IdentityFilter) -> Result<Vec<Mentor>> {
        let sql = format!(
            "SELECT {} FROM mentors WHERE (? IS NULL OR id = ?) AND (? IS NULL OR status = ?) \
             ORDER BY surname, name, patronymic, id",
            MENTOR_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user_id)
            .bind(filter.user_id)
            .bind(&filter.status)
            .bind(&filter.status)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list mentors")?;

        rows.iter().map(row_to_mentor).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Mentor>> {
        let sql = format!("SELECT {} FROM mentors WHERE id = ?", MENTOR_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get mentor by ID")?;

        row.as_ref().map(row_to_mentor).transpose()
    }

    async fn create(&self, mentor: &Mentor) -> Result<Mentor> {
        let sql = format!(
            "INSERT INTO mentors (username, password_hash, {}, status, \
             is_active, is_staff, is_superuser, date_joined) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PROFILE_COLUMNS
        );
        let query = sqlx::query(&sql)
            .bind(&mentor.username)
            .bind(&mentor.password_hash);
        let result = bind_profile(query, &mentor.profile)
            .bind(mentor.status.map(|s| s.to_string()))
            .bind(mentor.is_active)
            .bind(mentor.is_staff)
            .bind(mentor.is_superuser)
            .bind(mentor.date_joined)
            .execute(&self.pool)
            .await
            .context("Failed to create mentor")?;

        Ok(Mentor {
            id: result.last_insert_rowid(),
            ..mentor.clone()
        })
    }

    async fn update(&self, mentor: &Mentor) -> Result<Mentor> {
        let sql = "UPDATE mentors SET username = ?, password_hash = ?, email = ?, name = ?, \
                   surname = ?, patronymic = ?, photo = ?, telegram = ?, about_me = ?, \
                   status = ?, is_active = ?, is_staff = ?, is_superuser = ? \
                   WHERE id = ?";
        let query = sqlx::query(sql)
            .bind(&mentor.username)
            .bind(&mentor.password_hash);
        bind_profile(query, &mentor.profile)
            .bind(mentor.status.map(|s| s.to_string()))
            .bind(mentor.is_active)
            .bind(mentor.is_staff)
            .bind(mentor.is_superuser)
            .bind(mentor.id)
            .execute(&self.pool)
            .await
            .context("Failed to update mentor")?;

        self.get_by_id(mentor.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Mentor not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mentors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete mentor")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IdentityRepository for SqlxMentorRepository {
    async fn get_by_username(&self, username: &str) -> Result<Option<Mentor>> {
        let sql = format!("SELECT {} FROM mentors WHERE username = ?", MENTOR_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get mentor by username")?;

        row.as_ref().map(row_to_mentor).transpose()
    }

    async fn username_taken(&self, username: &str, exclude_id: Option<i64>) -> Result<bool> {
        value_taken(&self.pool, "mentors", "username", username, exclude_id).await
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool> {
        value_taken(&self.pool, "mentors", "email", email, exclude_id).await
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Bind the profile columns in `PROFILE_COLUMNS` order.
fn bind_profile<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    profile: &'q Profile,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.surname)
        .bind(&profile.patronymic)
        .bind(&profile.photo)
        .bind(&profile.telegram)
        .bind(&profile.about_me)
}

async fn value_taken(
    pool: &SqlitePool,
    table: &'static str,
    column: &'static str,
    value: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ? AND (? IS NULL OR id != ?))",
        table, column
    );
    let taken: bool = sqlx::query_scalar(&sql)
        .bind(value)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to check {} {}", table, column))?;

    Ok(taken)
}

fn row_to_profile(row: &SqliteRow) -> Profile {
    Profile {
        email: row.get("email"),
        name: row.get("name"),
        surname: row.get("surname"),
        patronymic: row.get("patronymic"),
        photo: row.get("photo"),
        telegram: row.get("telegram"),
        about_me: row.get("about_me"),
    }
}

fn row_to_user(row: &SqliteRow) -> Result<RegularUser> {
    let status: Option<String> = row.get("status");

    Ok(RegularUser {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        profile: row_to_profile(row),
        status: status.as_deref().map(UserStatus::from_str).transpose()?,
        result: row.get("result_id"),
        is_active: row.get("is_active"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        date_joined: row.get("date_joined"),
    })
}

fn row_to_mentor(row: &SqliteRow) -> Result<Mentor> {
    let status: Option<String> = row.get("status");

    Ok(Mentor {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        profile: row_to_profile(row),
        status: status.as_deref().map(MentorStatus::from_str).transpose()?,
        is_active: row.get("is_active"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        date_joined: row.get("date_joined"),
    })
}
