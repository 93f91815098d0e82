//! Database migrations module
//!
//! Code-based migrations embedded in the binary as SQL strings. Applied
//! versions are tracked in the `_migrations` table.
//!
//! # Usage
//!
//! ```ignore
//! use mentora::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements to apply
    pub up_sql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_results",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                frontend VARCHAR(255) NOT NULL,
                backend VARCHAR(255) NOT NULL,
                ux_ui VARCHAR(255) NOT NULL,
                data_science VARCHAR(255) NOT NULL,
                mobile_development VARCHAR(255) NOT NULL,
                machine_learning VARCHAR(255) NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_users",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(255),
                surname VARCHAR(255),
                patronymic VARCHAR(255) NOT NULL DEFAULT '',
                photo TEXT,
                telegram VARCHAR(255),
                status VARCHAR(32),
                about_me TEXT,
                result_id INTEGER REFERENCES results(id) ON DELETE SET NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                is_staff BOOLEAN NOT NULL DEFAULT 0,
                is_superuser BOOLEAN NOT NULL DEFAULT 0,
                date_joined TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_result ON users(result_id);
        "#,
    },
    Migration {
        version: 3,
        name: "create_mentors",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS mentors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                email VARCHAR(255) NOT NULL,
                name VARCHAR(255),
                surname VARCHAR(255),
                patronymic VARCHAR(255) NOT NULL DEFAULT '',
                photo TEXT,
                telegram VARCHAR(255),
                status VARCHAR(32),
                about_me TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                is_staff BOOLEAN NOT NULL DEFAULT 0,
                is_superuser BOOLEAN NOT NULL DEFAULT 0,
                date_joined TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 4,
        name: "create_sessions",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                principal_kind VARCHAR(16) NOT NULL,
                principal_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_principal ON sessions(principal_kind, principal_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_categories",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_articles",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                title_en VARCHAR(255) NOT NULL,
                text TEXT,
                author VARCHAR(255) NOT NULL,
                image TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_articles_title_en ON articles(title_en);
            CREATE TABLE IF NOT EXISTS article_categories (
                article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                PRIMARY KEY (article_id, category_id)
            );
            CREATE INDEX IF NOT EXISTS idx_article_categories_category ON article_categories(category_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_events",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                photo TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_events_date ON events(date);
        "#,
    },
    Migration {
        version: 8,
        name: "create_contacts",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                mail VARCHAR(255) NOT NULL,
                telegram VARCHAR(255),
                message TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_contacts_user ON contacts(user_id);
        "#,
    },
    Migration {
        version: 9,
        name: "create_appointments",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS appointments (
                contact_id INTEGER PRIMARY KEY REFERENCES contacts(id) ON DELETE CASCADE,
                mentor_id INTEGER NOT NULL REFERENCES mentors(id) ON DELETE CASCADE,
                description TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_appointments_mentor ON appointments(mentor_id);
        "#,
    },
    Migration {
        version: 10,
        name: "create_meta",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS meta (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT NOT NULL
            );
        "#,
    },
];

/// Run all pending migrations.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create migrations table")?;
    Ok(())
}

async fn get_applied_migrations(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

/// Apply a single migration inside a transaction
async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin migration")?;

    for statement in split_sql_statements(migration.up_sql) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.context("Failed to commit migration")?;
    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, handling comments properly
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    // Handle last statement without trailing semicolon
    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> SqlitePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &SqlitePool, username: &str, email: &str) -> sqlx::Result<i64> {
        let result = sqlx::query("INSERT INTO users (username, password_hash, email) VALUES (?, ?, ?)")
            .bind(username)
            .bind("hash")
            .bind(email)
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Running again should apply 0 migrations
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_versions_are_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, i + 1);
        }
    }

    #[tokio::test]
    async fn test_user_email_unique_but_mentor_email_not() {
        let pool = migrated_pool().await;

        insert_user(&pool, "alice", "same@example.com").await.unwrap();
        assert!(insert_user(&pool, "alice2", "same@example.com").await.is_err());

        for username in ["m1", "m2"] {
            sqlx::query("INSERT INTO mentors (username, password_hash, email) VALUES (?, ?, ?)")
                .bind(username)
                .bind("hash")
                .bind("same@example.com")
                .execute(&pool)
                .await
                .expect("Mentor emails may repeat");
        }
    }

    #[tokio::test]
    async fn test_patronymic_defaults_to_empty() {
        let pool = migrated_pool().await;
        let id = insert_user(&pool, "alice", "alice@example.com").await.unwrap();

        let row = sqlx::query("SELECT patronymic, is_active FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        let patronymic: String = row.get("patronymic");
        let is_active: bool = row.get("is_active");
        assert_eq!(patronymic, "");
        assert!(is_active);
    }

    #[tokio::test]
    async fn test_deleting_result_nulls_user_reference() {
        let pool = migrated_pool().await;
        let result_id = sqlx::query(
            "INSERT INTO results (date, frontend, backend, ux_ui, data_science, mobile_development, machine_learning) VALUES ('2024-01-01', 'a', 'b', 'c', 'd', 'e', 'f')",
        )
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let user_id = insert_user(&pool, "alice", "alice@example.com").await.unwrap();
        sqlx::query("UPDATE users SET result_id = ? WHERE id = ?")
            .bind(result_id)
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("DELETE FROM results WHERE id = ?")
            .bind(result_id)
            .execute(&pool)
            .await
            .unwrap();

        let row = sqlx::query("SELECT result_id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        let result: Option<i64> = row.get("result_id");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_deleting_contact_cascades_to_appointment() {
        let pool = migrated_pool().await;
        let user_id = insert_user(&pool, "alice", "alice@example.com").await.unwrap();
        let mentor_id = sqlx::query("INSERT INTO mentors (username, password_hash, email) VALUES ('bob', 'hash', 'bob@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let contact_id = sqlx::query("INSERT INTO contacts (user_id, mail, message) VALUES (?, 'a@b.c', 'hi')")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO appointments (contact_id, mentor_id, description) VALUES (?, ?, 'resume')")
            .bind(contact_id)
            .bind(mentor_id)
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS count FROM appointments")
            .fetch_one(&pool)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_foreign_key_constraints() {
        let pool = migrated_pool().await;

        let result = sqlx::query("INSERT INTO contacts (user_id, mail, message) VALUES (999, 'a@b.c', 'hi')")
            .execute(&pool)
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);

        // Test with comments
        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);";
        let statements = split_sql_statements(sql_with_comments);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}
