//! Event repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::Repository;
use crate::models::{Event, IdFilter};

pub struct SqlxEventRepository {
    pool: SqlitePool,
}

impl SqlxEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn Repository<Entity = Event, Filter = IdFilter>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxEventRepository {
    type Entity = Event;
    type Filter = IdFilter;

    /// Events come back in date order
    async fn list(&self, filter: &IdFilter) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, date, title, description, photo
            FROM events
            WHERE (? IS NULL OR id = ?)
            ORDER BY date, id
            "#,
        )
        .bind(filter.id)
        .bind(filter.id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list events")?;

        Ok(rows.iter().map(row_to_event).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        let row = sqlx::query("SELECT id, date, title, description, photo FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get event by ID")?;

        Ok(row.as_ref().map(row_to_event))
    }

    async fn create(&self, event: &Event) -> Result<Event> {
        let result = sqlx::query("INSERT INTO events (date, title, description, photo) VALUES (?, ?, ?, ?)")
            .bind(event.date)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.photo)
            .execute(&self.pool)
            .await
            .context("Failed to create event")?;

        Ok(Event {
            id: result.last_insert_rowid(),
            ..event.clone()
        })
    }

    async fn update(&self, event: &Event) -> Result<Event> {
        sqlx::query("UPDATE events SET date = ?, title = ?, description = ?, photo = ? WHERE id = ?")
            .bind(event.date)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.photo)
            .bind(event.id)
            .execute(&self.pool)
            .await
            .context("Failed to update event")?;

        Ok(event.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete event")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        date: row.get("date"),
        title: row.get("title"),
        description: row.get("description"),
        photo: row.get("photo"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::NaiveDate;

    fn event(title: &str, y: i32, m: u32, d: u32) -> Event {
        Event {
            id: 0,
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            title: title.into(),
            description: "desc".into(),
            photo: None,
        }
    }

    #[tokio::test]
    async fn test_list_ordered_by_date() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxEventRepository::new(pool);

        repo.create(&event("late", 2025, 1, 10)).await.unwrap();
        repo.create(&event("early", 2024, 12, 1)).await.unwrap();

        let titles: Vec<String> = repo
            .list(&IdFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_update_keeps_date() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxEventRepository::new(pool);

        let mut created = repo.create(&event("meetup", 2024, 3, 5)).await.unwrap();
        created.photo = Some("/media/e.jpg".into());
        repo.update(&created).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }
}
