//! Contact message and mentor appointment repositories
//!
//! An appointment is stored as a `contacts` row plus an `appointments` row
//! keyed by the same id. Writes touching both run in one transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

use super::Repository;
use crate::models::{ContactMessage, IdFilter, MentorAppointment};

/// SQLx-based contact message repository
pub struct SqlxContactRepository {
    pool: SqlitePool,
}

impl SqlxContactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn Repository<Entity = ContactMessage, Filter = IdFilter>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxContactRepository {
    type Entity = ContactMessage;
    type Filter = IdFilter;

    async fn list(&self, filter: &IdFilter) -> Result<Vec<ContactMessage>> {
        let rows = sqlx::query(
            "SELECT id, user_id, mail, telegram, message FROM contacts WHERE (? IS NULL OR id = ?) ORDER BY id",
        )
        .bind(filter.id)
        .bind(filter.id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list contacts")?;

        Ok(rows.iter().map(row_to_contact).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>> {
        let row = sqlx::query("SELECT id, user_id, mail, telegram, message FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get contact by ID")?;

        Ok(row.as_ref().map(row_to_contact))
    }

    async fn create(&self, contact: &ContactMessage) -> Result<ContactMessage> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let id = insert_contact(&mut tx, contact).await?;
        tx.commit().await.context("Failed to commit contact")?;

        Ok(ContactMessage {
            id,
            ..contact.clone()
        })
    }

    async fn update(&self, contact: &ContactMessage) -> Result<ContactMessage> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        update_contact(&mut tx, contact).await?;
        tx.commit().await.context("Failed to commit contact")?;

        Ok(contact.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete contact")?;

        Ok(result.rows_affected() > 0)
    }
}

const APPOINTMENT_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.mail, c.telegram, c.message, a.mentor_id, a.description
    FROM appointments a
    JOIN contacts c ON c.id = a.contact_id
"#;

/// SQLx-based mentor appointment repository
pub struct SqlxAppointmentRepository {
    pool: SqlitePool,
}

impl SqlxAppointmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(
        pool: SqlitePool,
    ) -> Arc<dyn Repository<Entity = MentorAppointment, Filter = IdFilter>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxAppointmentRepository {
    type Entity = MentorAppointment;
    type Filter = IdFilter;

    async fn list(&self, filter: &IdFilter) -> Result<Vec<MentorAppointment>> {
        let sql = format!("{} WHERE (? IS NULL OR c.id = ?) ORDER BY c.id", APPOINTMENT_SELECT);
        let rows = sqlx::query(&sql)
            .bind(filter.id)
            .bind(filter.id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list appointments")?;

        Ok(rows.iter().map(row_to_appointment).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MentorAppointment>> {
        let sql = format!("{} WHERE c.id = ?", APPOINTMENT_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get appointment by ID")?;

        Ok(row.as_ref().map(row_to_appointment))
    }

    async fn create(&self, appointment: &MentorAppointment) -> Result<MentorAppointment> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let id = insert_contact(&mut tx, &appointment.contact).await?;

        sqlx::query("INSERT INTO appointments (contact_id, mentor_id, description) VALUES (?, ?, ?)")
            .bind(id)
            .bind(appointment.mentor)
            .bind(&appointment.description)
            .execute(&mut *tx)
            .await
            .context("Failed to create appointment")?;

        tx.commit().await.context("Failed to commit appointment")?;

        let mut created = appointment.clone();
        created.contact.id = id;
        Ok(created)
    }

    async fn update(&self, appointment: &MentorAppointment) -> Result<MentorAppointment> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        update_contact(&mut tx, &appointment.contact).await?;

        sqlx::query("UPDATE appointments SET mentor_id = ?, description = ? WHERE contact_id = ?")
            .bind(appointment.mentor)
            .bind(&appointment.description)
            .bind(appointment.id())
            .execute(&mut *tx)
            .await
            .context("Failed to update appointment")?;

        tx.commit().await.context("Failed to commit appointment")?;
        Ok(appointment.clone())
    }

    /// Deletes the parent contact row; the appointment row cascades.
    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM contacts WHERE id = ? AND id IN (SELECT contact_id FROM appointments)",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to delete appointment")?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_contact(tx: &mut Transaction<'_, Sqlite>, contact: &ContactMessage) -> Result<i64> {
    let result = sqlx::query("INSERT INTO contacts (user_id, mail, telegram, message) VALUES (?, ?, ?, ?)")
        .bind(contact.user)
        .bind(&contact.mail)
        .bind(&contact.telegram)
        .bind(&contact.message)
        .execute(&mut **tx)
        .await
        .context("Failed to create contact")?;

    Ok(result.last_insert_rowid())
}

async fn update_contact(tx: &mut Transaction<'_, Sqlite>, contact: &ContactMessage) -> Result<()> {
    sqlx::query("UPDATE contacts SET user_id = ?, mail = ?, telegram = ?, message = ? WHERE id = ?")
        .bind(contact.user)
        .bind(&contact.mail)
        .bind(&contact.telegram)
        .bind(&contact.message)
        .bind(contact.id)
        .execute(&mut **tx)
        .await
        .context("Failed to update contact")?;

    Ok(())
}

fn row_to_contact(row: &SqliteRow) -> ContactMessage {
    ContactMessage {
        id: row.get("id"),
        user: row.get("user_id"),
        mail: row.get("mail"),
        telegram: row.get("telegram"),
        message: row.get("message"),
    }
}

fn row_to_appointment(row: &SqliteRow) -> MentorAppointment {
    MentorAppointment {
        contact: row_to_contact(row),
        mentor: row.get("mentor_id"),
        description: row.get("description"),
    }
}
