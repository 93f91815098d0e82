//! Account service
//!
//! Registration, profile updates and removal for both identity kinds.
//! Passwords travel in the payload's `password` field: required on
//! registration, optional on update, and always checked against the password
//! rules before being hashed.

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::{IdentityRepository, ReferenceRepository, Repository, SessionRepository};
use crate::models::fields::FieldReader;
use crate::models::{
    AssessmentResult, FieldMap, FieldSchema, Identity, IdentityFilter, Mentor, Profile, RegularUser,
    ResultFilter, ValidationErrors,
};
use crate::services::merge::merge_update;
use crate::services::password::{hash_password, validate_password};
use crate::services::resource::check_references;

/// Error types for account operations
#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    /// Payload failed validation
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Account not found
    #[error("{0} not found")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ValidationErrors> for AccountServiceError {
    fn from(errors: ValidationErrors) -> Self {
        AccountServiceError::ValidationError(errors)
    }
}

/// An identity record that can be registered and edited.
pub trait Account: Identity + FieldSchema + Send + Sync + 'static {
    /// Whether the email must be unique within the table.
    const UNIQUE_EMAIL: bool;

    fn profile(&self) -> &Profile;

    fn set_password_hash(&mut self, hash: String);

    /// The assessment result this account owns.
    fn result(&self) -> Option<i64> {
        None
    }
}

impl Account for RegularUser {
    const UNIQUE_EMAIL: bool = true;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }

    fn result(&self) -> Option<i64> {
        self.result
    }
}

impl Account for Mentor {
    const UNIQUE_EMAIL: bool = false;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }
}

/// Account management for one identity table.
pub struct AccountService<T> {
    repo: Arc<dyn IdentityRepository<Entity = T>>,
    references: Arc<dyn ReferenceRepository>,
    results: Arc<dyn Repository<Entity = AssessmentResult, Filter = ResultFilter>>,
    sessions: Arc<dyn SessionRepository>,
}

impl<T: Account> AccountService<T> {
    pub fn new(
        repo: Arc<dyn IdentityRepository<Entity = T>>,
        references: Arc<dyn ReferenceRepository>,
        results: Arc<dyn Repository<Entity = AssessmentResult, Filter = ResultFilter>>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            repo,
            references,
            results,
            sessions,
        }
    }

    pub async fn list(&self, filter: &IdentityFilter) -> Result<Vec<T>, AccountServiceError> {
        let accounts = self
            .repo
            .list(filter)
            .await
            .with_context(|| format!("Failed to list {} accounts", T::KIND))?;
        Ok(accounts)
    }

    pub async fn get(&self, id: i64) -> Result<T, AccountServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .with_context(|| format!("Failed to get {} account", T::KIND))?
            .ok_or_else(|| AccountServiceError::NotFound(format!("{} with ID {}", T::KIND, id)))
    }

    /// Create an account from a registration payload.
    pub async fn register(&self, fields: &FieldMap) -> Result<T, AccountServiceError> {
        let mut errors = ValidationErrors::new();
        let account = T::from_fields(fields, None).map_err(|e| errors.extend(e)).ok();
        let password = read_password(fields, true, &mut errors);

        let (Some(mut account), Some(password)) = (account, password) else {
            return Err(errors.into());
        };
        check_password(&password, account.username(), &mut errors);
        errors.into_result()?;

        self.ensure_unique(&account, None).await?;
        self.ensure_references(&account).await?;

        account.set_password_hash(hash_password(&password)?);
        let created = self
            .repo
            .create(&account)
            .await
            .with_context(|| format!("Failed to create {} account", T::KIND))?;

        tracing::info!("Registered {} {} ({})", T::KIND, created.username(), created.id());
        Ok(created)
    }

    /// Merge a sparse payload onto the stored account.
    ///
    /// A result the account no longer references is deleted.
    pub async fn update(&self, id: i64, fields: &FieldMap) -> Result<T, AccountServiceError> {
        let current = self.get(id).await?;

        let mut errors = ValidationErrors::new();
        let merged = merge_update(&current, fields).map_err(|e| errors.extend(e)).ok();
        let password = read_password(fields, false, &mut errors);

        let Some(mut merged) = merged else {
            return Err(errors.into());
        };
        if let Some(password) = &password {
            check_password(password, merged.username(), &mut errors);
        }
        errors.into_result()?;

        self.ensure_unique(&merged, Some(id)).await?;
        self.ensure_references(&merged).await?;

        if let Some(password) = &password {
            merged.set_password_hash(hash_password(password)?);
        }
        let updated = self
            .repo
            .update(&merged)
            .await
            .with_context(|| format!("Failed to update {} account", T::KIND))?;

        if let Some(old) = current.result() {
            if updated.result() != Some(old) {
                self.results
                    .delete(old)
                    .await
                    .context("Failed to delete replaced result")?;
                tracing::debug!("Deleted result {} replaced on {} {}", old, T::KIND, id);
            }
        }

        Ok(updated)
    }

    /// Delete an account and every session it holds.
    pub async fn delete(&self, id: i64) -> Result<(), AccountServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .with_context(|| format!("Failed to delete {} account", T::KIND))?;
        if !deleted {
            return Err(AccountServiceError::NotFound(format!("{} with ID {}", T::KIND, id)));
        }

        self.sessions
            .delete_by_principal(T::KIND, id)
            .await
            .context("Failed to delete account sessions")?;
        tracing::info!("Deleted {} {}", T::KIND, id);
        Ok(())
    }

    async fn ensure_unique(&self, account: &T, exclude_id: Option<i64>) -> Result<(), AccountServiceError> {
        let mut errors = ValidationErrors::new();

        if self.repo.username_taken(account.username(), exclude_id).await? {
            errors.add(
                "username",
                format!("A {} with that username already exists.", T::KIND),
            );
        }
        if T::UNIQUE_EMAIL && self.repo.email_taken(&account.profile().email, exclude_id).await? {
            errors.add("email", format!("{} with this email already exists.", T::KIND));
        }
        if let Some(result) = account.result() {
            if self.repo.result_taken(result, exclude_id).await? {
                errors.add("result", format!("{} with this result already exists.", T::KIND));
            }
        }

        Ok(errors.into_result()?)
    }

    async fn ensure_references(&self, account: &T) -> Result<(), AccountServiceError> {
        check_references(self.references.as_ref(), &account.references())
            .await?
            .into_result()?;
        Ok(())
    }
}

fn read_password(fields: &FieldMap, creating: bool, errors: &mut ValidationErrors) -> Option<String> {
    let mut reader = FieldReader::new(fields, creating);
    let password = if creating {
        let mut password = String::new();
        reader.required_text("password", None, &mut password);
        Some(password).filter(|p| !p.is_empty())
    } else {
        let mut password = None;
        reader.optional_text("password", None, &mut password);
        password
    };

    if let Err(e) = reader.finish() {
        errors.extend(e);
        return None;
    }
    password
}

fn check_password(password: &str, username: &str, errors: &mut ValidationErrors) {
    for problem in validate_password(password, username) {
        errors.add("password", problem);
    }
}
