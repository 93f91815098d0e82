//! Generic resource service
//!
//! Every plain CRUD resource (posts, categories, contacts, appointments,
//! results, events) goes through [`ResourceService`]: payloads are validated
//! through the entity's [`FieldSchema`], foreign keys are checked against the
//! database, and updates are merged onto the stored record.
//!
//! Page meta entries are addressed by key rather than id and have their own
//! [`MetaService`].

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::{MetaRepository, ReferenceRepository, Repository};
use crate::models::{FieldMap, FieldSchema, IdFilter, MetaEntry, Reference, ValidationErrors};
use crate::services::merge::merge_update;

/// Error types for resource operations
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// Payload failed validation
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// No record with that id or key
    #[error("{0} not found")]
    NotFound(String),

    /// Storage fault
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ValidationErrors> for ResourceError {
    fn from(errors: ValidationErrors) -> Self {
        ResourceError::ValidationError(errors)
    }
}

/// Collect an error for every reference whose target row is missing.
pub async fn check_references(
    repo: &dyn ReferenceRepository,
    references: &[Reference],
) -> anyhow::Result<ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for reference in references {
        if !repo.exists(reference.table, reference.id).await? {
            errors.add(
                reference.field,
                format!("Invalid pk \"{}\" - object does not exist.", reference.id),
            );
        }
    }
    Ok(errors)
}

/// CRUD over one repository with schema validation.
pub struct ResourceService<E, F> {
    name: &'static str,
    repo: Arc<dyn Repository<Entity = E, Filter = F>>,
    references: Arc<dyn ReferenceRepository>,
}

impl<E, F> ResourceService<E, F>
where
    E: FieldSchema + Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    /// `name` is used in not-found messages and logs.
    pub fn new(
        name: &'static str,
        repo: Arc<dyn Repository<Entity = E, Filter = F>>,
        references: Arc<dyn ReferenceRepository>,
    ) -> Self {
        Self {
            name,
            repo,
            references,
        }
    }

    pub async fn list(&self, filter: &F) -> Result<Vec<E>, ResourceError> {
        let items = self
            .repo
            .list(filter)
            .await
            .with_context(|| format!("Failed to list {}", self.name))?;
        Ok(items)
    }

    pub async fn get(&self, id: i64) -> Result<E, ResourceError> {
        self.repo
            .get_by_id(id)
            .await
            .with_context(|| format!("Failed to get {}", self.name))?
            .ok_or_else(|| self.not_found(id))
    }

    /// Validate a full payload and insert it.
    pub async fn create(&self, fields: &FieldMap) -> Result<E, ResourceError> {
        let entity = E::from_fields(fields, None)?;
        self.ensure_references(&entity).await?;

        let created = self
            .repo
            .create(&entity)
            .await
            .with_context(|| format!("Failed to create {}", self.name))?;
        tracing::debug!("Created {}", self.name);
        Ok(created)
    }

    /// Merge a sparse payload onto the stored record and save it.
    pub async fn update(&self, id: i64, fields: &FieldMap) -> Result<E, ResourceError> {
        let current = self.get(id).await?;
        let merged = merge_update(&current, fields)?;
        self.ensure_references(&merged).await?;

        let updated = self
            .repo
            .update(&merged)
            .await
            .with_context(|| format!("Failed to update {}", self.name))?;
        tracing::debug!("Updated {} {}", self.name, id);
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ResourceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .with_context(|| format!("Failed to delete {}", self.name))?;
        if !deleted {
            return Err(self.not_found(id));
        }
        tracing::debug!("Deleted {} {}", self.name, id);
        Ok(())
    }

    async fn ensure_references(&self, entity: &E) -> Result<(), ResourceError> {
        check_references(self.references.as_ref(), &entity.references())
            .await?
            .into_result()?;
        Ok(())
    }

    fn not_found(&self, id: i64) -> ResourceError {
        ResourceError::NotFound(format!("{} with ID {}", self.name, id))
    }
}

/// Page meta entries, addressed by key.
pub struct MetaService {
    repo: Arc<dyn MetaRepository>,
}

impl MetaService {
    pub fn new(repo: Arc<dyn MetaRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<MetaEntry>, ResourceError> {
        Ok(self.repo.list(&IdFilter::default()).await?)
    }

    /// Look up an entry by its raw path key (`$` stands for `/`).
    pub async fn get_by_key(&self, raw_key: &str) -> Result<MetaEntry, ResourceError> {
        let key = MetaEntry::decode_key(raw_key);
        self.repo
            .get_by_key(&key)
            .await?
            .ok_or_else(|| ResourceError::NotFound(format!("meta with key {}", key)))
    }

    pub async fn create(&self, fields: &FieldMap) -> Result<MetaEntry, ResourceError> {
        let entry = MetaEntry::from_fields(fields, None)?;
        self.ensure_unique_key(&entry).await?;
        Ok(self.repo.create(&entry).await?)
    }

    pub async fn update_by_key(&self, raw_key: &str, fields: &FieldMap) -> Result<MetaEntry, ResourceError> {
        let current = self.get_by_key(raw_key).await?;
        let merged = merge_update(&current, fields)?;
        self.ensure_unique_key(&merged).await?;
        Ok(self.repo.update(&merged).await?)
    }

    pub async fn delete_by_key(&self, raw_key: &str) -> Result<(), ResourceError> {
        let entry = self.get_by_key(raw_key).await?;
        self.repo.delete(entry.id).await?;
        Ok(())
    }

    async fn ensure_unique_key(&self, entry: &MetaEntry) -> Result<(), ResourceError> {
        let exclude = (entry.id > 0).then_some(entry.id);
        if self.repo.key_taken(&entry.key, exclude).await? {
            return Err(ValidationErrors::single("key", "meta with this key already exists.").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxCategoryRepository, SqlxEventRepository, SqlxMetaRepository,
        SqlxReferenceRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, ArticleFilter, Category, Event};
    use serde_json::{json, Value};
    use sqlx::SqlitePool;

    fn map(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    async fn setup_pool() -> SqlitePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    fn categories(pool: &SqlitePool) -> ResourceService<Category, IdFilter> {
        ResourceService::new(
            "category",
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxReferenceRepository::boxed(pool.clone()),
        )
    }

    fn articles(pool: &SqlitePool) -> ResourceService<Article, ArticleFilter> {
        ResourceService::new(
            "post",
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxReferenceRepository::boxed(pool.clone()),
        )
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let pool = setup_pool().await;
        let service = categories(&pool);

        let created = service.create(&map(json!({"title": "Career"}))).await.unwrap();
        assert_eq!(service.get(created.id).await.unwrap().title, "Career");

        service.delete(created.id).await.unwrap();
        assert!(matches!(service.get(created.id).await, Err(ResourceError::NotFound(_))));
        assert!(matches!(service.delete(created.id).await, Err(ResourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let pool = setup_pool().await;
        let err = categories(&pool).create(&FieldMap::new()).await.unwrap_err();

        let ResourceError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("title").is_some());
    }

    #[tokio::test]
    async fn test_missing_reference_rejected() {
        let pool = setup_pool().await;
        let err = articles(&pool)
            .create(&map(json!({
                "title": "Привет",
                "title_en": "hello",
                "author": "Anna",
                "categories": ["5"],
            })))
            .await
            .unwrap_err();

        let ResourceError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("categories").unwrap()[0],
            "Invalid pk \"5\" - object does not exist."
        );
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_image() {
        let pool = setup_pool().await;
        let category = categories(&pool)
            .create(&map(json!({"title": "Career"})))
            .await
            .unwrap();
        let service = articles(&pool);

        let created = service
            .create(&map(json!({
                "title": "Привет",
                "title_en": "hello",
                "author": "Anna",
                "image": "/media/cover.png",
                "categories": [category.id],
            })))
            .await
            .unwrap();

        let updated = service
            .update(created.id, &map(json!({"text": "Body"})))
            .await
            .unwrap();
        assert_eq!(updated.text.as_deref(), Some("Body"));
        assert_eq!(updated.image.as_deref(), Some("/media/cover.png"));
        assert_eq!(updated.categories, vec![category.id]);
        assert_eq!(updated.title_en, "hello");

        assert!(matches!(
            service.update(9999, &FieldMap::new()).await,
            Err(ResourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_event_date_accepts_both_formats() {
        let pool = setup_pool().await;
        let service: ResourceService<Event, IdFilter> = ResourceService::new(
            "event",
            SqlxEventRepository::boxed(pool.clone()),
            SqlxReferenceRepository::boxed(pool.clone()),
        );

        let a = service
            .create(&map(json!({"date": "05-03-24", "title": "A", "description": "a"})))
            .await
            .unwrap();
        let b = service
            .create(&map(json!({"date": "2024-03-05", "title": "B", "description": "b"})))
            .await
            .unwrap();
        assert_eq!(a.date, b.date);
    }

    #[tokio::test]
    async fn test_meta_by_key() {
        let pool = setup_pool().await;
        let service = MetaService::new(SqlxMetaRepository::boxed(pool));

        service
            .create(&map(json!({
                "key": "docs/overview",
                "title": "Overview",
                "description": "Docs landing page",
            })))
            .await
            .unwrap();

        let found = service.get_by_key("docs$overview").await.unwrap();
        assert_eq!(found.title, "Overview");

        let duplicate = service
            .create(&map(json!({"key": "docs/overview", "title": "x", "description": "y"})))
            .await;
        assert!(matches!(duplicate, Err(ResourceError::ValidationError(_))));

        let updated = service
            .update_by_key("docs$overview", &map(json!({"title": "Docs"})))
            .await
            .unwrap();
        assert_eq!(updated.title, "Docs");
        assert_eq!(updated.key, "docs/overview");

        service.delete_by_key("docs$overview").await.unwrap();
        assert!(matches!(
            service.get_by_key("docs$overview").await,
            Err(ResourceError::NotFound(_))
        ));
    }
}
