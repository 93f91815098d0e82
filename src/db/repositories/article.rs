//! Article repository
//!
//! Database operations for articles and their category links.
//!
//! This module provides:
//! - `SqlxArticleRepository` implementing [`Repository`] for SQLite
//!
//! Category links live in `article_categories`; an article and its links are
//! always written in one transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

use super::Repository;
use crate::models::{Article, ArticleFilter};

const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.title, a.title_en, a.text, a.author, a.image, a.created_at, a.updated_at,
           (SELECT GROUP_CONCAT(ac.category_id) FROM article_categories ac WHERE ac.article_id = a.id) AS category_ids
    FROM articles a
"#;

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: SqlitePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn Repository<Entity = Article, Filter = ArticleFilter>> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqlxArticleRepository {
    type Entity = Article;
    type Filter = ArticleFilter;

    /// The first present filter wins: `article_id`, then `category_ids`
    /// (any of), then `title` against `title_en`.
    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(ARTICLE_SELECT);

        if let Some(id) = filter.article_id {
            query.push(" WHERE a.id = ").push_bind(id);
        } else if !filter.category_ids.is_empty() {
            query.push(
                " WHERE a.id IN (SELECT article_id FROM article_categories WHERE category_id IN (",
            );
            let mut ids = query.separated(", ");
            for id in &filter.category_ids {
                ids.push_bind(*id);
            }
            query.push("))");
        } else if let Some(title) = &filter.title {
            query.push(" WHERE a.title_en = ").push_bind(title.clone());
        }
        query.push(" ORDER BY a.id");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list articles")?;

        rows.iter().map(row_to_article).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("{} WHERE a.id = ?", ARTICLE_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get article by ID")?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn create(&self, article: &Article) -> Result<Article> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, title_en, text, author, image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.title_en)
        .bind(&article.text)
        .bind(&article.author)
        .bind(&article.image)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create article")?;

        let id = result.last_insert_rowid();
        replace_categories(&mut tx, id, &article.categories).await?;
        tx.commit().await.context("Failed to commit article")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Article not found after create"))
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, title_en = ?, text = ?, author = ?, image = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.title_en)
        .bind(&article.text)
        .bind(&article.author)
        .bind(&article.image)
        .bind(Utc::now())
        .bind(article.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update article")?;

        replace_categories(&mut tx, article.id, &article.categories).await?;
        tx.commit().await.context("Failed to commit article")?;

        self.get_by_id(article.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete article")?;

        Ok(result.rows_affected() > 0)
    }
}

async fn replace_categories(
    tx: &mut Transaction<'_, Sqlite>,
    article_id: i64,
    category_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM article_categories WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await
        .context("Failed to clear article categories")?;

    for category_id in category_ids {
        sqlx::query("INSERT INTO article_categories (article_id, category_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await
            .context("Failed to link article category")?;
    }

    Ok(())
}

fn row_to_article(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let category_ids: Option<String> = row.get("category_ids");
    let mut categories = category_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().context("Invalid category id in article link"))
        .collect::<Result<Vec<_>>>()?;
    categories.sort_unstable();

    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        title_en: row.get("title_en"),
        text: row.get("text"),
        author: row.get("author"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        categories,
        image: row.get("image"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxArticleRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        for title in ["Career", "Design", "Data"] {
            sqlx::query("INSERT INTO categories (title) VALUES (?)")
                .bind(title)
                .execute(&pool)
                .await
                .unwrap();
        }
        SqlxArticleRepository::new(pool)
    }

    fn article(title_en: &str, categories: Vec<i64>) -> Article {
        Article {
            title: format!("{} (ru)", title_en),
            title_en: title_en.to_string(),
            author: "Anna".into(),
            categories,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_categories() {
        let repo = setup_test_repo().await;
        let created = repo.create(&article("hello", vec![3, 1])).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.categories, vec![1, 3]);
        assert_eq!(created.text, None);
    }

    #[tokio::test]
    async fn test_update_replaces_categories_and_touches_updated_at() {
        let repo = setup_test_repo().await;
        let mut created = repo.create(&article("hello", vec![1, 2])).await.unwrap();

        created.categories = vec![3];
        created.image = Some("/media/cover.png".into());
        let updated = repo.update(&created).await.unwrap();

        assert_eq!(updated.categories, vec![3]);
        assert_eq!(updated.image.as_deref(), Some("/media/cover.png"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = setup_test_repo().await;
        let first = repo.create(&article("first", vec![1])).await.unwrap();
        let second = repo.create(&article("second", vec![2, 3])).await.unwrap();
        repo.create(&article("third", vec![])).await.unwrap();

        let all = repo.list(&ArticleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let any_of = repo
            .list(&ArticleFilter {
                category_ids: vec![1, 3],
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<i64> = any_of.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let by_title = repo
            .list(&ArticleFilter {
                title: Some("second".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, second.id);

        // article_id wins over the other filters
        let by_id = repo
            .list(&ArticleFilter {
                article_id: Some(first.id),
                category_ids: vec![2],
                title: Some("second".into()),
            })
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, first.id);
    }

    #[tokio::test]
    async fn test_delete_article_removes_links() {
        let repo = setup_test_repo().await;
        let created = repo.create(&article("hello", vec![1])).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        let remaining = repo
            .list(&ArticleFilter {
                category_ids: vec![1],
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }
}
