//! Article endpoints, mounted at `/posts`
//!
//! List filters: `article_id`, else `category_id` (repeatable, any of),
//! else `title` matched against the English title.

use crate::api::middleware::{ApiError, AppState};
use crate::api::resources::{query_id, query_ids, query_text, ResourceApi};
use crate::models::{Article, ArticleFilter};
use crate::services::resource::ResourceService;

pub struct Posts;

impl ResourceApi for Posts {
    type Entity = Article;
    type Filter = ArticleFilter;

    const COLLECTION: &'static str = "/posts";
    const ITEM: &'static str = "/posts/{id}";

    fn service(state: &AppState) -> &ResourceService<Article, ArticleFilter> {
        &state.posts
    }

    fn filter(query: &[(String, String)]) -> Result<ArticleFilter, ApiError> {
        Ok(ArticleFilter {
            article_id: query_id(query, "article_id")?,
            category_ids: query_ids(query, "category_id")?,
            title: query_text(query, "title"),
        })
    }
}
