//! Category endpoints

use crate::api::middleware::{ApiError, AppState};
use crate::api::resources::{query_id, ResourceApi};
use crate::models::{Category, IdFilter};
use crate::services::resource::ResourceService;

pub struct Categories;

impl ResourceApi for Categories {
    type Entity = Category;
    type Filter = IdFilter;

    const COLLECTION: &'static str = "/categories";
    const ITEM: &'static str = "/categories/{id}";

    fn service(state: &AppState) -> &ResourceService<Category, IdFilter> {
        &state.categories
    }

    fn filter(query: &[(String, String)]) -> Result<IdFilter, ApiError> {
        Ok(IdFilter {
            id: query_id(query, "category_id")?,
        })
    }
}
