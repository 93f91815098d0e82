//! Assessment result endpoints
//!
//! `result_id` selects one result; otherwise `user_id` selects the result
//! owned by that user.

use crate::api::middleware::{ApiError, AppState};
use crate::api::resources::{query_id, ResourceApi};
use crate::models::{AssessmentResult, ResultFilter};
use crate::services::resource::ResourceService;

pub struct Results;

impl ResourceApi for Results {
    type Entity = AssessmentResult;
    type Filter = ResultFilter;

    const COLLECTION: &'static str = "/results";
    const ITEM: &'static str = "/results/{id}";

    fn service(state: &AppState) -> &ResourceService<AssessmentResult, ResultFilter> {
        &state.results
    }

    fn filter(query: &[(String, String)]) -> Result<ResultFilter, ApiError> {
        Ok(ResultFilter {
            result_id: query_id(query, "result_id")?,
            user_id: query_id(query, "user_id")?,
        })
    }
}
