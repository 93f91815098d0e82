//! Event endpoints. Lists are ordered by date.

use crate::api::middleware::{ApiError, AppState};
use crate::api::resources::{query_id, ResourceApi};
use crate::models::{Event, IdFilter};
use crate::services::resource::ResourceService;

pub struct Events;

impl ResourceApi for Events {
    type Entity = Event;
    type Filter = IdFilter;

    const COLLECTION: &'static str = "/events";
    const ITEM: &'static str = "/events/{id}";

    fn service(state: &AppState) -> &ResourceService<Event, IdFilter> {
        &state.events
    }

    fn filter(query: &[(String, String)]) -> Result<IdFilter, ApiError> {
        Ok(IdFilter {
            id: query_id(query, "event_id")?,
        })
    }
}
