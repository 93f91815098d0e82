//! Generic CRUD endpoints
//!
//! Each resource implements [`ResourceApi`] to name its routes, pick its
//! service from the state and parse its list filter. [`router`] then mounts:
//! - GET    /{collection}       list
//! - POST   /{collection}       create (201)
//! - GET    /{collection}/{id}  retrieve
//! - PUT    /{collection}/{id}  merge-update
//! - DELETE /{collection}/{id}  delete (204)

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::payload::Payload;
use crate::models::FieldSchema;
use crate::services::resource::ResourceService;

/// Raw query string pairs, in order, repeats kept.
pub type QueryPairs = Vec<(String, String)>;

/// Numeric `{id}` path segment. Anything else is a JSON 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemId(pub i64);

impl<S> FromRequestParts<S> for ItemId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found("Not found."))?;
        parse_item_id(&raw)
            .map(ItemId)
            .ok_or_else(|| ApiError::not_found(format!("No item with ID {}", raw)))
    }
}

/// Digits only, like an `int` route converter.
fn parse_item_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Route and service binding for one resource.
pub trait ResourceApi: Send + Sync + 'static {
    type Entity: FieldSchema + Serialize + Send + Sync + 'static;
    type Filter: Send + Sync + 'static;

    /// Collection path, e.g. `/events`
    const COLLECTION: &'static str;
    /// Item path, e.g. `/events/{id}`
    const ITEM: &'static str;

    fn service(state: &AppState) -> &ResourceService<Self::Entity, Self::Filter>;

    fn filter(query: &[(String, String)]) -> Result<Self::Filter, ApiError>;
}

/// Mount the CRUD routes for `R`.
pub fn router<R: ResourceApi>() -> Router<AppState> {
    Router::new()
        .route(R::COLLECTION, get(list::<R>).post(create::<R>))
        .route(
            R::ITEM,
            get(retrieve::<R>).put(update::<R>).delete(remove::<R>),
        )
}

async fn list<R: ResourceApi>(
    State(state): State<AppState>,
    Query(query): Query<QueryPairs>,
) -> Result<Json<Vec<R::Entity>>, ApiError> {
    let filter = R::filter(&query)?;
    Ok(Json(R::service(&state).list(&filter).await?))
}

async fn retrieve<R: ResourceApi>(
    State(state): State<AppState>,
    ItemId(id): ItemId,
) -> Result<Json<R::Entity>, ApiError> {
    Ok(Json(R::service(&state).get(id).await?))
}

async fn create<R: ResourceApi>(
    State(state): State<AppState>,
    Payload(fields): Payload,
) -> Result<impl IntoResponse, ApiError> {
    let created = R::service(&state).create(&fields).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update<R: ResourceApi>(
    State(state): State<AppState>,
    ItemId(id): ItemId,
    Payload(fields): Payload,
) -> Result<Json<R::Entity>, ApiError> {
    Ok(Json(R::service(&state).update(id, &fields).await?))
}

async fn remove<R: ResourceApi>(
    State(state): State<AppState>,
    ItemId(id): ItemId,
) -> Result<StatusCode, ApiError> {
    R::service(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parse an optional integer query parameter. The first occurrence wins.
pub fn query_id(query: &[(String, String)], name: &str) -> Result<Option<i64>, ApiError> {
    let Some((_, raw)) = query.iter().find(|(key, value)| key == name && !value.is_empty()) else {
        return Ok(None);
    };
    raw.trim().parse::<i64>().map(Some).map_err(|_| {
        ApiError::with_details(
            "VALIDATION_ERROR",
            "Invalid query parameter",
            serde_json::json!({ name: ["Enter a whole number."] }),
        )
    })
}

/// Every integer value of a repeatable query parameter.
pub fn query_ids(query: &[(String, String)], name: &str) -> Result<Vec<i64>, ApiError> {
    let mut ids = Vec::new();
    for (key, value) in query {
        if key != name || value.is_empty() {
            continue;
        }
        let id = value.trim().parse::<i64>().map_err(|_| {
            ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid query parameter",
                serde_json::json!({ name: ["Enter a whole number."] }),
            )
        })?;
        ids.push(id);
    }
    Ok(ids)
}

/// Optional text query parameter.
pub fn query_text(query: &[(String, String)], name: &str) -> Option<String> {
    query
        .iter()
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.clone())
}
