//! Page meta endpoints
//!
//! Entries are addressed by key. A key containing `/` is written with `$`
//! in the path, so `/meta/docs$overview` reads the entry `docs/overview`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::payload::Payload;
use crate::models::MetaEntry;

/// Single entry response: `{"data": {...}}`
#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub data: MetaEntry,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/meta", get(list_meta).post(create_meta))
        .route(
            "/meta/{key}",
            get(get_meta).put(update_meta).delete(delete_meta),
        )
}

async fn list_meta(State(state): State<AppState>) -> Result<Json<Vec<MetaEntry>>, ApiError> {
    Ok(Json(state.meta.list().await?))
}

/// GET /api/meta/{key}
async fn get_meta(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MetaResponse>, ApiError> {
    let data = state.meta.get_by_key(&key).await?;
    Ok(Json(MetaResponse { data }))
}

async fn create_meta(
    State(state): State<AppState>,
    Payload(fields): Payload,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.meta.create(&fields).await?;
    Ok((StatusCode::CREATED, Json(MetaResponse { data })))
}

async fn update_meta(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Payload(fields): Payload,
) -> Result<Json<MetaResponse>, ApiError> {
    let data = state.meta.update_by_key(&key, &fields).await?;
    Ok(Json(MetaResponse { data }))
}

async fn delete_meta(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.meta.delete_by_key(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
