//! User and mentor endpoints
//!
//! - POST /register/user, /register/mentor  registration (201)
//! - GET, POST /users, /mentors              list / create
//! - GET, PUT, DELETE /users/{id}, /mentors/{id}
//!
//! List filters: `user_id` and `status`. Lists are ordered by surname, name
//! and patronymic.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::payload::Payload;
use crate::api::resources::{query_id, query_text, ItemId, QueryPairs};
use crate::models::{IdentityFilter, Mentor, RegularUser};
use crate::services::account::{Account, AccountService};

/// Route and service binding for one identity table.
pub trait AccountApi: Send + Sync + 'static {
    type Entity: Account + Serialize;

    const COLLECTION: &'static str;
    const ITEM: &'static str;
    const REGISTER: &'static str;

    fn service(state: &AppState) -> &AccountService<Self::Entity>;
}

pub struct Users;

impl AccountApi for Users {
    type Entity = RegularUser;

    const COLLECTION: &'static str = "/users";
    const ITEM: &'static str = "/users/{id}";
    const REGISTER: &'static str = "/register/user";

    fn service(state: &AppState) -> &AccountService<RegularUser> {
        &state.users
    }
}

pub struct Mentors;

impl AccountApi for Mentors {
    type Entity = Mentor;

    const COLLECTION: &'static str = "/mentors";
    const ITEM: &'static str = "/mentors/{id}";
    const REGISTER: &'static str = "/register/mentor";

    fn service(state: &AppState) -> &AccountService<Mentor> {
        &state.mentors
    }
}

/// Mount the account routes for `A`.
pub fn router<A: AccountApi>() -> Router<AppState> {
    Router::new()
        .route(A::REGISTER, post(register::<A>))
        .route(A::COLLECTION, get(list::<A>).post(register::<A>))
        .route(
            A::ITEM,
            get(retrieve::<A>).put(update::<A>).delete(remove::<A>),
        )
}

fn identity_filter(query: &[(String, String)]) -> Result<IdentityFilter, ApiError> {
    Ok(IdentityFilter {
        user_id: query_id(query, "user_id")?,
        status: query_text(query, "status"),
    })
}

async fn list<A: AccountApi>(
    State(state): State<AppState>,
    Query(query): Query<QueryPairs>,
) -> Result<Json<Vec<A::Entity>>, ApiError> {
    let filter = identity_filter(&query)?;
    Ok(Json(A::service(&state).list(&filter).await?))
}

async fn retrieve<A: AccountApi>(
    State(state): State<AppState>,
    ItemId(id): ItemId,
) -> Result<Json<A::Entity>, ApiError> {
    Ok(Json(A::service(&state).get(id).await?))
}

async fn register<A: AccountApi>(
    State(state): State<AppState>,
    Payload(fields): Payload,
) -> Result<impl IntoResponse, ApiError> {
    let account = A::service(&state).register(&fields).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn update<A: AccountApi>(
    State(state): State<AppState>,
    ItemId(id): ItemId,
    Payload(fields): Payload,
) -> Result<Json<A::Entity>, ApiError> {
    Ok(Json(A::service(&state).update(id, &fields).await?))
}

async fn remove<A: AccountApi>(
    State(state): State<AppState>,
    ItemId(id): ItemId,
) -> Result<StatusCode, ApiError> {
    A::service(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
