//! API layer - HTTP handlers and routing
//!
//! Every endpoint is mounted under `/api`:
//! - Login, logout and the current principal
//! - Registration and CRUD for users and mentors
//! - CRUD for posts, categories, contacts, appointments, results and events
//! - Page meta entries addressed by key
//!
//! Uploaded files are served from `/media`.

pub mod accounts;
pub mod articles;
pub mod auth;
pub mod categories;
pub mod contacts;
pub mod events;
pub mod meta;
pub mod middleware;
pub mod payload;
pub mod resources;
pub mod results;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::db::repositories::{
    SqlxAppointmentRepository, SqlxArticleRepository, SqlxCategoryRepository,
    SqlxContactRepository, SqlxEventRepository, SqlxMentorRepository, SqlxMetaRepository,
    SqlxReferenceRepository, SqlxResultRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::models::PrincipalKind;
use crate::services::account::AccountService;
use crate::services::auth::{AuthBackend, Authenticator, MentorBackend, UserBackend};
use crate::services::resource::{MetaService, ResourceService};

pub use middleware::{ApiError, AppState};

/// Wire repositories and services over one pool.
pub fn build_state(pool: SqlitePool, config: &Config) -> AppState {
    let users = SqlxUserRepository::boxed(pool.clone());
    let mentors = SqlxMentorRepository::boxed(pool.clone());
    let sessions = SqlxSessionRepository::boxed(pool.clone());
    let references = SqlxReferenceRepository::boxed(pool.clone());
    let results = SqlxResultRepository::boxed(pool.clone());

    let backends = config
        .auth
        .backends
        .iter()
        .map(|kind| -> Arc<dyn AuthBackend> {
            match kind {
                PrincipalKind::User => Arc::new(UserBackend::new(users.clone())),
                PrincipalKind::Mentor => Arc::new(MentorBackend::new(mentors.clone())),
            }
        })
        .collect();
    let authenticator = Authenticator::with_session_expiration(
        backends,
        sessions.clone(),
        config.auth.session_expiration_days,
    );

    AppState {
        authenticator: Arc::new(authenticator),
        users: Arc::new(AccountService::new(
            users,
            references.clone(),
            results.clone(),
            sessions.clone(),
        )),
        mentors: Arc::new(AccountService::new(
            mentors,
            references.clone(),
            results.clone(),
            sessions,
        )),
        posts: Arc::new(ResourceService::new(
            "post",
            SqlxArticleRepository::boxed(pool.clone()),
            references.clone(),
        )),
        categories: Arc::new(ResourceService::new(
            "category",
            SqlxCategoryRepository::boxed(pool.clone()),
            references.clone(),
        )),
        contacts: Arc::new(ResourceService::new(
            "contact",
            SqlxContactRepository::boxed(pool.clone()),
            references.clone(),
        )),
        appointments: Arc::new(ResourceService::new(
            "appointment",
            SqlxAppointmentRepository::boxed(pool.clone()),
            references.clone(),
        )),
        results: Arc::new(ResourceService::new("result", results, references.clone())),
        events: Arc::new(ResourceService::new(
            "event",
            SqlxEventRepository::boxed(pool.clone()),
            references,
        )),
        meta: Arc::new(MetaService::new(SqlxMetaRepository::boxed(pool))),
        upload_config: Arc::new(config.upload.clone()),
    }
}

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = auth::protected_router().route_layer(
        axum_middleware::from_fn_with_state(state, middleware::require_auth),
    );

    Router::new()
        .merge(auth::public_router())
        .merge(protected_routes)
        .merge(accounts::router::<accounts::Users>())
        .merge(accounts::router::<accounts::Mentors>())
        .merge(resources::router::<articles::Posts>())
        .merge(resources::router::<categories::Categories>())
        .merge(resources::router::<contacts::Contacts>())
        .merge(resources::router::<contacts::Appointments>())
        .merge(resources::router::<results::Results>())
        .merge(resources::router::<events::Events>())
        .merge(meta::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let media = ServeDir::new(&state.upload_config.path);

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .nest_service(payload::MEDIA_URL_PREFIX, media)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
