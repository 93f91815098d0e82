//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The structured error response used by every handler
//! - Session authentication for `/me` and `/logout`

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::models::{
    Article, ArticleFilter, AssessmentResult, Category, ContactMessage, Event, IdFilter,
    MentorAppointment, Mentor, Principal, RegularUser, ResultFilter,
};
use crate::services::account::{AccountService, AccountServiceError};
use crate::services::auth::{AuthError, Authenticator};
use crate::services::resource::{MetaService, ResourceError, ResourceService};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub users: Arc<AccountService<RegularUser>>,
    pub mentors: Arc<AccountService<Mentor>>,
    pub posts: Arc<ResourceService<Article, ArticleFilter>>,
    pub categories: Arc<ResourceService<Category, IdFilter>>,
    pub contacts: Arc<ResourceService<ContactMessage, IdFilter>>,
    pub appointments: Arc<ResourceService<MentorAppointment, IdFilter>>,
    pub results: Arc<ResourceService<AssessmentResult, ResultFilter>>,
    pub events: Arc<ResourceService<Event, IdFilter>>,
    pub meta: Arc<MetaService>,
    pub upload_config: Arc<UploadConfig>,
}

/// Principal resolved from the request's session
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Session token the request authenticated with
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the fault and hide its details from the client.
    pub fn internal(error: impl std::fmt::Display) -> Self {
        tracing::error!("{}", error);
        Self::internal_error("Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<ResourceError> for ApiError {
    fn from(e: ResourceError) -> Self {
        match e {
            ResourceError::ValidationError(errors) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid input",
                serde_json::to_value(&errors).unwrap_or_default(),
            ),
            ResourceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ResourceError::InternalError(e) => ApiError::internal(format!("{:#}", e)),
        }
    }
}

impl From<AccountServiceError> for ApiError {
    fn from(e: AccountServiceError) -> Self {
        match e {
            AccountServiceError::ValidationError(errors) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid input",
                serde_json::to_value(&errors).unwrap_or_default(),
            ),
            AccountServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            AccountServiceError::InternalError(e) => ApiError::internal(format!("{:#}", e)),
        }
    }
}

/// Extract session token from the `Authorization` header or session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    let cookie_prefix = format!("{}=", SESSION_COOKIE);
    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix(&cookie_prefix) {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let principal = state
        .authenticator
        .validate_session(&token)
        .await
        .map_err(|e| match e {
            AuthError::InternalError(e) => ApiError::internal(format!("Session validation failed: {:#}", e)),
            _ => ApiError::unauthorized("Invalid or expired session"),
        })?;

    request.extensions_mut().insert(AuthenticatedPrincipal(principal));
    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationErrors;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=tok-1; lang=en"),
        );
        assert_eq!(extract_session_token(&headers), Some("tok-1".to_string()));
    }

    #[test]
    fn test_extract_token_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::unauthorized("x").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::not_found("x").into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::validation_error("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal_error("x").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_errors_become_details() {
        let err: ApiError =
            ResourceError::ValidationError(ValidationErrors::single("title", "This field is required.")).into();

        assert_eq!(err.error.code, "VALIDATION_ERROR");
        assert_eq!(
            err.error.details,
            Some(serde_json::json!({"title": ["This field is required."]}))
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err: ApiError = ResourceError::InternalError(anyhow::anyhow!("disk on fire")).into();
        assert_eq!(err.error.code, "INTERNAL_ERROR");
        assert!(!err.error.message.contains("disk"));
    }
}
