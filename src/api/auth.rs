//! Authentication API endpoints
//!
//! - POST /api/login  - check credentials against the backend chain
//! - POST /api/logout - invalidate the current session
//! - GET  /api/me     - principal of the current session
//!
//! Login answers with a flat `{"message": ...}` body in every case, so a
//! client cannot tell an unknown username from a wrong password.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::api::middleware::{
    ApiError, AppState, AuthenticatedPrincipal, SessionToken, SESSION_COOKIE,
};
use crate::api::payload::Payload;
use crate::models::{FieldMap, Principal};
use crate::services::auth::AuthError;

/// Body of every login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl LoginResponse {
    fn failure(status: StatusCode, message: &'static str) -> Response {
        (status, Json(Self { message, user_id: None })).into_response()
    }
}

/// Routes open to anonymous clients
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes behind the session middleware
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_principal))
}

/// POST /api/login
async fn login(State(state): State<AppState>, Payload(fields): Payload) -> Response {
    let username = text_field(&fields, "username");
    let password = text_field(&fields, "password");

    match state.authenticator.login(&username, &password).await {
        Ok((principal, session)) => {
            let max_age = state.authenticator.session_expiration_days() * 24 * 60 * 60;
            (
                session_cookie(&session.id, max_age),
                Json(LoginResponse {
                    message: "Authentication successful",
                    user_id: Some(principal.id()),
                }),
            )
                .into_response()
        }
        Err(AuthError::InternalError(e)) => {
            tracing::error!("Login failed: {:#}", e);
            LoginResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
        Err(_) => {
            tracing::debug!("Rejected login for {}", username);
            LoginResponse::failure(StatusCode::UNAUTHORIZED, "Authentication failed")
        }
    }
}

/// POST /api/logout
async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, ApiError> {
    state
        .authenticator
        .logout(&token)
        .await
        .map_err(ApiError::internal)?;

    Ok((StatusCode::NO_CONTENT, session_cookie("", 0)))
}

/// GET /api/me
async fn get_current_principal(
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Json<Principal> {
    Json(principal)
}

/// `Set-Cookie` header for the session token. A zero max age clears it.
fn session_cookie(token: &str, max_age: i64) -> HeaderMap {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    );

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.insert(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Session cookie not set: {}", e),
    }
    headers
}

/// Scalar text value of a login field; missing or non-text values are empty.
fn text_field(fields: &FieldMap, name: &str) -> String {
    match fields.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => match items.first() {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        },
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_field() {
        let fields = json!({"username": "alice", "password": ["pw"], "n": 5});
        let fields = fields.as_object().unwrap();

        assert_eq!(text_field(fields, "username"), "alice");
        assert_eq!(text_field(fields, "password"), "pw");
        assert_eq!(text_field(fields, "n"), "");
        assert_eq!(text_field(fields, "missing"), "");
    }

    #[test]
    fn test_session_cookie_set_and_clear() {
        let set = session_cookie("abc", 3600);
        assert_eq!(
            set[header::SET_COOKIE],
            "session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600"
        );

        let cleared = session_cookie("", 0);
        let cleared = cleared[header::SET_COOKIE].to_str().unwrap();
        assert!(cleared.starts_with(&format!("{}=;", SESSION_COOKIE)));
        assert!(cleared.ends_with("Max-Age=0"));
    }

    #[test]
    fn test_failure_body_has_no_user_id() {
        let body = serde_json::to_value(LoginResponse {
            message: "Authentication failed",
            user_id: None,
        })
        .unwrap();
        assert_eq!(body, json!({"message": "Authentication failed"}));
    }
}
