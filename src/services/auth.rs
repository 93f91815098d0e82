//! Authentication service
//!
//! Credentials are checked against an ordered chain of backends, one per
//! identity table. The first backend that recognizes the username and
//! verifies the password wins; if none does, authentication fails with the
//! same generic error whether the username was unknown or the password
//! wrong.
//!
//! A username may exist in both tables. Backend order then decides which
//! identity logs in.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::repositories::{IdentityRepository, SessionRepository};
use crate::models::{Identity, Mentor, Principal, PrincipalKind, RegularUser, Session};
use crate::services::password::{verify_dummy, verify_password};

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No backend accepted the credentials
    #[error("Authentication failed")]
    InvalidCredentials,

    /// Session token unknown, expired, or its principal is gone
    #[error("Session not found")]
    SessionNotFound,

    /// Storage fault
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// One identity table the authenticator can check.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    fn kind(&self) -> PrincipalKind;

    /// `None` when the username is unknown, the password does not verify,
    /// or the identity is inactive.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Principal>>;

    /// Load the principal a session points at
    async fn get_principal(&self, id: i64) -> Result<Option<Principal>>;
}

/// Backend over one identity repository.
pub struct IdentityBackend<T> {
    repo: Arc<dyn IdentityRepository<Entity = T>>,
}

pub type UserBackend = IdentityBackend<RegularUser>;
pub type MentorBackend = IdentityBackend<Mentor>;

impl<T> IdentityBackend<T> {
    pub fn new(repo: Arc<dyn IdentityRepository<Entity = T>>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<T> AuthBackend for IdentityBackend<T>
where
    T: Identity + Into<Principal> + Send + Sync + 'static,
{
    fn kind(&self) -> PrincipalKind {
        T::KIND
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Principal>> {
        let Some(identity) = self.repo.get_by_username(username).await? else {
            verify_dummy(password);
            return Ok(None);
        };

        let verified = match verify_password(password, identity.password_hash()) {
            Ok(verified) => verified,
            Err(e) => {
                tracing::warn!(
                    "Unusable password hash for {} {}: {:#}",
                    T::KIND,
                    identity.id(),
                    e
                );
                false
            }
        };

        if !verified || !identity.is_active() {
            return Ok(None);
        }

        Ok(Some(identity.into()))
    }

    async fn get_principal(&self, id: i64) -> Result<Option<Principal>> {
        Ok(self.repo.get_by_id(id).await?.map(Into::into))
    }
}

/// Ordered backend chain plus session management.
pub struct Authenticator {
    backends: Vec<Arc<dyn AuthBackend>>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl Authenticator {
    /// Create an authenticator trying `backends` in order
    pub fn new(backends: Vec<Arc<dyn AuthBackend>>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            backends,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Create an authenticator with custom session expiration
    pub fn with_session_expiration(
        backends: Vec<Arc<dyn AuthBackend>>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            backends,
            session_repo,
            session_expiration_days,
        }
    }

    pub fn session_expiration_days(&self) -> i64 {
        self.session_expiration_days
    }

    /// Backend kinds in the order they are tried
    pub fn order(&self) -> Vec<PrincipalKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Try each backend in order, stopping at the first match.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Principal>> {
        for backend in &self.backends {
            if let Some(principal) = backend.authenticate(username, password).await? {
                tracing::debug!("{} authenticated by {} backend", username, backend.kind());
                return Ok(Some(principal));
            }
        }
        Ok(None)
    }

    /// Authenticate and open a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(Principal, Session), AuthError> {
        let principal = self
            .authenticate(username, password)
            .await
            .context("Failed to authenticate")?
            .ok_or(AuthError::InvalidCredentials)?;

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            principal_kind: principal.kind(),
            principal_id: principal.id(),
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!("{} {} logged in", principal.kind(), principal.id());
        Ok((principal, session))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), AuthError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its principal.
    ///
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Principal, AuthError> {
        let session = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Err(AuthError::SessionNotFound);
        }

        let Some(backend) = self.backends.iter().find(|b| b.kind() == session.principal_kind) else {
            return Err(AuthError::SessionNotFound);
        };

        backend
            .get_principal(session.principal_id)
            .await
            .context("Failed to load session principal")?
            .ok_or(AuthError::SessionNotFound)
    }

    /// Remove expired sessions, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, AuthError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        Repository, SqlxMentorRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::Profile;
    use crate::services::password::hash_password;
    use sqlx::SqlitePool;

    struct Fixture {
        pool: SqlitePool,
        users: Arc<dyn IdentityRepository<Entity = RegularUser>>,
        mentors: Arc<dyn IdentityRepository<Entity = Mentor>>,
    }

    impl Fixture {
        async fn new() -> Self {
            let pool = create_test_pool().await.expect("Failed to create test pool");
            migrations::run_migrations(&pool)
                .await
                .expect("Failed to run migrations");
            Self {
                users: SqlxUserRepository::boxed(pool.clone()),
                mentors: SqlxMentorRepository::boxed(pool.clone()),
                pool,
            }
        }

        fn authenticator(&self, order: &[PrincipalKind]) -> Authenticator {
            let backends = order
                .iter()
                .map(|kind| -> Arc<dyn AuthBackend> {
                    match kind {
                        PrincipalKind::User => Arc::new(UserBackend::new(self.users.clone())),
                        PrincipalKind::Mentor => Arc::new(MentorBackend::new(self.mentors.clone())),
                    }
                })
                .collect();
            Authenticator::new(backends, SqlxSessionRepository::boxed(self.pool.clone()))
        }

        async fn add_user(&self, username: &str, password: &str) -> RegularUser {
            let profile = Profile {
                email: format!("{}@users.example.com", username),
                ..Default::default()
            };
            let user = RegularUser::new(username.into(), hash_password(password).unwrap(), profile);
            self.users.create(&user).await.unwrap()
        }

        async fn add_mentor(&self, username: &str, password: &str) -> Mentor {
            let profile = Profile {
                email: format!("{}@mentors.example.com", username),
                ..Default::default()
            };
            let mentor = Mentor::new(username.into(), hash_password(password).unwrap(), profile);
            self.mentors.create(&mentor).await.unwrap()
        }
    }

    const BOTH: [PrincipalKind; 2] = [PrincipalKind::User, PrincipalKind::Mentor];

    #[tokio::test]
    async fn test_user_authenticates_through_user_backend() {
        let fx = Fixture::new().await;
        let alice = fx.add_user("alice", "Secret123!").await;

        let principal = fx
            .authenticator(&BOTH)
            .authenticate("alice", "Secret123!")
            .await
            .unwrap()
            .expect("alice should authenticate");

        assert_eq!(principal.kind(), PrincipalKind::User);
        assert_eq!(principal.id(), alice.id);
    }

    #[tokio::test]
    async fn test_mentor_only_credentials_fall_through() {
        let fx = Fixture::new().await;
        let mentor = fx.add_mentor("mila", "Mentor123!").await;

        let principal = fx
            .authenticator(&BOTH)
            .authenticate("mila", "Mentor123!")
            .await
            .unwrap()
            .expect("mentor should authenticate");

        assert_eq!(principal.kind(), PrincipalKind::Mentor);
        assert_eq!(principal.id(), mentor.id);
    }

    #[tokio::test]
    async fn test_unknown_and_wrong_password_fail_alike() {
        let fx = Fixture::new().await;
        fx.add_user("alice", "Secret123!").await;
        let auth = fx.authenticator(&BOTH);

        assert!(auth.authenticate("alice", "wrong").await.unwrap().is_none());
        assert!(auth.authenticate("bob", "Secret123!").await.unwrap().is_none());

        let wrong = auth.login("alice", "wrong").await.unwrap_err();
        let unknown = auth.login("bob", "anything").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(unknown, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_backend_order_decides_shared_username() {
        let fx = Fixture::new().await;
        fx.add_user("sam", "UserPass1!").await;
        fx.add_mentor("sam", "MentorPass1!").await;

        let user_first = fx.authenticator(&BOTH);
        let mentor_first = fx.authenticator(&[PrincipalKind::Mentor, PrincipalKind::User]);

        // Each password only matches its own table, so both resolve
        let p = user_first.authenticate("sam", "MentorPass1!").await.unwrap().unwrap();
        assert_eq!(p.kind(), PrincipalKind::Mentor);
        let p = mentor_first.authenticate("sam", "UserPass1!").await.unwrap().unwrap();
        assert_eq!(p.kind(), PrincipalKind::User);
        assert_eq!(mentor_first.order(), vec![PrincipalKind::Mentor, PrincipalKind::User]);
    }

    #[tokio::test]
    async fn test_single_backend_ignores_other_table() {
        let fx = Fixture::new().await;
        fx.add_mentor("mila", "Mentor123!").await;

        let users_only = fx.authenticator(&[PrincipalKind::User]);
        assert!(users_only.authenticate("mila", "Mentor123!").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_identity_rejected() {
        let fx = Fixture::new().await;
        let mut alice = fx.add_user("alice", "Secret123!").await;
        alice.is_active = false;
        fx.users.update(&alice).await.unwrap();

        let result = fx.authenticator(&BOTH).authenticate("alice", "Secret123!").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_malformed_stored_hash_is_a_mismatch() {
        let fx = Fixture::new().await;
        let user = RegularUser::new(
            "legacy".into(),
            "not-a-phc-string".into(),
            Profile {
                email: "legacy@example.com".into(),
                ..Default::default()
            },
        );
        fx.users.create(&user).await.unwrap();

        let result = fx.authenticator(&BOTH).authenticate("legacy", "whatever").await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_session_round_trip() {
        let fx = Fixture::new().await;
        let mentor = fx.add_mentor("mila", "Mentor123!").await;
        let auth = fx.authenticator(&BOTH);

        let (principal, session) = auth.login("mila", "Mentor123!").await.unwrap();
        assert_eq!(session.principal_kind, PrincipalKind::Mentor);
        assert_eq!(session.principal_id, mentor.id);
        assert_eq!(principal.username(), "mila");

        let resolved = auth.validate_session(&session.id).await.unwrap();
        assert_eq!(resolved.kind(), PrincipalKind::Mentor);
        assert_eq!(resolved.id(), mentor.id);

        auth.logout(&session.id).await.unwrap();
        assert!(matches!(
            auth.validate_session(&session.id).await,
            Err(AuthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let fx = Fixture::new().await;
        fx.add_user("alice", "Secret123!").await;
        let auth = Authenticator::with_session_expiration(
            vec![Arc::new(UserBackend::new(fx.users.clone()))],
            SqlxSessionRepository::boxed(fx.pool.clone()),
            -1,
        );

        let (_, session) = auth.login("alice", "Secret123!").await.unwrap();
        assert!(matches!(
            auth.validate_session(&session.id).await,
            Err(AuthError::SessionNotFound)
        ));
    }
}
