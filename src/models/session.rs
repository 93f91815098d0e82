//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PrincipalKind;

/// Login session for either identity kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Identity table the principal lives in
    pub principal_kind: PrincipalKind,
    /// Associated principal ID
    pub principal_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
