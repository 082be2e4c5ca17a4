//! Session ledger domain model.
//!
//! One row per login outcome; the source of truth for "is this session
//! currently valid", independent of whether the bearer credential
//! itself has expired. Relabeling a row is how the system revokes a
//! session server-side without a token revocation list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action tag on a session record. Stored as its historical string
/// label in the datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    Login,
    Logout,
    /// A newer successful login displaced this session.
    LogoutByNewLogin,
    /// A rejected attempt; the detail names the cause
    /// (e.g. `Blocked`, `Wrong password`).
    Unauthorized(String),
}

impl SessionAction {
    pub fn as_label(&self) -> String {
        match self {
            SessionAction::Login => "Login".into(),
            SessionAction::Logout => "Logout".into(),
            SessionAction::LogoutByNewLogin => "Logout by new login".into(),
            SessionAction::Unauthorized(detail) => format!("Unauthorized ({detail})"),
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Login" => SessionAction::Login,
            "Logout" => SessionAction::Logout,
            "Logout by new login" => SessionAction::LogoutByNewLogin,
            other => {
                let detail = other
                    .strip_prefix("Unauthorized (")
                    .and_then(|s| s.strip_suffix(')'))
                    .unwrap_or(other);
                SessionAction::Unauthorized(detail.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub tenant_id: Uuid,
    /// The issued bearer credential.
    pub token: String,
    /// Raw per-login random value; its SHA-256 hash is embedded in the
    /// credential claims.
    pub fingerprint: String,
    pub action: SessionAction,
    /// Equals the credential's own expiry at creation time.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRecord {
    pub principal_id: Uuid,
    pub tenant_id: Uuid,
    pub token: String,
    pub fingerprint: String,
    pub action: SessionAction,
    pub expires_at: DateTime<Utc>,
}
