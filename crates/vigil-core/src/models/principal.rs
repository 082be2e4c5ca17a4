//! Principal domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated user identity, bound to exactly one tenant at
/// creation time and holding exactly one role (FK, not a join table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub name: String,
    /// Globally unique; login key.
    pub email: String,
    /// Argon2id PHC-format hash.
    pub password_hash: String,
    pub active: bool,
    /// Consecutive failed login attempts since the last success or
    /// window reset.
    pub failed_attempts: u32,
    /// Soft-delete flag; rows are never physically removed.
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    /// Also the reference point for the sliding lockout window: it is
    /// touched whenever `failed_attempts` changes.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrincipal {
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub name: String,
    pub email: String,
    /// Pre-hashed (Argon2id PHC string); this crate never sees plaintext.
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePrincipal {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub active: Option<bool>,
}
