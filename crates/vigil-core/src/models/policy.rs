//! Policy domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The atomic permission unit: the pair (service, action). Policies are
/// granted to roles many-to-many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub service_id: Uuid,
    /// The action this policy permits (e.g. `GetCompany`).
    pub action: String,
    /// System-seeded policies must never be edited or deleted; the
    /// repository rejects updates and deletes on immutable rows.
    pub immutable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicy {
    pub service_id: Uuid,
    pub action: String,
    pub immutable: bool,
}
