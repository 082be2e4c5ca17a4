//! Audit chain domain model and hashing primitives.
//!
//! Every privileged operation appends one immutable record whose
//! `current_hash` covers its own fields plus the previous record's
//! hash, so any retroactive mutation breaks the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One immutable, hash-chained ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub action: String,
    /// Entity type the operation touched (e.g. `Principal`).
    pub entity: String,
    /// The entity's id, or `error: <detail>` on failure paths.
    pub entity_id: String,
    /// Acting principal; the nil UUID when the actor could not be
    /// identified (e.g. a failed login for an unknown email).
    pub actor_id: Uuid,
    /// Free-text payload.
    pub detail: String,
    pub ip: String,
    /// `current_hash` of the previous record in creation order; the
    /// empty string for the first record.
    pub previous_hash: String,
    pub current_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Input for an append; hashes are computed at the datastore boundary.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub actor_id: Uuid,
    pub detail: String,
    pub ip: String,
}

impl AuditEvent {
    /// Failure-path event: `entity_id` carries the error detail instead
    /// of an id.
    pub fn failure(
        action: impl Into<String>,
        entity: impl Into<String>,
        error: &str,
        actor_id: Uuid,
        detail: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            entity: entity.into(),
            entity_id: format!("error: {error}"),
            actor_id,
            detail: detail.into(),
            ip: ip.into(),
        }
    }
}

/// SHA-256 over the canonical field concatenation, hex-encoded.
///
/// Must stay in lockstep with the datastore-side computation in the
/// audit repository: both hash the UTF-8 bytes of
/// `action ‖ entity ‖ entity_id ‖ actor_id ‖ detail ‖ ip ‖ previous_hash`.
pub fn chain_hash(
    action: &str,
    entity: &str,
    entity_id: &str,
    actor_id: Uuid,
    detail: &str,
    ip: &str,
    previous_hash: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action.as_bytes());
    hasher.update(entity.as_bytes());
    hasher.update(entity_id.as_bytes());
    hasher.update(actor_id.to_string().as_bytes());
    hasher.update(detail.as_bytes());
    hasher.update(ip.as_bytes());
    hasher.update(previous_hash.as_bytes());
    hex::encode(hasher.finalize())
}

impl AuditRecord {
    /// Recompute this record's hash from its fields and stored
    /// `previous_hash`.
    pub fn compute_hash(&self) -> String {
        chain_hash(
            &self.action,
            &self.entity,
            &self.entity_id,
            self.actor_id,
            &self.detail,
            &self.ip,
            &self.previous_hash,
        )
    }
}

/// Outcome of replaying a ledger segment.
#[derive(Debug, Clone)]
pub struct ChainVerification {
    pub records_checked: u64,
    pub intact: bool,
    /// Zero-based position of the first broken link, if any.
    pub first_broken: Option<u64>,
    pub error: Option<String>,
}

impl ChainVerification {
    pub fn intact(records_checked: u64) -> Self {
        Self {
            records_checked,
            intact: true,
            first_broken: None,
            error: None,
        }
    }
}

/// Replay `records` (in creation order) against `previous_hash` carried
/// in from any earlier segment (`""` when starting at the head of the
/// ledger). Reports the first broken link.
pub fn verify_chain_segment(
    records: &[AuditRecord],
    mut previous_hash: String,
    offset: u64,
) -> ChainVerification {
    for (i, record) in records.iter().enumerate() {
        let position = offset + i as u64;
        if record.previous_hash != previous_hash {
            return ChainVerification {
                records_checked: position + 1,
                intact: false,
                first_broken: Some(position),
                error: Some(format!(
                    "record {position}: previous_hash does not match predecessor"
                )),
            };
        }
        if record.current_hash != record.compute_hash() {
            return ChainVerification {
                records_checked: position + 1,
                intact: false,
                first_broken: Some(position),
                error: Some(format!("record {position}: current_hash mismatch")),
            };
        }
        previous_hash = record.current_hash.clone();
    }
    ChainVerification::intact(offset + records.len() as u64)
}

/// Replay a complete ledger from its first record.
pub fn verify_chain(records: &[AuditRecord]) -> ChainVerification {
    verify_chain_segment(records, String::new(), 0)
}
