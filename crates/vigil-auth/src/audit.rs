//! Audit trail service.
//!
//! Thin wrapper over the audit repository: fire-and-forget appends for
//! callers that must never fail because of audit delivery, and a paged
//! chain verification for operational integrity checks.

use tracing::warn;
use vigil_core::error::VigilResult;
use vigil_core::models::audit::{AuditEvent, ChainVerification, verify_chain_segment};
use vigil_core::repository::{AuditRepository, Pagination};

const VERIFY_PAGE_SIZE: u64 = 200;

pub struct AuditTrail<A: AuditRepository> {
    repo: A,
}

impl<A: AuditRepository> AuditTrail<A> {
    pub fn new(repo: A) -> Self {
        Self { repo }
    }

    /// Append an event to the chain. Append failure is logged and
    /// swallowed: audit delivery must not turn into a user-visible
    /// outage of the triggering operation.
    pub async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.repo.append(event.clone()).await {
            warn!(
                action = %event.action,
                entity = %event.entity,
                error = %e,
                "audit append failed; event dropped"
            );
        }
    }

    /// Replay the full ledger in creation order, recomputing each hash
    /// and checking linkage. Reports the first broken link's position.
    /// Operational check, not invoked per-request.
    pub async fn verify(&self) -> VigilResult<ChainVerification> {
        let mut previous_hash = String::new();
        let mut offset = 0u64;

        loop {
            let page = self
                .repo
                .list(Pagination {
                    offset,
                    limit: VERIFY_PAGE_SIZE,
                })
                .await?;

            let result = verify_chain_segment(&page.items, previous_hash, offset);
            if !result.intact {
                return Ok(result);
            }

            if page.items.is_empty() || offset + page.items.len() as u64 >= page.total {
                return Ok(ChainVerification::intact(offset + page.items.len() as u64));
            }

            previous_hash = page
                .items
                .last()
                .map(|r| r.current_hash.clone())
                .unwrap_or_default();
            offset += page.items.len() as u64;
        }
    }
}
