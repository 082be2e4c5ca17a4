//! SurrealDB implementation of [`AuditRepository`].
//!
//! The append runs as one datastore transaction: read the head's
//! `current_hash`, compute the new record's hash server-side with
//! `crypto::sha256` over the same canonical concatenation the Rust
//! verifier uses, and create the record. Interleaved appends therefore
//! cannot produce two records claiming the same `previous_hash`.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use vigil_core::error::VigilResult;
use vigil_core::models::audit::{AuditEvent, AuditRecord};
use vigil_core::repository::{AuditRepository, PaginatedResult, Pagination};

use crate::error::DbError;

/// Attempts per append before a commit conflict is surfaced. The
/// datastore uses optimistic concurrency, so two interleaved appends
/// make one of them retry rather than fork the chain.
const APPEND_RETRIES: u32 = 5;

const APPEND_SQL: &str = "\
BEGIN TRANSACTION;
LET $prev = (SELECT VALUE current_hash FROM audit \
    ORDER BY created_at DESC LIMIT 1)[0] ?? '';
CREATE type::record('audit', $id) SET \
    action = $action, \
    entity = $entity, \
    entity_id = $entity_id, \
    actor_id = $actor_id, \
    detail = $detail, \
    ip = $ip, \
    previous_hash = $prev, \
    current_hash = crypto::sha256(string::concat( \
        $action, $entity, $entity_id, $actor_id, \
        $detail, $ip, $prev));
COMMIT TRANSACTION;";

#[derive(Debug, SurrealValue)]
struct AuditRow {
    action: String,
    entity: String,
    entity_id: String,
    actor_id: String,
    detail: String,
    ip: String,
    previous_hash: String,
    current_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    action: String,
    entity: String,
    entity_id: String,
    actor_id: String,
    detail: String,
    ip: String,
    previous_hash: String,
    current_hash: String,
    created_at: DateTime<Utc>,
}

fn is_commit_conflict(e: &surrealdb::Error) -> bool {
    let msg = e.to_string();
    msg.contains("conflict") || msg.contains("retried")
}

fn row_to_record(row: AuditRow, id: Uuid) -> Result<AuditRecord, DbError> {
    let actor_id = Uuid::parse_str(&row.actor_id)
        .map_err(|e| DbError::Migration(format!("invalid actor UUID: {e}")))?;
    Ok(AuditRecord {
        id,
        action: row.action,
        entity: row.entity,
        entity_id: row.entity_id,
        actor_id,
        detail: row.detail,
        ip: row.ip,
        previous_hash: row.previous_hash,
        current_hash: row.current_hash,
        created_at: row.created_at,
    })
}

impl AuditRowWithId {
    fn try_into_record(self) -> Result<AuditRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        row_to_record(
            AuditRow {
                action: self.action,
                entity: self.entity,
                entity_id: self.entity_id,
                actor_id: self.actor_id,
                detail: self.detail,
                ip: self.ip,
                previous_hash: self.previous_hash,
                current_hash: self.current_hash,
                created_at: self.created_at,
            },
            id,
        )
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the append-only audit chain.
#[derive(Clone)]
pub struct SurrealAuditRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditRepository for SurrealAuditRepository<C> {
    async fn append(&self, event: AuditEvent) -> VigilResult<AuditRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let actor = event.actor_id.to_string();

        let mut attempt = 0;
        let mut result = loop {
            attempt += 1;

            let checked = self
                .db
                .query(APPEND_SQL)
                .bind(("id", id_str.clone()))
                .bind(("action", event.action.clone()))
                .bind(("entity", event.entity.clone()))
                .bind(("entity_id", event.entity_id.clone()))
                .bind(("actor_id", actor.clone()))
                .bind(("detail", event.detail.clone()))
                .bind(("ip", event.ip.clone()))
                .await
                .map_err(DbError::from)?
                .check();

            match checked {
                Ok(result) => break result,
                Err(e) if attempt < APPEND_RETRIES && is_commit_conflict(&e) => continue,
                Err(e) => return Err(DbError::Query(e.to_string()).into()),
            }
        };

        // BEGIN is statement 0 and the LET is statement 1; the CREATE
        // result is statement 2.
        let rows: Vec<AuditRow> = result.take(2).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit".into(),
            id: id_str,
        })?;

        row_to_record(row, id).map_err(Into::into)
    }

    async fn head(&self) -> VigilResult<Option<AuditRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM audit \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_record()?)),
            None => Ok(None),
        }
    }

    async fn list(&self, pagination: Pagination) -> VigilResult<PaginatedResult<AuditRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM audit \
                 ORDER BY created_at ASC LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|r| r.try_into_record())
            .collect::<Result<Vec<_>, _>>()?;

        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM audit GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
