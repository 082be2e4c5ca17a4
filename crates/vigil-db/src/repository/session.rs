//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use vigil_core::error::VigilResult;
use vigil_core::models::session::{CreateSessionRecord, SessionAction, SessionRecord};
use vigil_core::repository::SessionRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    principal_id: String,
    tenant_id: String,
    token: String,
    fingerprint: String,
    action: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    principal_id: String,
    tenant_id: String,
    token: String,
    fingerprint: String,
    action: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_session(row: SessionRow, id: Uuid) -> Result<SessionRecord, DbError> {
    let principal_id = Uuid::parse_str(&row.principal_id)
        .map_err(|e| DbError::Migration(format!("invalid principal UUID: {e}")))?;
    let tenant_id = Uuid::parse_str(&row.tenant_id)
        .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
    Ok(SessionRecord {
        id,
        principal_id,
        tenant_id,
        token: row.token,
        fingerprint: row.fingerprint,
        action: SessionAction::from_label(&row.action),
        expires_at: row.expires_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<SessionRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        row_to_session(
            SessionRow {
                principal_id: self.principal_id,
                tenant_id: self.tenant_id,
                token: self.token,
                fingerprint: self.fingerprint,
                action: self.action,
                expires_at: self.expires_at,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            id,
        )
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the session ledger.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSessionRecord) -> VigilResult<SessionRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 principal_id = $principal_id, \
                 tenant_id = $tenant_id, \
                 token = $session_token, \
                 fingerprint = $fingerprint, \
                 action = $action, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("principal_id", input.principal_id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("session_token", input.token))
            .bind(("fingerprint", input.fingerprint))
            .bind(("action", input.action.as_label()))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        row_to_session(row, id).map_err(Into::into)
    }

    async fn latest_login(&self, principal_id: Uuid) -> VigilResult<SessionRecord> {
        let principal_str = principal_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE principal_id = $principal_id AND action = 'Login' \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("principal_id", principal_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: format!("principal={principal_str}"),
        })?;

        row.try_into_session().map_err(Into::into)
    }

    async fn current_login(&self, principal_id: Uuid) -> VigilResult<SessionRecord> {
        let principal_str = principal_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE principal_id = $principal_id AND action = 'Login' \
                 AND expires_at >= time::now() \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("principal_id", principal_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: format!("principal={principal_str}"),
        })?;

        row.try_into_session().map_err(Into::into)
    }

    async fn relabel(&self, id: Uuid, action: SessionAction) -> VigilResult<SessionRecord> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('session', $id) SET \
                 action = $action, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("action", action.as_label()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id.to_string(),
        })?;

        row_to_session(row, id).map_err(Into::into)
    }

    async fn cleanup_expired(&self) -> VigilResult<u64> {
        // Count expired login records first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE action = 'Login' AND expires_at < time::now() \
                 GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE session WHERE action = 'Login' AND expires_at < time::now()")
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
