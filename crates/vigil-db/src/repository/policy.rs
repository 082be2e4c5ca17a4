//! SurrealDB implementation of [`PolicyRepository`].
//!
//! Policy-to-role assignment is a graph edge
//! (`policy -> assigned -> role`), mirroring the many-to-many side of
//! the model; the role-to-principal side is a plain FK on the
//! principal.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use vigil_core::error::{VigilError, VigilResult};
use vigil_core::models::policy::{CreatePolicy, Policy};
use vigil_core::repository::PolicyRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PolicyRow {
    service_id: String,
    action: String,
    immutable: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PolicyRowWithId {
    record_id: String,
    service_id: String,
    action: String,
    immutable: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_policy(row: PolicyRow, id: Uuid) -> Result<Policy, DbError> {
    let service_id = Uuid::parse_str(&row.service_id)
        .map_err(|e| DbError::Migration(format!("invalid service UUID: {e}")))?;
    Ok(Policy {
        id,
        service_id,
        action: row.action,
        immutable: row.immutable,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl PolicyRowWithId {
    fn try_into_policy(self) -> Result<Policy, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        row_to_policy(
            PolicyRow {
                service_id: self.service_id,
                action: self.action,
                immutable: self.immutable,
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

/// SurrealDB implementation of the Policy repository.
#[derive(Clone)]
pub struct SurrealPolicyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPolicyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PolicyRepository for SurrealPolicyRepository<C> {
    async fn create(&self, input: CreatePolicy) -> VigilResult<Policy> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('policy', $id) SET \
                 service_id = $service_id, \
                 action = $action, \
                 immutable = $immutable",
            )
            .bind(("id", id_str.clone()))
            .bind(("service_id", input.service_id.to_string()))
            .bind(("action", input.action))
            .bind(("immutable", input.immutable))
            .await
            .map_err(DbError::from)?;

        let mut result = match result.check() {
            Ok(r) => r,
            Err(e) if e.to_string().contains("idx_policy_service_action") => {
                return Err(VigilError::Conflict {
                    entity: "policy".into(),
                });
            }
            Err(e) => return Err(DbError::Query(e.to_string()).into()),
        };

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "policy".into(),
            id: id_str,
        })?;

        row_to_policy(row, id).map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> VigilResult<Policy> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('policy', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "policy".into(),
            id: id_str,
        })?;

        row_to_policy(row, id).map_err(Into::into)
    }

    async fn get_by_service_action(&self, service_id: Uuid, action: &str) -> VigilResult<Policy> {
        let action_owned = action.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM policy \
                 WHERE service_id = $service_id AND action = $action",
            )
            .bind(("service_id", service_id.to_string()))
            .bind(("action", action_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "policy".into(),
            id: format!("service={service_id} action={action_owned}"),
        })?;

        row.try_into_policy().map_err(Into::into)
    }

    async fn update_action(&self, id: Uuid, action: &str) -> VigilResult<Policy> {
        let current = self.get_by_id(id).await?;
        if current.immutable {
            return Err(DbError::Immutable {
                entity: "policy".into(),
                id: id.to_string(),
            }
            .into());
        }

        let mut result = self
            .db
            .query(
                "UPDATE type::record('policy', $id) SET \
                 action = $action, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("action", action.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "policy".into(),
            id: id.to_string(),
        })?;

        row_to_policy(row, id).map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> VigilResult<()> {
        let current = self.get_by_id(id).await?;
        if current.immutable {
            return Err(DbError::Immutable {
                entity: "policy".into(),
                id: id.to_string(),
            }
            .into());
        }

        let id_str = id.to_string();
        // Delete assignment edges first, then the policy record.
        self.db
            .query(format!(
                "DELETE assigned WHERE in = policy:`{id_str}`; \
                 DELETE policy:`{id_str}`;"
            ))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn assign_to_role(&self, policy_id: Uuid, role_id: Uuid) -> VigilResult<()> {
        let policy_str = policy_id.to_string();
        let role_str = role_id.to_string();

        self.db
            .query(format!(
                "RELATE policy:`{policy_str}` -> assigned -> role:`{role_str}`;"
            ))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn unassign_from_role(&self, policy_id: Uuid, role_id: Uuid) -> VigilResult<()> {
        let policy_str = policy_id.to_string();
        let role_str = role_id.to_string();

        self.db
            .query(format!(
                "DELETE assigned WHERE \
                 in = policy:`{policy_str}` AND out = role:`{role_str}`;"
            ))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn is_assigned_to_role(&self, policy_id: Uuid, role_id: Uuid) -> VigilResult<bool> {
        let policy_str = policy_id.to_string();
        let role_str = role_id.to_string();

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM assigned WHERE \
                 in = policy:`{policy_str}` AND out = role:`{role_str}` \
                 GROUP ALL"
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn list_for_role(&self, role_id: Uuid) -> VigilResult<Vec<Policy>> {
        let role_str = role_id.to_string();

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM policy WHERE \
                 id IN (SELECT VALUE in FROM assigned \
                 WHERE out = role:`{role_str}`)"
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_policy().map_err(Into::into))
            .collect()
    }
}
