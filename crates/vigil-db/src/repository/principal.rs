//! SurrealDB implementation of [`PrincipalRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use vigil_core::error::{VigilError, VigilResult};
use vigil_core::models::principal::{CreatePrincipal, Principal, UpdatePrincipal};
use vigil_core::repository::{PaginatedResult, Pagination, PrincipalRepository};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PrincipalRow {
    tenant_id: String,
    role_id: String,
    name: String,
    email: String,
    password_hash: String,
    active: bool,
    failed_attempts: u32,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PrincipalRowWithId {
    record_id: String,
    tenant_id: String,
    role_id: String,
    name: String,
    email: String,
    password_hash: String,
    active: bool,
    failed_attempts: u32,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_principal(row: PrincipalRow, id: Uuid) -> Result<Principal, DbError> {
    let tenant_id = Uuid::parse_str(&row.tenant_id)
        .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
    let role_id = Uuid::parse_str(&row.role_id)
        .map_err(|e| DbError::Migration(format!("invalid role UUID: {e}")))?;
    Ok(Principal {
        id,
        tenant_id,
        role_id,
        name: row.name,
        email: row.email,
        password_hash: row.password_hash,
        active: row.active,
        failed_attempts: row.failed_attempts,
        deleted: row.deleted,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl PrincipalRowWithId {
    fn try_into_principal(self) -> Result<Principal, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        row_to_principal(
            PrincipalRow {
                tenant_id: self.tenant_id,
                role_id: self.role_id,
                name: self.name,
                email: self.email,
                password_hash: self.password_hash,
                active: self.active,
                failed_attempts: self.failed_attempts,
                deleted: self.deleted,
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

/// SurrealDB implementation of the Principal repository.
#[derive(Clone)]
pub struct SurrealPrincipalRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPrincipalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PrincipalRepository for SurrealPrincipalRepository<C> {
    async fn create(&self, input: CreatePrincipal) -> VigilResult<Principal> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('principal', $id) SET \
                 tenant_id = $tenant_id, \
                 role_id = $role_id, \
                 name = $name, \
                 email = $email, \
                 password_hash = $password_hash",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("role_id", input.role_id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = match result.check() {
            Ok(r) => r,
            // Unique email index violation.
            Err(e) if e.to_string().contains("idx_principal_email") => {
                return Err(VigilError::Conflict {
                    entity: "principal".into(),
                });
            }
            Err(e) => return Err(DbError::Query(e.to_string()).into()),
        };

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        row_to_principal(row, id).map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> VigilResult<Principal> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('principal', $id) \
                 WHERE deleted = false",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        row_to_principal(row, id).map_err(Into::into)
    }

    async fn get_by_email(&self, email: &str) -> VigilResult<Principal> {
        let email_owned = email.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM principal \
                 WHERE email = $email AND deleted = false",
            )
            .bind(("email", email_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: format!("email={email_owned}"),
        })?;

        row.try_into_principal().map_err(Into::into)
    }

    async fn update(&self, id: Uuid, input: UpdatePrincipal) -> VigilResult<Principal> {
        let current = self.get_by_id(id).await?;
        let name = input.name.unwrap_or(current.name);
        let email = input.email.unwrap_or(current.email);
        let role_id = input.role_id.unwrap_or(current.role_id);
        let active = input.active.unwrap_or(current.active);

        let mut result = self
            .db
            .query(
                "UPDATE type::record('principal', $id) SET \
                 name = $name, email = $email, \
                 role_id = $role_id, active = $active, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("name", name))
            .bind(("email", email))
            .bind(("role_id", role_id.to_string()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id.to_string(),
        })?;

        row_to_principal(row, id).map_err(Into::into)
    }

    async fn set_failed_attempts(&self, id: Uuid, attempts: u32) -> VigilResult<Principal> {
        // updated_at anchors the sliding lockout window.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('principal', $id) SET \
                 failed_attempts = $attempts, \
                 updated_at = time::now() \
                 WHERE deleted = false",
            )
            .bind(("id", id.to_string()))
            .bind(("attempts", attempts))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id.to_string(),
        })?;

        row_to_principal(row, id).map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> VigilResult<()> {
        // Soft delete; the row is never physically removed.
        self.db
            .query(
                "UPDATE type::record('principal', $id) SET \
                 deleted = true, active = false, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> VigilResult<PaginatedResult<Principal>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM principal \
                 WHERE tenant_id = $tenant_id AND deleted = false \
                 ORDER BY created_at ASC LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|r| r.try_into_principal())
            .collect::<Result<Vec<_>, _>>()?;

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM principal \
                 WHERE tenant_id = $tenant_id AND deleted = false \
                 GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
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
