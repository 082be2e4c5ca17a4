//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The datastore is a shared
//! collaborator accessed concurrently by many request handlers; apart
//! from the audit append (which the implementation must serialize) all
//! operations are plain read-then-write sequences.

use uuid::Uuid;

use crate::error::VigilResult;
use crate::models::{
    audit::{AuditEvent, AuditRecord},
    policy::{CreatePolicy, Policy},
    principal::{CreatePrincipal, Principal, UpdatePrincipal},
    role::{CreateRole, Role},
    service::{CreateService, Service},
    session::{CreateSessionRecord, SessionAction, SessionRecord},
    tenant::{CreateTenant, Tenant, UpdateTenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub trait PrincipalRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePrincipal,
    ) -> impl Future<Output = VigilResult<Principal>> + Send;
    /// Soft-deleted principals are never returned.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VigilResult<Principal>> + Send;
    /// Email is globally unique; soft-deleted principals are never
    /// returned.
    fn get_by_email(&self, email: &str) -> impl Future<Output = VigilResult<Principal>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePrincipal,
    ) -> impl Future<Output = VigilResult<Principal>> + Send;
    /// Persist the failed-attempts counter; touches `updated_at`, which
    /// anchors the sliding lockout window.
    fn set_failed_attempts(
        &self,
        id: Uuid,
        attempts: u32,
    ) -> impl Future<Output = VigilResult<Principal>> + Send;
    /// Soft-delete: sets the `deleted` flag, never removes the row.
    fn delete(&self, id: Uuid) -> impl Future<Output = VigilResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<PaginatedResult<Principal>>> + Send;
}

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = VigilResult<Tenant>> + Send;
    /// Soft-deleted tenants are never returned.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VigilResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = VigilResult<Tenant>> + Send;
    /// Soft-delete: sets the `deleted` flag, never removes the row.
    fn delete(&self, id: Uuid) -> impl Future<Output = VigilResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<PaginatedResult<Tenant>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = VigilResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VigilResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = VigilResult<Role>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<PaginatedResult<Role>>> + Send;
}

pub trait ServiceRepository: Send + Sync {
    fn create(&self, input: CreateService) -> impl Future<Output = VigilResult<Service>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VigilResult<Service>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = VigilResult<Service>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<PaginatedResult<Service>>> + Send;
}

pub trait PolicyRepository: Send + Sync {
    fn create(&self, input: CreatePolicy) -> impl Future<Output = VigilResult<Policy>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VigilResult<Policy>> + Send;
    fn get_by_service_action(
        &self,
        service_id: Uuid,
        action: &str,
    ) -> impl Future<Output = VigilResult<Policy>> + Send;
    /// Rename the action. Fails `Forbidden` on immutable policies.
    fn update_action(
        &self,
        id: Uuid,
        action: &str,
    ) -> impl Future<Output = VigilResult<Policy>> + Send;
    /// Fails `Forbidden` on immutable policies.
    fn delete(&self, id: Uuid) -> impl Future<Output = VigilResult<()>> + Send;

    /// Grant a policy to a role (many-to-many association).
    fn assign_to_role(
        &self,
        policy_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = VigilResult<()>> + Send;
    fn unassign_from_role(
        &self,
        policy_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = VigilResult<()>> + Send;
    fn is_assigned_to_role(
        &self,
        policy_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = VigilResult<bool>> + Send;
    fn list_for_role(&self, role_id: Uuid)
    -> impl Future<Output = VigilResult<Vec<Policy>>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateSessionRecord,
    ) -> impl Future<Output = VigilResult<SessionRecord>> + Send;
    /// Most recent record with action `Login` for this principal,
    /// regardless of expiry. `NotFound` when the principal has no
    /// active login to displace or close.
    fn latest_login(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = VigilResult<SessionRecord>> + Send;
    /// Most recent record with action `Login` and `expires_at >= now`.
    /// This is the liveness check that makes server-side logout
    /// effective while the bearer token is still cryptographically
    /// valid.
    fn current_login(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = VigilResult<SessionRecord>> + Send;
    /// Replace the action tag on an existing record.
    fn relabel(
        &self,
        id: Uuid,
        action: SessionAction,
    ) -> impl Future<Output = VigilResult<SessionRecord>> + Send;
    /// Remove expired `Login` records; returns how many were removed.
    fn cleanup_expired(&self) -> impl Future<Output = VigilResult<u64>> + Send;
}

pub trait AuditRepository: Send + Sync {
    /// Append one record, chained to the current head. Implementations
    /// must serialize the read-head/compute/insert sequence (e.g. a
    /// datastore transaction) so concurrent appends cannot fork the
    /// chain.
    fn append(&self, event: AuditEvent) -> impl Future<Output = VigilResult<AuditRecord>> + Send;
    /// The most recently created record, if any.
    fn head(&self) -> impl Future<Output = VigilResult<Option<AuditRecord>>> + Send;
    /// Ledger slice in creation order (oldest first).
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<PaginatedResult<AuditRecord>>> + Send;
}
