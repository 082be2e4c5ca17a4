//! Permission evaluation.
//!
//! Resolves decoded claims plus a requested (service, action) pair into
//! an allow/deny decision, returning the resolved principal, tenant,
//! and role for the caller's use. Every denial also lands in the audit
//! chain with the failing step's detail.

use uuid::Uuid;
use vigil_core::error::{VigilError, VigilResult};
use vigil_core::models::audit::AuditEvent;
use vigil_core::models::{principal::Principal, role::Role, tenant::Tenant};
use vigil_core::repository::{
    AuditRepository, PolicyRepository, PrincipalRepository, RoleRepository, ServiceRepository,
    SessionRepository, TenantRepository,
};

use crate::audit::AuditTrail;
use crate::credential::{self, Claims};
use crate::error::AuthError;

/// The resolved identity context of an authorized call.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub principal: Principal,
    pub tenant: Tenant,
    pub role: Role,
}

impl AccessContext {
    /// Resolve the tenant a downstream operation should act on.
    ///
    /// A caller-supplied tenant id different from the claims' own is
    /// honored only for the tenant-override roles; every other role
    /// silently falls back to its own tenant. This is the designed
    /// single-tenant-isolation default, not an error.
    pub fn effective_tenant(&self, requested: Option<Uuid>) -> Uuid {
        match requested {
            Some(id) if id != self.tenant.id && self.role.has_tenant_override() => id,
            Some(id) if id == self.tenant.id => id,
            _ => self.tenant.id,
        }
    }
}

/// Permission evaluator, generic over repository implementations so the
/// auth layer has no dependency on the database crate.
pub struct Evaluator<P, Se, T, R, Sv, Po, A>
where
    P: PrincipalRepository,
    Se: SessionRepository,
    T: TenantRepository,
    R: RoleRepository,
    Sv: ServiceRepository,
    Po: PolicyRepository,
    A: AuditRepository,
{
    principal_repo: P,
    session_repo: Se,
    tenant_repo: T,
    role_repo: R,
    service_repo: Sv,
    policy_repo: Po,
    audit: AuditTrail<A>,
}

impl<P, Se, T, R, Sv, Po, A> Evaluator<P, Se, T, R, Sv, Po, A>
where
    P: PrincipalRepository,
    Se: SessionRepository,
    T: TenantRepository,
    R: RoleRepository,
    Sv: ServiceRepository,
    Po: PolicyRepository,
    A: AuditRepository,
{
    pub fn new(
        principal_repo: P,
        session_repo: Se,
        tenant_repo: T,
        role_repo: R,
        service_repo: Sv,
        policy_repo: Po,
        audit_repo: A,
    ) -> Self {
        Self {
            principal_repo,
            session_repo,
            tenant_repo,
            role_repo,
            service_repo,
            policy_repo,
            audit: AuditTrail::new(audit_repo),
        }
    }

    /// Fire-and-forget denial record; the audit action carries the
    /// requested operation, the entity names the step that failed.
    async fn record_denial(&self, op: &str, entity: &str, reason: &str, actor_id: Uuid, ip: &str) {
        self.audit
            .record(AuditEvent::failure(
                op,
                entity,
                reason,
                actor_id,
                String::new(),
                ip,
            ))
            .await;
    }

    /// Decide whether the holder of `claims` may perform `action`
    /// against `service`. Each step's failure is terminal and distinctly
    /// typed: identity and session liveness problems are `Unauthorized`,
    /// resolution problems past that point are `Forbidden`. Denials are
    /// appended to the audit chain before the error is returned.
    pub async fn authorize(
        &self,
        claims: &Claims,
        service: &str,
        action: &str,
        ip: &str,
    ) -> VigilResult<AccessContext> {
        let op = format!("{service}::{action}");

        // 1. Principal must exist and be active.
        let principal = match self.principal_repo.get_by_id(claims.user_id).await {
            Ok(p) if p.active => p,
            Ok(_) | Err(VigilError::NotFound { .. }) => {
                self.record_denial(
                    &op,
                    "Principal",
                    "principal missing or inactive",
                    claims.user_id,
                    ip,
                )
                .await;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 2. A live Login session record must exist, and the claims'
        //    fingerprint hash must match its fingerprint. The bearer
        //    token stays cryptographically valid after logout or after a
        //    newer login; this check is what revokes it.
        match self.session_repo.current_login(principal.id).await {
            Ok(session) => {
                if credential::hash_fingerprint(&session.fingerprint) != claims.fingerprint_hash {
                    self.record_denial(
                        &op,
                        "Session",
                        "credential not bound to the active session",
                        principal.id,
                        ip,
                    )
                    .await;
                    return Err(AuthError::NoActiveSession.into());
                }
            }
            Err(VigilError::NotFound { .. }) => {
                self.record_denial(&op, "Session", "no active session", principal.id, ip)
                    .await;
                return Err(AuthError::NoActiveSession.into());
            }
            Err(e) => return Err(e),
        }

        // 3. Tenant from the claims must exist and be active.
        let tenant = match self.tenant_repo.get_by_id(claims.tenant_id).await {
            Ok(t) if t.active => t,
            Ok(_) | Err(VigilError::NotFound { .. }) => {
                self.record_denial(
                    &op,
                    "Tenant",
                    "tenant missing or inactive",
                    principal.id,
                    ip,
                )
                .await;
                return Err(VigilError::Forbidden {
                    reason: "forbidden".into(),
                });
            }
            Err(e) => return Err(e),
        };

        // 4. Role from the claims must exist.
        let role = match self.role_repo.get_by_id(claims.role_id).await {
            Ok(r) => r,
            Err(VigilError::NotFound { .. }) => {
                self.record_denial(&op, "Role", "unknown role", principal.id, ip)
                    .await;
                return Err(VigilError::Forbidden {
                    reason: "forbidden".into(),
                });
            }
            Err(e) => return Err(e),
        };

        // 5. Service by name.
        let service = match self.service_repo.get_by_name(service).await {
            Ok(s) => s,
            Err(VigilError::NotFound { .. }) => {
                self.record_denial(&op, "Service", "unknown service", principal.id, ip)
                    .await;
                return Err(VigilError::Forbidden {
                    reason: "forbidden".into(),
                });
            }
            Err(e) => return Err(e),
        };

        // 6. Policy for (service, action), assigned to this role.
        let policy = match self
            .policy_repo
            .get_by_service_action(service.id, action)
            .await
        {
            Ok(p) => p,
            Err(VigilError::NotFound { .. }) => {
                self.record_denial(&op, "Policy", "no policy for action", principal.id, ip)
                    .await;
                return Err(VigilError::Forbidden {
                    reason: "forbidden".into(),
                });
            }
            Err(e) => return Err(e),
        };
        if !self
            .policy_repo
            .is_assigned_to_role(policy.id, role.id)
            .await?
        {
            self.record_denial(
                &op,
                "Policy",
                "policy not assigned to role",
                principal.id,
                ip,
            )
            .await;
            return Err(VigilError::Forbidden {
                reason: "forbidden".into(),
            });
        }

        Ok(AccessContext {
            principal,
            tenant,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn context(role_name: &str, tenant_id: Uuid) -> AccessContext {
        let now = Utc::now();
        AccessContext {
            principal: Principal {
                id: Uuid::new_v4(),
                tenant_id,
                role_id: Uuid::new_v4(),
                name: "Test".into(),
                email: "test@example.com".into(),
                password_hash: String::new(),
                active: true,
                failed_attempts: 0,
                deleted: false,
                created_at: now,
                updated_at: now,
            },
            tenant: Tenant {
                id: tenant_id,
                name: "Own".into(),
                active: true,
                deleted: false,
                created_at: now,
                updated_at: now,
            },
            role: Role {
                id: Uuid::new_v4(),
                name: role_name.into(),
                description: String::new(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn override_honored_for_privileged_roles() {
        let own = Uuid::new_v4();
        let foreign = Uuid::new_v4();
        assert_eq!(
            context("Administrator", own).effective_tenant(Some(foreign)),
            foreign
        );
        assert_eq!(
            context("Manager", own).effective_tenant(Some(foreign)),
            foreign
        );
    }

    #[test]
    fn override_silently_ignored_for_other_roles() {
        let own = Uuid::new_v4();
        let foreign = Uuid::new_v4();
        assert_eq!(
            context("CompanyCommon", own).effective_tenant(Some(foreign)),
            own
        );
    }

    #[test]
    fn no_request_falls_back_to_own_tenant() {
        let own = Uuid::new_v4();
        assert_eq!(context("Administrator", own).effective_tenant(None), own);
        assert_eq!(context("Manager", own).effective_tenant(Some(own)), own);
    }
}
