//! Login and logout orchestration.
//!
//! Composes the credential codec, the session ledger, and the audit
//! chain. Per principal the session states cycle
//! `NoActiveSession → ActiveSession → NoActiveSession`; a new login
//! always starts a fresh cycle and implicitly closes the previous one.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use vigil_core::error::{VigilError, VigilResult};
use vigil_core::models::audit::AuditEvent;
use vigil_core::models::session::{CreateSessionRecord, SessionAction};
use vigil_core::repository::{
    AuditRepository, PrincipalRepository, SessionRepository, TenantRepository,
};

use crate::audit::AuditTrail;
use crate::config::AuthConfig;
use crate::credential::{self, Claims, CredentialCodec};
use crate::error::AuthError;
use crate::password;

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// The issued bearer credential.
    pub token: String,
    /// Session ledger row backing this login.
    pub session_id: Uuid,
    /// Expiry shared by the credential and the session record.
    pub expires_at: DateTime<Utc>,
}

/// Login/logout orchestrator, generic over repository implementations.
pub struct AuthService<P, T, Se, A>
where
    P: PrincipalRepository,
    T: TenantRepository,
    Se: SessionRepository,
    A: AuditRepository,
{
    principal_repo: P,
    tenant_repo: T,
    session_repo: Se,
    audit: AuditTrail<A>,
    codec: CredentialCodec,
    config: AuthConfig,
}

impl<P, T, Se, A> AuthService<P, T, Se, A>
where
    P: PrincipalRepository,
    T: TenantRepository,
    Se: SessionRepository,
    A: AuditRepository,
{
    pub fn new(
        principal_repo: P,
        tenant_repo: T,
        session_repo: Se,
        audit_repo: A,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let codec = CredentialCodec::new(&config)?;
        Ok(Self {
            principal_repo,
            tenant_repo,
            session_repo,
            audit: AuditTrail::new(audit_repo),
            codec,
            config,
        })
    }

    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    pub fn audit(&self) -> &AuditTrail<A> {
        &self.audit
    }

    /// Authenticate by email and password and issue a credential.
    ///
    /// Unknown email and wrong password fail identically to the caller;
    /// the distinction survives only in the audit detail. Six or more
    /// failed attempts block logins until ten minutes have passed since
    /// the last one, after which the counter resets and the password
    /// check proceeds normally (sliding lockout, not a hard ban).
    pub async fn login(&self, email: &str, plain_password: &str, ip: &str) -> VigilResult<LoginOutput> {
        let mut principal = match self.principal_repo.get_by_email(email).await {
            Ok(p) => p,
            Err(VigilError::NotFound { .. }) => {
                self.audit
                    .record(AuditEvent::failure(
                        "Login",
                        "Principal",
                        "principal not found",
                        Uuid::nil(),
                        "unknown email",
                        ip,
                    ))
                    .await;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        if principal.failed_attempts >= self.config.max_login_attempts {
            let window = Duration::seconds(self.config.lockout_window_secs as i64);
            if Utc::now() - principal.updated_at < window {
                self.audit
                    .record(AuditEvent::failure(
                        "Unauthorized (Blocked)",
                        "Principal",
                        "login blocked",
                        principal.id,
                        "attempt limit reached inside lockout window",
                        ip,
                    ))
                    .await;
                return Err(AuthError::InvalidCredentials.into());
            }
            // Window elapsed: reset and carry on to the password check.
            principal = self
                .principal_repo
                .set_failed_attempts(principal.id, 0)
                .await?;
        }

        let valid = password::verify_password(
            plain_password,
            &principal.password_hash,
            self.config.pepper.as_deref(),
        )
        .map_err(VigilError::from)?;

        if !valid {
            let attempts = principal.failed_attempts + 1;
            self.principal_repo
                .set_failed_attempts(principal.id, attempts)
                .await?;
            self.audit
                .record(AuditEvent::failure(
                    "Unauthorized (Wrong password)",
                    "Principal",
                    "wrong password",
                    principal.id,
                    format!("failed attempt {attempts}"),
                    ip,
                ))
                .await;
            return Err(AuthError::InvalidCredentials.into());
        }

        // One active session per principal: a new login displaces the
        // previous one without the old token being presented.
        match self.session_repo.latest_login(principal.id).await {
            Ok(previous) => {
                self.session_repo
                    .relabel(previous.id, SessionAction::LogoutByNewLogin)
                    .await?;
            }
            Err(VigilError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let fingerprint = credential::generate_fingerprint();
        let claims = Claims {
            user_id: principal.id,
            tenant_id: principal.tenant_id,
            role_id: principal.role_id,
            fingerprint_hash: credential::hash_fingerprint(&fingerprint),
        };

        let ttl = Duration::seconds(self.config.token_lifetime_secs as i64);
        let expires_at = Utc::now() + ttl;
        let token = self.codec.issue(&claims, ttl).map_err(VigilError::from)?;

        let session = self
            .session_repo
            .create(CreateSessionRecord {
                principal_id: principal.id,
                tenant_id: principal.tenant_id,
                token: token.clone(),
                fingerprint,
                action: SessionAction::Login,
                expires_at,
            })
            .await?;

        if principal.failed_attempts > 0 {
            self.principal_repo
                .set_failed_attempts(principal.id, 0)
                .await?;
        }

        self.audit
            .record(AuditEvent {
                action: "Login".into(),
                entity: "Principal".into(),
                entity_id: principal.id.to_string(),
                actor_id: principal.id,
                detail: String::new(),
                ip: ip.into(),
            })
            .await;

        Ok(LoginOutput {
            token,
            session_id: session.id,
            expires_at,
        })
    }

    /// Close the caller's active session by relabeling its ledger row.
    /// Requires an active principal and tenant; having nothing to log
    /// out of is itself unauthorized.
    pub async fn logout(&self, claims: &Claims, ip: &str) -> VigilResult<()> {
        let principal = match self.principal_repo.get_by_id(claims.user_id).await {
            Ok(p) if p.active => p,
            Ok(_) | Err(VigilError::NotFound { .. }) => {
                self.audit
                    .record(AuditEvent::failure(
                        "Logout",
                        "Principal",
                        "principal missing or inactive",
                        claims.user_id,
                        String::new(),
                        ip,
                    ))
                    .await;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        match self.tenant_repo.get_by_id(claims.tenant_id).await {
            Ok(t) if t.active => {}
            Ok(_) | Err(VigilError::NotFound { .. }) => {
                self.audit
                    .record(AuditEvent::failure(
                        "Logout",
                        "Tenant",
                        "tenant missing or inactive",
                        principal.id,
                        String::new(),
                        ip,
                    ))
                    .await;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        }

        match self.session_repo.latest_login(principal.id).await {
            Ok(session) => {
                self.session_repo
                    .relabel(session.id, SessionAction::Logout)
                    .await?;
            }
            Err(VigilError::NotFound { .. }) => {
                self.audit
                    .record(AuditEvent::failure(
                        "Logout",
                        "Principal",
                        "no active session",
                        principal.id,
                        String::new(),
                        ip,
                    ))
                    .await;
                return Err(AuthError::NoActiveSession.into());
            }
            Err(e) => return Err(e),
        }

        self.audit
            .record(AuditEvent {
                action: "Logout".into(),
                entity: "Principal".into(),
                entity_id: principal.id.to_string(),
                actor_id: principal.id,
                detail: String::new(),
                ip: ip.into(),
            })
            .await;

        Ok(())
    }
}
