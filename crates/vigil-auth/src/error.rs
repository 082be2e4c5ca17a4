//! Authentication error types.
//!
//! These variants carry the internal diagnostic distinctions; the
//! conversion into [`VigilError`] deliberately collapses them so that
//! callers (and therefore credential holders) cannot tell signature,
//! expiry, and decryption failures apart, nor unknown-email from
//! wrong-password from lockout.

use thiserror::Error;
use vigil_core::error::VigilError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password, or blocked by the lockout window.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Outer signature or issuer check failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// The credential's own expiry has passed.
    #[error("credential expired")]
    Expired,

    /// Inner claims blob failed authenticated decryption.
    #[error("claims decryption failed")]
    DecryptionFailed,

    /// No live `Login` session record for the principal.
    #[error("no active session")]
    NoActiveSession,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for VigilError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::NoActiveSession => {
                VigilError::Unauthorized {
                    reason: "unauthorized".into(),
                }
            }
            AuthError::InvalidSignature | AuthError::Expired | AuthError::DecryptionFailed => {
                VigilError::Verification("invalid credential".into())
            }
            AuthError::Crypto(msg) => VigilError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_failures_are_opaque_to_callers() {
        let a = VigilError::from(AuthError::InvalidSignature).to_string();
        let b = VigilError::from(AuthError::Expired).to_string();
        let c = VigilError::from(AuthError::DecryptionFailed).to_string();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn login_failures_are_indistinguishable() {
        let a = VigilError::from(AuthError::InvalidCredentials).to_string();
        let b = VigilError::from(AuthError::NoActiveSession).to_string();
        assert_eq!(a, b);
    }
}
