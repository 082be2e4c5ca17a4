//! Error types for the VIGIL authorization core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigilError {
    /// No credential, invalid/expired credential, no active session,
    /// locked-out login, or wrong password.
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Credential valid but tenant/role/service/policy resolution failed.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// Referenced entity absent for reasons other than authorization.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Duplicate unique field on create.
    #[error("Entity already exists: {entity}")]
    Conflict { entity: String },

    #[error("Database error: {0}")]
    Database(String),

    /// Cryptographic failure while decoding a credential. Deliberately
    /// opaque: signature, expiry, and decryption failures all surface
    /// through this one variant.
    #[error("Credential verification failed: {0}")]
    Verification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VigilResult<T> = Result<T, VigilError>;
