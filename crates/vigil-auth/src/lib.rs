//! VIGIL Auth — credential issuance/verification, permission
//! evaluation, audit trail, and login/logout orchestration.

pub mod audit;
pub mod authorize;
pub mod config;
pub mod credential;
pub mod error;
pub mod password;
pub mod service;

pub use audit::AuditTrail;
pub use authorize::{AccessContext, Evaluator};
pub use config::AuthConfig;
pub use credential::{Claims, CredentialCodec};
pub use error::AuthError;
pub use service::AuthService;
