//! SurrealDB repository implementations.

mod audit;
mod policy;
mod principal;
mod role;
mod service;
mod session;
mod tenant;

pub use audit::SurrealAuditRepository;
pub use policy::SurrealPolicyRepository;
pub use principal::SurrealPrincipalRepository;
pub use role::SurrealRoleRepository;
pub use service::SurrealServiceRepository;
pub use session::SurrealSessionRepository;
pub use tenant::SurrealTenantRepository;
