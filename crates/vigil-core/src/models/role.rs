//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role names whose holders may act on a tenant other than their own
/// when one is explicitly supplied. Distinguished structurally by name,
/// not by a flag.
pub const TENANT_OVERRIDE_ROLES: [&str; 2] = ["Administrator", "Manager"];

/// A named bundle of policies, assigned to exactly one principal each
/// (the principal carries the FK).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Whether this role may act on an explicitly supplied foreign
    /// tenant instead of the claims' own.
    pub fn has_tenant_override(&self) -> bool {
        TENANT_OVERRIDE_ROLES.contains(&self.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn role(name: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn override_roles_are_exactly_administrator_and_manager() {
        assert!(role("Administrator").has_tenant_override());
        assert!(role("Manager").has_tenant_override());
        assert!(!role("CompanyCommon").has_tenant_override());
        // Name matching is exact, not case-insensitive.
        assert!(!role("administrator").has_tenant_override());
        assert!(!role("Manager ").has_tenant_override());
    }
}
