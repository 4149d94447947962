use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller roles, ordered by privilege. Variant order is load-bearing:
/// everything at or above `UNRESTRICTED_FROM` bypasses establishment
/// scoping, so adding a role means placing it in the order, not editing
/// comparison sites.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Establishment-scoped front-desk and operations staff.
    Staff,
    /// Establishment-scoped manager.
    Manager,
    /// Back-office administrator, exempt from establishment scoping.
    Admin,
}

/// The least-privileged role that is exempt from establishment scoping.
const UNRESTRICTED_FROM: Role = Role::Admin;

impl Role {
    /// True iff this role sees data across all establishments.
    pub fn can_access_all(&self) -> bool {
        *self >= UNRESTRICTED_FROM
    }

    /// True iff this role's data access is confined to one establishment.
    pub fn is_scoped(&self) -> bool {
        !self.can_access_all()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staff" => Ok(Role::Staff),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_ordering() {
        assert!(Role::Staff < Role::Manager);
        assert!(Role::Manager < Role::Admin);
    }

    #[test]
    fn test_only_admin_is_unrestricted() {
        assert!(Role::Admin.can_access_all());
        assert!(!Role::Manager.can_access_all());
        assert!(!Role::Staff.can_access_all());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Staff, Role::Manager, Role::Admin] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("owner".parse::<Role>().is_err());
    }
}
