//! Business roles and back-office permissions.

use serde::{Deserialize, Serialize};

/// The business role an authenticated identity resolves to.
///
/// `Admin` and `Wholesale` are mutually exclusive; when both records exist
/// for one identity, `Admin` wins. Everyone else signed in is `Retail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Store employee with back-office access.
    Admin,
    /// Registered wholesale client buying at wholesale prices.
    Wholesale,
    /// Ordinary customer.
    Retail,
}

impl Role {
    /// Whether this role is one of the privileged back-office roles.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Admin | Self::Wholesale)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Wholesale => write!(f, "wholesale"),
            Self::Retail => write!(f, "retail"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "wholesale" => Ok(Self::Wholesale),
            "retail" => Ok(Self::Retail),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Back-office CRUD permissions granted to an employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl Permissions {
    /// Every permission granted.
    pub const FULL: Self = Self {
        can_create: true,
        can_update: true,
        can_delete: true,
    };

    /// Read-only access.
    pub const READ_ONLY: Self = Self {
        can_create: false,
        can_update: false,
        can_delete: false,
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Admin, Role::Wholesale, Role::Retail] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("driver".parse::<Role>().is_err());
    }

    #[test]
    fn test_privileged_roles() {
        assert!(Role::Admin.is_privileged());
        assert!(Role::Wholesale.is_privileged());
        assert!(!Role::Retail.is_privileged());
    }

    #[test]
    fn test_permissions_default_is_read_only() {
        assert_eq!(Permissions::default(), Permissions::READ_ONLY);
    }
}
