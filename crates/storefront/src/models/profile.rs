//! Business profiles an identity can resolve to.

use serde::{Deserialize, Serialize};

use phonestore_core::{
    Cnpj, CustomerId, Email, EmployeeId, Permissions, Role, StoreId, WholesaleClientId,
};

use super::session::Identity;

/// A store employee with back-office access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: EmployeeId,
    pub name: String,
    pub permissions: Permissions,
    /// Store the employee is attached to; `None` for chain-wide staff.
    pub store_id: Option<StoreId>,
}

/// A registered wholesale client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholesaleProfile {
    pub id: WholesaleClientId,
    pub name: String,
    pub company_name: String,
    pub cnpj: Cnpj,
    pub store_id: StoreId,
}

/// An ordinary customer, derived from identity metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailProfile {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<Email>,
}

impl RetailProfile {
    /// Derive the retail profile from the metadata captured at sign-up.
    ///
    /// Falls back to the email's local part, then to an empty name.
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        let name = identity
            .metadata_str("name")
            .or_else(|| identity.metadata_str("full_name"))
            .map(str::to_owned)
            .or_else(|| {
                identity
                    .email
                    .as_ref()
                    .and_then(|e| e.as_str().split('@').next())
                    .map(str::to_owned)
            })
            .unwrap_or_default();

        Self {
            id: CustomerId::from(identity.id),
            name,
            phone: identity.metadata_str("phone").map(str::to_owned),
            email: identity.email.clone(),
        }
    }
}

/// Outcome of role resolution: the privileged profile an identity holds.
///
/// Admin and wholesale are exclusive; see
/// [`resolve_role`](crate::services::session::resolve_role).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegedProfile {
    Admin(AdminProfile),
    Wholesale(WholesaleProfile),
}

impl PrivilegedProfile {
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Admin(_) => Role::Admin,
            Self::Wholesale(_) => Role::Wholesale,
        }
    }
}

/// The profile exposed to the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "profile", rename_all = "snake_case")]
pub enum ResolvedProfile {
    Admin(AdminProfile),
    Wholesale(WholesaleProfile),
    Retail(RetailProfile),
    /// No authenticated session.
    None,
}

impl ResolvedProfile {
    /// The role, or `None` when nobody is signed in.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::Admin(_) => Some(Role::Admin),
            Self::Wholesale(_) => Some(Role::Wholesale),
            Self::Retail(_) => Some(Role::Retail),
            Self::None => None,
        }
    }
}

impl From<PrivilegedProfile> for ResolvedProfile {
    fn from(profile: PrivilegedProfile) -> Self {
        match profile {
            PrivilegedProfile::Admin(p) => Self::Admin(p),
            PrivilegedProfile::Wholesale(p) => Self::Wholesale(p),
        }
    }
}
