//! Roles and capabilities
//!
//! Role names come from the identity provider's `user_roles` table. They are
//! folded into a `RoleSet` bit-set once per request; handlers then ask for a
//! `Capability` through [`authorize`] instead of matching on role strings.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// User role for authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vendor,
    Admin,
}

impl Role {
    const fn bit(self) -> u8 {
        match self {
            Role::Vendor => 0b01,
            Role::Admin => 0b10,
        }
    }

    /// Parse a stored role name. Unknown names yield `None` and are ignored.
    pub fn from_db(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "RFP_VENDOR" | "VENDOR" => Some(Role::Vendor),
            "RFP_ADMIN" | "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Role::Vendor => write!(f, "vendor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const fn empty() -> Self {
        RoleSet(0)
    }

    pub fn with(mut self, role: Role) -> Self {
        self.0 |= role.bit();
        self
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    fn intersects(&self, other: RoleSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Build a set from raw role names, skipping the ones we don't know.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|n| Role::from_db(n.as_ref()))
            .fold(RoleSet::empty(), RoleSet::with)
    }

    pub fn roles(&self) -> Vec<Role> {
        [Role::Vendor, Role::Admin]
            .into_iter()
            .filter(|r| self.contains(*r))
            .collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        iter.into_iter().fold(RoleSet::empty(), RoleSet::with)
    }
}

/// Operations guarded by a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Request a write credential for a submission slot
    IssueUploadToken,
    /// Read a sealed submission after the deadline
    OpenSealedBid,
    /// List submissions and their access history
    ReviewSubmissions,
}

impl Capability {
    fn granted_to(self) -> RoleSet {
        match self {
            Capability::IssueUploadToken => RoleSet::empty().with(Role::Vendor).with(Role::Admin),
            Capability::OpenSealedBid | Capability::ReviewSubmissions => {
                RoleSet::empty().with(Role::Admin)
            }
        }
    }

    fn denial_message(self) -> &'static str {
        match self {
            Capability::IssueUploadToken => "Insufficient permissions",
            Capability::OpenSealedBid => {
                "Insufficient permissions. Only RFP administrators can access bid submissions."
            }
            Capability::ReviewSubmissions => {
                "Insufficient permissions. Only RFP administrators can review bid submissions."
            }
        }
    }
}

/// Check that `roles` grants `capability`.
pub fn authorize(roles: &RoleSet, capability: Capability) -> Result<(), AppError> {
    if roles.intersects(capability.granted_to()) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions(
            capability.denial_message().to_string(),
        ))
    }
}
