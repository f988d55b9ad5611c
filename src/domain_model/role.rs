use super::permission::{self, order, product, settings, user, analytics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    User,
    Manager,
    Admin,
    SuperAdmin,
}

/// Lowest privilege first.
pub const ROLE_HIERARCHY: &[&str] = &["guest", "user", "manager", "admin", "super_admin"];

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Guest,
        Role::User,
        Role::Manager,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// The fixed permission set granted to the role.
    pub fn permissions(&self) -> BTreeSet<String> {
        let set: &[&str] = match self {
            Role::SuperAdmin => permission::ALL,
            Role::Admin => &[
                user::VIEW,
                user::CREATE,
                user::EDIT,
                product::VIEW,
                product::CREATE,
                product::EDIT,
                order::VIEW,
                order::EDIT,
                analytics::VIEW,
                settings::VIEW,
            ],
            Role::Manager => &[
                user::VIEW,
                product::VIEW,
                product::EDIT,
                order::VIEW,
                order::EDIT,
                order::APPROVE,
            ],
            Role::User => &[product::VIEW, order::VIEW, order::CREATE, order::CANCEL],
            Role::Guest => &[],
        };
        set.iter().map(|p| p.to_string()).collect()
    }

    /// Where a freshly signed-in user of this role lands.
    pub fn default_route(&self) -> &'static str {
        match self {
            Role::SuperAdmin | Role::Admin => "/admin/dashboard",
            Role::Manager => "/manager/dashboard",
            _ => "/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Compares positions in `hierarchy`. A role missing from the hierarchy never
/// passes, on either side.
pub fn is_higher_or_equal(user_role: &str, required: &str, hierarchy: &[&str]) -> bool {
    let user_index = hierarchy.iter().position(|r| *r == user_role);
    let required_index = hierarchy.iter().position(|r| *r == required);
    match (user_index, required_index) {
        (Some(u), Some(r)) => u >= r,
        _ => false,
    }
}
