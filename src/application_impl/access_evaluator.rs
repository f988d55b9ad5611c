use crate::domain_model::permission::{self, grants};
use crate::domain_model::{DecodedToken, ROLE_HIERARCHY, Role, is_higher_or_equal};
use std::collections::BTreeSet;

/// A composable access requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    Permission(String),
    AnyPermission(Vec<String>),
    AllPermissions(Vec<String>),
    Role(String),
    AnyRole(Vec<String>),
    /// At or above this role in the standard hierarchy.
    MinRole(String),
    All(Vec<AccessRule>),
    Any(Vec<AccessRule>),
}

impl AccessRule {
    pub fn permission(p: impl Into<String>) -> Self {
        AccessRule::Permission(p.into())
    }

    pub fn role(r: impl Into<String>) -> Self {
        AccessRule::Role(r.into())
    }

    pub fn min_role(r: impl Into<String>) -> Self {
        AccessRule::MinRole(r.into())
    }
}

/// Evaluates permission and role checks for one user. Anonymous access
/// passes nothing.
#[derive(Debug, Clone, Default)]
pub struct Access {
    role: Option<String>,
    permissions: BTreeSet<String>,
}

impl Access {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: Option<&DecodedToken>) -> Self {
        match user {
            Some(user) => Self {
                role: Some(user.role.clone()),
                permissions: effective_permissions(user),
            },
            None => Self::anonymous(),
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn has_permission(&self, required: &str) -> bool {
        self.permissions.iter().any(|held| grants(held, required))
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().any(|p| self.has_permission(p.as_ref()))
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.role.is_some() && required.iter().all(|p| self.has_permission(p.as_ref()))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }

    /// Roles outside `hierarchy` never pass.
    pub fn has_higher_or_equal_role(&self, required: &str, hierarchy: &[&str]) -> bool {
        match &self.role {
            Some(role) => is_higher_or_equal(role, required, hierarchy),
            None => false,
        }
    }

    fn can(&self, resource: &str, action: &str) -> bool {
        self.has_permission(&permission::resource_action(resource, action))
            || self.has_permission(&permission::wildcard(resource))
    }

    pub fn can_view(&self, resource: &str) -> bool {
        self.can(resource, "view")
    }

    pub fn can_create(&self, resource: &str) -> bool {
        self.can(resource, "create")
    }

    pub fn can_edit(&self, resource: &str) -> bool {
        self.can(resource, "edit")
    }

    pub fn can_delete(&self, resource: &str) -> bool {
        self.can(resource, "delete")
    }

    pub fn can_export(&self, resource: &str) -> bool {
        self.can(resource, "export")
    }

    /// View, create, edit and delete all at once.
    pub fn can_manage(&self, resource: &str) -> bool {
        ["view", "create", "edit", "delete"]
            .iter()
            .all(|action| self.can(resource, action))
    }

    fn at_least(&self, role: Role) -> bool {
        self.has_higher_or_equal_role(role.as_str(), ROLE_HIERARCHY)
    }

    pub fn is_super_admin(&self) -> bool {
        self.at_least(Role::SuperAdmin)
    }

    pub fn is_admin(&self) -> bool {
        self.at_least(Role::Admin)
    }

    pub fn is_manager(&self) -> bool {
        self.at_least(Role::Manager)
    }

    pub fn is_user(&self) -> bool {
        self.at_least(Role::User)
    }

    pub fn is_guest(&self) -> bool {
        self.at_least(Role::Guest)
    }

    pub fn evaluate(&self, rule: &AccessRule) -> bool {
        if self.role.is_none() {
            return false;
        }
        match rule {
            AccessRule::Permission(p) => self.has_permission(p),
            AccessRule::AnyPermission(ps) => self.has_any_permission(ps.as_slice()),
            AccessRule::AllPermissions(ps) => self.has_all_permissions(ps.as_slice()),
            AccessRule::Role(r) => self.has_role(r),
            AccessRule::AnyRole(rs) => self.has_any_role(rs.as_slice()),
            AccessRule::MinRole(r) => self.has_higher_or_equal_role(r, ROLE_HIERARCHY),
            AccessRule::All(rules) => rules.iter().all(|rule| self.evaluate(rule)),
            AccessRule::Any(rules) => rules.iter().any(|rule| self.evaluate(rule)),
        }
    }
}

/// The token's own permission claim, or its role's fixed set when the claim
/// is absent. Unknown roles get nothing.
pub fn effective_permissions(user: &DecodedToken) -> BTreeSet<String> {
    match &user.permissions {
        Some(permissions) => permissions.clone(),
        None => user
            .role
            .parse::<Role>()
            .map(|role| role.permissions())
            .unwrap_or_default(),
    }
}
