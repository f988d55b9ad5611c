use super::{Access, RouteTargets, SessionValidator};
use crate::domain_model::{DecodedToken, ROLE_HIERARCHY, Role};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Forbidden,
    AlreadyAuthenticated,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::Unauthenticated => "authentication required",
            DenyReason::Forbidden => "insufficient role or permissions",
            DenyReason::AlreadyAuthenticated => "already signed in",
        };
        f.write_str(s)
    }
}

/// What the routing layer should do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny {
        redirect_to: String,
        reason: DenyReason,
    },
}

impl GuardDecision {
    pub fn deny(redirect_to: impl Into<String>, reason: DenyReason) -> Self {
        GuardDecision::Deny {
            redirect_to: redirect_to.into(),
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }

    pub fn redirect_to(&self) -> Option<&str> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::Deny { redirect_to, .. } => Some(redirect_to),
        }
    }
}

/// Allow/deny decisions over the current session.
pub struct RouteGuard {
    validator: Arc<SessionValidator>,
    targets: RouteTargets,
}

impl RouteGuard {
    pub fn new(validator: Arc<SessionValidator>, targets: RouteTargets) -> Self {
        Self { validator, targets }
    }

    async fn current_user(&self) -> Option<DecodedToken> {
        self.validator.validate_session().await.user().cloned()
    }

    fn unauthenticated(&self) -> GuardDecision {
        GuardDecision::deny(self.targets.login.clone(), DenyReason::Unauthenticated)
    }

    fn forbidden(&self) -> GuardDecision {
        GuardDecision::deny(self.targets.unauthorized.clone(), DenyReason::Forbidden)
    }

    /// Roles and permissions are AND'd; an empty list skips that check.
    pub async fn protect_route(
        &self,
        allowed_roles: &[&str],
        allowed_permissions: &[&str],
    ) -> GuardDecision {
        self.decide_protect(self.current_user().await.as_ref(), allowed_roles, allowed_permissions)
    }

    pub fn decide_protect(
        &self,
        user: Option<&DecodedToken>,
        allowed_roles: &[&str],
        allowed_permissions: &[&str],
    ) -> GuardDecision {
        let Some(user) = user else {
            return self.unauthenticated();
        };
        let access = Access::for_user(Some(user));
        if !allowed_roles.is_empty() && !access.has_any_role(allowed_roles) {
            return self.forbidden();
        }
        if !access.has_all_permissions(allowed_permissions) {
            return self.forbidden();
        }
        GuardDecision::Allow
    }

    /// Keeps signed-in users off sign-in pages; they land on their role's home.
    pub async fn public_only(&self) -> GuardDecision {
        match self.current_user().await {
            Some(user) => {
                let landing = user
                    .role
                    .parse::<Role>()
                    .map(|role| role.default_route().to_string())
                    .unwrap_or_else(|_| self.targets.home.clone());
                GuardDecision::deny(landing, DenyReason::AlreadyAuthenticated)
            }
            None => GuardDecision::Allow,
        }
    }

    pub async fn authenticated_only(&self) -> GuardDecision {
        match self.current_user().await {
            Some(_) => GuardDecision::Allow,
            None => self.unauthenticated(),
        }
    }

    pub async fn require_permission(&self, permission: &str) -> GuardDecision {
        self.protect_route(&[], &[permission]).await
    }

    pub async fn require_role(&self, role: &str) -> GuardDecision {
        self.protect_route(&[role], &[]).await
    }

    pub async fn require_any_role(&self, roles: &[&str]) -> GuardDecision {
        self.protect_route(roles, &[]).await
    }

    pub async fn require_higher_or_equal_role(&self, required: &str) -> GuardDecision {
        let Some(user) = self.current_user().await else {
            return self.unauthenticated();
        };
        if Access::for_user(Some(&user)).has_higher_or_equal_role(required, ROLE_HIERARCHY) {
            GuardDecision::Allow
        } else {
            self.forbidden()
        }
    }

    pub async fn require_admin(&self) -> GuardDecision {
        self.require_any_role(&[Role::Admin.as_str(), Role::SuperAdmin.as_str()])
            .await
    }

    pub async fn require_super_admin(&self) -> GuardDecision {
        self.require_role(Role::SuperAdmin.as_str()).await
    }
}
