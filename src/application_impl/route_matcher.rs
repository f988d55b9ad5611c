use super::{Access, DenyReason, GuardDecision};
use crate::domain_model::{DecodedToken, Role, permission};
use regex::Regex;
use std::collections::BTreeMap;

/// A route pattern. `:name` matches one path segment and `*` matches
/// anything; a pattern with neither matches itself and everything below it.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pattern: String,
    regex: Option<Regex>,
    params: Vec<String>,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        if !Self::is_dynamic(pattern) {
            return Ok(Self {
                pattern: pattern.to_string(),
                regex: None,
                params: Vec::new(),
            });
        }

        let mut params = Vec::new();
        let mut source = String::from("^");
        for (i, segment) in pattern.split('/').enumerate() {
            if i > 0 {
                source.push('/');
            }
            if let Some(name) = segment.strip_prefix(':') {
                params.push(name.to_string());
                source.push_str("([^/]+)");
            } else {
                let parts: Vec<String> = segment.split('*').map(regex::escape).collect();
                source.push_str(&parts.join(".*"));
            }
        }
        source.push('$');

        Ok(Self {
            pattern: pattern.to_string(),
            regex: Some(Regex::new(&source)?),
            params,
        })
    }

    pub fn is_dynamic(pattern: &str) -> bool {
        pattern.contains(':') || pattern.contains('*')
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => path == self.pattern || path.starts_with(&format!("{}/", self.pattern)),
        }
    }

    /// Named segments, or `None` when the path does not match.
    pub fn extract_params(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let Some(regex) = &self.regex else {
            return self.matches(path).then(BTreeMap::new);
        };
        let captures = regex.captures(path)?;
        Some(
            self.params
                .iter()
                .zip(captures.iter().skip(1))
                .filter_map(|(name, m)| m.map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

pub struct RouteMatcher;

impl RouteMatcher {
    pub fn matches(path: &str, pattern: &str) -> bool {
        RoutePattern::new(pattern).is_ok_and(|p| p.matches(path))
    }

    pub fn matches_any(path: &str, patterns: &[RoutePattern]) -> bool {
        patterns.iter().any(|p| p.matches(path))
    }

    pub fn extract_params(path: &str, pattern: &str) -> BTreeMap<String, String> {
        RoutePattern::new(pattern)
            .ok()
            .and_then(|p| p.extract_params(path))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct RouteTargets {
    pub login: String,
    pub unauthorized: String,
    pub home: String,
}

impl Default for RouteTargets {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            unauthorized: "/unauthorized".to_string(),
            home: "/".to_string(),
        }
    }
}

/// Which paths are public, which need a session and which need an admin,
/// plus per-path permission requirements.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    public: Vec<RoutePattern>,
    protected: Vec<RoutePattern>,
    admin: Vec<RoutePattern>,
    permissions: Vec<(RoutePattern, Vec<String>)>,
    /// Exact paths a signed-in user is sent away from.
    auth_pages: Vec<String>,
    targets: RouteTargets,
}

fn compile(patterns: &[&str]) -> Result<Vec<RoutePattern>, regex::Error> {
    patterns.iter().map(|p| RoutePattern::new(p)).collect()
}

impl RoutePolicy {
    pub fn new(
        public: &[&str],
        protected: &[&str],
        admin: &[&str],
        targets: RouteTargets,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            public: compile(public)?,
            protected: compile(protected)?,
            admin: compile(admin)?,
            permissions: Vec::new(),
            auth_pages: Vec::new(),
            targets,
        })
    }

    pub fn standard(targets: RouteTargets) -> Result<Self, regex::Error> {
        use permission::{order, product, settings, user};

        Self::new(
            &[
                "/",
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/verify-email",
                "/products",
                "/api/auth",
                "/api/public",
            ],
            &["/dashboard", "/profile", "/settings", "/api/protected"],
            &["/admin", "/api/admin"],
            targets,
        )?
        .with_auth_pages(&[
            "/login",
            "/register",
            "/forgot-password",
            "/reset-password",
            "/verify-email",
        ])
        .require("/admin/users", &[user::VIEW])?
        .require("/admin/users/create", &[user::CREATE])?
        .require("/admin/users/:id/edit", &[user::EDIT])?
        .require("/admin/products", &[product::VIEW])?
        .require("/admin/products/create", &[product::CREATE])?
        .require("/admin/orders", &[order::VIEW])?
        .require("/admin/orders/:id/approve", &[order::APPROVE])?
        .require("/settings", &[settings::VIEW])
    }

    pub fn with_auth_pages(mut self, pages: &[&str]) -> Self {
        self.auth_pages = pages.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn require(mut self, pattern: &str, permissions: &[&str]) -> Result<Self, regex::Error> {
        self.permissions.push((
            RoutePattern::new(pattern)?,
            permissions.iter().map(|p| p.to_string()).collect(),
        ));
        Ok(self)
    }

    pub fn targets(&self) -> &RouteTargets {
        &self.targets
    }

    pub fn is_public(&self, path: &str) -> bool {
        RouteMatcher::matches_any(path, &self.public)
    }

    pub fn is_protected(&self, path: &str) -> bool {
        RouteMatcher::matches_any(path, &self.protected)
    }

    pub fn is_admin(&self, path: &str) -> bool {
        RouteMatcher::matches_any(path, &self.admin)
    }

    /// Every permission any matching entry asks for.
    pub fn required_permissions(&self, path: &str) -> Vec<&str> {
        self.permissions
            .iter()
            .filter(|(pattern, _)| pattern.matches(path))
            .flat_map(|(_, permissions)| permissions.iter().map(String::as_str))
            .collect()
    }

    /// `user` is the current session's user, if any.
    pub fn decide(&self, path: &str, user: Option<&DecodedToken>) -> GuardDecision {
        if self.is_public(path) {
            let exact_auth_page = self.auth_pages.iter().any(|p| p == path);
            return match user {
                Some(_) if exact_auth_page => GuardDecision::deny(
                    self.targets.home.clone(),
                    DenyReason::AlreadyAuthenticated,
                ),
                _ => GuardDecision::Allow,
            };
        }

        let Some(user) = user else {
            return GuardDecision::deny(
                format!("{}?redirect={}", self.targets.login, path),
                DenyReason::Unauthenticated,
            );
        };

        let is_admin_role = matches!(user.role.parse::<Role>(), Ok(Role::Admin | Role::SuperAdmin));
        if self.is_admin(path) && !is_admin_role {
            return GuardDecision::deny(self.targets.unauthorized.clone(), DenyReason::Forbidden);
        }

        let access = Access::for_user(Some(user));
        if !access.has_all_permissions(self.required_permissions(path).as_slice()) {
            return GuardDecision::deny(self.targets.unauthorized.clone(), DenyReason::Forbidden);
        }
        GuardDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::testing::claims;

    #[test]
    fn static_patterns_match_by_prefix() {
        assert!(RouteMatcher::matches("/dashboard", "/dashboard"));
        assert!(RouteMatcher::matches("/dashboard/stats", "/dashboard"));
        assert!(!RouteMatcher::matches("/dashboards", "/dashboard"));
        assert!(RouteMatcher::matches("/", "/"));
        assert!(!RouteMatcher::matches("/login", "/"));
    }

    #[test]
    fn params_and_wildcards() {
        assert!(RouteMatcher::matches("/users/42", "/users/:id"));
        assert!(!RouteMatcher::matches("/users/42/edit", "/users/:id"));
        assert!(RouteMatcher::matches("/files/a/b.txt", "/files/*"));
        assert!(RouteMatcher::matches("/a.b", "/a.b"));
        assert!(!RouteMatcher::matches("/axb/c", "/a.b/:x"));

        let params = RouteMatcher::extract_params("/orders/7/items/9", "/orders/:order/items/:item");
        assert_eq!(params.get("order").map(String::as_str), Some("7"));
        assert_eq!(params.get("item").map(String::as_str), Some("9"));
        assert!(RouteMatcher::extract_params("/nope", "/orders/:order").is_empty());
    }

    #[test]
    fn policy_decisions() {
        let policy = RoutePolicy::standard(RouteTargets::default()).unwrap();
        let admin = claims("a", "admin", None);
        let user = claims("u", "user", None);

        assert_eq!(policy.decide("/products", None), GuardDecision::Allow);
        assert_eq!(
            policy.decide("/dashboard", None),
            GuardDecision::deny("/login?redirect=/dashboard", DenyReason::Unauthenticated)
        );
        assert_eq!(policy.decide("/dashboard", Some(&user)), GuardDecision::Allow);
        assert_eq!(
            policy.decide("/login", Some(&user)),
            GuardDecision::deny("/", DenyReason::AlreadyAuthenticated)
        );
        assert_eq!(policy.decide("/", Some(&user)), GuardDecision::Allow);
        assert_eq!(policy.decide("/products", Some(&user)), GuardDecision::Allow);
        assert_eq!(
            policy.decide("/admin/users", Some(&user)),
            GuardDecision::deny("/unauthorized", DenyReason::Forbidden)
        );
        assert_eq!(policy.decide("/admin/users/5/edit", Some(&admin)), GuardDecision::Allow);
        // admin's fixed set has no order approval
        assert_eq!(
            policy.decide("/admin/orders/5/approve", Some(&admin)),
            GuardDecision::deny("/unauthorized", DenyReason::Forbidden)
        );
    }
}
