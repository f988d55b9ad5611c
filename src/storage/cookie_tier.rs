use crate::domain_port::{CookieOptions, CookieStore, SameSite, StorageError};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Defaults applied to every auth cookie. Production sends cookies only over
/// TLS and allows cross-site use; development keeps them lax and plain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    pub fn for_environment(environment: Environment, domain: Option<String>) -> Self {
        if environment.is_production() {
            Self {
                path: "/".to_string(),
                domain,
                secure: true,
                same_site: SameSite::None,
            }
        } else {
            Self {
                path: "/".to_string(),
                domain,
                secure: false,
                same_site: SameSite::Lax,
            }
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    fn apply(&self, options: &CookieOptions) -> CookieOptions {
        CookieOptions {
            path: options.path.clone().or_else(|| Some(self.path.clone())),
            domain: options.domain.clone().or_else(|| self.domain.clone()),
            secure: options.secure.or(Some(self.secure)),
            same_site: options.same_site.or(Some(self.same_site)),
            max_age: options.max_age,
            expires: options.expires,
        }
    }
}

pub struct CookieTier {
    store: Arc<dyn CookieStore>,
    policy: CookiePolicy,
}

impl CookieTier {
    pub fn new(store: Arc<dyn CookieStore>, policy: CookiePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    pub async fn set(
        &self,
        key: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<(), StorageError> {
        self.store.set(key, value, &self.policy.apply(options)).await
    }

    /// Read failures count as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("cookie read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Never fails; a cookie that cannot be removed is logged and left.
    pub async fn delete(&self, key: &str) {
        let options = self.policy.apply(&CookieOptions::default());
        if let Err(e) = self.store.delete(key, &options).await {
            tracing::warn!("cookie delete failed for {}: {}", key, e);
        }
    }

    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryCookieJar;

    #[test]
    fn production_is_stricter() {
        let prod = CookiePolicy::for_environment(Environment::Production, None);
        let dev = CookiePolicy::for_environment(Environment::Development, None);
        assert!(prod.secure);
        assert_eq!(prod.same_site, SameSite::None);
        assert!(!dev.secure);
        assert_eq!(dev.same_site, SameSite::Lax);
    }

    #[tokio::test]
    async fn writes_carry_policy_defaults() {
        let jar = Arc::new(MemoryCookieJar::new());
        let policy = CookiePolicy::for_environment(
            Environment::Production,
            Some("example.com".to_string()),
        );
        let tier = CookieTier::new(jar.clone(), policy);

        let options = CookieOptions {
            max_age: Some(60),
            ..Default::default()
        };
        tier.set("access_token", "abc", &options).await.unwrap();

        let stored = jar.options("access_token").unwrap();
        assert_eq!(stored.secure, Some(true));
        assert_eq!(stored.same_site, Some(SameSite::None));
        assert_eq!(stored.domain.as_deref(), Some("example.com"));
        assert_eq!(stored.path.as_deref(), Some("/"));
        assert_eq!(tier.get("access_token").await.as_deref(), Some("abc"));

        tier.delete("access_token").await;
        tier.delete("access_token").await;
        assert!(!tier.has("access_token").await);
    }
}
