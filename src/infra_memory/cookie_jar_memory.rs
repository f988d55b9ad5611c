use crate::domain_port::{CookieOptions, CookieStore, StorageError};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

struct StoredCookie {
    value: String,
    options: CookieOptions,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A cookie jar held in process memory, honoring `max_age` and `expires`.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: DashMap<String, StoredCookie>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self {
            cookies: DashMap::new(),
        }
    }

    /// Attributes the cookie was last written with.
    pub fn options(&self, key: &str) -> Option<CookieOptions> {
        self.cookies.get(key).map(|c| c.options.clone())
    }

    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.cookies.iter().filter(|c| c.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cookies.clear();
    }
}

#[async_trait::async_trait]
impl CookieStore for MemoryCookieJar {
    async fn set(
        &self,
        key: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let expires_at = match (options.max_age, options.expires) {
            (Some(max_age), _) => Some(now + Duration::seconds(max_age)),
            (None, Some(expires)) => Some(expires),
            (None, None) => None,
        };
        if expires_at.is_some_and(|at| at <= now) {
            self.cookies.remove(key);
            return Ok(());
        }
        self.cookies.insert(
            key.to_string(),
            StoredCookie {
                value: value.to_string(),
                options: options.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = Utc::now();
        let found = self
            .cookies
            .get(key)
            .map(|cookie| (cookie.is_live(now), cookie.value.clone()));
        match found {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                self.cookies.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str, _options: &CookieOptions) -> Result<(), StorageError> {
        self.cookies.remove(key);
        Ok(())
    }
}
