use super::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes for a cookie write. Unset fields fall back to the tier's
/// environment-dependent defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub same_site: Option<SameSite>,
    /// Seconds; zero or negative removes the cookie.
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait CookieStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, options: &CookieOptions)
    -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Removing a cookie that does not exist is not an error.
    async fn delete(&self, key: &str, options: &CookieOptions) -> Result<(), StorageError>;

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some_and(|v| !v.is_empty()))
    }
}
