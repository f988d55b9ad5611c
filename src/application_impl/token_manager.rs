use super::{TokenCodec, fingerprint};
use crate::application_port::{AuthError, RefreshedTokens};
use crate::domain_model::{AuthTokens, DecodedToken};
use crate::domain_port::CookieOptions;
use crate::storage::{CookieTier, EncryptedTier, MemoryTier};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const AUTH_TOKENS_KEY: &str = "auth_tokens";
const DECODED_TOKEN_PREFIX: &str = "decoded_token:";
/// Decoded claims kept at once; reaching it empties the claims cache.
const MAX_CACHED_CLAIMS: usize = 32;

/// Seven days.
pub const DEFAULT_REFRESH_TOKEN_MAX_AGE: Duration = Duration::from_secs(604_800);

#[derive(Debug, Clone)]
enum CachedAuth {
    Tokens(AuthTokens),
    Claims(DecodedToken),
}

/// The only writer of auth tokens. Reads go memory, then cookie, then the
/// persistent tier; writes keep all three in step.
pub struct TokenManager {
    codec: Arc<dyn TokenCodec>,
    memory: MemoryTier<CachedAuth>,
    cookies: CookieTier,
    persistent: EncryptedTier,
    refresh_token_max_age: Duration,
}

impl TokenManager {
    pub fn new(codec: Arc<dyn TokenCodec>, cookies: CookieTier, persistent: EncryptedTier) -> Self {
        Self {
            codec,
            memory: MemoryTier::new(),
            cookies,
            persistent,
            refresh_token_max_age: DEFAULT_REFRESH_TOKEN_MAX_AGE,
        }
    }

    pub fn with_refresh_token_max_age(mut self, max_age: Duration) -> Self {
        self.refresh_token_max_age = max_age;
        self
    }

    pub fn codec(&self) -> &Arc<dyn TokenCodec> {
        &self.codec
    }

    /// The persistent tier is written first and its failure aborts the whole
    /// call. Cookie writes are best-effort.
    pub async fn set_tokens(&self, tokens: &AuthTokens) -> Result<(), AuthError> {
        self.persistent.set(AUTH_TOKENS_KEY, tokens).await?;

        let access_max_age = (tokens.expires_at - Utc::now().timestamp_millis()) / 1000;
        self.write_cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token, access_max_age.max(0))
            .await;
        self.write_cookie(
            REFRESH_TOKEN_COOKIE,
            &tokens.refresh_token,
            self.refresh_token_max_age.as_secs() as i64,
        )
        .await;

        self.memory.clear();
        self.memory
            .set(AUTH_TOKENS_KEY, CachedAuth::Tokens(tokens.clone()));
        if self.decode_token(&tokens.access_token).is_none() {
            tracing::warn!("stored an access token that does not decode");
        }
        Ok(())
    }

    async fn write_cookie(&self, key: &str, value: &str, max_age: i64) {
        let options = CookieOptions {
            max_age: Some(max_age),
            ..Default::default()
        };
        if let Err(e) = self.cookies.set(key, value, &options).await {
            tracing::warn!("cookie write failed for {}: {}", key, e);
        }
    }

    /// First non-expired access token across the tiers.
    pub async fn get_access_token(&self) -> Option<String> {
        if let Some(tokens) = self.cached_tokens() {
            if !self.codec.is_expired(&tokens.access_token) {
                tracing::trace!("access token served from memory");
                return Some(tokens.access_token);
            }
        }

        if let Some(token) = self.cookies.get(ACCESS_TOKEN_COOKIE).await {
            if !self.codec.is_expired(&token) {
                tracing::debug!("access token served from cookie");
                return Some(token);
            }
        }

        let tokens = self.persistent.get::<AuthTokens>(AUTH_TOKENS_KEY).await?;
        if self.codec.is_expired(&tokens.access_token) {
            tracing::debug!("no unexpired access token in any tier");
            return None;
        }
        tracing::debug!("access token served from persistent store");
        let token = tokens.access_token.clone();
        self.memory.set(AUTH_TOKENS_KEY, CachedAuth::Tokens(tokens));
        Some(token)
    }

    /// The stored access token whether or not it has expired.
    pub async fn peek_access_token(&self) -> Option<String> {
        if let Some(tokens) = self.cached_tokens() {
            return Some(tokens.access_token);
        }
        if let Some(token) = self.cookies.get(ACCESS_TOKEN_COOKIE).await {
            return Some(token);
        }
        self.persistent
            .get::<AuthTokens>(AUTH_TOKENS_KEY)
            .await
            .map(|tokens| tokens.access_token)
    }

    /// Cookie first, then the persistent tier. Never checks expiry.
    pub async fn get_refresh_token(&self) -> Option<String> {
        if let Some(token) = self.cookies.get(REFRESH_TOKEN_COOKIE).await {
            return Some(token);
        }
        self.persistent
            .get::<AuthTokens>(AUTH_TOKENS_KEY)
            .await
            .map(|tokens| tokens.refresh_token)
            .filter(|token| !token.is_empty())
    }

    /// Keeps the current refresh token and swaps in a new access token.
    pub async fn update_access_token(&self, access_token: &str) -> Result<AuthTokens, AuthError> {
        let refresh_token = self
            .get_refresh_token()
            .await
            .ok_or(AuthError::NoRefreshToken)?;
        self.store_pair(access_token, refresh_token).await
    }

    /// Applies a refresh response, honoring a rotated refresh token when one
    /// came back.
    pub async fn apply_refresh(&self, refreshed: &RefreshedTokens) -> Result<AuthTokens, AuthError> {
        match &refreshed.refresh_token {
            Some(refresh_token) => {
                self.store_pair(&refreshed.access_token, refresh_token.clone())
                    .await
            }
            None => self.update_access_token(&refreshed.access_token).await,
        }
    }

    async fn store_pair(
        &self,
        access_token: &str,
        refresh_token: String,
    ) -> Result<AuthTokens, AuthError> {
        let expires_at = self
            .get_token_expiry(access_token)
            .ok_or(AuthError::InvalidToken)?;
        let tokens = AuthTokens {
            access_token: access_token.to_string(),
            refresh_token,
            expires_at,
        };
        self.set_tokens(&tokens).await?;
        Ok(tokens)
    }

    /// Claims are cached per token fingerprint, so a different token never
    /// sees another token's claims.
    pub fn decode_token(&self, token: &str) -> Option<DecodedToken> {
        let key = format!("{}{}", DECODED_TOKEN_PREFIX, fingerprint(token));
        if let Some(CachedAuth::Claims(claims)) = self.memory.get(&key) {
            return Some(claims);
        }
        let claims = self.codec.decode(token)?;
        if self.memory.count_prefixed(DECODED_TOKEN_PREFIX) >= MAX_CACHED_CLAIMS {
            self.memory.remove_prefixed(DECODED_TOKEN_PREFIX);
        }
        self.memory.set(key, CachedAuth::Claims(claims.clone()));
        Some(claims)
    }

    pub fn is_token_expired(&self, token: &str) -> bool {
        match self.decode_token(token) {
            Some(claims) => super::claims_expired(
                &claims,
                Utc::now().timestamp_millis(),
                self.codec.skew(),
            ),
            None => true,
        }
    }

    /// Expiry in epoch milliseconds.
    pub fn get_token_expiry(&self, token: &str) -> Option<i64> {
        self.decode_token(token)?.expires_at_millis()
    }

    /// Idempotent. Tier failures are logged, never returned.
    pub async fn clear_tokens(&self) {
        self.cookies.delete(ACCESS_TOKEN_COOKIE).await;
        self.cookies.delete(REFRESH_TOKEN_COOKIE).await;
        if let Err(e) = self.persistent.delete(AUTH_TOKENS_KEY).await {
            tracing::warn!("persistent token removal failed: {}", e);
        }
        self.memory.clear();
        tracing::debug!("tokens cleared from every tier");
    }

    /// Drops only the in-process cache.
    pub fn clear_memory_cache(&self) {
        self.memory.clear();
    }

    pub async fn get_current_user(&self) -> Option<DecodedToken> {
        let token = self.get_access_token().await?;
        self.decode_token(&token)
    }

    pub async fn is_authenticated(&self) -> bool {
        match self.get_access_token().await {
            Some(token) => !self.is_token_expired(&token),
            None => false,
        }
    }

    pub fn cached_tokens(&self) -> Option<AuthTokens> {
        match self.memory.get(AUTH_TOKENS_KEY) {
            Some(CachedAuth::Tokens(tokens)) => Some(tokens),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::JwtClaimsCodec;
    use crate::application_impl::testing::{claims, mint_expiring_in, tokens_for};
    use crate::domain_port::{BlobStore, CookieStore, StorageError};
    use crate::infra_memory::{MemoryBlobStore, MemoryCookieJar};
    use crate::storage::{CookiePolicy, Environment, TokenCipher};

    struct Fixture {
        jar: Arc<MemoryCookieJar>,
        blobs: Arc<MemoryBlobStore>,
        manager: TokenManager,
    }

    fn fixture() -> Fixture {
        let jar = Arc::new(MemoryCookieJar::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let manager = manager_over(jar.clone(), blobs.clone());
        Fixture {
            jar,
            blobs,
            manager,
        }
    }

    fn manager_over(cookies: Arc<dyn CookieStore>, blobs: Arc<dyn BlobStore>) -> TokenManager {
        TokenManager::new(
            Arc::new(JwtClaimsCodec::default()),
            CookieTier::new(
                cookies,
                CookiePolicy::for_environment(Environment::Development, None),
            ),
            EncryptedTier::new(blobs, TokenCipher::from_key_material("test")),
        )
    }

    #[tokio::test]
    async fn claims_cache_stays_bounded() {
        let f = fixture();
        let stored = tokens_for(&claims("u1", "user", None), "r1");
        f.manager.set_tokens(&stored).await.unwrap();

        for i in 0..(MAX_CACHED_CLAIMS * 3) {
            let token = tokens_for(&claims(&format!("u{}", i), "user", None), "r").access_token;
            assert_eq!(f.manager.decode_token(&token).unwrap().id, format!("u{}", i));
        }
        assert!(f.manager.memory.count_prefixed(DECODED_TOKEN_PREFIX) <= MAX_CACHED_CLAIMS);
        assert_eq!(f.manager.cached_tokens(), Some(stored.clone()));
        assert_eq!(f.manager.get_current_user().await.unwrap().id, "u1");
    }

    struct BrokenBlobStore;

    #[async_trait::async_trait]
    impl BlobStore for BrokenBlobStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Store("offline".into()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Store("offline".into()))
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Store("offline".into()))
        }
    }

    #[tokio::test]
    async fn set_tokens_populates_every_tier() {
        let f = fixture();
        let tokens = tokens_for(&claims("u1", "admin", None), "r1");
        f.manager.set_tokens(&tokens).await.unwrap();

        assert_eq!(f.manager.cached_tokens(), Some(tokens.clone()));
        assert_eq!(
            f.jar.get(ACCESS_TOKEN_COOKIE).await.unwrap().as_deref(),
            Some(tokens.access_token.as_str())
        );
        assert_eq!(f.jar.options(REFRESH_TOKEN_COOKIE).unwrap().max_age, Some(604_800));
        let access_age = f.jar.options(ACCESS_TOKEN_COOKIE).unwrap().max_age.unwrap();
        assert!((3590..=3600).contains(&access_age));
        assert!(f.blobs.raw(AUTH_TOKENS_KEY).is_some());
    }

    #[tokio::test]
    async fn every_tier_answers_with_the_same_token() {
        let f = fixture();
        let tokens = tokens_for(&claims("u1", "user", None), "r1");
        f.manager.set_tokens(&tokens).await.unwrap();
        assert_eq!(f.manager.get_access_token().await, Some(tokens.access_token.clone()));

        f.manager.clear_memory_cache();
        assert_eq!(f.manager.get_access_token().await, Some(tokens.access_token.clone()));

        f.jar.clear();
        f.manager.clear_memory_cache();
        assert_eq!(f.manager.get_access_token().await, Some(tokens.access_token.clone()));
        assert!(f.manager.cached_tokens().is_some());

        f.manager.clear_tokens().await;
        assert_eq!(f.manager.get_access_token().await, None);
    }

    #[tokio::test]
    async fn expired_tokens_are_not_served() {
        let f = fixture();
        let tokens = AuthTokens {
            access_token: mint_expiring_in(20),
            refresh_token: "r1".into(),
            expires_at: Utc::now().timestamp_millis() + 20_000,
        };
        f.manager.set_tokens(&tokens).await.unwrap();
        assert_eq!(f.manager.get_access_token().await, None);
        assert!(!f.manager.is_authenticated().await);
        assert_eq!(f.manager.peek_access_token().await, Some(tokens.access_token));
        assert_eq!(f.manager.get_refresh_token().await.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let f = fixture();
        f.manager.clear_tokens().await;
        f.manager
            .set_tokens(&tokens_for(&claims("u1", "user", None), "r1"))
            .await
            .unwrap();
        f.manager.clear_tokens().await;
        f.manager.clear_tokens().await;
        assert!(f.jar.is_empty());
        assert!(f.blobs.is_empty());
        assert!(f.manager.cached_tokens().is_none());
        assert_eq!(f.manager.get_refresh_token().await, None);
    }

    #[tokio::test]
    async fn decode_cache_is_bound_to_the_token() {
        let f = fixture();
        let alice = tokens_for(&claims("alice", "admin", None), "r1");
        let bob = tokens_for(&claims("bob", "user", None), "r2");
        assert_eq!(f.manager.decode_token(&alice.access_token).unwrap().id, "alice");
        assert_eq!(f.manager.decode_token(&bob.access_token).unwrap().id, "bob");

        f.manager.set_tokens(&alice).await.unwrap();
        f.manager.set_tokens(&bob).await.unwrap();
        assert_eq!(f.manager.get_current_user().await.unwrap().id, "bob");
        assert!(f.manager.decode_token("garbage").is_none());
    }

    #[tokio::test]
    async fn update_access_token_keeps_refresh_token() {
        let f = fixture();
        let missing = f
            .manager
            .update_access_token(&tokens_for(&claims("u1", "user", None), "x").access_token)
            .await;
        assert_eq!(missing.unwrap_err(), AuthError::NoRefreshToken);

        f.manager
            .set_tokens(&tokens_for(&claims("u1", "user", None), "r1"))
            .await
            .unwrap();
        let invalid = f.manager.update_access_token("not-a-token").await;
        assert_eq!(invalid.unwrap_err(), AuthError::InvalidToken);

        let next = tokens_for(&claims("u1", "manager", None), "ignored");
        let stored = f.manager.update_access_token(&next.access_token).await.unwrap();
        assert_eq!(stored.refresh_token, "r1");
        assert_eq!(stored.expires_at, next.expires_at);
        assert_eq!(f.manager.get_current_user().await.unwrap().role, "manager");
    }

    #[tokio::test]
    async fn rotated_refresh_token_replaces_the_old_one() {
        let f = fixture();
        f.manager
            .set_tokens(&tokens_for(&claims("u1", "user", None), "r1"))
            .await
            .unwrap();
        let next = tokens_for(&claims("u1", "user", None), "r2");
        f.manager
            .apply_refresh(&RefreshedTokens {
                access_token: next.access_token.clone(),
                refresh_token: Some("r2".into()),
            })
            .await
            .unwrap();
        assert_eq!(f.manager.get_refresh_token().await.as_deref(), Some("r2"));
        assert_eq!(f.manager.get_access_token().await, Some(next.access_token));
    }

    #[tokio::test]
    async fn persistent_failure_aborts_set_tokens() {
        let jar = Arc::new(MemoryCookieJar::new());
        let manager = manager_over(jar.clone(), Arc::new(BrokenBlobStore));
        let result = manager
            .set_tokens(&tokens_for(&claims("u1", "user", None), "r1"))
            .await;
        assert!(matches!(result, Err(AuthError::Store(_))));
        assert!(jar.is_empty());
        assert!(manager.cached_tokens().is_none());

        manager.clear_tokens().await;
        assert_eq!(manager.get_access_token().await, None);
    }

    #[tokio::test]
    async fn token_expiry_is_in_millis() {
        let f = fixture();
        let c = claims("u1", "user", None);
        let tokens = tokens_for(&c, "r1");
        assert_eq!(
            f.manager.get_token_expiry(&tokens.access_token),
            Some(c.exp.unwrap() * 1000)
        );
        assert_eq!(f.manager.get_token_expiry("nope"), None);
    }
}
