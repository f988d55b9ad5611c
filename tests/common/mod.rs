#![allow(dead_code)]

use authgate::application_impl::{AUTH_TOKENS_KEY, JwtClaimsCodec, TokenManager};
use authgate::domain_model::{AuthTokens, DecodedToken};
use authgate::infra_memory::{MemoryBlobStore, MemoryCookieJar};
use authgate::storage::{CookiePolicy, CookieTier, EncryptedTier, Environment, TokenCipher};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::collections::BTreeSet;
use std::sync::Arc;

pub const CIPHER_KEY: &str = "integration-test-key";

/// The backing stores of one token manager, kept around for inspection.
pub struct Tiers {
    pub jar: Arc<MemoryCookieJar>,
    pub blobs: Arc<MemoryBlobStore>,
}

impl Tiers {
    pub async fn persisted(&self) -> Option<AuthTokens> {
        EncryptedTier::new(self.blobs.clone(), TokenCipher::from_key_material(CIPHER_KEY))
            .get(AUTH_TOKENS_KEY)
            .await
    }
}

pub fn token_manager() -> (Arc<TokenManager>, Tiers) {
    let jar = Arc::new(MemoryCookieJar::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let tokens = TokenManager::new(
        Arc::new(JwtClaimsCodec::default()),
        CookieTier::new(
            jar.clone(),
            CookiePolicy::for_environment(Environment::Development, None),
        ),
        EncryptedTier::new(blobs.clone(), TokenCipher::from_key_material(CIPHER_KEY)),
    );
    (Arc::new(tokens), Tiers { jar, blobs })
}

pub fn claims(id: &str, role: &str, permissions: Option<&[&str]>) -> DecodedToken {
    DecodedToken {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: id.to_string(),
        role: role.to_string(),
        permissions: permissions.map(|p| p.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()),
        exp: Some(chrono::Utc::now().timestamp() + 3600),
        ..Default::default()
    }
}

/// Signed with a throwaway key; clients never verify signatures.
pub fn mint(claims: &DecodedToken) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(b"integration"),
    )
    .unwrap()
}

pub fn pair(claims: &DecodedToken, refresh_token: &str) -> AuthTokens {
    AuthTokens {
        access_token: mint(claims),
        refresh_token: refresh_token.to_string(),
        expires_at: claims.exp.unwrap_or_default() * 1000,
    }
}
