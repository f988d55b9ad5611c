use crate::domain_model::{AuthTokens, DecodedToken};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};

pub(crate) fn claims(id: &str, role: &str, permissions: Option<&[&str]>) -> DecodedToken {
    DecodedToken {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: id.to_string(),
        role: role.to_string(),
        permissions: permissions.map(|p| p.iter().map(|s| s.to_string()).collect()),
        tenant_id: None,
        session_id: None,
        exp: Some(Utc::now().timestamp() + 3600),
    }
}

pub(crate) fn mint(claims: &DecodedToken, key: &[u8]) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(key)).unwrap()
}

pub(crate) fn mint_expiring_in(secs: i64) -> String {
    let mut c = claims("u1", "user", None);
    c.exp = Some(Utc::now().timestamp() + secs);
    mint(&c, b"test-key")
}

pub(crate) fn tokens_for(claims: &DecodedToken, refresh_token: &str) -> AuthTokens {
    AuthTokens {
        access_token: mint(claims, b"test-key"),
        refresh_token: refresh_token.to_string(),
        expires_at: claims.expires_at_millis().unwrap_or_default(),
    }
}
