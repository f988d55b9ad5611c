use crate::domain_model::{AuthTokens, DecodedToken};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Mints and verifies HS256 access tokens carrying the session claims. Used
/// by the development backend and the fake auth API; clients never verify.
pub struct TokenIssuer {
    signing_key: Vec<u8>,
    access_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(signing_key: &[u8], access_ttl: Duration) -> Self {
        Self {
            signing_key: signing_key.to_vec(),
            access_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// `exp` is overwritten and a fresh session id is stamped in.
    pub fn issue_access_token(&self, claims: &DecodedToken) -> Result<(String, i64), IssueError> {
        let exp = (Utc::now() + self.access_ttl).timestamp();
        let claims = DecodedToken {
            exp: Some(exp),
            session_id: Some(nanoid::nanoid!()),
            ..claims.clone()
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| IssueError::Encoding(e.to_string()))?;
        Ok((token, exp))
    }

    /// Access token plus a fresh opaque refresh token.
    pub fn issue_pair(&self, claims: &DecodedToken) -> Result<AuthTokens, IssueError> {
        let (access_token, exp) = self.issue_access_token(claims)?;
        Ok(AuthTokens {
            access_token,
            refresh_token: nanoid::nanoid!(43),
            expires_at: exp * 1000,
        })
    }

    pub fn verify(&self, token: &str) -> Result<DecodedToken, IssueError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        let data = decode::<DecodedToken>(
            token,
            &DecodingKey::from_secret(&self.signing_key),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => IssueError::Expired,
            _ => IssueError::Invalid,
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::testing::claims;

    #[test]
    fn issued_tokens_verify_with_the_same_key_only() {
        let issuer = TokenIssuer::new(b"secret", Duration::minutes(5));
        let (token, exp) = issuer
            .issue_access_token(&claims("u1", "admin", None))
            .unwrap();
        let verified = issuer.verify(&token).unwrap();
        assert_eq!(verified.id, "u1");
        assert_eq!(verified.exp, Some(exp));
        assert!(verified.session_id.is_some());

        let other = TokenIssuer::new(b"other", Duration::minutes(5));
        assert!(matches!(other.verify(&token), Err(IssueError::Invalid)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new(b"secret", Duration::seconds(-10));
        let (token, _) = issuer
            .issue_access_token(&claims("u1", "user", None))
            .unwrap();
        assert!(matches!(issuer.verify(&token), Err(IssueError::Expired)));
    }

    #[test]
    fn pairs_are_unique() {
        let issuer = TokenIssuer::new(b"secret", Duration::minutes(5));
        let a = issuer.issue_pair(&claims("u1", "user", None)).unwrap();
        let b = issuer.issue_pair(&claims("u1", "user", None)).unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.refresh_token, b.refresh_token);
    }
}
