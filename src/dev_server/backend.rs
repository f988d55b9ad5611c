use crate::application_impl::{IssueError, TokenIssuer};
use crate::domain_model::{AuthTokens, DecodedToken, Role};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use dashmap::{DashMap, DashSet};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum DevError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("No token provided")]
    MissingToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DevError {
    pub fn status(&self) -> u16 {
        match self {
            DevError::EmailTaken => 409,
            DevError::Internal(_) => 500,
            _ => 401,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DevError::InvalidCredentials => "INVALID_CREDENTIALS",
            DevError::EmailTaken => "EMAIL_TAKEN",
            DevError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            DevError::MissingToken => "NO_TOKEN",
            DevError::TokenExpired => "TOKEN_EXPIRED",
            DevError::InvalidToken => "INVALID_TOKEN",
            DevError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<IssueError> for DevError {
    fn from(error: IssueError) -> Self {
        match error {
            IssueError::Expired => DevError::TokenExpired,
            IssueError::Invalid => DevError::InvalidToken,
            IssueError::Encoding(e) => DevError::Internal(e),
        }
    }
}

struct DevAccount {
    claims: DecodedToken,
    password_hash: String,
}

/// Accounts, token issuance and refresh rotation for the development API.
pub struct DevBackend {
    issuer: TokenIssuer,
    hasher: Argon2<'static>,
    accounts: DashMap<String, DevAccount>,
    refresh_tokens: DashMap<String, DecodedToken>,
    revoked: DashSet<String>,
    refresh_calls: AtomicUsize,
    last_bearer: Mutex<Option<String>>,
}

impl DevBackend {
    pub fn new(signing_key: &[u8], access_ttl: chrono::Duration) -> Result<Self, DevError> {
        // minimum-cost argon2id
        let params = Params::new(Params::MIN_M_COST, 1, 1, None)
            .map_err(|e| DevError::Internal(e.to_string()))?;
        Ok(Self {
            issuer: TokenIssuer::new(signing_key, access_ttl),
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            accounts: DashMap::new(),
            refresh_tokens: DashMap::new(),
            revoked: DashSet::new(),
            refresh_calls: AtomicUsize::new(0),
            last_bearer: Mutex::new(None),
        })
    }

    /// One account per role, `<role>@example.com` with password `password`.
    pub fn with_demo_accounts(self) -> Result<Self, DevError> {
        for role in Role::ALL {
            let email = format!("{}@example.com", role.as_str());
            self.add_account(&email, "password", role.as_str(), role, None)?;
        }
        Ok(self)
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        self.issuer.access_ttl()
    }

    pub fn add_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
        permissions: Option<BTreeSet<String>>,
    ) -> Result<DecodedToken, DevError> {
        if self.accounts.contains_key(email) {
            return Err(DevError::EmailTaken);
        }
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DevError::Internal(e.to_string()))?
            .to_string();
        let claims = DecodedToken {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role: role.as_str().to_string(),
            permissions,
            ..Default::default()
        };
        self.accounts.insert(
            email.to_string(),
            DevAccount {
                claims: claims.clone(),
                password_hash,
            },
        );
        Ok(claims)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(AuthTokens, DecodedToken), DevError> {
        let claims = {
            let account = self
                .accounts
                .get(email)
                .ok_or(DevError::InvalidCredentials)?;
            let parsed = PasswordHash::new(&account.password_hash)
                .map_err(|e| DevError::Internal(format!("invalid PHC hash: {}", e)))?;
            match self.hasher.verify_password(password.as_bytes(), &parsed) {
                Ok(_) => {}
                Err(argon2::password_hash::Error::Password) => {
                    return Err(DevError::InvalidCredentials);
                }
                Err(e) => return Err(DevError::Internal(format!("verify error: {}", e))),
            }
            account.claims.clone()
        };
        let tokens = self.issue(&claims)?;
        tracing::info!("dev login for {}", email);
        Ok((tokens, claims))
    }

    /// Single use: the presented refresh token is consumed and replaced.
    pub fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, DevError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let (_, claims) = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(DevError::InvalidRefreshToken)?;
        let tokens = self.issue(&claims)?;
        tracing::debug!("rotated refresh token for {}", claims.email);
        Ok(tokens)
    }

    /// Verifies signature, expiry and revocation of a bearer token.
    pub fn authenticate(&self, bearer: Option<&str>) -> Result<DecodedToken, DevError> {
        let token = bearer.ok_or(DevError::MissingToken)?;
        *self.last_bearer.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        if self.revoked.contains(token) {
            return Err(DevError::InvalidToken);
        }
        Ok(self.issuer.verify(token)?)
    }

    /// Drops every refresh token of the bearer's user.
    pub fn logout(&self, bearer: Option<&str>) {
        let Some(user) = bearer.and_then(|token| self.issuer.verify(token).ok()) else {
            return;
        };
        self.refresh_tokens.retain(|_, claims| claims.id != user.id);
        if let Some(token) = bearer {
            self.revoked.insert(token.to_string());
        }
    }

    /// Makes `token` fail authentication from now on.
    pub fn revoke_access_token(&self, token: &str) {
        self.revoked.insert(token.to_string());
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn last_bearer(&self) -> Option<String> {
        self.last_bearer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn issue(&self, claims: &DecodedToken) -> Result<AuthTokens, DevError> {
        let tokens = self.issuer.issue_pair(claims)?;
        self.refresh_tokens
            .insert(tokens.refresh_token.clone(), claims.clone());
        Ok(tokens)
    }
}
