use super::ApiError;
use crate::domain_model::AuthTokens;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
}

/// Profile returned alongside the tokens at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, alias = "uid")]
    pub id: String,
    #[serde(default, alias = "full_name")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub tokens: AuthTokens,
    pub user: Option<UserProfile>,
    pub message: String,
}

/// What a refresh call hands back. Some backends rotate the refresh token,
/// others only mint a new access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// The issuing service's auth endpoints.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, input: LoginInput) -> Result<LoginResult, ApiError>;
    async fn register(&self, input: RegisterInput) -> Result<String, ApiError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError>;
    async fn logout(&self, access_token: Option<&str>) -> Result<(), ApiError>;
    async fn forgot_password(&self, email: &str) -> Result<String, ApiError>;
    async fn reset_password(&self, token: &str, password: &str) -> Result<String, ApiError>;
    async fn verify_email(&self, token: &str) -> Result<String, ApiError>;
    async fn resend_verification_email(&self, email: &str) -> Result<String, ApiError>;
}
