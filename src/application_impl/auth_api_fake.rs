use super::{IssueError, TokenIssuer};
use crate::application_port::*;
use crate::domain_model::{AuthTokens, DecodedToken, Role};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// In-process stand-in for the auth backend. Issues real HS256 tokens, keeps
/// refresh tokens single-use, and counts refresh calls.
pub struct FakeAuthApi {
    issuer: TokenIssuer,
    refresh_tokens: DashMap<String, DecodedToken>,
    refresh_calls: AtomicUsize,
    fail_refresh: AtomicBool,
    refresh_delay_ms: AtomicU64,
}

impl FakeAuthApi {
    pub fn new(signing_key: &[u8]) -> Self {
        Self::with_access_ttl(signing_key, chrono::Duration::minutes(15))
    }

    pub fn with_access_ttl(signing_key: &[u8], access_ttl: chrono::Duration) -> Self {
        Self {
            issuer: TokenIssuer::new(signing_key, access_ttl),
            refresh_tokens: DashMap::new(),
            refresh_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
        }
    }

    /// Mints a token pair for `claims` and remembers its refresh token.
    pub fn issue(&self, claims: &DecodedToken) -> Result<AuthTokens, ApiError> {
        let tokens = self.issuer.issue_pair(claims).map_err(issue_error)?;
        self.refresh_tokens
            .insert(tokens.refresh_token.clone(), claims.clone());
        Ok(tokens)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Holds every refresh call open this long before answering.
    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

fn issue_error(e: IssueError) -> ApiError {
    ApiError::internal(e.to_string())
}

fn fake_user(email: &str) -> DecodedToken {
    let local = email.split('@').next().unwrap_or_default();
    let role = local.parse::<Role>().unwrap_or(Role::User);
    DecodedToken {
        id: uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, email.as_bytes()).to_string(),
        email: email.to_string(),
        name: local.to_string(),
        role: role.as_str().to_string(),
        ..Default::default()
    }
}

// Passwords equal to "wrong" are rejected; the local part of the email picks
// the role when it names one.
#[async_trait::async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, input: LoginInput) -> Result<LoginResult, ApiError> {
        if input.password == "wrong" {
            return Err(ApiError::new(
                401,
                "Invalid email or password",
                Some(code::UNAUTHORIZED),
            ));
        }
        let claims = fake_user(&input.email);
        let tokens = self.issue(&claims)?;
        Ok(LoginResult {
            tokens,
            user: Some(UserProfile {
                id: claims.id,
                name: claims.name,
                email: claims.email,
                role: claims.role,
                status: Some("active".to_string()),
            }),
            message: "Login successful".to_string(),
        })
    }

    async fn register(&self, input: RegisterInput) -> Result<String, ApiError> {
        if input.password != input.confirm_password {
            return Err(ApiError::new(400, "Passwords do not match", None));
        }
        Ok("Registration successful".to_string())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.refresh_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(ApiError::new(401, "Refresh token rejected", Some(code::UNAUTHORIZED)));
        }
        let Some((_, claims)) = self.refresh_tokens.remove(refresh_token) else {
            return Err(ApiError::new(401, "Invalid refresh token", Some(code::UNAUTHORIZED)));
        };
        let tokens = self.issue(&claims)?;
        Ok(RefreshedTokens {
            access_token: tokens.access_token,
            refresh_token: Some(tokens.refresh_token),
        })
    }

    async fn logout(&self, _access_token: Option<&str>) -> Result<(), ApiError> {
        Ok(())
    }

    async fn forgot_password(&self, _email: &str) -> Result<String, ApiError> {
        Ok("Password reset instructions have been sent to your email.".to_string())
    }

    async fn reset_password(&self, _token: &str, _password: &str) -> Result<String, ApiError> {
        Ok("Password has been reset".to_string())
    }

    async fn verify_email(&self, _token: &str) -> Result<String, ApiError> {
        Ok("Email verified".to_string())
    }

    async fn resend_verification_email(&self, _email: &str) -> Result<String, ApiError> {
        Ok("Verification email sent".to_string())
    }
}
