use super::ApiResponse;
use crate::application_port::*;
use crate::domain_model::AuthTokens;
use crate::domain_port::{HttpExecutor, HttpRequest};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(alias = "accessToken")]
    access_token: String,
    #[serde(alias = "refreshToken")]
    refresh_token: String,
    /// Seconds.
    #[serde(default, alias = "expiresIn")]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<UserProfile>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    #[serde(alias = "access_token")]
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    refresh_token: Option<String>,
}

/// The `/auth/*` REST endpoints. Runs on the raw executor, never through
/// `AuthorizedClient`.
pub struct RestAuthApi {
    executor: Arc<dyn HttpExecutor>,
}

impl RestAuthApi {
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self { executor }
    }

    async fn post(&self, request: HttpRequest) -> Result<ApiResponse<Value>, ApiError> {
        let request = request.with_header("Content-Type", "application/json");
        let response = self.executor.execute(&request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(response.status, &response.body));
        }
        let envelope = ApiResponse::<Value>::from_body(response.body)?;
        if !envelope.success {
            let body = json!({ "message": envelope.message, "code": envelope.code });
            return Err(ApiError::from_response(400, &body));
        }
        Ok(envelope)
    }

    async fn post_message(&self, url: &str, body: Value, fallback: &str) -> Result<String, ApiError> {
        let envelope = self.post(public(url, body)).await?;
        Ok(envelope.message.unwrap_or_else(|| fallback.to_string()))
    }
}

/// Everything but logout goes out unauthenticated.
fn public(url: &str, body: Value) -> HttpRequest {
    HttpRequest::post(url, body).without_auth()
}

fn data<T: for<'de> Deserialize<'de>>(envelope: ApiResponse<Value>) -> Result<T, ApiError> {
    let data = envelope
        .data
        .ok_or_else(|| ApiError::malformed("response carried no data"))?;
    serde_json::from_value(data).map_err(|e| ApiError::malformed(e.to_string()))
}

#[async_trait::async_trait]
impl AuthApi for RestAuthApi {
    async fn login(&self, input: LoginInput) -> Result<LoginResult, ApiError> {
        let body = json!({
            "email": input.email,
            "password": input.password,
            "remember_me": input.remember_me,
        });
        let envelope = self.post(public("/auth/login", body)).await?;
        let message = envelope.message.clone();
        let login: LoginData = data(envelope)?;
        let expires_at = Utc::now()
            .timestamp_millis()
            .saturating_add(login.expires_in.unwrap_or(0).saturating_mul(1000));
        Ok(LoginResult {
            tokens: AuthTokens {
                access_token: login.access_token,
                refresh_token: login.refresh_token,
                expires_at,
            },
            user: login.user,
            message: login
                .message
                .or(message)
                .unwrap_or_else(|| "Login successful".to_string()),
        })
    }

    async fn register(&self, input: RegisterInput) -> Result<String, ApiError> {
        let body = json!({
            "name": input.name,
            "email": input.email,
            "password": input.password,
            "confirmPassword": input.confirm_password,
            "acceptTerms": input.accept_terms,
        });
        self.post_message("/auth/register", body, "Registration successful")
            .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let envelope = self
            .post(public(
                "/auth/refresh",
                json!({ "refreshToken": refresh_token }),
            ))
            .await?;
        let refreshed: RefreshData = data(envelope)?;
        Ok(RefreshedTokens {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
        })
    }

    async fn logout(&self, access_token: Option<&str>) -> Result<(), ApiError> {
        let mut request = HttpRequest::post("/auth/logout", json!({}));
        if let Some(token) = access_token {
            request.set_bearer(token);
        }
        self.post(request).await?;
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        self.post_message(
            "/auth/forgot-password",
            json!({ "email": email }),
            "Password reset instructions have been sent to your email.",
        )
        .await
    }

    async fn reset_password(&self, token: &str, password: &str) -> Result<String, ApiError> {
        self.post_message(
            "/auth/reset-password",
            json!({ "token": token, "password": password }),
            "Password has been reset",
        )
        .await
    }

    async fn verify_email(&self, token: &str) -> Result<String, ApiError> {
        self.post_message("/auth/verify-email", json!({ "token": token }), "Email verified")
            .await
    }

    async fn resend_verification_email(&self, email: &str) -> Result<String, ApiError> {
        self.post_message(
            "/auth/resend-verification-email",
            json!({ "email": email }),
            "Verification email sent",
        )
        .await
    }
}
