use crate::application_port::*;
use crate::domain_model::AuthTokens;
use crate::domain_port::{GraphqlError, GraphqlExecutor, GraphqlResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

const USER_FIELDS: &str = "uid full_name email role status";

const USER_LOGIN: &str = "mutation UserLogin($input: LoginUserInput!) { userLogin(input: $input) { edge { data { uid full_name email role status tokens { accessToken accessTokenExpiresAt refreshToken refreshTokenExpiresAt } } node } } }";
const REFRESH_TOKEN: &str = "mutation RefreshToken($input: RefreshTokenInput!) { refreshToken(input: $input) { edge { data { accessToken accessTokenExpiresAt refreshToken refreshTokenExpiresAt } node } } }";
const USER_LOGOUT: &str = "mutation UserLogout { userLogout { success message } }";

fn user_mutation(operation: &str, field: &str, input_type: &str) -> String {
    format!(
        "mutation {operation}($input: {input_type}!) {{ {field}(input: $input) {{ edge {{ data {{ {USER_FIELDS} }} node }} }} }}"
    )
}

/// Epoch milliseconds or an RFC 3339 timestamp.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expiry {
    Millis(i64),
    Text(String),
}

impl Expiry {
    fn millis(&self) -> Option<i64> {
        match self {
            Expiry::Millis(ms) => Some(*ms),
            Expiry::Text(s) => s
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|t| t.with_timezone(&Utc).timestamp_millis())
                }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenSet {
    access_token: String,
    #[serde(default)]
    access_token_expires_at: Option<Expiry>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(flatten)]
    user: UserProfile,
    tokens: TokenSet,
}

#[derive(Debug, Deserialize)]
struct LogoutPayload {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// The auth mutations of the GraphQL backend. Payloads live at
/// `<field>.edge.data`.
pub struct GraphqlAuthApi {
    executor: Arc<dyn GraphqlExecutor>,
}

impl GraphqlAuthApi {
    pub fn new(executor: Arc<dyn GraphqlExecutor>) -> Self {
        Self { executor }
    }

    async fn mutate(
        &self,
        document: &str,
        field: &str,
        variables: Value,
        bearer: Option<&str>,
    ) -> Result<Value, ApiError> {
        let response = self.executor.mutate(document, variables, bearer).await?;
        field_value(response, field)
    }

    async fn edge_data<T: DeserializeOwned>(
        &self,
        document: &str,
        field: &str,
        variables: Value,
    ) -> Result<T, ApiError> {
        let value = self.mutate(document, field, variables, None).await?;
        let data = value
            .pointer("/edge/data")
            .filter(|d| !d.is_null())
            .cloned()
            .ok_or_else(|| ApiError::malformed("Invalid response from server"))?;
        serde_json::from_value(data).map_err(|e| ApiError::malformed(e.to_string()))
    }
}

fn field_value(response: GraphqlResponse, field: &str) -> Result<Value, ApiError> {
    if let Some(first) = response.errors.first() {
        return Err(graphql_error(first));
    }
    response
        .data
        .and_then(|mut data| data.get_mut(field).map(Value::take))
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::malformed("Invalid response from server"))
}

fn graphql_error(error: &GraphqlError) -> ApiError {
    let code = error
        .extensions
        .as_ref()
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str);
    let status = match code {
        Some("UNAUTHENTICATED") => 401,
        Some("FORBIDDEN") => 403,
        Some("BAD_USER_INPUT") => 400,
        _ => 500,
    };
    let mut api_error = ApiError::new(status, error.message.clone(), code);
    api_error.details = error.extensions.clone();
    api_error
}

fn not_supported(operation: &str) -> ApiError {
    ApiError::new(
        501,
        format!("{operation} is not available over GraphQL"),
        Some(code::NOT_SUPPORTED),
    )
}

#[async_trait::async_trait]
impl AuthApi for GraphqlAuthApi {
    async fn login(&self, input: LoginInput) -> Result<LoginResult, ApiError> {
        let variables = json!({ "input": {
            "email": input.email,
            "password": input.password,
            "remember_me": input.remember_me,
        }});
        let payload: LoginPayload = self.edge_data(USER_LOGIN, "userLogin", variables).await?;
        let refresh_token = payload
            .tokens
            .refresh_token
            .ok_or_else(|| ApiError::malformed("login response carried no refresh token"))?;
        let expires_at = payload
            .tokens
            .access_token_expires_at
            .as_ref()
            .and_then(Expiry::millis)
            .unwrap_or_default();
        Ok(LoginResult {
            tokens: AuthTokens {
                access_token: payload.tokens.access_token,
                refresh_token,
                expires_at,
            },
            user: Some(payload.user),
            message: "Login successful".to_string(),
        })
    }

    async fn register(&self, input: RegisterInput) -> Result<String, ApiError> {
        let variables = json!({ "input": {
            "full_name": input.name,
            "email": input.email,
            "password": input.password,
            "confirm_password": input.confirm_password,
            "accept_terms": input.accept_terms,
        }});
        let document = user_mutation("UserRegistration", "userRegistration", "RegisterUserInput");
        let _: Value = self
            .edge_data(&document, "userRegistration", variables)
            .await?;
        Ok("Registration successful. Please check your email to verify your account.".to_string())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let variables = json!({ "input": { "refreshToken": refresh_token } });
        let tokens: TokenSet = self
            .edge_data(REFRESH_TOKEN, "refreshToken", variables)
            .await?;
        Ok(RefreshedTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    async fn logout(&self, access_token: Option<&str>) -> Result<(), ApiError> {
        let value = self
            .mutate(USER_LOGOUT, "userLogout", json!({}), access_token)
            .await?;
        let payload: LogoutPayload =
            serde_json::from_value(value).map_err(|e| ApiError::malformed(e.to_string()))?;
        if !payload.success {
            return Err(ApiError::new(
                400,
                payload.message.unwrap_or_else(|| "Logout failed".to_string()),
                None,
            ));
        }
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let variables = json!({ "input": { "email": email } });
        let document = user_mutation("ForgotPassword", "forgotPassword", "ForgotPasswordInput");
        self.mutate(&document, "forgotPassword", variables, None)
            .await?;
        Ok("Password reset instructions have been sent to your email.".to_string())
    }

    async fn reset_password(&self, token: &str, password: &str) -> Result<String, ApiError> {
        let variables = json!({ "input": { "token": token, "password": password } });
        let document = user_mutation("ResetPassword", "resetPassword", "ResetPasswordInput");
        self.mutate(&document, "resetPassword", variables, None)
            .await?;
        Ok("Password has been reset successfully.".to_string())
    }

    async fn verify_email(&self, _token: &str) -> Result<String, ApiError> {
        Err(not_supported("Email verification"))
    }

    async fn resend_verification_email(&self, _email: &str) -> Result<String, ApiError> {
        Err(not_supported("Resending the verification email"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::TransportError;
    use std::sync::Mutex;

    struct Scripted {
        response: GraphqlResponse,
        seen: Mutex<Vec<(String, Value, Option<String>)>>,
    }

    impl Scripted {
        fn new(response: Value) -> Arc<Self> {
            Arc::new(Self {
                response: serde_json::from_value(response).unwrap(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl GraphqlExecutor for Scripted {
        async fn mutate(
            &self,
            document: &str,
            variables: Value,
            bearer: Option<&str>,
        ) -> Result<GraphqlResponse, TransportError> {
            self.seen.lock().unwrap().push((
                document.to_string(),
                variables,
                bearer.map(str::to_string),
            ));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn login_reads_tokens_and_profile_from_the_edge() {
        let executor = Scripted::new(json!({"data": {"userLogin": {"edge": {"data": {
            "uid": "u1",
            "full_name": "Ada",
            "email": "ada@example.com",
            "role": "manager",
            "status": "active",
            "tokens": {
                "accessToken": "a",
                "accessTokenExpiresAt": "2030-01-01T00:00:00Z",
                "refreshToken": "r",
                "refreshTokenExpiresAt": 1893456000000i64
            }
        }, "node": null}}}}));
        let api = GraphqlAuthApi::new(executor.clone());
        let result = api
            .login(LoginInput {
                email: "ada@example.com".into(),
                password: "pw".into(),
                remember_me: false,
            })
            .await
            .unwrap();
        assert_eq!(result.tokens.refresh_token, "r");
        assert_eq!(result.tokens.expires_at, 1_893_456_000_000);
        let user = result.user.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "Ada");

        let seen = executor.seen.lock().unwrap();
        assert!(seen[0].0.contains("userLogin"));
        assert_eq!(seen[0].1["input"]["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn refresh_accepts_epoch_millis() {
        let api = GraphqlAuthApi::new(Scripted::new(json!({"data": {"refreshToken": {"edge": {"data": {
            "accessToken": "a2",
            "accessTokenExpiresAt": 1893456000000i64,
            "refreshToken": "r2"
        }}}}})));
        let refreshed = api.refresh_token("r1").await.unwrap();
        assert_eq!(refreshed.access_token, "a2");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn extension_codes_map_to_statuses() {
        let api = GraphqlAuthApi::new(Scripted::new(json!({
            "data": null,
            "errors": [{"message": "Refresh token expired", "extensions": {"code": "UNAUTHENTICATED"}}]
        })));
        let err = api.refresh_token("r1").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.code.as_deref(), Some("UNAUTHENTICATED"));
        assert_eq!(err.message, "Refresh token expired");

        let api = GraphqlAuthApi::new(Scripted::new(json!({
            "errors": [{"message": "bad", "extensions": {"code": "BAD_USER_INPUT"}}]
        })));
        assert_eq!(api.forgot_password("x").await.unwrap_err().status, 400);
    }

    #[tokio::test]
    async fn missing_payload_is_malformed() {
        let api = GraphqlAuthApi::new(Scripted::new(json!({"data": {"refreshToken": {"edge": {"data": null}}}})));
        let err = api.refresh_token("r1").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some(code::MALFORMED_RESPONSE));
    }

    #[tokio::test]
    async fn logout_carries_the_bearer_and_email_flows_are_unsupported() {
        let executor = Scripted::new(json!({"data": {"userLogout": {"success": true, "message": "bye"}}}));
        let api = GraphqlAuthApi::new(executor.clone());
        api.logout(Some("tok")).await.unwrap();
        assert_eq!(executor.seen.lock().unwrap()[0].2.as_deref(), Some("tok"));
        assert_eq!(api.verify_email("t").await.unwrap_err().status, 501);
    }
}
