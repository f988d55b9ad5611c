use super::refresh_coordinator::wait_for;
use super::{Claim, LeaderGuard, RefreshCoordinator, SessionEvents, TokenManager};
use crate::application_port::{ApiError, AuthApi, AuthError};
use crate::domain_model::SessionEvent;
use crate::domain_port::{HttpExecutor, HttpRequest, HttpResponse, Method, REQUIRES_AUTH_HEADER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Requests to these paths never trigger a refresh.
pub const AUTH_ENDPOINTS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/verify-email",
    "/auth/reset-password",
    "/auth/forgot-password",
    "/auth/refresh",
];

pub fn is_auth_endpoint(url: &str) -> bool {
    AUTH_ENDPOINTS.iter().any(|endpoint| url.contains(endpoint))
}

fn default_success() -> bool {
    true
}

/// The `{data, message, success, code}` envelope the backend wraps
/// responses in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub code: Option<String>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Bodies that are not an envelope become its `data`.
    pub fn from_body(body: Value) -> Result<Self, ApiError> {
        let is_envelope = body
            .as_object()
            .is_some_and(|o| o.contains_key("success") || o.contains_key("data"));
        if is_envelope {
            return serde_json::from_value(body).map_err(|e| ApiError::malformed(e.to_string()));
        }
        let data = if body.is_null() {
            None
        } else {
            Some(serde_json::from_value(body).map_err(|e| ApiError::malformed(e.to_string()))?)
        };
        Ok(Self {
            data,
            message: None,
            success: true,
            code: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Attaches bearer tokens and recovers from 401s with a single shared
/// refresh.
pub struct AuthorizedClient {
    executor: Arc<dyn HttpExecutor>,
    tokens: Arc<TokenManager>,
    auth_api: Arc<dyn AuthApi>,
    events: SessionEvents,
    coordinator: RefreshCoordinator,
    identity: ClientIdentity,
    login_route: String,
}

impl AuthorizedClient {
    pub fn new(
        executor: Arc<dyn HttpExecutor>,
        tokens: Arc<TokenManager>,
        auth_api: Arc<dyn AuthApi>,
        events: SessionEvents,
    ) -> Self {
        Self {
            executor,
            tokens,
            auth_api,
            events,
            coordinator: RefreshCoordinator::new(),
            identity: ClientIdentity::default(),
            login_route: "/login".to_string(),
        }
    }

    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_login_route(mut self, login_route: impl Into<String>) -> Self {
        self.login_route = login_route.into();
        self
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<ApiResponse<T>, ApiError> {
        self.send(HttpRequest::get(url)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(HttpRequest::post(url, to_json(body)?)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(HttpRequest::new(Method::Put, url).with_body(to_json(body)?))
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(HttpRequest::new(Method::Patch, url).with_body(to_json(body)?))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: &str) -> Result<ApiResponse<T>, ApiError> {
        self.send(HttpRequest::new(Method::Delete, url)).await
    }

    pub async fn send<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.execute(request).await?;
        ApiResponse::from_body(response.body)
    }

    /// Sends `request`, refreshing and retrying once on a 401. Any other
    /// failure comes back normalized.
    pub async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let requires_auth = request
            .remove_header(REQUIRES_AUTH_HEADER)
            .is_none_or(|v| v != "false");
        self.apply_default_headers(&mut request);

        let mut sent = None;
        if requires_auth {
            if let Some(token) = self.tokens.get_access_token().await {
                request.set_bearer(&token);
                sent = Some(token);
            }
        }

        let response = self.executor.execute(&request).await?;
        if response.status != 401 || is_auth_endpoint(&request.url) {
            return into_result(response);
        }

        tracing::debug!("{} {} got 401, recovering session", request.method, request.url);
        let token = self.recover(sent.as_deref()).await?;
        request.set_bearer(&token);
        let retried = self.executor.execute(&request).await?;
        into_result(retried)
    }

    fn apply_default_headers(&self, request: &mut HttpRequest) {
        let defaults = [
            ("Content-Type", "application/json"),
            ("X-Client", self.identity.name.as_str()),
            ("X-Client-Version", self.identity.version.as_str()),
        ];
        for (name, value) in defaults {
            if request.header(name).is_none() {
                request.headers.insert(name.to_string(), value.to_string());
            }
        }
    }

    /// A token to retry with. If the request carried a token and the stored
    /// one already moved on from it, the stored one is used and no refresh
    /// happens.
    async fn recover(&self, sent: Option<&str>) -> Result<String, ApiError> {
        match self.coordinator.claim() {
            Claim::Waiter(rx) => {
                tracing::debug!("refresh already in flight, waiting");
                wait_for(rx).await
            }
            Claim::Leader(guard) => {
                if let Some(sent) = sent {
                    if let Some(current) = self.tokens.get_access_token().await {
                        if sent != current {
                            guard.settle(Ok(current.clone()));
                            return Ok(current);
                        }
                    }
                }
                self.lead(guard).await
            }
        }
    }

    /// Refreshes unconditionally, joining a refresh already in flight.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        match self.coordinator.claim() {
            Claim::Waiter(rx) => wait_for(rx).await,
            Claim::Leader(guard) => self.lead(guard).await,
        }
    }

    async fn lead(&self, guard: LeaderGuard<'_>) -> Result<String, ApiError> {
        let result = self.refresh_tokens().await;
        match &result {
            Ok(_) => {
                tracing::info!("access token refreshed");
                self.events.emit(SessionEvent::Refreshed);
            }
            Err(e) => self.terminate(e).await,
        }
        guard.settle(result.clone());
        result
    }

    async fn refresh_tokens(&self) -> Result<String, ApiError> {
        let refresh_token = self
            .tokens
            .get_refresh_token()
            .await
            .ok_or(AuthError::NoRefreshToken)?;
        let refreshed = self
            .auth_api
            .refresh_token(&refresh_token)
            .await
            .map_err(refresh_failed)?;
        let tokens = self.tokens.apply_refresh(&refreshed).await?;
        Ok(tokens.access_token)
    }

    /// Runs once per failed leader, however many waiters it had.
    async fn terminate(&self, error: &ApiError) {
        self.tokens.clear_tokens().await;
        tracing::error!("session terminated: {}", error);
        self.events.emit(SessionEvent::Terminated {
            redirect_to: self.login_route.clone(),
            reason: error.message.clone(),
        });
    }
}

fn refresh_failed(error: ApiError) -> ApiError {
    let mut failed = ApiError::from(AuthError::RefreshFailed(error.message.clone()));
    failed.details = serde_json::to_value(&error).ok();
    failed
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::internal(e.to_string()))
}

fn into_result(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response.status, &response.body))
    }
}
