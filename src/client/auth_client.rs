use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::{DecodedToken, SessionEvent};
use crate::domain_port::*;
use crate::infra_fs::FileBlobStore;
use crate::infra_http::{ReqwestExecutor, ReqwestGraphqlExecutor};
use crate::infra_memory::{MemoryBlobStore, MemoryCookieJar};
use crate::infra_redis::RedisBlobStore;
use crate::logger::*;
use crate::settings::Settings;
use crate::storage::{CookiePolicy, CookieTier, EncryptedTier, Environment, TokenCipher};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

/// Everything a front end needs to run an authenticated session, wired once
/// at startup and handed around by reference.
pub struct AuthClient {
    tokens: Arc<TokenManager>,
    validator: Arc<SessionValidator>,
    guard: RouteGuard,
    policy: RoutePolicy,
    http: Arc<AuthorizedClient>,
    auth_api: Arc<dyn AuthApi>,
    events: SessionEvents,
}

impl AuthClient {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let environment = match settings.auth.environment.as_str() {
            "production" => Environment::Production,
            "development" => Environment::Development,
            other => return Err(anyhow!("Unknown environment: {}", other)),
        };

        if settings.storage.encryption_key.is_empty() {
            return Err(anyhow!("storage.encryption_key must be set"));
        }
        let refresh_token_max_age = Duration::from_secs(settings.auth.refresh_token_max_age_secs);

        let blob_store: Arc<dyn BlobStore> = match settings.storage.backend.as_str() {
            "memory" => Arc::new(MemoryBlobStore::new()),
            "file" => {
                let dir = settings
                    .storage
                    .file_dir
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.file_dir is required for the file backend"))?;
                Arc::new(FileBlobStore::new(dir))
            }
            "redis" => {
                let url = settings
                    .storage
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.redis_url is required for the redis backend"))?;
                let store = RedisBlobStore::connect(url, settings.storage.redis_prefix.clone())
                    .await?
                    .with_ttl(settings.auth.refresh_token_max_age_secs);
                Arc::new(store)
            }
            other => return Err(anyhow!("Unknown storage backend: {}", other)),
        };
        let persistent = EncryptedTier::new(
            blob_store,
            TokenCipher::from_key_material(&settings.storage.encryption_key),
        );

        let cookie_policy = CookiePolicy::for_environment(environment, settings.cookie.domain.clone())
            .with_path(settings.cookie.path.clone());
        let cookies = CookieTier::new(Arc::new(MemoryCookieJar::new()), cookie_policy);

        let codec: Arc<dyn TokenCodec> = Arc::new(JwtClaimsCodec::new(Duration::from_secs(
            settings.auth.expiry_skew_secs,
        )));
        let tokens = Arc::new(
            TokenManager::new(codec, cookies, persistent)
                .with_refresh_token_max_age(refresh_token_max_age),
        );

        let timeout = Duration::from_millis(settings.api.timeout_ms);
        let executor: Arc<dyn HttpExecutor> =
            Arc::new(ReqwestExecutor::new(settings.api.base_url.clone(), timeout)?);

        let auth_api: Arc<dyn AuthApi> = match settings.api.backend.as_str() {
            "rest" => Arc::new(RestAuthApi::new(executor.clone())),
            "graphql" => {
                let endpoint = format!(
                    "{}{}",
                    settings.api.base_url.trim_end_matches('/'),
                    settings.api.graphql_path
                );
                let graphql: Arc<dyn GraphqlExecutor> =
                    Arc::new(ReqwestGraphqlExecutor::new(endpoint, timeout)?);
                Arc::new(GraphqlAuthApi::new(graphql))
            }
            "fake" => Arc::new(FakeAuthApi::new(settings.dev_server.signing_key.as_bytes())),
            other => return Err(anyhow!("Unknown api backend: {}", other)),
        };

        let defaults = ClientIdentity::default();
        let identity = ClientIdentity {
            name: settings.api.client_name.clone().unwrap_or(defaults.name),
            version: settings.api.client_version.clone().unwrap_or(defaults.version),
        };

        let targets = RouteTargets {
            login: settings.routes.login.clone(),
            unauthorized: settings.routes.unauthorized.clone(),
            home: settings.routes.home.clone(),
        };
        let policy = RoutePolicy::standard(targets.clone())?;

        Ok(Self::assemble(tokens, executor, auth_api, targets, policy, identity))
    }

    /// Wires the services around an already built token manager.
    pub fn from_parts(
        tokens: Arc<TokenManager>,
        executor: Arc<dyn HttpExecutor>,
        auth_api: Arc<dyn AuthApi>,
        targets: RouteTargets,
        policy: RoutePolicy,
    ) -> Self {
        Self::assemble(
            tokens,
            executor,
            auth_api,
            targets,
            policy,
            ClientIdentity::default(),
        )
    }

    fn assemble(
        tokens: Arc<TokenManager>,
        executor: Arc<dyn HttpExecutor>,
        auth_api: Arc<dyn AuthApi>,
        targets: RouteTargets,
        policy: RoutePolicy,
        identity: ClientIdentity,
    ) -> Self {
        let events = SessionEvents::new();
        let validator = Arc::new(SessionValidator::new(tokens.clone()));
        let guard = RouteGuard::new(validator.clone(), targets.clone());
        let http = Arc::new(
            AuthorizedClient::new(executor, tokens.clone(), auth_api.clone(), events.clone())
                .with_identity(identity)
                .with_login_route(targets.login),
        );
        Self {
            tokens,
            validator,
            guard,
            policy,
            http,
            auth_api,
            events,
        }
    }

    /// Signs in and stores the session in every tier. The returned user
    /// always carries an id, an email and a role.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<DecodedToken, ApiError> {
        let result = self
            .auth_api
            .login(LoginInput {
                email: email.to_string(),
                password: password.to_string(),
                remember_me,
            })
            .await?;

        let mut tokens = result.tokens;
        let user = self
            .tokens
            .decode_token(&tokens.access_token)
            .filter(DecodedToken::has_required_claims)
            .ok_or(AuthError::InvalidToken)?;
        if let Some(expires_at) = self.tokens.get_token_expiry(&tokens.access_token) {
            tokens.expires_at = expires_at;
        }
        self.tokens.set_tokens(&tokens).await?;

        info!("signed in as {} ({})", user.email, user.role);
        self.events.emit(SessionEvent::LoggedIn {
            user_id: user.id.clone(),
        });
        Ok(user)
    }

    /// The server call is best-effort; local state is always wiped.
    pub async fn logout(&self) {
        let access_token = self.tokens.peek_access_token().await;
        if let Err(e) = self.auth_api.logout(access_token.as_deref()).await {
            warn!("server logout failed: {}", e);
        }
        self.tokens.clear_tokens().await;
        info!("signed out");
        self.events.emit(SessionEvent::LoggedOut);
    }

    pub async fn refresh_user(&self) -> Option<DecodedToken> {
        self.validator.validate_session().await.user().cloned()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated().await
    }

    /// What the route policy says about `path` for the current session.
    pub async fn check_route(&self, path: &str) -> GuardDecision {
        let session = self.validator.validate_session().await;
        self.policy.decide(path, session.user())
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn validator(&self) -> &Arc<SessionValidator> {
        &self.validator
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn http(&self) -> &Arc<AuthorizedClient> {
        &self.http
    }

    pub fn auth_api(&self) -> &Arc<dyn AuthApi> {
        &self.auth_api
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::testing::claims;
    use crate::domain_model::AuthTokens;

    struct Unreachable;

    #[async_trait::async_trait]
    impl HttpExecutor for Unreachable {
        async fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Network("offline".into()))
        }
    }

    fn client_with(auth_api: Arc<dyn AuthApi>) -> AuthClient {
        let cookies = CookieTier::new(
            Arc::new(MemoryCookieJar::new()),
            CookiePolicy::for_environment(Environment::Development, None),
        );
        let persistent = EncryptedTier::new(
            Arc::new(MemoryBlobStore::new()),
            TokenCipher::from_key_material("test"),
        );
        let tokens = Arc::new(TokenManager::new(
            Arc::new(JwtClaimsCodec::default()),
            cookies,
            persistent,
        ));
        let targets = RouteTargets::default();
        let policy = RoutePolicy::standard(targets.clone()).unwrap();
        AuthClient::from_parts(tokens, Arc::new(Unreachable), auth_api, targets, policy)
    }

    #[tokio::test]
    async fn login_stores_tokens_and_announces_the_user() {
        let client = client_with(Arc::new(FakeAuthApi::new(b"k")));
        let mut events = client.events().subscribe();

        let user = client.login("manager@example.com", "pw", false).await.unwrap();
        assert_eq!(user.role, "manager");
        assert!(client.is_authenticated().await);
        assert_eq!(client.refresh_user().await.unwrap().id, user.id);

        let stored = client.tokens().cached_tokens().unwrap();
        assert_eq!(
            Some(stored.expires_at),
            client.tokens().get_token_expiry(&stored.access_token)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedIn { user_id: user.id }
        );
    }

    #[tokio::test]
    async fn logout_wipes_state_even_when_the_server_is_gone() {
        struct OfflineLogout(FakeAuthApi);

        #[async_trait::async_trait]
        impl AuthApi for OfflineLogout {
            async fn login(&self, input: LoginInput) -> Result<LoginResult, ApiError> {
                self.0.login(input).await
            }
            async fn register(&self, input: RegisterInput) -> Result<String, ApiError> {
                self.0.register(input).await
            }
            async fn refresh_token(&self, token: &str) -> Result<RefreshedTokens, ApiError> {
                self.0.refresh_token(token).await
            }
            async fn logout(&self, _access_token: Option<&str>) -> Result<(), ApiError> {
                Err(TransportError::Network("offline".into()).into())
            }
            async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
                self.0.forgot_password(email).await
            }
            async fn reset_password(&self, token: &str, password: &str) -> Result<String, ApiError> {
                self.0.reset_password(token, password).await
            }
            async fn verify_email(&self, token: &str) -> Result<String, ApiError> {
                self.0.verify_email(token).await
            }
            async fn resend_verification_email(&self, email: &str) -> Result<String, ApiError> {
                self.0.resend_verification_email(email).await
            }
        }

        let client = client_with(Arc::new(OfflineLogout(FakeAuthApi::new(b"k"))));
        client.login("user@example.com", "pw", false).await.unwrap();
        client.logout().await;
        assert!(!client.is_authenticated().await);
        assert!(client.tokens().get_refresh_token().await.is_none());
    }

    #[tokio::test]
    async fn tokens_without_required_claims_are_refused() {
        let api = FakeAuthApi::new(b"k");
        let mut incomplete = claims("u1", "user", None);
        incomplete.email.clear();
        let tokens = api.issue(&incomplete).unwrap();

        struct FixedLogin(AuthTokens);

        #[async_trait::async_trait]
        impl AuthApi for FixedLogin {
            async fn login(&self, _input: LoginInput) -> Result<LoginResult, ApiError> {
                Ok(LoginResult {
                    tokens: self.0.clone(),
                    user: None,
                    message: "ok".into(),
                })
            }
            async fn register(&self, _input: RegisterInput) -> Result<String, ApiError> {
                unimplemented!()
            }
            async fn refresh_token(&self, _token: &str) -> Result<RefreshedTokens, ApiError> {
                unimplemented!()
            }
            async fn logout(&self, _access_token: Option<&str>) -> Result<(), ApiError> {
                Ok(())
            }
            async fn forgot_password(&self, _email: &str) -> Result<String, ApiError> {
                unimplemented!()
            }
            async fn reset_password(&self, _token: &str, _password: &str) -> Result<String, ApiError> {
                unimplemented!()
            }
            async fn verify_email(&self, _token: &str) -> Result<String, ApiError> {
                unimplemented!()
            }
            async fn resend_verification_email(&self, _email: &str) -> Result<String, ApiError> {
                unimplemented!()
            }
        }

        let client = client_with(Arc::new(FixedLogin(tokens)));
        let err = client.login("u1@example.com", "pw", false).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some(code::INVALID_TOKEN));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn route_checks_follow_the_session() {
        let client = client_with(Arc::new(FakeAuthApi::new(b"k")));
        assert_eq!(
            client.check_route("/admin/users").await.redirect_to(),
            Some("/login?redirect=/admin/users")
        );
        client.login("admin@example.com", "pw", false).await.unwrap();
        assert!(client.check_route("/admin/users").await.is_allowed());
    }
}
