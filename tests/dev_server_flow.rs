mod common;

use authgate::application_impl::{
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, RestAuthApi, RoutePolicy, RouteTargets,
};
use authgate::application_port::code;
use authgate::client::AuthClient;
use authgate::dev_server::{DevBackend, bind_ephemeral};
use authgate::domain_model::{DecodedToken, SessionEvent};
use authgate::domain_port::CookieStore;
use authgate::infra_http::ReqwestExecutor;
use common::*;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

const SIGNING_KEY: &[u8] = b"dev-flow-signing-key";

struct Running {
    backend: Arc<DevBackend>,
    client: AuthClient,
    tiers: Tiers,
}

/// Starts a dev server on a free port and a client wired to it over HTTP.
fn start(access_ttl: chrono::Duration) -> Running {
    let backend = Arc::new(
        DevBackend::new(SIGNING_KEY, access_ttl)
            .and_then(DevBackend::with_demo_accounts)
            .unwrap(),
    );
    let (addr, server) = bind_ephemeral(backend.clone());
    tokio::spawn(server);

    let executor = Arc::new(
        ReqwestExecutor::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap(),
    );
    let auth_api = Arc::new(RestAuthApi::new(executor.clone()));
    let (tokens, tiers) = token_manager();
    let targets = RouteTargets::default();
    let policy = RoutePolicy::standard(targets.clone()).unwrap();
    let client = AuthClient::from_parts(tokens, executor, auth_api, targets, policy);
    Running {
        backend,
        client,
        tiers,
    }
}

#[tokio::test]
async fn login_then_expiring_token_is_refreshed_once() {
    // inside the 30s expiry skew, so the client treats it as expired at once
    let run = start(chrono::Duration::seconds(20));
    let user = run
        .client
        .login("admin@example.com", "password", true)
        .await
        .unwrap();
    assert_eq!(user.role, "admin");

    let cached = run.client.tokens().cached_tokens().unwrap();
    assert_eq!(run.tiers.persisted().await.as_ref(), Some(&cached));
    assert_eq!(
        run.tiers.jar.get(ACCESS_TOKEN_COOKIE).await.unwrap(),
        Some(cached.access_token.clone())
    );
    assert_eq!(
        run.tiers.jar.get(REFRESH_TOKEN_COOKIE).await.unwrap(),
        Some(cached.refresh_token.clone())
    );
    assert_eq!(
        Some(cached.expires_at),
        run.client.tokens().get_token_expiry(&cached.access_token)
    );

    let me = run.client.http().get::<DecodedToken>("/api/me").await.unwrap();
    assert_eq!(me.data.unwrap().email, "admin@example.com");
    assert_eq!(run.backend.refresh_calls(), 1);

    let rotated = run.client.tokens().cached_tokens().unwrap();
    assert_ne!(rotated.refresh_token, cached.refresh_token);
    assert_eq!(run.backend.last_bearer(), Some(rotated.access_token.clone()));
    assert_eq!(run.tiers.persisted().await, Some(rotated));
}

#[tokio::test]
async fn revoked_token_under_concurrent_load_refreshes_once() {
    let run = start(chrono::Duration::minutes(15));
    run.client
        .login("manager@example.com", "password", false)
        .await
        .unwrap();
    let stale = run.client.tokens().get_access_token().await.unwrap();
    run.backend.revoke_access_token(&stale);

    let http = run.client.http();
    let results = join_all((0..6).map(|_| http.get::<DecodedToken>("/api/me"))).await;
    for result in results {
        assert_eq!(result.unwrap().data.unwrap().role, "manager");
    }
    assert_eq!(run.backend.refresh_calls(), 1);
    assert_ne!(run.client.tokens().get_access_token().await.unwrap(), stale);
}

#[tokio::test]
async fn logout_ends_the_session_on_both_sides() {
    let run = start(chrono::Duration::minutes(15));
    let mut events = run.client.events().subscribe();
    run.client
        .login("user@example.com", "password", false)
        .await
        .unwrap();
    let before = run.client.tokens().cached_tokens().unwrap();

    run.client.logout().await;
    assert!(!run.client.is_authenticated().await);
    assert!(run.tiers.persisted().await.is_none());
    assert!(run.tiers.jar.is_empty());

    let refused = run
        .client
        .auth_api()
        .refresh_token(&before.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(refused.status, 401);
    assert_eq!(refused.code.as_deref(), Some("INVALID_REFRESH_TOKEN"));

    let err = run.client.http().get::<DecodedToken>("/api/me").await.unwrap_err();
    assert_eq!(err.code.as_deref(), Some(code::NO_REFRESH_TOKEN));

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], SessionEvent::LoggedIn { .. }));
    assert_eq!(seen[1], SessionEvent::LoggedOut);
    assert!(matches!(seen[2], SessionEvent::Terminated { .. }));
}

#[tokio::test]
async fn wrong_password_is_rejected_without_storing_anything() {
    let run = start(chrono::Duration::minutes(15));
    let err = run
        .client
        .login("admin@example.com", "nope", false)
        .await
        .unwrap_err();
    assert_eq!(err.status, 401);
    assert_eq!(err.code.as_deref(), Some("INVALID_CREDENTIALS"));
    assert!(run.client.tokens().cached_tokens().is_none());
    assert!(run.tiers.persisted().await.is_none());
}
