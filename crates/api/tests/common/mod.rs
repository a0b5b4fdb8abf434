#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pricedesk_api::auth::jwt::{generate_access_token, JwtConfig, SuperGrant};
use pricedesk_api::config::{BootstrapCredentials, ServerConfig};
use pricedesk_api::credentials::{self, CredentialStore};
use pricedesk_api::router::build_app_router;
use pricedesk_api::state::AppState;
use pricedesk_core::identity::Identity;
use pricedesk_core::pricing::AdjustmentPolicy;
use pricedesk_core::roles::Role;
use sqlx::PgPool;
use tower::ServiceExt;

pub const WORKER_PASSWORD: &str = "mostrador-1";
pub const ADMIN_PASSWORD: &str = "gerencia-22";
pub const SUPER_PASSWORD: &str = "dueno-333";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        heartbeat_interval_secs: 30,
        presence_stale_timeout_secs: 90,
        adjustment_policy: AdjustmentPolicy::Inherit,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        bootstrap: BootstrapCredentials {
            worker: Some(WORKER_PASSWORD.to_string()),
            admin: Some(ADMIN_PASSWORD.to_string()),
            super_admin: Some(SUPER_PASSWORD.to_string()),
        },
    }
}

/// State with credentials loaded from the (migrated) database but none seeded.
pub async fn build_test_state(pool: PgPool) -> AppState {
    build_test_state_with(pool, test_config()).await
}

pub async fn build_test_state_with(pool: PgPool, config: ServerConfig) -> AppState {
    let store = CredentialStore::load(&pool)
        .await
        .expect("credentials should load");
    AppState::new(pool, config, store)
}

/// State whose three role passwords are set to the `*_PASSWORD` constants.
pub async fn build_seeded_state(pool: PgPool) -> AppState {
    let config = test_config();
    credentials::seed_missing(&pool, &config.bootstrap)
        .await
        .expect("seeding should succeed");
    build_test_state_with(pool, config).await
}

/// Build the full application router with all middleware layers.
pub async fn build_test_app(pool: PgPool) -> Router {
    app_for(&build_test_state(pool).await)
}

pub fn app_for(state: &AppState) -> Router {
    build_app_router(state.clone(), &state.config)
}

/// Mint a token for `identity` at the state's current credential revision.
pub async fn token_for(state: &AppState, identity: &Identity, grant: Option<SuperGrant>) -> String {
    let revision = state.credentials.revision().await;
    generate_access_token(identity, grant, revision, &state.config.jwt)
        .expect("token generation should succeed")
}

pub async fn worker_token(state: &AppState) -> String {
    token_for(state, &Identity::new("Luis", "Gómez", Role::Worker), None).await
}

pub async fn admin_token(state: &AppState) -> String {
    token_for(state, &Identity::new("Marta", "Ruiz", Role::Admin), None).await
}

pub async fn super_token(state: &AppState) -> String {
    token_for(
        state,
        &Identity::new("Ana", "Pérez", Role::Admin),
        Some(SuperGrant::Credential),
    )
    .await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
