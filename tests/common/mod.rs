#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Executor;
use tower::ServiceExt;

use petjournal_api::config::AppConfig;
use petjournal_api::database::DatabaseManager;
use petjournal_api::oss::{
    AssumeRoleRequest, CredentialBroker, OssClient, StsError, TemporaryCredential,
};
use petjournal_api::routes;
use petjournal_api::state::AppState;

pub const PRIVATE_PEM: &str = include_str!("../fixtures/jwt_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/jwt_public.pem");
pub const OTHER_PRIVATE_PEM: &str = include_str!("../fixtures/other_private.pem");

/// Broker double: counts calls, optionally fails.
pub struct SpyBroker {
    calls: AtomicUsize,
    fail: bool,
}

impl SpyBroker {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), fail: false })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), fail: true })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialBroker for SpyBroker {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredential, StsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StsError::Unavailable("simulated provider outage".into()));
        }
        Ok(TemporaryCredential {
            access_key_id: "STS.spy-id".into(),
            access_key_secret: "spy-secret".into(),
            security_token: "spy-token".into(),
            expires_at: Utc::now() + Duration::seconds(request.duration_secs as i64),
        })
    }
}

pub fn config_vars() -> HashMap<&'static str, String> {
    HashMap::from([
        // Nothing listens on port 9; health checks fail fast
        ("DB_HOST", "127.0.0.1".to_string()),
        ("DB_PORT", "9".to_string()),
        ("DB_USER", "petjournal".to_string()),
        ("DB_PASSWORD", "petjournal".to_string()),
        ("DB_NAME", "petjournal".to_string()),
        ("DATABASE_CONNECTION_TIMEOUT", "1".to_string()),
        ("OSS_REGION", "oss-cn-hangzhou".to_string()),
        ("OSS_BUCKET", "pet-journal".to_string()),
        ("OSS_ACCESS_KEY_ID", "svc-id".to_string()),
        ("OSS_ACCESS_KEY_SECRET", "svc-secret".to_string()),
        ("STS_ROLE_ARN", "acs:ram::1234:role/uploader".to_string()),
        ("JWT_PUBLIC_KEY", PUBLIC_PEM.to_string()),
    ])
}

pub fn config_from(vars: &HashMap<&'static str, String>) -> AppConfig {
    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config is valid")
}

/// Router wired with the given broker and a lazy pool that never connects.
pub fn app_with(config: AppConfig, broker: Arc<dyn CredentialBroker>) -> Router {
    let pool = MySqlPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(config.database.connection_timeout))
        .connect_lazy_with(DatabaseManager::connect_options(&config.database));
    let oss = OssClient::new(&config.storage).expect("oss client");
    let state = AppState::with_parts(config, broker, oss, pool).expect("state");
    routes::app(state)
}

/// Router over a live pool and an OSS client pointed at `oss_base_url`.
pub fn app_with_database(pool: MySqlPool, oss_base_url: String) -> Router {
    let config = config_from(&config_vars());
    let oss = OssClient::with_base_url(&config.storage, oss_base_url).expect("oss client");
    let state = AppState::with_parts(config, SpyBroker::ok(), oss, pool).expect("state");
    routes::app(state)
}

/// Pool for `TEST_DATABASE_URL` with `sql/schema.sql` applied, or `None`
/// when no test database is configured.
pub async fn database() -> Result<Option<MySqlPool>> {
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return Ok(None);
    };

    let pool = MySqlPoolOptions::new().max_connections(4).connect(&url).await?;
    let schema = include_str!("../../sql/schema.sql");
    let statements = schema
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    for statement in statements.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        pool.execute(statement).await?;
    }
    Ok(Some(pool))
}

/// Caller id no other test run will share.
pub fn fresh_caller() -> String {
    format!("t{}", uuid::Uuid::new_v4().simple())
}

pub fn app(broker: Arc<dyn CredentialBroker>) -> Router {
    app_with(config_from(&config_vars()), broker)
}

pub fn token_for(user_id: Value) -> String {
    sign(json!({ "userId": user_id }), PRIVATE_PEM)
}

pub fn sign(claims: Value, pem: &str) -> String {
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    encode(&Header::new(Algorithm::RS256), &claims, &key).expect("token")
}

/// Send a request and decode the JSON body (Null when empty).
pub async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

pub fn get(path: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn post_json(path: &str, authorization: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}
