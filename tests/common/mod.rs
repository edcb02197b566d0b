#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use storefront_cms::{
    backend::{Backends, MemoryAuth, MemoryBackend},
    build_router,
    config::AppConfig,
    AppState,
};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "editor@example.com";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

/// Response captured by the harness: status, headers and parsed JSON body.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Helper harness around the full router backed by the in-memory stores.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub backend: Arc<MemoryBackend>,
    token: Option<String>,
}

fn test_config() -> AppConfig {
    AppConfig::new("127.0.0.1".to_string(), 18_080, "development".to_string())
}

fn seed_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/demo_seed.json")
}

impl TestApp {
    /// Empty stores, admin routes open.
    pub async fn new() -> Self {
        Self::build(test_config(), MemoryBackend::new()).await
    }

    /// Demo catalog and pages loaded from the seed fixture.
    pub async fn seeded() -> Self {
        let backend = MemoryBackend::from_seed_file(seed_path())
            .await
            .expect("failed to load seed fixture");
        Self::build(test_config(), backend).await
    }

    /// Seeded stores with admin authentication enforced. A signed-in editor
    /// token is kept for `request_authenticated`.
    pub async fn seeded_with_admin_auth() -> Self {
        let mut cfg = test_config();
        cfg.require_admin_auth = true;
        let backend = MemoryBackend::from_seed_file(seed_path())
            .await
            .expect("failed to load seed fixture");
        let mut app = Self::build(cfg, backend).await;

        let signup = app
            .request(
                Method::POST,
                "/auth/sign-up",
                Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
                None,
            )
            .await;
        assert_eq!(signup.status, StatusCode::CREATED, "sign-up failed: {}", signup.body);
        let token = signup.data()["session"]["access_token"]
            .as_str()
            .expect("session token")
            .to_string();
        app.token = Some(token);
        app
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        Self::build(cfg, MemoryBackend::new()).await
    }

    async fn build(cfg: AppConfig, backend: MemoryBackend) -> Self {
        let backend = Arc::new(backend);
        let state = AppState::new(
            cfg,
            Backends {
                data: backend.clone(),
                auth: Arc::new(MemoryAuth::new()),
            },
        );
        let router = build_router(state.clone()).expect("router should build");
        Self {
            router,
            state,
            backend,
            token: None,
        }
    }

    pub fn token(&self) -> &str {
        self.token.as_deref().expect("app was built without admin auth")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    /// Convenience helper for admin requests; sends the editor token when
    /// the app enforces admin auth.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        self.request(method, uri, body, self.token.as_deref()).await
    }
}

/// Collects `field` from every object in a JSON array.
pub fn pluck<'a>(items: &'a Value, field: &str) -> Vec<&'a str> {
    items
        .as_array()
        .map(|arr| arr.iter().filter_map(|item| item[field].as_str()).collect())
        .unwrap_or_default()
}
