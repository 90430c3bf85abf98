//! Server test utilities.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use docity_core::config::{AppConfig, PackConfig};
use docity_repo::{MemoryBackend, ObjectResolver, RepoBackend};
use docity_server::{AppState, PackRegistry, create_router};
use std::sync::Arc;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub backend: Arc<MemoryBackend>,
}

/// A buffered response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("etag")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// The test configuration: the "hello" pack with `welcome.html` as index page.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::for_testing();
    config.packs.insert(
        "hello".to_string(),
        PackConfig {
            index_page: "welcome.html".to_string(),
            description: Some("Greetings".to_string()),
        },
    );
    config
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server backed by the seeded "hello" repository.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::with_backend(crate::common::hello_backend(), modifier).await
    }

    /// Create a test server over a caller-prepared in-memory backend.
    pub async fn with_backend<F>(backend: Arc<MemoryBackend>, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = test_config();
        modifier(&mut config);
        let (router, state) = build(backend.clone(), config).await;
        Self {
            router,
            state,
            backend,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request("GET", uri, &[]).await
    }

    pub async fn get_with(&self, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", uri, headers).await
    }

    pub async fn request(&self, method: &str, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        send(&self.router, method, uri, headers).await
    }
}

/// Wire up state and router for any backend.
#[allow(dead_code)]
pub async fn build(backend: Arc<dyn RepoBackend>, config: AppConfig) -> (axum::Router, AppState) {
    let resolver = ObjectResolver::from_config(backend, &config.repos);
    let registry = PackRegistry::load(&config.packs, &resolver).await;
    let state = AppState::new(config, registry, resolver);
    (create_router(state.clone()), state)
}

/// Drive the router in-process with one request.
#[allow(dead_code)]
pub async fn send(
    router: &axum::Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body,
    }
}
