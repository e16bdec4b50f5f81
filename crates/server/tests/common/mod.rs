//! Common test utilities for in-process API testing.
//!
//! The fixture builds the real router around a scriptable extractor, so
//! tests exercise the full request path without spawning any subprocess.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use vidl_core::testing::MockExtractor;
use vidl_core::{Config, Extractor};
use vidl_server::api::create_router;
use vidl_server::state::AppState;

/// In-process server with a scriptable extractor.
pub struct TestFixture {
    pub router: Router,
    pub extractor: Arc<MockExtractor>,
    pub temp_dir: TempDir,
    pub artifacts_dir: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    /// Fixture with defaults: zero grace delay so deletions are observable
    /// without waiting.
    pub async fn new() -> Self {
        Self::with_config_mut(|_| {}).await
    }

    /// Fixture with a config tweak applied on top of the test defaults.
    pub async fn with_config_mut(tweak: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let artifacts_dir = temp_dir.path().join("artifacts");
        std::fs::create_dir_all(&artifacts_dir).expect("Failed to create artifacts dir");

        let mut config = Config::default();
        config.downloads.dir = artifacts_dir.clone();
        config.downloads.grace_secs = 0;
        tweak(&mut config);

        let extractor = Arc::new(MockExtractor::new());
        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&extractor) as Arc<dyn Extractor>,
        ));
        let router = create_router(state);

        Self {
            router,
            extractor,
            temp_dir,
            artifacts_dir,
        }
    }

    /// POST /download from the default test client.
    pub async fn post_download(&self, url: &str) -> TestResponse {
        self.post_download_from(url, "198.51.100.1").await
    }

    /// POST /download with an explicit client identity (X-Forwarded-For).
    pub async fn post_download_from(&self, url: &str, client: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri("/download")
            .header("Content-Type", "application/json")
            .header("X-Forwarded-For", client)
            .extension(ConnectInfo(peer_addr()))
            .body(Body::from(
                serde_json::to_vec(&json!({ "url": url })).unwrap(),
            ))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .extension(ConnectInfo(peer_addr()))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Files currently present in the artifact directory.
    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(&self.artifacts_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}

fn peer_addr() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}
