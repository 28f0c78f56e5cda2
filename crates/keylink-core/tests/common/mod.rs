//! Common test utilities for `Keylink` integration tests.
//!
//! This module provides a harness that wires the core components together
//! around a temporary database and drives the router in-process.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use tower::ServiceExt;

use keylink_core::config::Config;
use keylink_core::gate::AccessGate;
use keylink_core::issue::{IssuedLink, LinkIssuer};
use keylink_core::rate_limit::RateLimiter;
use keylink_core::store::Database;

/// Address used for requests unless a test picks another.
pub const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7));

/// Create a temporary directory for test files.
///
/// The directory will be automatically cleaned up when the returned
/// `TempDir` is dropped.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Generate random bytes for testing.
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Response captured from the router.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse the body as a JSON error and return its code.
    pub fn error_code(&self) -> Option<String> {
        let value: serde_json::Value =
            serde_json::from_slice(&self.body).expect("Error body should be JSON");
        value["code"].as_str().map(String::from)
    }
}

/// A fully wired Keylink instance backed by a temporary directory.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub config: Config,
    pub db: Database,
    pub limiter: Arc<RateLimiter>,
    pub router: axum::Router,
}

impl Harness {
    /// Build with default configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build after letting the caller adjust the configuration.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = create_temp_dir();

        let mut config = Config::default();
        config.server.host = "http://localhost".to_string();
        config.storage.database = Some(dir.path().join("keylink.db"));
        config.archive.directory = Some(dir.path().join("archives"));
        adjust(&mut config);

        let db = Database::open(&config.database_path()).expect("Failed to open database");
        let limiter = Arc::new(RateLimiter::new(
            config.security.rate_limit,
            config.security.rate_window,
        ));
        let gate = AccessGate::new(
            Arc::clone(&limiter),
            db.attempts(),
            db.links(),
            config.security.failed_attempt_limit,
        );
        let router = keylink_core::web::router(gate);

        Self {
            dir,
            config,
            db,
            limiter,
            router,
        }
    }

    /// Issuer writing into this harness's store.
    pub fn issuer(&self) -> LinkIssuer {
        LinkIssuer::new(&self.config, self.db.links())
    }

    /// Write `content` to `name` and issue a link for it.
    pub fn share(&self, name: &str, content: &[u8]) -> IssuedLink {
        let path = create_test_file(self.dir.path(), name, content);
        self.issuer().issue(&path).expect("Failed to issue link")
    }

    /// Failed-attempt count for [`CLIENT`].
    pub fn failures(&self) -> u32 {
        self.db
            .attempts()
            .get_count(&CLIENT.to_string())
            .expect("Failed to read attempts")
    }

    /// `GET path` from [`CLIENT`].
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, CLIENT).await
    }

    /// Send a request through the router as if it came from `client`.
    pub async fn request(&self, method: Method, path: &str, client: IpAddr) -> TestResponse {
        let mut request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(client, 40_000)));

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Request path for an issued link.
pub fn path_of(link: &IssuedLink) -> String {
    format!("/{}", link.token)
}

/// Shorthand for a whole-second duration.
pub const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
