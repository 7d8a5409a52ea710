//! Common test utilities for API testing with mocks.
//!
//! Builds an in-process router whose uploader runs real sagas against the
//! mock ads platform and mock fetcher, with results kept in a temporary
//! SQLite file.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use uploader_core::{
    campaign::{PlannerConfig, RowSchema},
    load_config_from_str,
    report::SqliteResultSink,
    testing::{MockAdsPlatform, MockFetcher},
    BatchUploader, TaskPlanner,
};
use uploader_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use uploader_core::testing::fixtures;

/// Access token configured for the fixture platform; must never be served.
pub const SECRET_TOKEN: &str = "secret-token-value";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_batch() {
///     let fixture = TestFixture::new();
///     fixture.serve_image("https://cdn.test/a.jpg").await;
///
///     let response = fixture.post("/api/v1/batches", json!({
///         "rows": [fixture_row("Shoes", "https://cdn.test/a.jpg")]
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Mock ads platform - inspect created resources, inject failures
    pub platform: Arc<MockAdsPlatform>,
    /// Mock fetcher - serve media bodies
    pub fetcher: Arc<MockFetcher>,
    /// Temporary directory for the results database and media scratch
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("results.db");

        let config = load_config_from_str(&format!(
            r#"
[server]
host = "127.0.0.1"
port = 0

[database]
path = "{}"

[scheduler]
pool_size = 2

[platforms."{}"]
access_token = "{}"
ad_account_id = "act_{}"
page_id = "{}"
"#,
            db_path.display(),
            fixtures::PLATFORM_KEY,
            SECRET_TOKEN,
            fixtures::ACCOUNT_ID,
            fixtures::PAGE_ID,
        ))
        .expect("Failed to parse test config");

        let platform = Arc::new(MockAdsPlatform::new());
        let fetcher = Arc::new(MockFetcher::new());
        let runner = fixtures::saga_runner(platform.clone(), fetcher.clone(), temp_dir.path());

        let results =
            Arc::new(SqliteResultSink::new(&db_path).expect("Failed to create result store"));
        let planner = TaskPlanner::new(
            RowSchema::default(),
            PlannerConfig::default(),
            config.platform_targets(),
        );
        let uploader = BatchUploader::new(planner, Arc::new(runner))
            .with_sink(results.clone())
            .with_pool_size(config.scheduler.pool_size);

        let state = Arc::new(AppState::new(config, Arc::new(uploader), results));
        let router = create_router(state.clone());

        Self {
            router,
            state,
            platform,
            fetcher,
            temp_dir,
        }
    }

    /// Serve a small JPEG body at `url`.
    pub async fn serve_image(&self, url: &str) {
        self.fetcher
            .set_body(url, fixtures::JPEG_BYTES.to_vec())
            .await;
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// GET returning the raw body text (for non-JSON endpoints).
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// A JSON row marked for upload on the fixture platform.
pub fn fixture_row(topic: &str, media: &str) -> Value {
    serde_json::json!({
        "Topic": topic,
        "Country": "GB",
        "Title": "Find Deals",
        "Body": "Compare offers near you.",
        "Query": topic,
        "Media": media,
        "Upload": "yes",
        "Platform": fixtures::PLATFORM_KEY,
    })
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
