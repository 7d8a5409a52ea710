//! API integration tests.
//!
//! Requests go through the full router: batch planning, sagas against the
//! mock platform, result recording and the read-only endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{fixture_row, TestFixture, SECRET_TOKEN};

const IMAGE: &str = "https://cdn.test/a.jpg";

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
    assert!(response.body["version"].is_string());
}

#[tokio::test]
async fn test_config_hides_access_token() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    let platform = &response.body["platforms"]["fb api"];
    assert_json_path!(platform, "access_token_configured", json!(true));
    assert_json_path!(platform, "page_id", json!("456"));
    assert!(!response.body.to_string().contains(SECRET_TOKEN));
}

#[tokio::test]
async fn test_batch_runs_and_records_results() {
    let fixture = TestFixture::new();
    fixture.serve_image(IMAGE).await;

    let response = fixture
        .post(
            "/api/v1/batches",
            json!({
                "rows": [
                    fixture_row("Garden Tools", IMAGE),
                    {"Topic": "Ignored", "Upload": "no"},
                    fixture_row("Garden Tools", "https://cdn.test/missing.jpg"),
                ],
                "display_date": "16-10",
            }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "display_date", json!("16-10"));
    assert_json_path!(response.body, "succeeded", json!(1));
    assert_json_path!(response.body, "failed", json!(1));
    let results = response.body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_json_path!(results[0], "row_id", json!(2));
    assert_json_path!(results[0], "status", json!("SUCCESS"));
    assert_json_path!(results[0], "detail", json!("campaign-1"));
    assert_json_path!(results[1], "row_id", json!(4));
    assert_json_path!(results[1], "status", json!("FAILED"));
    assert_json_path!(response.body["skipped"][0], "row_id", json!(3));

    assert_eq!(fixture.platform.campaigns().await.len(), 2);
    assert!(fixture.platform.live_resources().await.len() >= 3);

    let batch_id = response.body["batch_id"].as_str().unwrap().to_string();
    let history = fixture
        .get(&format!("/api/v1/results?batch_id={}", batch_id))
        .await;
    assert_status!(history, StatusCode::OK);
    assert_json_path!(history.body, "total", json!(2));
    assert_json_path!(history.body["results"][0], "row_id", json!(2));
    assert_json_path!(history.body["results"][1], "status", json!("FAILED"));
}

#[tokio::test]
async fn test_batch_with_nothing_marked() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/batches",
            json!({
                "rows": [{"Topic": "Shoes", "Upload": "no"}],
                "display_date": "01/02",
            }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(
        response.body,
        "summary",
        json!("No campaigns to upload for 01-02.")
    );
    assert!(fixture.platform.calls().await.is_empty());

    let history = fixture.get("/api/v1/results").await;
    assert_json_path!(history.body, "total", json!(0));
}

#[tokio::test]
async fn test_batch_rejects_rows_that_are_not_an_array() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/batches", json!({"rows": {"Topic": "Shoes"}}))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_batch_rejects_zero_pool_size() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/batches",
            json!({"rows": [fixture_row("Shoes", IMAGE)], "pool_size": 0}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(fixture.platform.calls().await.is_empty());
}

#[tokio::test]
async fn test_batch_conflicts_while_another_is_running() {
    let fixture = TestFixture::new();
    fixture.serve_image(IMAGE).await;
    let body = json!({"rows": [fixture_row("Shoes", IMAGE)], "display_date": "16-10"});

    let running = fixture.state.try_start_batch().expect("batch slot is free");
    let response = fixture.post("/api/v1/batches", body.clone()).await;

    assert_status!(response, StatusCode::CONFLICT);
    assert_json_path!(response.body, "error", json!("A batch is already running"));
    assert!(fixture.platform.calls().await.is_empty());

    drop(running);
    let response = fixture.post("/api/v1/batches", body).await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_batch_malformed_json() {
    let fixture = TestFixture::new();

    let response = fixture.post_raw("/api/v1/batches", "{not json").await;

    assert!(response.status.is_client_error(), "{:?}", response.status);
}

#[tokio::test]
async fn test_results_limit() {
    let fixture = TestFixture::new();
    fixture.serve_image(IMAGE).await;
    let rows: Vec<_> = (0..3).map(|_| fixture_row("Lamps", IMAGE)).collect();
    let response = fixture
        .post("/api/v1/batches", json!({"rows": rows, "display_date": "16-10"}))
        .await;
    assert_status!(response, StatusCode::OK);

    let page = fixture.get("/api/v1/results?limit=2").await;

    assert_status!(page, StatusCode::OK);
    assert_json_path!(page.body, "total", json!(2));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.get_text("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("uploader_http_requests_total"));
}
