//! Integration tests for the HTTP surface
//!
//! Exercises routing, status payload shape, and command-endpoint
//! conflict handling against the real router with a canned page source.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use slicewatch_sc::api::server::{build_router, AppContext};
use slicewatch_sc::config::Config;
use slicewatch_sc::error::Result;
use slicewatch_sc::fetch::page::{PageContent, PageSource};
use slicewatch_sc::scan::ScanContext;
use slicewatch_sc::scheduler::Scheduler;
use slicewatch_sc::state::SharedState;

struct EmptyPages;

#[async_trait]
impl PageSource for EmptyPages {
    async fn fetch_page(&self, _url: &str) -> Result<PageContent> {
        Ok(PageContent::default())
    }
}

/// Test helper: build the full app over a temp data directory. The
/// TempDir must outlive the returned context.
fn setup_app(dir: &TempDir) -> (axum::Router, AppContext) {
    let config = Arc::new(Config {
        data_dir: dir.path().to_path_buf(),
        restaurant_urls: vec!["https://maps.app.goo.gl/restA".to_string()],
        fetch_delay_secs: 0,
        drift_seed: Some(1),
        ..Config::default()
    });
    let state = Arc::new(SharedState::new(config.active_locations()));
    let scan = Arc::new(ScanContext::new(
        Arc::clone(&state),
        Arc::clone(&config),
        Arc::new(EmptyPages),
    ));
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&scan)));
    let ctx = AppContext {
        state,
        scan,
        scheduler,
    };
    (build_router(ctx.clone()), ctx)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn health_endpoint_reports_module_and_version() {
    let dir = TempDir::new().unwrap();
    let (app, _ctx) = setup_app(&dir);

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "slicewatch-sc");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn status_returns_full_dashboard_state() {
    let dir = TempDir::new().unwrap();
    let (app, ctx) = setup_app(&dir);
    ctx.state.update_pizza_index(4.2, 0.0).await.unwrap();

    let response = app
        .oneshot(test_request("GET", "/api/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["pizza_index"], 4.2);
    assert_eq!(body["active_locations"], 1);
    assert_eq!(body["scan_count"], 0);
    assert_eq!(body["anomaly_count"], 0);
    assert_eq!(body["scanning"], false);
    assert_eq!(body["scanner_running"], false);
    assert!(body["last_scan_time"].is_null());
    assert!(body["activity_feed"].is_array());
}

#[tokio::test]
async fn activity_feed_endpoint_includes_timestamp() {
    let dir = TempDir::new().unwrap();
    let (app, ctx) = setup_app(&dir);
    ctx.state
        .log_activity(
            slicewatch_common::types::ActivityKind::System,
            "hello",
            slicewatch_common::types::ActivityLevel::Normal,
            "09:00:00".to_string(),
        )
        .await;

    let response = app
        .oneshot(test_request("GET", "/api/activity_feed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["activity_feed"][0]["message"], "hello");
    assert_eq!(body["activity_feed"][0]["type"], "SYSTEM");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn trigger_scan_conflicts_while_one_is_in_flight() {
    let dir = TempDir::new().unwrap();
    let (app, ctx) = setup_app(&dir);

    let _guard = ctx.state.begin_scan().expect("guard available");
    let response = app
        .oneshot(test_request("POST", "/api/trigger_scan"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "scan_already_running");
}

#[tokio::test]
async fn trigger_scan_starts_when_idle() {
    let dir = TempDir::new().unwrap();
    let (app, _ctx) = setup_app(&dir);

    let response = app
        .oneshot(test_request("POST", "/api/trigger_scan"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "scan_triggered");
}

#[tokio::test]
async fn scanner_start_stop_conflicts() {
    let dir = TempDir::new().unwrap();
    let (app, _ctx) = setup_app(&dir);

    // Stop before ever starting
    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/stop_scanner"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "scanner_not_running");

    // First start succeeds
    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/start_scanner"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Second start conflicts
    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/start_scanner"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "scanner_already_running");

    // Stop succeeds once
    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/stop_scanner"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "scanner_stopped");
}

#[tokio::test]
async fn command_endpoints_also_accept_get() {
    let dir = TempDir::new().unwrap();
    let (app, _ctx) = setup_app(&dir);

    let response = app
        .oneshot(test_request("GET", "/api/trigger_scan"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
