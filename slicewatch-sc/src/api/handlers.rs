//! HTTP request handlers
//!
//! Status endpoints return current dashboard state; command endpoints
//! answer 409 with a machine-readable status string when the requested
//! transition conflicts with the current one.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use slicewatch_common::time::now_local;
use slicewatch_common::types::ActivityItem;

use crate::api::server::AppContext;
use crate::scan;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

/// Command outcome, also used as the 409 conflict body.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    status: String,
    message: String,
}

impl CommandResponse {
    fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardStatus {
    pizza_index: f64,
    gay_bar_index: f64,
    active_locations: usize,
    scan_count: u64,
    anomaly_count: u64,
    last_scan_time: Option<String>,
    scanning: bool,
    scanner_running: bool,
    activity_feed: Vec<ActivityItem>,
}

#[derive(Debug, Serialize)]
pub struct ActivityFeedResponse {
    activity_feed: Vec<ActivityItem>,
    timestamp: String,
}

// ============================================================================
// Status Endpoints
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "slicewatch-sc".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/status - Full dashboard state in one response
pub async fn status(State(ctx): State<AppContext>) -> Json<DashboardStatus> {
    Json(DashboardStatus {
        pizza_index: ctx.state.pizza_index().await,
        gay_bar_index: ctx.state.bar_index().await,
        active_locations: ctx.state.active_locations(),
        scan_count: ctx.state.scan_count(),
        anomaly_count: ctx.state.anomaly_count(),
        last_scan_time: ctx.state.last_scan_time().await,
        scanning: ctx.state.is_scanning(),
        scanner_running: ctx.state.scanner_running(),
        activity_feed: ctx.state.activity_feed().await,
    })
}

/// GET /api/activity_feed - Activity feed with a server timestamp
pub async fn activity_feed(State(ctx): State<AppContext>) -> Json<ActivityFeedResponse> {
    Json(ActivityFeedResponse {
        activity_feed: ctx.state.activity_feed().await,
        timestamp: now_local(ctx.scan.config().offset()).to_rfc3339(),
    })
}

// ============================================================================
// Command Endpoints
// ============================================================================

/// GET|POST /api/trigger_scan - Start a manual scan in the background
pub async fn trigger_scan(
    State(ctx): State<AppContext>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<CommandResponse>)> {
    if scan::spawn_scan(&ctx.scan) {
        info!("Manual scan triggered");
        Ok(Json(CommandResponse::new(
            "scan_triggered",
            "Manual scan started",
        )))
    } else {
        Err((
            StatusCode::CONFLICT,
            Json(CommandResponse::new(
                "scan_already_running",
                "A scan is already in progress",
            )),
        ))
    }
}

/// GET|POST /api/start_scanner - Start the hourly scheduler
pub async fn start_scanner(
    State(ctx): State<AppContext>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<CommandResponse>)> {
    if ctx.scheduler.start().await {
        Ok(Json(CommandResponse::new(
            "scanner_started",
            "Automated scanner started successfully",
        )))
    } else {
        Err((
            StatusCode::CONFLICT,
            Json(CommandResponse::new(
                "scanner_already_running",
                "Scanner is already running",
            )),
        ))
    }
}

/// GET|POST /api/stop_scanner - Stop the hourly scheduler
pub async fn stop_scanner(
    State(ctx): State<AppContext>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<CommandResponse>)> {
    if ctx.scheduler.stop().await {
        Ok(Json(CommandResponse::new(
            "scanner_stopped",
            "Automated scanner stopped successfully",
        )))
    } else {
        Err((
            StatusCode::CONFLICT,
            Json(CommandResponse::new(
                "scanner_not_running",
                "Scanner is not running",
            )),
        ))
    }
}
