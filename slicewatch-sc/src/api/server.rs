//! HTTP server setup and routing
//!
//! Axum router over the status, command, and SSE endpoints. Command
//! endpoints accept both GET and POST so they stay usable from a
//! browser address bar.

use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::scan::ScanContext;
use crate::scheduler::Scheduler;
use crate::state::SharedState;

/// Shared application context passed to all handlers
///
/// AppContext implements Clone, which gives us `FromRef<AppContext>`
/// for free via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub scan: Arc<ScanContext>,
    pub scheduler: Arc<Scheduler>,
}

/// Build the full application router.
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Dashboard status surface
        .route("/api/status", get(super::handlers::status))
        .route("/api/activity_feed", get(super::handlers::activity_feed))
        // Command surface
        .route(
            "/api/trigger_scan",
            get(super::handlers::trigger_scan).post(super::handlers::trigger_scan),
        )
        .route(
            "/api/start_scanner",
            get(super::handlers::start_scanner).post(super::handlers::start_scanner),
        )
        .route(
            "/api/stop_scanner",
            get(super::handlers::stop_scanner).post(super::handlers::stop_scanner),
        )
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP server until the shutdown future resolves.
pub async fn run(
    port: u16,
    ctx: AppContext,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
