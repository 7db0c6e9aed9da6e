//! slicewatch-sc - Main entry point
//!
//! Loads configuration, wires the shared state, scan context, and
//! scheduler together, starts automatic scanning, and serves the HTTP
//! surface until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slicewatch_common::time::{now_local, timestamp_hms};
use slicewatch_common::types::{ActivityKind, ActivityLevel};
use slicewatch_sc::api::server::{self, AppContext};
use slicewatch_sc::fetch::page::{HttpPageSource, PageSource};
use slicewatch_sc::scan::ScanContext;
use slicewatch_sc::scheduler::Scheduler;
use slicewatch_sc::{Config, SharedState};

/// Command-line arguments for slicewatch-sc
#[derive(Parser, Debug)]
#[command(name = "slicewatch-sc")]
#[command(about = "Venue scan daemon for the SliceWatch dashboard")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SLICEWATCH_PORT")]
    port: Option<u16>,

    /// Directory for snapshot files
    #[arg(short, long, env = "SLICEWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "SLICEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Do not start automatic scanning at launch
    #[arg(long)]
    no_autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slicewatch_sc=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    let config = Arc::new(config);

    info!(
        "Starting SliceWatch scan daemon v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.port
    );
    info!("Data directory: {}", config.data_dir.display());

    let venues = config.venues();
    info!("Monitoring {} venue(s)", venues.len());

    let state = Arc::new(SharedState::new(venues.len()));
    let source: Arc<dyn PageSource> = Arc::new(
        HttpPageSource::new(Duration::from_secs(config.page_timeout_secs))
            .context("Failed to build HTTP page source")?,
    );
    let scan = Arc::new(ScanContext::new(
        Arc::clone(&state),
        Arc::clone(&config),
        source,
    ));
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&scan)));

    let now = now_local(config.offset());
    state
        .log_activity(
            ActivityKind::Init,
            "SliceWatch scan daemon starting...",
            ActivityLevel::Normal,
            timestamp_hms(now),
        )
        .await;

    if args.no_autostart {
        info!("Automatic scanning disabled at launch (--no-autostart)");
    } else {
        scheduler.start().await;
    }

    let ctx = AppContext {
        state: Arc::clone(&state),
        scan,
        scheduler: Arc::clone(&scheduler),
    };

    server::run(config.port, ctx, shutdown_signal()).await?;

    // Stop the timer task so a mid-sleep loop does not outlive the
    // server during shutdown.
    scheduler.stop().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
