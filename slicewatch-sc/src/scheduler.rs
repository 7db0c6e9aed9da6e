//! Hourly scan scheduler
//!
//! A cooperative timer task that runs one scan immediately on start,
//! then waits until shortly past each top of the hour. The wait is
//! interruptible: stop requests go over a watch channel and take effect
//! at the next await point rather than waiting out the hour. A failed
//! cycle does not kill the loop; it backs off for the configured
//! cooldown and tries again.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use slicewatch_common::events::SliceEvent;
use slicewatch_common::time::{now_local, timestamp_hms, until_next_hour};
use slicewatch_common::types::{ActivityKind, ActivityLevel};

use crate::scan::ScanContext;

/// Longest the loop will ever sleep between cycles.
const MAX_SLEEP: Duration = Duration::from_secs(3600);

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the timer task. Start and stop are serialized through a mutex
/// so concurrent commands cannot race two loops into existence.
pub struct Scheduler {
    ctx: Arc<ScanContext>,
    running: Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(ctx: Arc<ScanContext>) -> Self {
        Self {
            ctx,
            running: Mutex::new(None),
        }
    }

    /// Start the scan loop. Returns false when it is already running.
    pub async fn start(&self) -> bool {
        let mut slot = self.running.lock().await;
        let state = self.ctx.state();
        if slot.is_some() || !state.try_set_scanner_running(true) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(Arc::clone(&self.ctx), stop_rx));
        *slot = Some(Running { stop_tx, handle });

        let now = now_local(self.ctx.config().offset());
        state.broadcast_event(SliceEvent::ScannerStateChanged { running: true });
        state
            .log_activity(
                ActivityKind::System,
                "Automatic scanning started",
                ActivityLevel::Success,
                timestamp_hms(now),
            )
            .await;
        info!("Scheduler started");
        true
    }

    /// Stop the scan loop. Returns false when it was not running.
    /// A cycle already in flight finishes; the loop exits at its next
    /// await point instead of sleeping out the hour.
    pub async fn stop(&self) -> bool {
        let mut slot = self.running.lock().await;
        let Some(running) = slot.take() else {
            return false;
        };
        if running.stop_tx.send(true).is_err() {
            warn!("Scheduler task already gone at stop");
        }
        drop(running.handle);

        let state = self.ctx.state();
        state.try_set_scanner_running(false);
        let now = now_local(self.ctx.config().offset());
        state.broadcast_event(SliceEvent::ScannerStateChanged { running: false });
        state
            .log_activity(
                ActivityKind::System,
                "Automatic scanning stopped",
                ActivityLevel::Warning,
                timestamp_hms(now),
            )
            .await;
        info!("Scheduler stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.ctx.state().scanner_running()
    }
}

/// The timer loop itself: scan, then wait for the next slot or a stop.
async fn run_loop(ctx: Arc<ScanContext>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let wait = match ctx.try_scan().await {
            Ok(true) => next_wait(&ctx),
            Ok(false) => {
                // A manual scan holds the guard; retry on the next slot.
                info!("Scheduled scan skipped; a scan is already in flight");
                next_wait(&ctx)
            }
            Err(e) => {
                error!("Scan cycle failed: {}", e);
                let now = now_local(ctx.config().offset());
                ctx.state()
                    .log_activity(
                        ActivityKind::Error,
                        format!("Scan cycle failed, retrying in {} seconds: {}",
                            ctx.config().retry_cooldown_secs, e),
                        ActivityLevel::Critical,
                        timestamp_hms(now),
                    )
                    .await;
                Duration::from_secs(ctx.config().retry_cooldown_secs)
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
    info!("Scheduler loop exited");
}

/// Sleep until shortly past the next top of the hour, capped at an hour.
fn next_wait(ctx: &Arc<ScanContext>) -> Duration {
    let now = now_local(ctx.config().offset());
    let until = until_next_hour(now) + Duration::from_secs(ctx.config().hour_buffer_secs);
    until.min(MAX_SLEEP)
}
