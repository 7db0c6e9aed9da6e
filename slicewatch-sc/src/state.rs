//! Shared dashboard state
//!
//! Thread-safe process-wide state shared by the scheduler task, manual
//! scan tasks, and the HTTP/SSE layer. All mutation goes through the
//! methods here; nothing exposes a raw mutable field.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use slicewatch_common::events::SliceEvent;
use slicewatch_common::types::{ActivityItem, ActivityKind, ActivityLevel};
use slicewatch_common::validate;
use slicewatch_common::ValidationError;

/// The activity feed keeps at most this many entries, newest first.
pub const MAX_ACTIVITY_ITEMS: usize = 10;

/// Starting pizza index before the first scan lands.
pub const INITIAL_PIZZA_INDEX: f64 = 3.42;

/// Starting bar index; the inverse gauge starts high.
pub const INITIAL_BAR_INDEX: f64 = 6.58;

/// Shared state accessible by all components
///
/// Index values use RwLock for concurrent reads with rare writes;
/// counters and the two in-flight flags are atomics.
pub struct SharedState {
    /// Pizza index, 0-10
    pizza_index: RwLock<f64>,

    /// Bar index, 0-10 (inverse of bar busyness)
    bar_index: RwLock<f64>,

    /// Bounded activity feed, newest first
    activity_feed: RwLock<VecDeque<ActivityItem>>,

    /// Completed scans since startup
    scan_count: AtomicU64,

    /// Anomalies detected since startup
    anomaly_count: AtomicU64,

    /// HH:MM:SS of the last completed scan
    last_scan_time: RwLock<Option<String>>,

    /// Scan-in-flight guard; flipped only by compare-and-swap
    scanning: AtomicBool,

    /// Whether the hourly scheduler loop is running
    scanner_running: AtomicBool,

    /// Number of monitored venues (fixed at startup from the roster)
    active_locations: usize,

    /// Event broadcaster for SSE events
    event_tx: broadcast::Sender<SliceEvent>,
}

impl SharedState {
    pub fn new(active_locations: usize) -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            pizza_index: RwLock::new(INITIAL_PIZZA_INDEX),
            bar_index: RwLock::new(INITIAL_BAR_INDEX),
            activity_feed: RwLock::new(VecDeque::with_capacity(MAX_ACTIVITY_ITEMS)),
            scan_count: AtomicU64::new(0),
            anomaly_count: AtomicU64::new(0),
            last_scan_time: RwLock::new(None),
            scanning: AtomicBool::new(false),
            scanner_running: AtomicBool::new(false),
            active_locations,
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: SliceEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<SliceEvent> {
        self.event_tx.subscribe()
    }

    pub async fn pizza_index(&self) -> f64 {
        *self.pizza_index.read().await
    }

    pub async fn bar_index(&self) -> f64 {
        *self.bar_index.read().await
    }

    /// Validate and set the pizza index, broadcasting the update.
    pub async fn update_pizza_index(
        &self,
        new_value: f64,
        change_percent: f64,
    ) -> Result<(), ValidationError> {
        let validated = validate::index_value(new_value, "pizza_index")?;
        let mut guard = self.pizza_index.write().await;
        let old_value = *guard;
        *guard = validated;
        drop(guard);
        self.broadcast_event(SliceEvent::PizzaIndexUpdated {
            value: validated,
            change: (change_percent * 100.0).round() / 100.0,
            old_value,
        });
        Ok(())
    }

    /// Validate and set the bar index, broadcasting the update.
    pub async fn update_bar_index(
        &self,
        new_value: f64,
        change_percent: f64,
    ) -> Result<(), ValidationError> {
        let validated = validate::index_value(new_value, "bar_index")?;
        let mut guard = self.bar_index.write().await;
        let old_value = *guard;
        *guard = validated;
        drop(guard);
        self.broadcast_event(SliceEvent::BarIndexUpdated {
            value: validated,
            change: (change_percent * 100.0).round() / 100.0,
            old_value,
        });
        Ok(())
    }

    /// Append to the activity feed (evicting the oldest entry past the
    /// cap), broadcast it, and log it.
    pub async fn log_activity(
        &self,
        kind: ActivityKind,
        message: impl AsRef<str>,
        level: ActivityLevel,
        timestamp_hms: String,
    ) {
        let item = ActivityItem {
            kind,
            message: validate::activity_message(message.as_ref()),
            level,
            timestamp: timestamp_hms,
        };

        {
            let mut feed = self.activity_feed.write().await;
            feed.push_front(item.clone());
            feed.truncate(MAX_ACTIVITY_ITEMS);
        }

        info!("[{}] {:?}: {}", item.timestamp, item.kind, item.message);
        self.broadcast_event(SliceEvent::ActivityUpdate(item));
    }

    /// Activity feed contents, newest first.
    pub async fn activity_feed(&self) -> Vec<ActivityItem> {
        self.activity_feed.read().await.iter().cloned().collect()
    }

    /// Record a completed scan and broadcast the new stats.
    pub async fn record_scan(&self, timestamp_hms: String) {
        let scan_count = self.scan_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_scan_time.write().await = Some(timestamp_hms.clone());
        self.broadcast_event(SliceEvent::ScanStatsUpdated {
            scan_count,
            last_scan_time: timestamp_hms,
        });
    }

    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    pub fn increment_anomalies(&self) -> u64 {
        self.anomaly_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn anomaly_count(&self) -> u64 {
        self.anomaly_count.load(Ordering::Relaxed)
    }

    pub async fn last_scan_time(&self) -> Option<String> {
        self.last_scan_time.read().await.clone()
    }

    /// Acquire the scan-in-flight guard. Returns None when a scan is
    /// already running. Uses compare-and-swap so two concurrent
    /// triggers cannot both pass the check.
    pub fn begin_scan(self: &Arc<Self>) -> Option<ScanGuard> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(ScanGuard {
                state: Arc::clone(self),
            })
        } else {
            None
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Flip the scheduler-running flag to `desired`; false if already
    /// in that state.
    pub fn try_set_scanner_running(&self, desired: bool) -> bool {
        self.scanning_flag_swap(desired)
    }

    fn scanning_flag_swap(&self, desired: bool) -> bool {
        self.scanner_running
            .compare_exchange(!desired, desired, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn scanner_running(&self) -> bool {
        self.scanner_running.load(Ordering::Acquire)
    }

    pub fn active_locations(&self) -> usize {
        self.active_locations
    }
}

/// RAII guard for the at-most-one-scan-in-flight invariant. Clears the
/// flag on drop, so an early return or panic inside a scan cannot leave
/// the guard stuck.
pub struct ScanGuard {
    state: Arc<SharedState>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.state.scanning.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn activity_feed_caps_at_ten_newest_first() {
        let state = SharedState::new(0);
        for i in 0..15 {
            state
                .log_activity(
                    ActivityKind::System,
                    format!("message {}", i),
                    ActivityLevel::Normal,
                    "12:00:00".to_string(),
                )
                .await;
        }
        let feed = state.activity_feed().await;
        assert_eq!(feed.len(), MAX_ACTIVITY_ITEMS);
        // Newest first; the oldest five were evicted from the tail
        assert_eq!(feed[0].message, "message 14");
        assert_eq!(feed[9].message, "message 5");
    }

    #[tokio::test]
    async fn index_updates_validate_range() {
        let state = SharedState::new(0);
        state.update_pizza_index(4.237, 1.0).await.unwrap();
        assert_eq!(state.pizza_index().await, 4.24);

        assert!(state.update_pizza_index(10.5, 0.0).await.is_err());
        // Failed update leaves the value untouched
        assert_eq!(state.pizza_index().await, 4.24);
    }

    #[tokio::test]
    async fn scan_guard_is_exclusive_and_releases_on_drop() {
        let state = Arc::new(SharedState::new(0));
        let guard = state.begin_scan().expect("first acquire succeeds");
        assert!(state.is_scanning());
        assert!(state.begin_scan().is_none());
        drop(guard);
        assert!(!state.is_scanning());
        assert!(state.begin_scan().is_some());
    }

    #[tokio::test]
    async fn scanner_running_flag_rejects_repeat_transitions() {
        let state = SharedState::new(0);
        assert!(state.try_set_scanner_running(true));
        assert!(!state.try_set_scanner_running(true));
        assert!(state.try_set_scanner_running(false));
        assert!(!state.try_set_scanner_running(false));
    }

    #[tokio::test]
    async fn index_update_broadcasts_event() {
        let state = SharedState::new(0);
        let mut rx = state.subscribe_events();
        state.update_bar_index(5.0, 0.0).await.unwrap();
        match rx.recv().await.unwrap() {
            SliceEvent::BarIndexUpdated { value, old_value, .. } => {
                assert_eq!(value, 5.0);
                assert_eq!(old_value, INITIAL_BAR_INDEX);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
