//! Event types for the slicewatch dashboard
//!
//! Events are broadcast process-wide and serialized for SSE
//! transmission to connected dashboard clients. All state-change
//! notifications use this central enum.

use serde::{Deserialize, Serialize};

use crate::types::ActivityItem;

/// Dashboard event types
///
/// Broadcast after each scan step and on command-surface actions; the
/// SSE layer forwards them verbatim to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SliceEvent {
    /// Pizza index recalculated
    ///
    /// Triggers:
    /// - SSE: Update index gauge
    PizzaIndexUpdated {
        /// New value, 0-10, rounded to 2 decimals
        value: f64,
        /// Percent change relative to the old value
        change: f64,
        /// Value before the update
        old_value: f64,
    },

    /// Bar index recalculated (inverse of bar busyness)
    BarIndexUpdated {
        value: f64,
        change: f64,
        old_value: f64,
    },

    /// New entry appended to the activity feed
    ActivityUpdate(ActivityItem),

    /// Scan statistics changed after a completed scan
    ScanStatsUpdated {
        scan_count: u64,
        /// HH:MM:SS local wall-clock of the last completed scan
        last_scan_time: String,
    },

    /// A scan cycle started
    ScanningStarted,

    /// A scan cycle finished (successfully or not)
    ScanningComplete,

    /// An anomaly fired this scan
    ///
    /// Triggers:
    /// - SSE: Show alert banner
    AnomalyDetected {
        title: String,
        message: String,
        /// HH:MM:SS local wall-clock
        timestamp: String,
        /// Total anomalies since startup
        anomaly_count: u64,
    },

    /// Scheduler started or stopped
    ScannerStateChanged {
        running: bool,
    },
}

impl SliceEvent {
    /// Event type string for the SSE `event:` field.
    pub fn type_str(&self) -> &'static str {
        match self {
            SliceEvent::PizzaIndexUpdated { .. } => "PizzaIndexUpdated",
            SliceEvent::BarIndexUpdated { .. } => "BarIndexUpdated",
            SliceEvent::ActivityUpdate(_) => "ActivityUpdate",
            SliceEvent::ScanStatsUpdated { .. } => "ScanStatsUpdated",
            SliceEvent::ScanningStarted => "ScanningStarted",
            SliceEvent::ScanningComplete => "ScanningComplete",
            SliceEvent::AnomalyDetected { .. } => "AnomalyDetected",
            SliceEvent::ScannerStateChanged { .. } => "ScannerStateChanged",
        }
    }
}
