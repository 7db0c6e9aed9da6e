//! slicewatch-sc - Scan daemon for the SliceWatch dashboard
//!
//! Periodically samples venue busyness, derives the pizza and bar
//! indexes, persists hourly snapshots, and serves dashboard state over
//! REST and SSE.

pub mod anomaly;
pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod scan;
pub mod scheduler;
pub mod snapshot;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::SharedState;
