//! Error types for slicewatch-sc
//!
//! Module-specific error types using thiserror. Per-venue and
//! per-record failures stay contained inside a scan; only a whole-cycle
//! failure surfaces, and even that never terminates the process.

use slicewatch_common::ValidationError;
use thiserror::Error;

/// Main error type for the scan daemon
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Per-venue fetch or page-parse failure (venue skipped, scan continues)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Field or record validation failure (record dropped)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Snapshot file format errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Fetch(e.to_string())
    }
}

/// Convenience Result type using slicewatch-sc Error
pub type Result<T> = std::result::Result<T, Error>;
