//! Common error types for slicewatch

use thiserror::Error;

/// Validation failure for a single scraped or API-supplied field.
///
/// Carries the offending field name, the rejected value (stringified),
/// and a human-readable reason. Batch validation collects these without
/// aborting the batch; the invalid record is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation error for field '{field}': {reason} (value: {value})")]
pub struct ValidationError {
    /// Field that failed validation
    pub field: &'static str,
    /// Offending value, stringified for reporting
    pub value: String,
    /// Why the value was rejected
    pub reason: String,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
