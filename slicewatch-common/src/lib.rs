//! # Slicewatch Common Library
//!
//! Shared code for the slicewatch services including:
//! - Venue sample and time-bucket data model
//! - Event types (SliceEvent enum)
//! - Field validation for scraped records
//! - Wall-clock helpers (scan scheduling, target slot rule)

pub mod error;
pub mod events;
pub mod time;
pub mod types;
pub mod validate;

pub use error::ValidationError;
pub use events::SliceEvent;
