//! Field validation for scraped records and API inputs
//!
//! All validators are pure and stateless: they return the normalized
//! value or a [`ValidationError`] naming the field, the offending value,
//! and the reason. Batch validation drops invalid records and keeps
//! going; it never aborts the batch.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::ValidationError;
use crate::types::{Meridiem, VenueSample};

pub const BUSYNESS_MIN: u8 = 0;
pub const BUSYNESS_MAX: u8 = 100;
pub const INDEX_MIN: f64 = 0.0;
pub const INDEX_MAX: f64 = 10.0;

/// Activity feed messages are truncated to this length after
/// control-character stripping.
pub const MAX_ACTIVITY_MESSAGE_LEN: usize = 500;

/// http(s) absolute-URL shape: scheme, host (domain, localhost, or IPv4),
/// optional port, optional path/query.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
    )
    .expect("URL pattern compiles")
});

/// Validate a busyness percentage carried as an integer.
pub fn busyness_percent(value: i64) -> Result<u8, ValidationError> {
    if (BUSYNESS_MIN as i64..=BUSYNESS_MAX as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::new(
            "busyness_percent",
            value,
            format!("Must be between {} and {}", BUSYNESS_MIN, BUSYNESS_MAX),
        ))
    }
}

/// Validate a busyness percentage carried as text (snapshot read-back,
/// scraped attributes). Empty and "None" mean missing data and pass
/// through as `None`.
pub fn busyness_percent_str(value: Option<&str>) -> Result<Option<u8>, ValidationError> {
    let raw = match value {
        None => return Ok(None),
        Some(s) if s.is_empty() || s == "None" => return Ok(None),
        Some(s) => s,
    };
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::new("busyness_percent", raw, "Cannot convert to integer"))?;
    busyness_percent(parsed).map(Some)
}

/// Validate an hour in 24-hour form. 24 is valid: it is midnight
/// reported as the last hour of the previous day.
pub fn hour_24(value: i64) -> Result<u8, ValidationError> {
    if (0..=24).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::new(
            "hour_24",
            value,
            format!("Must be between 0 and 24, got {}", value),
        ))
    }
}

/// Validate an hour in 12-hour form.
pub fn hour_12(value: i64) -> Result<u8, ValidationError> {
    if (1..=12).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::new(
            "hour_12",
            value,
            format!("Must be between 1 and 12, got {}", value),
        ))
    }
}

pub fn meridiem(value: &str) -> Result<Meridiem, ValidationError> {
    match value {
        "AM" => Ok(Meridiem::Am),
        "PM" => Ok(Meridiem::Pm),
        _ => Err(ValidationError::new(
            "meridiem",
            value,
            "Must be one of [AM, PM]",
        )),
    }
}

/// Validate an http(s) absolute URL.
pub fn url(value: &str) -> Result<&str, ValidationError> {
    if URL_PATTERN.is_match(value) {
        Ok(value)
    } else {
        Err(ValidationError::new("url", value, "Invalid URL format"))
    }
}

/// Validate a composite index value: finite, 0-10, rounded to 2 decimals.
pub fn index_value(value: f64, field: &'static str) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new(field, value, "Must be a finite number"));
    }
    if !(INDEX_MIN..=INDEX_MAX).contains(&value) {
        return Err(ValidationError::new(
            field,
            value,
            format!("Must be between {} and {}", INDEX_MIN, INDEX_MAX),
        ));
    }
    Ok((value * 100.0).round() / 100.0)
}

/// Strip control characters (keeping newline/tab) and truncate.
pub fn sanitize_string(value: &str, max_length: usize) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    let mut out = cleaned.trim().to_string();
    if out.len() > max_length {
        // Truncate at a char boundary
        let mut end = max_length;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
    }
    out
}

/// Sanitize an activity feed message.
pub fn activity_message(message: &str) -> String {
    sanitize_string(message, MAX_ACTIVITY_MESSAGE_LEN)
}

/// Validate a whole venue sample. The enums are already well-typed by
/// construction; this re-checks the fields that cross process
/// boundaries (URL shape, hour range, percent range).
pub fn sample(record: &VenueSample) -> Result<(), ValidationError> {
    url(&record.venue_url)?;
    hour_24(record.hour_24 as i64)?;
    if let Some(percent) = record.busyness_percent {
        busyness_percent(percent as i64)?;
    }
    Ok(())
}

/// Validate a batch of samples: invalid records are dropped and logged,
/// valid ones proceed. The first few errors are reported individually.
pub fn batch(records: Vec<VenueSample>) -> Vec<VenueSample> {
    let mut valid = Vec::with_capacity(records.len());
    let mut errors: Vec<(usize, String, ValidationError)> = Vec::new();

    for (i, record) in records.into_iter().enumerate() {
        match sample(&record) {
            Ok(()) => valid.push(record),
            Err(e) => errors.push((i, record.venue_url.clone(), e)),
        }
    }

    if !errors.is_empty() {
        warn!("Validation errors found in {} records", errors.len());
        for (index, venue_url, error) in errors.iter().take(5) {
            warn!("  Record {} ({}): {}", index, venue_url, error);
        }
        if errors.len() > 5 {
            warn!("  ... and {} more errors", errors.len() - 5);
        }
    }

    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, VenueType, Weekday};

    fn sample_record(url: &str, percent: Option<u8>) -> VenueSample {
        VenueSample {
            venue_url: url.to_string(),
            venue_type: VenueType::Restaurant,
            weekday: Weekday::Monday,
            hour_24: 19,
            hour_label: "7 PM".to_string(),
            timestamp: "2026-08-29T19:00:00-05:00".to_string(),
            value: "Usually 60% busy at 7 PM.".to_string(),
            busyness_percent: percent,
            data_type: DataType::Historical,
        }
    }

    #[test]
    fn busyness_accepts_full_range() {
        assert_eq!(busyness_percent(0).unwrap(), 0);
        assert_eq!(busyness_percent(100).unwrap(), 100);
        assert_eq!(busyness_percent(55).unwrap(), 55);
    }

    #[test]
    fn busyness_rejects_out_of_range() {
        let err = busyness_percent(101).unwrap_err();
        assert_eq!(err.field, "busyness_percent");
        assert_eq!(err.value, "101");
        assert!(busyness_percent(-1).is_err());
    }

    #[test]
    fn busyness_str_passes_missing_through() {
        assert_eq!(busyness_percent_str(None).unwrap(), None);
        assert_eq!(busyness_percent_str(Some("")).unwrap(), None);
        assert_eq!(busyness_percent_str(Some("None")).unwrap(), None);
    }

    #[test]
    fn busyness_str_parses_numeric_strings() {
        assert_eq!(busyness_percent_str(Some("85")).unwrap(), Some(85));
        assert!(busyness_percent_str(Some("105")).is_err());
        assert!(busyness_percent_str(Some("busy")).is_err());
    }

    #[test]
    fn hour_24_allows_midnight_alias() {
        assert_eq!(hour_24(0).unwrap(), 0);
        assert_eq!(hour_24(24).unwrap(), 24);
        assert!(hour_24(25).is_err());
        assert!(hour_24(-1).is_err());
    }

    #[test]
    fn hour_12_is_one_through_twelve() {
        assert_eq!(hour_12(1).unwrap(), 1);
        assert_eq!(hour_12(12).unwrap(), 12);
        assert!(hour_12(0).is_err());
        assert!(hour_12(13).is_err());
        let err = hour_12(0).unwrap_err();
        assert_eq!(err.field, "hour_12");
    }

    #[test]
    fn meridiem_accepts_only_am_pm() {
        assert_eq!(meridiem("AM").unwrap(), Meridiem::Am);
        assert_eq!(meridiem("PM").unwrap(), Meridiem::Pm);
        assert!(meridiem("am").is_err());
        assert!(meridiem("noon").is_err());
    }

    #[test]
    fn url_shapes() {
        assert!(url("https://maps.app.goo.gl/KqSr8hH5GV4ZGJP27").is_ok());
        assert!(url("http://localhost:5760/").is_ok());
        assert!(url("http://192.168.1.10/page").is_ok());
        assert!(url("ftp://example.com").is_err());
        assert!(url("not a url").is_err());
    }

    #[test]
    fn index_value_bounds_and_rounding() {
        assert_eq!(index_value(3.456, "pizza_index").unwrap(), 3.46);
        assert_eq!(index_value(0.0, "pizza_index").unwrap(), 0.0);
        assert_eq!(index_value(10.0, "pizza_index").unwrap(), 10.0);
        assert!(index_value(10.01, "pizza_index").is_err());
        assert!(index_value(-0.1, "pizza_index").is_err());
        assert!(index_value(f64::NAN, "pizza_index").is_err());
    }

    #[test]
    fn sanitize_strips_control_chars_and_truncates() {
        assert_eq!(sanitize_string("ok\u{0}bad\u{7}", 100), "okbad");
        assert_eq!(sanitize_string("  padded  ", 100), "padded");
        assert_eq!(sanitize_string("abcdef", 3), "abc");
    }

    #[test]
    fn batch_drops_invalid_records() {
        let records = vec![
            sample_record("https://maps.app.goo.gl/abc1", Some(50)),
            sample_record("not-a-url", Some(50)),
            sample_record("https://maps.app.goo.gl/abc2", None),
        ];
        let valid = batch(records);
        assert_eq!(valid.len(), 2);
        assert!(valid.iter().all(|r| r.venue_url.starts_with("https://")));
    }
}
