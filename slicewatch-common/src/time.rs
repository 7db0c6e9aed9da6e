//! Wall-clock helpers
//!
//! The scan pipeline reasons in venue-local time, configured as a fixed
//! UTC offset. Components take the current instant as a parameter so
//! tests control the clock.

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Timelike, Utc};
use std::time::Duration;

use crate::types::Weekday;

/// Build a fixed UTC offset from whole hours, falling back to UTC for
/// out-of-range values.
pub fn fixed_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

/// Current wall-clock time in the configured venue-local offset.
pub fn now_local(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

/// Seconds until the next top of hour.
pub fn until_next_hour(now: DateTime<FixedOffset>) -> Duration {
    let seconds_into_hour = (now.minute() * 60 + now.second()) as u64;
    Duration::from_secs(3600 - seconds_into_hour)
}

/// The weekday/hour slot a scan should look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSlot {
    /// Weekday whose day cycle holds the reading
    pub weekday: Weekday,
    /// Display hour within that cycle, 1-24 (24 = midnight)
    pub hour: u8,
    /// The actual current hour, 0-23; recorded on the produced sample
    pub current_hour: u8,
}

/// Map the current wall-clock to the slot to look up.
///
/// The map service reports midnight as hour 24 of the previous day, so
/// at current hour 0 the target is the previous weekday at hour 24.
pub fn target_slot(now: DateTime<FixedOffset>) -> TargetSlot {
    let weekday = Weekday::from_chrono(now.weekday());
    let current_hour = now.hour() as u8;
    if current_hour == 0 {
        TargetSlot {
            weekday: weekday.previous(),
            hour: 24,
            current_hour,
        }
    } else {
        TargetSlot {
            weekday,
            hour: current_hour,
            current_hour,
        }
    }
}

/// 12-hour display label for a 0-23 hour, e.g. 19 -> "7 PM", 0 -> "12 AM".
pub fn hour_label(hour_24: u8) -> String {
    let hour_12 = match hour_24 % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if hour_24 < 12 { "AM" } else { "PM" };
    format!("{} {}", hour_12, meridiem)
}

/// HH:MM:SS local wall-clock, for activity feed entries.
pub fn timestamp_hms(now: DateTime<FixedOffset>) -> String {
    now.format("%H:%M:%S").to_string()
}

/// Compact stamps used in snapshot file names.
pub fn hour_stamp(now: DateTime<FixedOffset>) -> String {
    now.format("%Y%m%d_%H").to_string()
}

pub fn scan_stamp(now: DateTime<FixedOffset>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Build a local datetime for tests and replays.
pub fn local_datetime(
    offset: FixedOffset,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<FixedOffset>> {
    offset
        .with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
}
