//! Day-cycle inference over historical time buckets
//!
//! The weekly-pattern display reports up to 7 days of 20 hourly buckets
//! as one flat element sequence. Each day starts at 6 AM, so a fresh
//! cycle begins whenever hour 6 appears while the current cycle already
//! has entries. Cycles are labeled by offset from today: cycle 0 is
//! today, cycle k is today + k days, wrapping the week. That forward
//! enumeration is an assumption about the data source's ordering,
//! reproduced as documented; a conformance run against captured data
//! decides whether it should ever change.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

use slicewatch_common::types::{CycleTag, Meridiem, RawTimeBucket, Weekday};
use slicewatch_common::validate;

/// First reported hour of each day in the weekly pattern.
pub const DAY_START_HOUR: u8 = 6;

/// Most buckets a scrape can carry: 7 days x 20 hours.
pub const MAX_BUCKETS: usize = 140;

/// `at <hour> <AM|PM>` with either a narrow no-break space (U+202F, as
/// the data source emits) or a regular space before the meridiem.
static TIME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"at (\d{1,2})[\u{202f} ](AM|PM)\.?").expect("time label pattern compiles")
});

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)%").expect("percent pattern"));

/// Parse one attribute label into a time bucket.
///
/// Returns None when no `at <hour>` reference can be extracted; the
/// caller logs and skips such labels. An out-of-range percentage is
/// dropped (bucket kept, percent set to None).
pub fn parse_label(element_index: usize, raw: &str) -> Option<RawTimeBucket> {
    let captures = TIME_LABEL.captures(raw)?;
    let hour_12: i64 = captures[1].parse().ok()?;
    let hour_12 = validate::hour_12(hour_12).ok()?;
    let meridiem = validate::meridiem(&captures[2]).ok()?;

    let hour_24 = match meridiem {
        Meridiem::Am => {
            if hour_12 == 12 {
                0
            } else {
                hour_12
            }
        }
        Meridiem::Pm => {
            if hour_12 == 12 {
                12
            } else {
                hour_12 + 12
            }
        }
    };
    // Midnight is displayed as hour 24 of the prior day
    let display_hour = if hour_24 == 0 { 24 } else { hour_24 };

    let busyness_percent = PERCENT
        .captures(raw)
        .and_then(|c| c[1].parse::<i64>().ok())
        .and_then(|p| validate::busyness_percent(p).ok());

    Some(RawTimeBucket {
        element_index,
        hour_24,
        display_hour,
        hour_12,
        meridiem,
        hour_label: format!("{} {}", hour_12, meridiem),
        busyness_percent,
        raw_label: raw.to_string(),
        cycle: None,
    })
}

/// Split a bucket sequence into day cycles.
///
/// A new cycle starts at every bucket with hour 6 once the current
/// cycle is non-empty; the trailing partial cycle is kept.
pub fn split_cycles(buckets: &[RawTimeBucket]) -> Vec<Range<usize>> {
    let mut cycles = Vec::new();
    let mut start = 0;
    for (i, bucket) in buckets.iter().enumerate() {
        if bucket.hour_24 == DAY_START_HOUR && i > start {
            cycles.push(start..i);
            start = i;
        }
    }
    if start < buckets.len() {
        cycles.push(start..buckets.len());
    }
    cycles
}

/// Tag every bucket with its cycle metadata: cycle 0 = `today`,
/// cycle k = today + k days mod 7.
pub fn assign_weekdays(buckets: &mut [RawTimeBucket], today: Weekday) {
    let cycles = split_cycles(buckets);
    for (cycle_index, range) in cycles.into_iter().enumerate() {
        let assigned_weekday = today.offset(cycle_index);

        let mut hours: Vec<u8> = buckets[range.clone()]
            .iter()
            .map(|b| b.display_hour)
            .collect();
        hours.sort_unstable();
        hours.dedup();
        let start_hour = hours.first().copied().unwrap_or(0);
        let end_hour = hours.last().copied().unwrap_or(0);

        debug!(
            "Cycle {} = {} (today + {} days), {} hours",
            cycle_index,
            assigned_weekday,
            cycle_index,
            hours.len()
        );

        for bucket in &mut buckets[range] {
            bucket.cycle = Some(CycleTag {
                cycle_index,
                assigned_weekday,
                day_offset: cycle_index,
                is_today: cycle_index == 0,
                hours_count: hours.len(),
                start_hour,
                end_hour,
            });
        }
    }
}

/// Recover the historical reading for `target_weekday` at display hour
/// `target_hour`. Tags all buckets with cycle metadata as a side
/// effect. None when the target cycle is absent or lacks that hour.
pub fn infer(
    buckets: &mut [RawTimeBucket],
    today: Weekday,
    target_weekday: Weekday,
    target_hour: u8,
) -> Option<RawTimeBucket> {
    assign_weekdays(buckets, today);
    buckets
        .iter()
        .find(|b| {
            b.display_hour == target_hour
                && b.cycle
                    .as_ref()
                    .is_some_and(|tag| tag.assigned_weekday == target_weekday)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(element_index: usize, display_hour: u8, percent: Option<u8>) -> RawTimeBucket {
        let hour_24 = if display_hour == 24 { 0 } else { display_hour };
        let hour_12 = match hour_24 % 12 {
            0 => 12,
            h => h,
        };
        let meridiem = if hour_24 < 12 { Meridiem::Am } else { Meridiem::Pm };
        RawTimeBucket {
            element_index,
            hour_24,
            display_hour,
            hour_12,
            meridiem,
            hour_label: format!("{} {}", hour_12, meridiem),
            busyness_percent: percent,
            raw_label: String::new(),
            cycle: None,
        }
    }

    /// Display hours of one reported day: 6 AM through midnight (24),
    /// then 1 AM. 20 buckets.
    fn day_hours() -> Vec<u8> {
        (6..=24).chain(std::iter::once(1)).collect()
    }

    fn one_day(start_index: usize, percent: Option<u8>) -> Vec<RawTimeBucket> {
        day_hours()
            .into_iter()
            .enumerate()
            .map(|(i, h)| bucket(start_index + i, h, percent))
            .collect()
    }

    #[test]
    fn parse_label_handles_narrow_no_break_space() {
        let b = parse_label(0, "Usually 62% busy at 7\u{202f}PM.").unwrap();
        assert_eq!(b.hour_24, 19);
        assert_eq!(b.display_hour, 19);
        assert_eq!(b.hour_12, 7);
        assert_eq!(b.meridiem, Meridiem::Pm);
        assert_eq!(b.busyness_percent, Some(62));
        assert_eq!(b.hour_label, "7 PM");
    }

    #[test]
    fn parse_label_handles_regular_space_and_midnight() {
        let b = parse_label(3, "Usually 15% busy at 12 AM.").unwrap();
        assert_eq!(b.hour_24, 0);
        assert_eq!(b.display_hour, 24);

        let noon = parse_label(4, "Usually 55% busy at 12 PM.").unwrap();
        assert_eq!(noon.hour_24, 12);
        assert_eq!(noon.display_hour, 12);
    }

    #[test]
    fn parse_label_rejects_labels_without_time() {
        assert!(parse_label(0, "Now: 75% busy").is_none());
        assert!(parse_label(0, "Closed").is_none());
    }

    #[test]
    fn parse_label_rejects_out_of_range_clock_hour() {
        assert!(parse_label(0, "Usually 40% busy at 13 PM.").is_none());
        assert!(parse_label(0, "Usually 40% busy at 0 AM.").is_none());
    }

    #[test]
    fn parse_label_drops_out_of_range_percent() {
        let b = parse_label(0, "Usually 150% busy at 7 PM.").unwrap();
        assert_eq!(b.busyness_percent, None);
    }

    #[test]
    fn forty_buckets_with_hour_six_at_0_and_20_split_into_two_cycles() {
        let mut buckets = one_day(0, Some(40));
        buckets.extend(one_day(20, Some(40)));
        assert_eq!(buckets.len(), 40);
        assert_eq!(buckets[20].hour_24, 6);

        let cycles = split_cycles(&buckets);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], 0..20);
        assert_eq!(cycles[1], 20..40);
    }

    #[test]
    fn trailing_partial_cycle_is_kept() {
        let mut buckets = one_day(0, None);
        buckets.push(bucket(20, 6, None));
        buckets.push(bucket(21, 7, None));
        let cycles = split_cycles(&buckets);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[1], 20..22);
    }

    #[test]
    fn weekday_assignment_enumerates_forward_from_today() {
        let mut buckets = Vec::new();
        for day in 0..3 {
            for (i, h) in [6u8, 12, 18].iter().enumerate() {
                buckets.push(bucket(day * 3 + i, *h, Some(30)));
            }
        }
        assign_weekdays(&mut buckets, Weekday::Friday);

        let tag = |i: usize| buckets[i].cycle.as_ref().unwrap();
        assert_eq!(tag(0).assigned_weekday, Weekday::Friday);
        assert!(tag(0).is_today);
        assert_eq!(tag(3).assigned_weekday, Weekday::Saturday);
        assert_eq!(tag(6).assigned_weekday, Weekday::Sunday);
        assert_eq!(tag(6).day_offset, 2);
    }

    #[test]
    fn infer_finds_target_weekday_and_hour() {
        let mut buckets = one_day(0, Some(40));
        let mut tuesday: Vec<RawTimeBucket> = one_day(20, Some(40))
            .into_iter()
            .map(|mut b| {
                if b.display_hour == 19 {
                    b.busyness_percent = Some(88);
                }
                b
            })
            .collect();
        buckets.append(&mut tuesday);

        // Today is Monday, so cycle 1 is Tuesday
        let hit = infer(&mut buckets, Weekday::Monday, Weekday::Tuesday, 19).unwrap();
        assert_eq!(hit.busyness_percent, Some(88));
        assert_eq!(hit.cycle.as_ref().unwrap().cycle_index, 1);
    }

    #[test]
    fn infer_fails_when_target_cycle_absent() {
        let mut buckets = one_day(0, Some(40));
        // Only today's cycle exists; Wednesday is two days out
        assert!(infer(&mut buckets, Weekday::Monday, Weekday::Wednesday, 12).is_none());
    }

    #[test]
    fn infer_fails_when_hour_missing_from_target_cycle() {
        let mut buckets: Vec<_> = [6u8, 7, 8].iter().map(|h| bucket(0, *h, Some(40))).collect();
        assert!(infer(&mut buckets, Weekday::Monday, Weekday::Monday, 22).is_none());
    }
}
