//! Anomaly detection over the latest snapshot
//!
//! Two independent rules, either of which fires an anomaly:
//! - absolute: any restaurant at or above 90% busyness
//! - divergence: restaurants busy on average (>= 70%) while bars are
//!   empty on average (<= 30%); skipped entirely when no bar has data
//!
//! Detection is a pure function of the sample set. The snapshot-reading
//! wrapper maps any failure to "no anomaly" so a broken file can never
//! abort a scan.

use chrono::{DateTime, FixedOffset};
use std::path::Path;
use tracing::{info, warn};

use slicewatch_common::types::VenueSample;

use crate::snapshot;

/// Any single restaurant at or above this fires the absolute rule.
pub const ABSOLUTE_THRESHOLD: u8 = 90;

/// Restaurants count as "busy" at or above this average.
pub const RESTAURANT_HIGH_THRESHOLD: f64 = 70.0;

/// Bars count as "empty" at or below this average.
pub const BAR_LOW_THRESHOLD: f64 = 30.0;

/// What the detector concluded, with enough detail for activity
/// messages and logging.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Restaurants that tripped the absolute rule: (url, percent)
    pub absolute_hits: Vec<(String, u8)>,
    /// Set when the divergence rule fired: (restaurant avg, bar avg)
    pub divergence: Option<(f64, f64)>,
    pub restaurant_avg: Option<f64>,
    pub bar_avg: Option<f64>,
}

impl Detection {
    /// True when either rule fired.
    pub fn is_anomalous(&self) -> bool {
        !self.absolute_hits.is_empty() || self.divergence.is_some()
    }
}

/// Apply both rules to a snapshot's samples.
pub fn detect(samples: &[VenueSample]) -> Detection {
    let mut detection = Detection::default();

    let restaurant: Vec<(&VenueSample, u8)> = samples
        .iter()
        .filter(|s| !s.venue_type.is_bar())
        .filter_map(|s| s.busyness_percent.map(|p| (s, p)))
        .collect();
    let bars: Vec<u8> = samples
        .iter()
        .filter(|s| s.venue_type.is_bar())
        .filter_map(|s| s.busyness_percent)
        .collect();

    // Rule A: absolute threshold
    for (sample, percent) in &restaurant {
        if *percent >= ABSOLUTE_THRESHOLD {
            detection
                .absolute_hits
                .push((sample.venue_url.clone(), *percent));
        }
    }

    if !restaurant.is_empty() {
        let avg = restaurant.iter().map(|(_, p)| *p as f64).sum::<f64>() / restaurant.len() as f64;
        detection.restaurant_avg = Some(avg);
    }
    if !bars.is_empty() {
        let avg = bars.iter().map(|p| *p as f64).sum::<f64>() / bars.len() as f64;
        detection.bar_avg = Some(avg);
    }

    // Rule B: divergence, only checkable with at least one bar reading
    if let (Some(restaurant_avg), Some(bar_avg)) = (detection.restaurant_avg, detection.bar_avg) {
        if restaurant_avg >= RESTAURANT_HIGH_THRESHOLD && bar_avg <= BAR_LOW_THRESHOLD {
            detection.divergence = Some((restaurant_avg, bar_avg));
        }
    }

    if detection.is_anomalous() {
        if !detection.absolute_hits.is_empty() {
            info!(
                "Absolute threshold alert: {} restaurant(s) at {}%+",
                detection.absolute_hits.len(),
                ABSOLUTE_THRESHOLD
            );
        }
        if let Some((high, low)) = detection.divergence {
            info!(
                "Divergence alert: restaurants busy ({:.1}%) while bars empty ({:.1}%)",
                high, low
            );
        }
    }

    detection
}

/// Load the current-hour snapshot and run detection. Any read failure
/// is logged and reported as "no anomaly"; the scan continues.
pub fn check_latest(data_dir: &Path, now: DateTime<FixedOffset>) -> Detection {
    let path = snapshot::current_hour_path(data_dir, now);
    if !path.exists() {
        warn!("No current hour data file found: {}", path.display());
        return Detection::default();
    }
    match snapshot::read_samples(&path) {
        Ok(samples) => detect(&samples),
        Err(e) => {
            warn!("Anomaly check could not read snapshot: {}", e);
            Detection::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicewatch_common::types::{DataType, VenueType, Weekday};

    fn sample(venue_type: VenueType, percent: Option<u8>) -> VenueSample {
        VenueSample {
            venue_url: format!("https://maps.app.goo.gl/{:?}", percent),
            venue_type,
            weekday: Weekday::Friday,
            hour_24: 19,
            hour_label: "7 PM".to_string(),
            timestamp: "2026-08-28T19:00:00-05:00".to_string(),
            value: String::new(),
            busyness_percent: percent,
            data_type: DataType::Historical,
        }
    }

    #[test]
    fn rule_a_fires_on_single_hot_restaurant() {
        let samples = vec![
            sample(VenueType::Restaurant, Some(95)),
            sample(VenueType::Restaurant, None),
        ];
        let detection = detect(&samples);
        assert!(detection.is_anomalous());
        assert_eq!(detection.absolute_hits.len(), 1);
        assert_eq!(detection.absolute_hits[0].1, 95);
    }

    #[test]
    fn rule_a_does_not_fire_at_89() {
        let samples = vec![
            sample(VenueType::Restaurant, Some(89)),
            sample(VenueType::Restaurant, Some(40)),
            sample(VenueType::GayBar, Some(60)),
        ];
        let detection = detect(&samples);
        assert!(detection.absolute_hits.is_empty());
        assert!(!detection.is_anomalous());
    }

    #[test]
    fn rule_b_fires_on_divergence() {
        let samples = vec![
            sample(VenueType::Restaurant, Some(80)),
            sample(VenueType::Restaurant, Some(80)),
            sample(VenueType::GayBar, Some(20)),
            sample(VenueType::SportsBar, Some(20)),
        ];
        let detection = detect(&samples);
        assert!(detection.is_anomalous());
        let (high, low) = detection.divergence.unwrap();
        assert_eq!(high, 80.0);
        assert_eq!(low, 20.0);
    }

    #[test]
    fn rule_b_skipped_without_bar_data() {
        let samples = vec![
            sample(VenueType::Restaurant, Some(80)),
            sample(VenueType::GayBar, None),
        ];
        let detection = detect(&samples);
        assert!(detection.divergence.is_none());
        assert!(!detection.is_anomalous());
    }

    #[test]
    fn bars_combine_gay_and_sports_with_equal_weight() {
        let samples = vec![
            sample(VenueType::Restaurant, Some(75)),
            sample(VenueType::GayBar, Some(10)),
            sample(VenueType::SportsBar, Some(50)),
        ];
        let detection = detect(&samples);
        assert_eq!(detection.bar_avg, Some(30.0));
        assert!(detection.is_anomalous());
    }

    #[test]
    fn empty_snapshot_is_not_anomalous() {
        let detection = detect(&[]);
        assert!(!detection.is_anomalous());
        assert_eq!(detection.restaurant_avg, None);
    }

    #[test]
    fn missing_snapshot_file_means_no_anomaly() {
        let dir = tempfile::TempDir::new().unwrap();
        let now = slicewatch_common::time::local_datetime(
            slicewatch_common::time::fixed_offset(-5),
            2026,
            8,
            28,
            19,
            0,
            0,
        )
        .unwrap();
        let detection = check_latest(dir.path(), now);
        assert!(!detection.is_anomalous());
    }
}
