//! Scan orchestration
//!
//! One scan cycle walks the venue roster sequentially (with a fixed
//! delay between fetches), validates the samples, persists the hourly
//! snapshot, recomputes both indexes, and runs anomaly detection.
//! Per-venue failures are logged and skipped; failures after the fetch
//! stage abort the cycle and surface to the scheduler.
//!
//! At most one cycle runs at a time. Admission goes through
//! [`SharedState::begin_scan`], whose guard clears the in-flight flag
//! on drop even if the cycle panics.

use chrono::{DateTime, FixedOffset};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use slicewatch_common::events::SliceEvent;
use slicewatch_common::time::{now_local, target_slot, timestamp_hms};
use slicewatch_common::types::{ActivityKind, ActivityLevel, VenueSample, Weekday};
use slicewatch_common::validate;

use crate::anomaly::{self, Detection};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::page::PageSource;
use crate::fetch::VenueFetcher;
use crate::snapshot::{self, RawBucketRow};
use crate::state::SharedState;

/// Pizza index boost applied when an anomaly fires.
const ANOMALY_BOOST: f64 = 1.5;

/// Half-width of the random walk applied when no anomaly fires.
const DRIFT_RANGE: f64 = 0.05;

/// Everything one scan cycle needs, shared between the scheduler and
/// the manual-trigger endpoint.
pub struct ScanContext {
    state: Arc<SharedState>,
    config: Arc<Config>,
    fetcher: VenueFetcher<Arc<dyn PageSource>>,
    rng: Mutex<StdRng>,
}

impl ScanContext {
    pub fn new(state: Arc<SharedState>, config: Arc<Config>, source: Arc<dyn PageSource>) -> Self {
        let rng = match config.drift_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state,
            config,
            fetcher: VenueFetcher::new(source),
            rng: Mutex::new(rng),
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Run one cycle if none is in flight. Returns `Ok(false)` when
    /// another cycle held the guard.
    pub async fn try_scan(self: &Arc<Self>) -> Result<bool> {
        let Some(_guard) = self.state.begin_scan() else {
            return Ok(false);
        };
        self.run_cycle().await?;
        Ok(true)
    }

    /// One full cycle. ScanningComplete fires whether the cycle
    /// succeeds or fails, so SSE clients tracking the started/complete
    /// pair are never left dangling.
    async fn run_cycle(&self) -> Result<()> {
        self.state.broadcast_event(SliceEvent::ScanningStarted);
        let result = self.cycle_inner().await;
        self.state.broadcast_event(SliceEvent::ScanningComplete);
        result
    }

    async fn cycle_inner(&self) -> Result<()> {
        let now = now_local(self.config.offset());
        // The slot is fixed once here; a cycle that crosses an hour
        // boundary mid-fetch still targets the hour it started in.
        let slot = target_slot(now);
        let today = Weekday::from_chrono(chrono::Datelike::weekday(&now));
        self.state
            .log_activity(
                ActivityKind::Scan,
                format!("Starting scan for {} at hour {}", slot.weekday, slot.hour),
                ActivityLevel::Normal,
                timestamp_hms(now),
            )
            .await;

        let venues = self.config.venues();
        let mut samples: Vec<VenueSample> = Vec::with_capacity(venues.len());
        let mut raw_rows: Vec<RawBucketRow> = Vec::new();

        for (i, venue) in venues.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_secs(self.config.fetch_delay_secs)).await;
            }
            let fetch_now = now_local(self.config.offset());
            match self.fetcher.fetch_venue(venue, fetch_now, today, slot).await {
                Ok(outcome) => {
                    let level = if outcome.sample.has_data() {
                        ActivityLevel::Success
                    } else {
                        ActivityLevel::Normal
                    };
                    self.state
                        .log_activity(
                            ActivityKind::Scrape,
                            format!("{}: {}", venue.url, outcome.sample.value),
                            level,
                            timestamp_hms(fetch_now),
                        )
                        .await;
                    let scrape_timestamp = outcome.sample.timestamp.clone();
                    raw_rows.extend(outcome.raw_buckets.into_iter().map(|bucket| RawBucketRow {
                        scrape_timestamp: scrape_timestamp.clone(),
                        venue_url: venue.url.clone(),
                        target_weekday: slot.weekday,
                        target_hour: slot.hour,
                        bucket,
                    }));
                    samples.push(outcome.sample);
                }
                Err(e) => {
                    warn!("Fetch failed for {}: {}", venue.url, e);
                    self.state
                        .log_activity(
                            ActivityKind::Error,
                            format!("Failed to check {}: {}", venue.url, e),
                            ActivityLevel::Warning,
                            timestamp_hms(fetch_now),
                        )
                        .await;
                }
            }
        }

        let samples = validate::batch(samples);
        let path = snapshot::write_samples(&self.config.data_dir, now, &samples)?;
        info!("Wrote {} sample(s) to {}", samples.len(), path.display());
        snapshot::write_raw_buckets(&self.config.data_dir, now, &raw_rows)?;

        self.update_indexes(&samples, now).await?;

        let detection = anomaly::check_latest(&self.config.data_dir, now);
        if detection.is_anomalous() {
            self.apply_anomaly(&detection, now).await?;
        } else {
            self.apply_drift(now).await?;
        }

        let done = now_local(self.config.offset());
        self.state.record_scan(timestamp_hms(done)).await;
        self.state
            .log_activity(
                ActivityKind::Analyze,
                format!("Scan complete: {} venue(s) checked", samples.len()),
                ActivityLevel::Success,
                timestamp_hms(done),
            )
            .await;
        Ok(())
    }

    /// Recompute both indexes from the fresh samples. A category with
    /// no usable data leaves its index where it was.
    async fn update_indexes(
        &self,
        samples: &[VenueSample],
        now: DateTime<FixedOffset>,
    ) -> Result<()> {
        let restaurant: Vec<f64> = samples
            .iter()
            .filter(|s| !s.venue_type.is_bar())
            .filter_map(|s| s.busyness_percent.map(|p| p as f64))
            .collect();
        let bars: Vec<f64> = samples
            .iter()
            .filter(|s| s.venue_type.is_bar())
            .filter_map(|s| s.busyness_percent.map(|p| p as f64))
            .collect();

        if restaurant.is_empty() {
            self.state
                .log_activity(
                    ActivityKind::Pizza,
                    "No restaurant busyness data this hour; pizza index unchanged",
                    ActivityLevel::Normal,
                    timestamp_hms(now),
                )
                .await;
        } else {
            let avg = restaurant.iter().sum::<f64>() / restaurant.len() as f64;
            let new_value = (avg / 10.0).clamp(validate::INDEX_MIN, validate::INDEX_MAX);
            let old = self.state.pizza_index().await;
            self.state
                .update_pizza_index(new_value, change_percent(old, new_value))
                .await?;
            self.state
                .log_activity(
                    ActivityKind::Pizza,
                    format!(
                        "Pizza index updated: {:.2} ({} data point(s))",
                        new_value,
                        restaurant.len()
                    ),
                    ActivityLevel::Normal,
                    timestamp_hms(now),
                )
                .await;
        }

        if bars.is_empty() {
            self.state
                .log_activity(
                    ActivityKind::Bar,
                    "No bar busyness data this hour; bar index unchanged",
                    ActivityLevel::Normal,
                    timestamp_hms(now),
                )
                .await;
        } else {
            let avg = bars.iter().sum::<f64>() / bars.len() as f64;
            // Bars empty means something is up: the index runs inverse
            let new_value = (10.0 - avg / 10.0).clamp(validate::INDEX_MIN, validate::INDEX_MAX);
            let old = self.state.bar_index().await;
            self.state
                .update_bar_index(new_value, change_percent(old, new_value))
                .await?;
            self.state
                .log_activity(
                    ActivityKind::Bar,
                    format!(
                        "Bar index updated: {:.2} ({} data point(s))",
                        new_value,
                        bars.len()
                    ),
                    ActivityLevel::Normal,
                    timestamp_hms(now),
                )
                .await;
        }
        Ok(())
    }

    async fn apply_anomaly(&self, detection: &Detection, now: DateTime<FixedOffset>) -> Result<()> {
        let anomaly_count = self.state.increment_anomalies();
        let (title, message) = describe_anomaly(detection);
        error!("ANOMALY: {} - {}", title, message);

        let current = self.state.pizza_index().await;
        let boosted = (current + ANOMALY_BOOST).min(validate::INDEX_MAX);
        self.state
            .update_pizza_index(boosted, change_percent(current, boosted))
            .await?;

        self.state.broadcast_event(SliceEvent::AnomalyDetected {
            title: title.clone(),
            message: message.clone(),
            timestamp: timestamp_hms(now),
            anomaly_count,
        });
        self.state
            .log_activity(
                ActivityKind::Anomaly,
                format!("{}: {}", title, message),
                ActivityLevel::Critical,
                timestamp_hms(now),
            )
            .await;
        Ok(())
    }

    /// Small random walk on quiet scans so the gauge never looks frozen.
    async fn apply_drift(&self, _now: DateTime<FixedOffset>) -> Result<()> {
        let drift = self.rng.lock().await.gen_range(-DRIFT_RANGE..=DRIFT_RANGE);
        let current = self.state.pizza_index().await;
        let drifted = (current + drift).clamp(validate::INDEX_MIN, validate::INDEX_MAX);
        self.state
            .update_pizza_index(drifted, change_percent(current, drifted))
            .await?;
        Ok(())
    }
}

/// Percent change of `new` relative to `old`; zero when `old` is zero.
fn change_percent(old: f64, new: f64) -> f64 {
    if old > 0.0 {
        (new - old) / old * 100.0
    } else {
        0.0
    }
}

fn describe_anomaly(detection: &Detection) -> (String, String) {
    if !detection.absolute_hits.is_empty() {
        let hits = detection
            .absolute_hits
            .iter()
            .map(|(url, percent)| format!("{} at {}%", url, percent))
            .collect::<Vec<_>>()
            .join(", ");
        (
            "High restaurant activity".to_string(),
            format!(
                "{} restaurant(s) at or above {}%: {}",
                detection.absolute_hits.len(),
                anomaly::ABSOLUTE_THRESHOLD,
                hits
            ),
        )
    } else if let Some((high, low)) = detection.divergence {
        (
            "Restaurant/bar divergence".to_string(),
            format!(
                "Restaurants averaging {:.1}% while bars average {:.1}%",
                high, low
            ),
        )
    } else {
        ("Anomaly".to_string(), "Unclassified anomaly".to_string())
    }
}

/// Kick off a manual scan in the background. Returns `false` (without
/// spawning) when a cycle is already in flight.
pub fn spawn_scan(ctx: &Arc<ScanContext>) -> bool {
    let Some(guard) = ctx.state.begin_scan() else {
        return false;
    };
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = ctx.run_cycle().await {
            error!("Manual scan failed: {}", e);
            let now = now_local(ctx.config.offset());
            ctx.state
                .log_activity(
                    ActivityKind::Error,
                    format!("Scan failed: {}", e),
                    ActivityLevel::Critical,
                    timestamp_hms(now),
                )
                .await;
        }
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_percent_relative_to_old() {
        assert_eq!(change_percent(4.0, 5.0), 25.0);
        assert_eq!(change_percent(5.0, 4.0), -20.0);
    }

    #[test]
    fn change_percent_zero_base_reports_zero() {
        assert_eq!(change_percent(0.0, 7.5), 0.0);
    }

    #[test]
    fn anomaly_description_prefers_absolute_hits() {
        let detection = Detection {
            absolute_hits: vec![("https://maps.app.goo.gl/abc".to_string(), 95)],
            divergence: Some((80.0, 20.0)),
            restaurant_avg: Some(80.0),
            bar_avg: Some(20.0),
        };
        let (title, message) = describe_anomaly(&detection);
        assert_eq!(title, "High restaurant activity");
        assert!(message.contains("95%"));
    }
}
