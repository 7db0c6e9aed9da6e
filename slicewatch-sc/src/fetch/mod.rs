//! Venue busyness fetching
//!
//! Produces exactly one [`VenueSample`] per venue per scan, trying
//! signals in priority order: live percentage, live phrase, historical
//! weekly-pattern reading, no data. Live signals reflect the current
//! moment; the historical fallback asks day-cycle inference for the
//! target weekday/hour slot.

pub mod daycycle;
pub mod live;
pub mod page;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use slicewatch_common::time;
use slicewatch_common::types::{DataType, RawTimeBucket, VenueSample, Weekday};

use crate::config::Venue;
use crate::error::Result;
use page::{PageContent, PageSource};

/// The sample plus the raw buckets parsed along the way (for the
/// per-scan diagnostic dump; empty when a live signal won).
#[derive(Debug)]
pub struct FetchOutcome {
    pub sample: VenueSample,
    pub raw_buckets: Vec<RawTimeBucket>,
}

/// Fetches one venue's busyness through an opaque page source.
pub struct VenueFetcher<S: PageSource> {
    source: S,
}

impl<S: PageSource> VenueFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch the venue page and reduce it to one sample for the given
    /// slot. The caller fixes `today` and `slot` once per scan so every
    /// venue in a cycle targets the same weekday/hour even when the
    /// cycle itself crosses an hour boundary.
    pub async fn fetch_venue(
        &self,
        venue: &Venue,
        now: DateTime<FixedOffset>,
        today: Weekday,
        slot: time::TargetSlot,
    ) -> Result<FetchOutcome> {
        debug!(
            "Checking {} ({}) for {} at hour {}",
            venue.url, venue.venue_type, slot.weekday, slot.hour
        );

        let content = self.source.fetch_page(&venue.url).await?;
        Ok(reduce_page(venue, &content, now, today, slot))
    }
}

/// Pure reduction of fetched page content to a sample. Split out from
/// the async fetch so tests drive it with synthetic content.
pub fn reduce_page(
    venue: &Venue,
    content: &PageContent,
    now: DateTime<FixedOffset>,
    today: Weekday,
    slot: time::TargetSlot,
) -> FetchOutcome {
    let timestamp = now.to_rfc3339();
    let clock_label = now.format("%I:%M %p").to_string();
    let current_label = time::hour_label(slot.current_hour);

    // Step 1: live signals. An explicit right-now percentage supersedes
    // a phrase match.
    let text_hit = live::match_live_text(&content.body_text);
    let percent_hit = live::match_live_percent(&content.busyness_labels);

    if let Some(hit) = percent_hit {
        info!("  Live percentage for {}: {}% busy", venue.url, hit.percent);
        return FetchOutcome {
            sample: VenueSample {
                venue_url: venue.url.clone(),
                venue_type: venue.venue_type,
                weekday: slot.weekday,
                hour_24: slot.current_hour,
                hour_label: current_label,
                timestamp,
                value: format!("{} (LIVE DATA - {})", hit.label, clock_label),
                busyness_percent: Some(hit.percent),
                data_type: DataType::Live,
            },
            raw_buckets: Vec::new(),
        };
    }

    if let Some(indicator) = text_hit {
        info!(
            "  Live text for {}: '{}' (flag: {})",
            venue.url, indicator.phrase, indicator.flag
        );
        return FetchOutcome {
            sample: VenueSample {
                venue_url: venue.url.clone(),
                venue_type: venue.venue_type,
                weekday: slot.weekday,
                hour_24: slot.current_hour,
                hour_label: current_label,
                timestamp,
                value: format!(
                    "Live text indicator: '{}' (LIVE DATA - {})",
                    indicator.phrase, clock_label
                ),
                busyness_percent: Some(indicator.estimated_percent),
                data_type: DataType::Live,
            },
            raw_buckets: Vec::new(),
        };
    }

    // Step 2: no live signal; fall back to the weekly pattern.
    debug!("  No live data for {}, trying historical", venue.url);
    let mut buckets: Vec<RawTimeBucket> = content
        .busyness_labels
        .iter()
        .enumerate()
        .filter_map(|(i, label)| {
            let parsed = daycycle::parse_label(i, label);
            if parsed.is_none() {
                warn!("  Could not extract time from label: '{}'", label);
            }
            parsed
        })
        .take(daycycle::MAX_BUCKETS)
        .collect();

    let hit = daycycle::infer(&mut buckets, today, slot.weekday, slot.hour);

    let sample = match hit {
        Some(bucket) => {
            let cycle_index = bucket.cycle.as_ref().map(|t| t.cycle_index).unwrap_or(0);
            info!(
                "  Historical reading for {}: {:?}% at {}",
                venue.url, bucket.busyness_percent, bucket.hour_label
            );
            VenueSample {
                venue_url: venue.url.clone(),
                venue_type: venue.venue_type,
                weekday: slot.weekday,
                hour_24: slot.current_hour,
                hour_label: bucket.hour_label.clone(),
                timestamp,
                value: format!("{} (HISTORICAL - Cycle {})", bucket.raw_label, cycle_index),
                busyness_percent: bucket.busyness_percent,
                data_type: DataType::Historical,
            }
        }
        None => {
            info!(
                "  No data for {} ({} at hour {})",
                venue.url, slot.weekday, slot.hour
            );
            VenueSample {
                venue_url: venue.url.clone(),
                venue_type: venue.venue_type,
                weekday: slot.weekday,
                hour_24: slot.current_hour,
                hour_label: current_label,
                timestamp,
                value: format!(
                    "No data available for {} at hour {}",
                    slot.weekday, slot.hour
                ),
                busyness_percent: None,
                data_type: DataType::NoData,
            }
        }
    };

    FetchOutcome {
        sample,
        raw_buckets: buckets,
    }
}
