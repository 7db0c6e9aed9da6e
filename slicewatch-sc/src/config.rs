//! slicewatch-sc configuration
//!
//! Compiled defaults, optionally overridden by a TOML file, with the
//! port and data directory overridable again from the command line
//! (CLI > file > default).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use chrono::FixedOffset;
use slicewatch_common::time::fixed_offset;
use slicewatch_common::types::VenueType;
use slicewatch_common::validate;

use crate::error::{Error, Result};

/// One entry of the monitored venue roster.
#[derive(Debug, Clone)]
pub struct Venue {
    pub url: String,
    pub venue_type: VenueType,
}

/// Scan daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind port
    pub port: u16,
    /// Directory for snapshot and diagnostic files
    pub data_dir: PathBuf,
    /// Venue-local wall clock as whole hours east of UTC
    pub utc_offset_hours: i32,
    /// Monitored restaurants (pizza index)
    pub restaurant_urls: Vec<String>,
    /// Monitored gay bars (bar index)
    pub gay_bar_urls: Vec<String>,
    /// Monitored sports bars (bar index, same weight)
    pub sports_bar_urls: Vec<String>,
    /// Fixed delay between venue fetches, to avoid bot defenses
    pub fetch_delay_secs: u64,
    /// Buffer past the top of the hour before a scheduled scan
    pub hour_buffer_secs: u64,
    /// Cooldown after a whole scan cycle fails
    pub retry_cooldown_secs: u64,
    /// Per-page fetch timeout
    pub page_timeout_secs: u64,
    /// Fixed seed for the index drift; None seeds from entropy
    pub drift_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5760,
            data_dir: PathBuf::from("data"),
            utc_offset_hours: -5,
            restaurant_urls: Vec::new(),
            gay_bar_urls: Vec::new(),
            sports_bar_urls: Vec::new(),
            fetch_delay_secs: 2,
            hour_buffer_secs: 30,
            retry_cooldown_secs: 300,
            page_timeout_secs: 60,
            drift_seed: None,
        }
    }
}

/// On-disk TOML shape; every field optional over the compiled defaults.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    utc_offset_hours: Option<i32>,
    restaurant_urls: Option<Vec<String>>,
    gay_bar_urls: Option<Vec<String>>,
    sports_bar_urls: Option<Vec<String>>,
    fetch_delay_secs: Option<u64>,
    hour_buffer_secs: Option<u64>,
    retry_cooldown_secs: Option<u64>,
    page_timeout_secs: Option<u64>,
    drift_seed: Option<u64>,
}

impl Config {
    /// Load configuration, merging a TOML file (if given) over defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();
        if let Some(path) = path {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Cannot read {}: {}", path.display(), e))
            })?;
            let file: FileConfig = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))?;
            config.apply(file);
        }
        Ok(config)
    }

    fn apply(&mut self, file: FileConfig) {
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.utc_offset_hours {
            self.utc_offset_hours = v;
        }
        if let Some(v) = file.restaurant_urls {
            self.restaurant_urls = v;
        }
        if let Some(v) = file.gay_bar_urls {
            self.gay_bar_urls = v;
        }
        if let Some(v) = file.sports_bar_urls {
            self.sports_bar_urls = v;
        }
        if let Some(v) = file.fetch_delay_secs {
            self.fetch_delay_secs = v;
        }
        if let Some(v) = file.hour_buffer_secs {
            self.hour_buffer_secs = v;
        }
        if let Some(v) = file.retry_cooldown_secs {
            self.retry_cooldown_secs = v;
        }
        if let Some(v) = file.page_timeout_secs {
            self.page_timeout_secs = v;
        }
        if let Some(v) = file.drift_seed {
            self.drift_seed = Some(v);
        }
    }

    /// Venue-local fixed UTC offset.
    pub fn offset(&self) -> FixedOffset {
        fixed_offset(self.utc_offset_hours)
    }

    /// The validated venue roster, in fetch order (restaurants, then
    /// gay bars, then sports bars). Invalid URLs are logged and skipped.
    pub fn venues(&self) -> Vec<Venue> {
        let groups = [
            (&self.restaurant_urls, VenueType::Restaurant),
            (&self.gay_bar_urls, VenueType::GayBar),
            (&self.sports_bar_urls, VenueType::SportsBar),
        ];
        let mut venues = Vec::new();
        for (urls, venue_type) in groups {
            for url in urls {
                match validate::url(url) {
                    Ok(_) => venues.push(Venue {
                        url: url.clone(),
                        venue_type,
                    }),
                    Err(e) => warn!("Skipping invalid {} URL: {}", venue_type, e),
                }
            }
        }
        venues
    }

    /// Number of venues the roster actually monitors.
    pub fn active_locations(&self) -> usize {
        self.venues().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_no_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.port, 5760);
        assert_eq!(config.fetch_delay_secs, 2);
        assert_eq!(config.retry_cooldown_secs, 300);
        assert_eq!(config.utc_offset_hours, -5);
    }

    #[test]
    fn file_overrides_merge_over_defaults() {
        let mut config = Config::default();
        let file: FileConfig = toml::from_str(
            r#"
            port = 6003
            restaurant_urls = ["https://maps.app.goo.gl/abc"]
            drift_seed = 42
            "#,
        )
        .unwrap();
        config.apply(file);
        assert_eq!(config.port, 6003);
        assert_eq!(config.restaurant_urls.len(), 1);
        assert_eq!(config.drift_seed, Some(42));
        // Untouched fields keep defaults
        assert_eq!(config.hour_buffer_secs, 30);
    }

    #[test]
    fn venues_skip_invalid_urls() {
        let config = Config {
            restaurant_urls: vec![
                "https://maps.app.goo.gl/abc".to_string(),
                "not-a-url".to_string(),
            ],
            gay_bar_urls: vec!["https://maps.app.goo.gl/bar".to_string()],
            ..Config::default()
        };
        let venues = config.venues();
        assert_eq!(venues.len(), 2);
        assert_eq!(venues[0].venue_type, VenueType::Restaurant);
        assert_eq!(venues[1].venue_type, VenueType::GayBar);
        assert_eq!(config.active_locations(), 2);
    }
}
