//! Core data model for venue busyness sampling
//!
//! A scan produces exactly one [`VenueSample`] per venue. Samples carry a
//! [`DataType`] recording how the reading was obtained: a live signal, a
//! historical weekly-pattern reading, or nothing. [`RawTimeBucket`]s are
//! the per-element scrape records that feed day-cycle inference and the
//! diagnostic dump file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// English weekday names, Monday-first (matches day-cycle offset math).
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Day of week, Monday-first ordering.
///
/// Day-cycle inference assigns weekdays by offset-from-today arithmetic,
/// so the ordering here is load-bearing: `Monday as usize == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Monday = 0 .. Sunday = 6
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        match index % 7 {
            0 => Weekday::Monday,
            1 => Weekday::Tuesday,
            2 => Weekday::Wednesday,
            3 => Weekday::Thursday,
            4 => Weekday::Friday,
            5 => Weekday::Saturday,
            _ => Weekday::Sunday,
        }
    }

    /// Weekday `days` ahead of `self`, wrapping around the week.
    pub fn offset(self, days: usize) -> Self {
        Self::from_index(self.index() + days)
    }

    /// Previous calendar weekday (used by the midnight target-slot rule).
    pub fn previous(self) -> Self {
        Self::from_index(self.index() + 6)
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        Self::from_index(day.num_days_from_monday() as usize)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(WEEKDAY_NAMES[self.index()])
    }
}

impl FromStr for Weekday {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WEEKDAY_NAMES
            .iter()
            .position(|name| *name == s)
            .map(Weekday::from_index)
            .ok_or_else(|| {
                ValidationError::new("weekday", s, format!("Must be one of {:?}", WEEKDAY_NAMES))
            })
    }
}

/// Venue category; determines which composite index a sample feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueType {
    Restaurant,
    GayBar,
    SportsBar,
}

impl VenueType {
    /// Bars (gay + sports) feed the bar index with equal weight.
    pub fn is_bar(self) -> bool {
        matches!(self, VenueType::GayBar | VenueType::SportsBar)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VenueType::Restaurant => "restaurant",
            VenueType::GayBar => "gay_bar",
            VenueType::SportsBar => "sports_bar",
        }
    }
}

impl fmt::Display for VenueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VenueType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restaurant" => Ok(VenueType::Restaurant),
            "gay_bar" => Ok(VenueType::GayBar),
            "sports_bar" => Ok(VenueType::SportsBar),
            _ => Err(ValidationError::new(
                "venue_type",
                s,
                "Must be one of [restaurant, gay_bar, sports_bar]",
            )),
        }
    }
}

/// How a sample's busyness reading was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// A current-moment signal was found on the page
    Live,
    /// Inferred from the weekly pattern via day-cycle inference
    Historical,
    /// Neither a live nor a historical reading was available
    NoData,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Live => "LIVE",
            DataType::Historical => "HISTORICAL",
            DataType::NoData => "NO_DATA",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIVE" => Ok(DataType::Live),
            "HISTORICAL" => Ok(DataType::Historical),
            "NO_DATA" => Ok(DataType::NoData),
            _ => Err(ValidationError::new(
                "data_type",
                s,
                "Must be one of [LIVE, HISTORICAL, NO_DATA]",
            )),
        }
    }
}

/// AM/PM half of a 12-hour label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn as_str(self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One busyness reading for one venue from one scan.
///
/// `hour_24` ranges 0-24: hour 24 is midnight reported as the last hour
/// of the *previous* calendar day, following the map service's day
/// boundary convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueSample {
    pub venue_url: String,
    pub venue_type: VenueType,
    pub weekday: Weekday,
    pub hour_24: u8,
    /// 12-hour display label, e.g. "7 PM"
    pub hour_label: String,
    /// Scan wall-clock time, RFC 3339
    pub timestamp: String,
    /// Free-text description of the reading (raw label plus provenance)
    pub value: String,
    /// 0-100 when a reading exists
    pub busyness_percent: Option<u8>,
    pub data_type: DataType,
}

impl VenueSample {
    pub fn has_data(&self) -> bool {
        self.busyness_percent.is_some()
    }
}

/// Inferred-cycle metadata attached to a bucket after day-cycle
/// inference ran over its venue's bucket sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTag {
    /// 0-based cycle index within the scrape (cycle 0 = today)
    pub cycle_index: usize,
    pub assigned_weekday: Weekday,
    /// Days ahead of today this cycle is assumed to represent
    pub day_offset: usize,
    pub is_today: bool,
    /// Distinct display hours present in the cycle
    pub hours_count: usize,
    pub start_hour: u8,
    pub end_hour: u8,
}

/// A single scraped (hour, label, percent) tuple, before and after
/// day-cycle assignment. Ephemeral: consumed by inference and dumped to
/// the per-scan diagnostic file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTimeBucket {
    /// Position of the source element in the scraped page
    pub element_index: usize,
    /// 0-23; midnight parses as 0
    pub hour_24: u8,
    /// 1-24; midnight displayed as hour 24 of the prior day
    pub display_hour: u8,
    pub hour_12: u8,
    pub meridiem: Meridiem,
    /// e.g. "7 PM"
    pub hour_label: String,
    pub busyness_percent: Option<u8>,
    /// Raw attribute text the bucket was parsed from
    pub raw_label: String,
    /// Filled in by day-cycle inference
    pub cycle: Option<CycleTag>,
}

/// Category of an activity feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Scan,
    Scrape,
    Analyze,
    Anomaly,
    Error,
    System,
    Init,
    Connect,
    Pizza,
    Bar,
}

/// Severity of an activity feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Normal,
    Success,
    Warning,
    Critical,
}

/// One entry in the bounded activity feed (newest first, max 10 kept).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    pub level: ActivityLevel,
    /// HH:MM:SS local wall-clock
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_offset_wraps_around_week() {
        assert_eq!(Weekday::Monday.offset(0), Weekday::Monday);
        assert_eq!(Weekday::Monday.offset(3), Weekday::Thursday);
        assert_eq!(Weekday::Saturday.offset(2), Weekday::Monday);
        assert_eq!(Weekday::Sunday.offset(7), Weekday::Sunday);
    }

    #[test]
    fn weekday_previous() {
        assert_eq!(Weekday::Monday.previous(), Weekday::Sunday);
        assert_eq!(Weekday::Sunday.previous(), Weekday::Saturday);
    }

    #[test]
    fn weekday_parses_english_names() {
        assert_eq!("Wednesday".parse::<Weekday>().unwrap(), Weekday::Wednesday);
        assert!("wednesday".parse::<Weekday>().is_err());
        assert!("Miercoles".parse::<Weekday>().is_err());
    }

    #[test]
    fn venue_type_serde_uses_snake_case() {
        let json = serde_json::to_string(&VenueType::GayBar).unwrap();
        assert_eq!(json, "\"gay_bar\"");
        assert_eq!("sports_bar".parse::<VenueType>().unwrap(), VenueType::SportsBar);
        assert!(VenueType::SportsBar.is_bar());
        assert!(!VenueType::Restaurant.is_bar());
    }

    #[test]
    fn data_type_round_trips_screaming_case() {
        let json = serde_json::to_string(&DataType::NoData).unwrap();
        assert_eq!(json, "\"NO_DATA\"");
        assert_eq!("LIVE".parse::<DataType>().unwrap(), DataType::Live);
    }
}
