//! Live busyness signal detection
//!
//! Two live signals exist, in increasing precedence: a known phrase in
//! the page text (mapped to an estimated percentage), and an explicit
//! right-now percentage in a descriptive attribute. A percentage is
//! "right now" exactly when the label carries no `at <hour>` time
//! reference; that is what separates it from a historical per-hour
//! reading.

use once_cell::sync::Lazy;
use regex::Regex;

use slicewatch_common::validate;

/// Confidence attached to a phrase-based live indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Low,
    High,
    Maximum,
}

/// A known live phrase and its estimated busyness.
#[derive(Debug, Clone, Copy)]
pub struct LiveTextIndicator {
    pub phrase: &'static str,
    /// Whether the phrase signals elevated activity
    pub flag: bool,
    pub confidence: Confidence,
    pub estimated_percent: u8,
}

/// Known live phrases, checked in order; the first match wins.
/// "not busy" deliberately precedes its longer variants, matching the
/// data source's own phrasing precedence.
pub const LIVE_TEXT_PATTERNS: [LiveTextIndicator; 5] = [
    LiveTextIndicator {
        phrase: "busier than usual",
        flag: true,
        confidence: Confidence::High,
        estimated_percent: 75,
    },
    LiveTextIndicator {
        phrase: "as busy as it gets",
        flag: true,
        confidence: Confidence::Maximum,
        estimated_percent: 100,
    },
    LiveTextIndicator {
        phrase: "not busy",
        flag: false,
        confidence: Confidence::Low,
        estimated_percent: 10,
    },
    LiveTextIndicator {
        phrase: "not too busy",
        flag: false,
        confidence: Confidence::Low,
        estimated_percent: 15,
    },
    LiveTextIndicator {
        phrase: "usually not busy",
        flag: false,
        confidence: Confidence::Low,
        estimated_percent: 15,
    },
];

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)%").expect("percent pattern"));

static BUSY_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+%\s*busy").expect("busy percent pattern"));

/// `at <hour>` time reference, the marker of a historical per-hour label.
static TIME_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bat\s+\d{1,2}").expect("time reference pattern"));

/// Scan page text for a known live phrase (case-insensitive).
pub fn match_live_text(body_text: &str) -> Option<&'static LiveTextIndicator> {
    let lowered = body_text.to_lowercase();
    LIVE_TEXT_PATTERNS
        .iter()
        .find(|indicator| lowered.contains(indicator.phrase))
}

/// A right-now percentage reading extracted from an attribute label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePercent {
    pub percent: u8,
    /// The label the reading came from
    pub label: String,
}

/// Scan attribute labels for a busyness percentage with no time
/// reference. Labels with an out-of-range percentage are skipped.
pub fn match_live_percent(labels: &[String]) -> Option<LivePercent> {
    for label in labels {
        if !BUSY_PERCENT.is_match(label) || TIME_REFERENCE.is_match(label) {
            continue;
        }
        let Some(captures) = PERCENT.captures(label) else {
            continue;
        };
        let Ok(raw) = captures[1].parse::<i64>() else {
            continue;
        };
        if let Ok(percent) = validate::busyness_percent(raw) {
            return Some(LivePercent {
                percent,
                label: label.clone(),
            });
        }
    }
    None
}
