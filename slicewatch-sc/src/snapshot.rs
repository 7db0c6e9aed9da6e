//! Flat-file snapshot persistence
//!
//! Each scan writes two delimited files under the data directory: the
//! current-hour snapshot (one row per venue sample, read back by the
//! anomaly detector) and a raw-bucket diagnostic dump with inferred
//! cycle metadata. A snapshot is superseded wholesale by the next scan
//! of the same hour; there is no merging.

use chrono::{DateTime, FixedOffset};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use slicewatch_common::time::{hour_stamp, scan_stamp};
use slicewatch_common::types::{RawTimeBucket, VenueSample, Weekday};
use slicewatch_common::validate;

use crate::error::{Error, Result};

const SAMPLE_HEADER: &str =
    "venue_url,weekday,hour_24,hour_label,timestamp,value,busyness_percent,data_type,venue_type";

const RAW_HEADER: &str = "scrape_timestamp,venue_url,element_index,hour_24,display_hour,hour_12,\
meridiem,hour_label,busyness_percent,raw_label,detected_cycle,cycle_hours_count,cycle_start_hour,\
cycle_end_hour,assigned_weekday,day_offset,is_today_cycle,target_weekday,target_hour";

/// One diagnostic row: a raw bucket plus its scan context.
#[derive(Debug, Clone)]
pub struct RawBucketRow {
    pub scrape_timestamp: String,
    pub venue_url: String,
    pub target_weekday: Weekday,
    pub target_hour: u8,
    pub bucket: RawTimeBucket,
}

/// Path of the current-hour snapshot for `now`.
pub fn current_hour_path(data_dir: &Path, now: DateTime<FixedOffset>) -> PathBuf {
    data_dir.join(format!("current_hour_{}.csv", hour_stamp(now)))
}

/// Path of the raw-bucket diagnostic dump for `now`.
pub fn raw_dump_path(data_dir: &Path, now: DateTime<FixedOffset>) -> PathBuf {
    data_dir.join(format!("all_scraped_data_{}.csv", scan_stamp(now)))
}

/// Write the per-scan snapshot; returns the file path.
pub fn write_samples(
    data_dir: &Path,
    now: DateTime<FixedOffset>,
    samples: &[VenueSample],
) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let path = current_hour_path(data_dir, now);

    let mut out = String::with_capacity(256 * (samples.len() + 1));
    out.push_str(SAMPLE_HEADER);
    out.push('\n');
    for sample in samples {
        let weekday = sample.weekday.to_string();
        let hour_24 = sample.hour_24.to_string();
        let percent = sample
            .busyness_percent
            .map(|p| p.to_string())
            .unwrap_or_default();
        let fields = [
            sample.venue_url.as_str(),
            weekday.as_str(),
            hour_24.as_str(),
            sample.hour_label.as_str(),
            sample.timestamp.as_str(),
            sample.value.as_str(),
            percent.as_str(),
            sample.data_type.as_str(),
            sample.venue_type.as_str(),
        ];
        write_row(&mut out, &fields);
    }

    std::fs::write(&path, out)?;
    info!("Current hour data saved to {}", path.display());
    Ok(path)
}

/// Write the raw-bucket diagnostic dump. Skipped (Ok(None)) when there
/// are no rows, matching the snapshot layer's behavior of only dumping
/// scans that parsed historical data.
pub fn write_raw_buckets(
    data_dir: &Path,
    now: DateTime<FixedOffset>,
    rows: &[RawBucketRow],
) -> Result<Option<PathBuf>> {
    if rows.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(data_dir)?;
    let path = raw_dump_path(data_dir, now);

    let mut out = String::with_capacity(256 * (rows.len() + 1));
    out.push_str(RAW_HEADER);
    out.push('\n');
    for row in rows {
        let b = &row.bucket;
        let element_index = b.element_index.to_string();
        let hour_24 = b.hour_24.to_string();
        let display_hour = b.display_hour.to_string();
        let hour_12 = b.hour_12.to_string();
        let percent = b.busyness_percent.map(|p| p.to_string()).unwrap_or_default();
        let target_weekday = row.target_weekday.to_string();
        let target_hour = row.target_hour.to_string();
        let (cycle, hours_count, start_hour, end_hour, weekday, offset, is_today) = match &b.cycle {
            Some(tag) => (
                tag.cycle_index.to_string(),
                tag.hours_count.to_string(),
                tag.start_hour.to_string(),
                tag.end_hour.to_string(),
                tag.assigned_weekday.to_string(),
                tag.day_offset.to_string(),
                tag.is_today.to_string(),
            ),
            None => Default::default(),
        };
        let fields = [
            row.scrape_timestamp.as_str(),
            row.venue_url.as_str(),
            element_index.as_str(),
            hour_24.as_str(),
            display_hour.as_str(),
            hour_12.as_str(),
            b.meridiem.as_str(),
            b.hour_label.as_str(),
            percent.as_str(),
            b.raw_label.as_str(),
            cycle.as_str(),
            hours_count.as_str(),
            start_hour.as_str(),
            end_hour.as_str(),
            weekday.as_str(),
            offset.as_str(),
            is_today.as_str(),
            target_weekday.as_str(),
            target_hour.as_str(),
        ];
        write_row(&mut out, &fields);
    }

    std::fs::write(&path, out)?;
    info!("All scraped data saved to {}", path.display());
    Ok(Some(path))
}

/// Read a current-hour snapshot back into samples. Malformed rows are
/// logged and skipped; a missing header is a format error.
pub fn read_samples(path: &Path) -> Result<Vec<VenueSample>> {
    let contents = std::fs::read_to_string(path)?;
    let mut lines = contents.lines();
    match lines.next() {
        Some(header) if header == SAMPLE_HEADER => {}
        _ => {
            return Err(Error::Snapshot(format!(
                "Unexpected header in {}",
                path.display()
            )))
        }
    }

    let mut samples = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        match parse_sample_row(line) {
            Ok(sample) => samples.push(sample),
            Err(e) => warn!(
                "Skipping malformed snapshot row {} in {}: {}",
                line_no + 2,
                path.display(),
                e
            ),
        }
    }
    Ok(samples)
}

fn parse_sample_row(line: &str) -> Result<VenueSample> {
    let fields = split_row(line);
    if fields.len() != 9 {
        return Err(Error::Snapshot(format!(
            "Expected 9 fields, got {}",
            fields.len()
        )));
    }
    let hour_24: i64 = fields[2]
        .parse()
        .map_err(|_| Error::Snapshot(format!("Bad hour_24: {}", fields[2])))?;
    Ok(VenueSample {
        venue_url: validate::url(&fields[0])?.to_string(),
        weekday: fields[1].parse()?,
        hour_24: validate::hour_24(hour_24)?,
        hour_label: fields[3].clone(),
        timestamp: fields[4].clone(),
        value: fields[5].clone(),
        busyness_percent: validate::busyness_percent_str(Some(fields[6].as_str()))?,
        data_type: fields[7].parse()?,
        venue_type: fields[8].parse()?,
    })
}

/// Append one delimited row, quoting fields that need it.
fn write_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            let _ = write!(out, "\"{}\"", field.replace('"', "\"\""));
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Quote-aware split of one delimited row.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}
