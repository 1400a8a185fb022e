//! Annotation reader: parse human-supplied timecodes from tabular input.
//!
//! Dive annotations arrive as a CSV with one timecode column. Two column
//! formats are seen in the wild: raw numeric seconds, and a date-time
//! column that must be converted to epoch seconds. Rows that fail to parse
//! are dropped; a missing column is fatal.

use std::io::Read;

use chrono::{DateTime, NaiveDateTime};

use crate::error::{CoreError, CoreResult};

/// How the timecode column should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimecodeFormat {
    /// Plain floating-point seconds.
    Seconds,
    /// A date-time string, converted to epoch seconds.
    DateTime,
}

/// Which column to read and how to parse it.
#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    pub column: String,
    pub format: TimecodeFormat,
}

impl Default for AnnotationConfig {
    /// The historical annotation sheets use a `Start Date` date-time column.
    fn default() -> Self {
        Self {
            column: "Start Date".to_string(),
            format: TimecodeFormat::DateTime,
        }
    }
}

/// Date-time layouts accepted for [`TimecodeFormat::DateTime`] cells.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse one cell into seconds, or `None` when it is unparseable.
fn parse_cell(cell: &str, format: TimecodeFormat) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    match format {
        TimecodeFormat::Seconds => cell.parse::<f64>().ok().filter(|s| s.is_finite()),
        TimecodeFormat::DateTime => {
            // RFC 3339 first (carries its own offset), then the known
            // offset-less layouts interpreted as UTC.
            if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
                return Some(dt.timestamp() as f64);
            }
            DATETIME_LAYOUTS.iter().find_map(|layout| {
                NaiveDateTime::parse_from_str(cell, layout)
                    .ok()
                    .map(|dt| dt.and_utc().timestamp() as f64)
            })
        }
    }
}

/// Read annotation timecodes from CSV input.
///
/// Returns the parsed seconds in row order. Rows whose timecode cell cannot
/// be parsed are skipped with a debug log; if the configured column is
/// absent from the header the whole file is rejected with
/// [`CoreError::MalformedInput`].
pub fn read_annotation_times<R: Read>(input: R, config: &AnnotationConfig) -> CoreResult<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| CoreError::MalformedInput(format!("unreadable CSV header: {e}")))?;

    let column_index = headers
        .iter()
        .position(|h| h.trim() == config.column)
        .ok_or_else(|| {
            CoreError::MalformedInput(format!(
                "annotation file has no '{}' column (found: {})",
                config.column,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

    let mut times = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        match record.get(column_index).and_then(|c| parse_cell(c, config.format)) {
            Some(secs) => times.push(secs),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, kept = times.len(), "Dropped unparseable annotation rows");
    }

    Ok(times)
}
