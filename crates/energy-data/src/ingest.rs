//! Interval CSV ingestion.
//!
//! Turns raw utility export rows into a validated, deduplicated,
//! time-ordered sequence of [`MeterReading`]s for exactly one meter. Bad
//! rows are skipped and noted, never fatal; structural problems (unreadable
//! header, mixed meters) abort the run.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::{DurationRound, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use energy_core::cancel::CancelToken;
use energy_core::config::AnalysisConfig;
use energy_core::error::{AnalysisError, Result};
use energy_core::models::MeterReading;
use serde::Deserialize;
use tracing::{debug, warn};

/// Required CSV columns, matching the utility export transport.
const REQUIRED_COLUMNS: &[&str] = &["ESIID", "USAGE_DATE", "USAGE_START_TIME", "USAGE_KWH"];

/// Row-level notes are capped so a pathological file cannot flood the
/// report; a summary line carries the remainder.
const MAX_ROW_NOTES: usize = 20;

/// How many rows to parse between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 256;

// ── Raw row ───────────────────────────────────────────────────────────────────

/// One CSV row as exported by the utility, before any validation.
///
/// All fields deserialize as strings so that a malformed value skips the
/// single row instead of aborting the whole file.
#[derive(Debug, Deserialize)]
struct RawIntervalRow {
    #[serde(rename = "ESIID")]
    meter_id: String,
    #[serde(rename = "USAGE_DATE")]
    date: String,
    #[serde(rename = "USAGE_START_TIME")]
    start_time: String,
    #[serde(rename = "USAGE_KWH")]
    kwh: String,
}

// ── Ingest result ─────────────────────────────────────────────────────────────

/// Validated ingest output plus bookkeeping for the report's notes.
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// The single meter identifier all rows referenced.
    pub meter_id: String,
    /// Deduplicated readings, ascending by timestamp.
    pub readings: Vec<MeterReading>,
    /// Total data rows seen in the file.
    pub rows_read: u64,
    /// Rows dropped for row-level problems.
    pub rows_skipped: u64,
    /// Warnings to surface in the report.
    pub notes: Vec<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Ingest an interval CSV file from disk.
pub fn ingest_path(
    path: &Path,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<IngestResult> {
    let file = std::fs::File::open(path)?;
    ingest_reader(file, config, cancel)
}

/// Ingest interval CSV rows from any reader.
///
/// Contract:
/// * more than one distinct meter identifier → [`AnalysisError::Format`];
/// * rows with unparseable timestamps, non-numeric or negative energy are
///   skipped with a note;
/// * identical timestamps deduplicate last-write-wins, except the
///   daylight-saving fall-back pair (same timestamp, different energy)
///   which is summed, since both occurrences are real intervals;
/// * fewer than `config.min_coverage_hours` distinct hours after filtering
///   → [`AnalysisError::InsufficientData`].
pub fn ingest_reader<R: Read>(
    reader: R,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<IngestResult> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    check_header(&mut csv_reader)?;

    let mut by_timestamp: std::collections::BTreeMap<NaiveDateTime, f64> =
        std::collections::BTreeMap::new();
    let mut meters: HashSet<String> = HashSet::new();
    let mut notes: Vec<String> = Vec::new();
    let mut rows_read = 0u64;
    let mut rows_skipped = 0u64;
    let mut suppressed_notes = 0u64;
    let mut dst_summed = 0u64;

    for (index, record) in csv_reader.deserialize::<RawIntervalRow>().enumerate() {
        rows_read += 1;
        // Data rows start on line 2, after the header.
        let line = index + 2;

        if rows_read % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            debug!("ingest cancelled after {} rows", rows_read);
            return Err(AnalysisError::Cancelled);
        }

        let row = match record {
            Ok(row) => row,
            Err(e) => {
                skip_row(
                    &mut notes,
                    &mut rows_skipped,
                    &mut suppressed_notes,
                    line,
                    &format!("unreadable row: {e}"),
                );
                continue;
            }
        };

        if row.meter_id.is_empty() {
            skip_row(
                &mut notes,
                &mut rows_skipped,
                &mut suppressed_notes,
                line,
                "missing meter identifier",
            );
            continue;
        }

        meters.insert(row.meter_id.clone());
        if meters.len() > 1 {
            let mut ids: Vec<&String> = meters.iter().collect();
            ids.sort();
            return Err(AnalysisError::Format(format!(
                "rows reference {} distinct meters ({})",
                meters.len(),
                ids.iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let timestamp = match parse_timestamp(&row.date, &row.start_time) {
            Some(ts) => ts,
            None => {
                skip_row(
                    &mut notes,
                    &mut rows_skipped,
                    &mut suppressed_notes,
                    line,
                    &format!("unparseable timestamp '{} {}'", row.date, row.start_time),
                );
                continue;
            }
        };

        let kwh = match row.kwh.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            Ok(v) => {
                skip_row(
                    &mut notes,
                    &mut rows_skipped,
                    &mut suppressed_notes,
                    line,
                    &format!("negative or non-finite energy value {v}"),
                );
                continue;
            }
            Err(_) => {
                skip_row(
                    &mut notes,
                    &mut rows_skipped,
                    &mut suppressed_notes,
                    line,
                    &format!("non-numeric energy value '{}'", row.kwh),
                );
                continue;
            }
        };

        match by_timestamp.entry(timestamp) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(kwh);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                if (kwh - *slot.get()).abs() < 1e-9 {
                    // True duplicate row: last write wins.
                    slot.insert(kwh);
                } else {
                    // Repeated local hour (DST fall-back): two real intervals.
                    *slot.get_mut() += kwh;
                    dst_summed += 1;
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }

    if suppressed_notes > 0 {
        notes.push(format!(
            "... and {suppressed_notes} more rows skipped for similar problems"
        ));
    }
    if dst_summed > 0 {
        notes.push(format!(
            "{dst_summed} repeated-timestamp intervals summed (daylight-saving fall-back)"
        ));
    }

    let readings: Vec<MeterReading> = by_timestamp
        .into_iter()
        .map(|(timestamp, kwh)| MeterReading { timestamp, kwh })
        .collect();

    let distinct_hours: HashSet<NaiveDateTime> = readings
        .iter()
        .map(|r| {
            r.timestamp
                .duration_trunc(TimeDelta::hours(1))
                .unwrap_or(r.timestamp)
        })
        .collect();
    if distinct_hours.len() < config.min_coverage_hours {
        return Err(AnalysisError::InsufficientData {
            hours: distinct_hours.len(),
            needed: config.min_coverage_hours,
        });
    }

    let meter_id = meters.into_iter().next().unwrap_or_default();
    debug!(
        "ingested {} readings for meter {} ({} rows read, {} skipped)",
        readings.len(),
        meter_id,
        rows_read,
        rows_skipped
    );

    Ok(IngestResult {
        meter_id,
        readings,
        rows_read,
        rows_skipped,
        notes,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Verify the header carries every required column before reading rows.
fn check_header<R: Read>(reader: &mut csv::Reader<R>) -> Result<()> {
    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::Format(format!("unreadable CSV header: {e}")))?;
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(AnalysisError::Format(format!(
                "missing required column {column}"
            )));
        }
    }
    Ok(())
}

/// Record a skipped row, capping the per-row notes.
fn skip_row(
    notes: &mut Vec<String>,
    rows_skipped: &mut u64,
    suppressed: &mut u64,
    line: usize,
    reason: &str,
) {
    *rows_skipped += 1;
    if notes.len() < MAX_ROW_NOTES {
        notes.push(format!("skipped row at line {line}: {reason}"));
    } else {
        *suppressed += 1;
    }
    warn!("skipped row at line {}: {}", line, reason);
}

/// Parse the separate local date and time columns of one row.
///
/// Accepts the date and time formats seen across utility exports; returns
/// `None` when neither list matches.
fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
    const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())?;
    Some(NaiveDateTime::new(date, time))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
