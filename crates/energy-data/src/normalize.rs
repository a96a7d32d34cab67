//! Hourly resampling and gap handling.
//!
//! Sums sub-hourly readings into exactly one sample per clock hour from the
//! first through the last observed hour. Short interior gaps are linearly
//! interpolated; long gaps are zero-filled and flagged; a series missing
//! too many hours fails the run entirely.

use std::collections::BTreeMap;

use chrono::{DurationRound, NaiveDateTime, TimeDelta};
use energy_core::config::AnalysisConfig;
use energy_core::error::{AnalysisError, Result};
use energy_core::models::{HourlySample, MeterReading, NormalizedSeries};
use tracing::debug;

/// Resample readings onto the hourly grid.
///
/// Returns the contiguous series plus the notes generated while filling
/// gaps. Fails with [`AnalysisError::LowQualityData`] when more than
/// `config.max_missing_fraction` of the grid hours had no readings.
pub fn normalize(
    readings: &[MeterReading],
    config: &AnalysisConfig,
) -> Result<(NormalizedSeries, Vec<String>)> {
    let mut by_hour: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for reading in readings {
        let hour = reading
            .timestamp
            .duration_trunc(TimeDelta::hours(1))
            .unwrap_or(reading.timestamp);
        *by_hour.entry(hour).or_insert(0.0) += reading.kwh;
    }

    let (Some((&first, _)), Some((&last, _))) =
        (by_hour.first_key_value(), by_hour.last_key_value())
    else {
        return Ok((NormalizedSeries::new(Vec::new()), Vec::new()));
    };

    // Hour-by-hour grid; interior hours may be absent from the map.
    let grid_len = ((last - first).num_hours() + 1) as usize;
    let mut values: Vec<Option<f64>> = Vec::with_capacity(grid_len);
    let mut hours: Vec<NaiveDateTime> = Vec::with_capacity(grid_len);
    let mut cursor = first;
    for _ in 0..grid_len {
        values.push(by_hour.get(&cursor).copied());
        hours.push(cursor);
        cursor += TimeDelta::hours(1);
    }

    let missing = values.iter().filter(|v| v.is_none()).count();
    let missing_fraction = missing as f64 / grid_len as f64;
    if missing_fraction > config.max_missing_fraction {
        return Err(AnalysisError::LowQualityData { missing_fraction });
    }

    let notes = fill_gaps(&mut values, &hours, config);

    let samples: Vec<HourlySample> = hours
        .into_iter()
        .zip(values)
        .map(|(hour, kwh)| HourlySample {
            hour,
            kwh: kwh.unwrap_or(0.0),
        })
        .collect();

    debug!(
        "normalized {} readings onto {} hours ({} missing, fraction {:.3})",
        readings.len(),
        grid_len,
        missing,
        missing_fraction
    );

    Ok((NormalizedSeries::new(samples), notes))
}

// ── Gap filling ───────────────────────────────────────────────────────────────

/// Fill every `None` run in place; returns one note per gap.
///
/// Runs no longer than `config.gap_fill_max_hours` interpolate linearly
/// between their known neighbours (the grid endpoints are always known, so
/// interior runs always have both). Longer runs become zeros.
fn fill_gaps(
    values: &mut [Option<f64>],
    hours: &[NaiveDateTime],
    config: &AnalysisConfig,
) -> Vec<String> {
    let mut notes = Vec::new();
    let mut i = 0usize;
    while i < values.len() {
        if values[i].is_some() {
            i += 1;
            continue;
        }
        let start = i;
        while i < values.len() && values[i].is_none() {
            i += 1;
        }
        let len = i - start;
        let range = format!(
            "{} through {}",
            hours[start].format("%Y-%m-%d %H:00"),
            hours[i - 1].format("%Y-%m-%d %H:00")
        );

        if len <= config.gap_fill_max_hours && start > 0 && i < values.len() {
            let before = values[start - 1].unwrap_or(0.0);
            let after = values[i].unwrap_or(0.0);
            for (offset, slot) in values[start..i].iter_mut().enumerate() {
                let t = (offset + 1) as f64 / (len + 1) as f64;
                *slot = Some(before + t * (after - before));
            }
            notes.push(format!(
                "interpolated {len} missing hour(s) {range} from neighbouring readings"
            ));
        } else {
            for slot in values[start..i].iter_mut() {
                *slot = Some(0.0);
            }
            notes.push(format!(
                "no readings for {len} hour(s) {range}; filled with zeros"
            ));
        }
    }
    notes
}

// ── Tests ─────────────────────────────────────────────────────────────────────
