//! The sequential reference pipeline.
//!
//! Ingest → normalize → (summary, devices, timing, series) → recommend →
//! assemble, in one thread. The async runtime crate fans the middle stages
//! out onto workers; because every stage is a pure function of the
//! normalized series, both paths produce identical reports.

use std::io::Read;

use energy_core::cancel::CancelToken;
use energy_core::config::AnalysisConfig;
use energy_core::error::Result;
use energy_core::models::{AnalysisReport, MeterReading};
use tracing::info;

use crate::{devices, ingest, normalize, recommend, report, series, summary, timing};

/// Per-run options that are inputs, not tuning: facts about the household.
#[derive(Debug, Clone, Copy, Default)]
pub struct HouseholdProfile {
    /// When true the household heats with gas, so winter excess is not
    /// electric heating and `heating_kwh` is zeroed.
    pub has_gas_heat: bool,
}

/// Run the full pipeline over an interval CSV reader.
pub fn analyze_reader<R: Read>(
    reader: R,
    config: &AnalysisConfig,
    profile: HouseholdProfile,
    cancel: &CancelToken,
) -> Result<AnalysisReport> {
    config.validate()?;
    let ingested = ingest::ingest_reader(reader, config, cancel)?;
    info!(
        "ingested {} readings for meter {}",
        ingested.readings.len(),
        ingested.meter_id
    );
    analyze_readings(&ingested.readings, ingested.notes, config, profile)
}

/// Run the pipeline stages downstream of ingestion.
pub fn analyze_readings(
    readings: &[MeterReading],
    ingest_notes: Vec<String>,
    config: &AnalysisConfig,
    profile: HouseholdProfile,
) -> Result<AnalysisReport> {
    let (series_data, normalize_notes) = normalize::normalize(readings, config)?;

    let summary = summary::summarize(&series_data, config, profile.has_gas_heat);
    let device_analysis = devices::disaggregate(&series_data, config);
    let timing_profile = timing::analyze_timing(&series_data, config);
    let series_tables = series::build_series_tables(&series_data);

    let recommendations = recommend::recommend(&summary, &device_analysis.breakdown, config);

    let mut notes = ingest_notes;
    notes.extend(normalize_notes);
    notes.extend(standing_notes(profile));

    report::assemble(
        summary,
        device_analysis,
        timing_profile,
        series_tables,
        recommendations,
        notes,
        config,
    )
}

/// Disclaimers attached to every successful report. Shared with the
/// concurrent runner so both paths stay bit-for-bit interchangeable.
pub fn standing_notes(profile: HouseholdProfile) -> Vec<String> {
    let mut notes = Vec::new();
    if profile.has_gas_heat {
        notes.push("Heating set to 0 because the household heats with gas.".to_string());
    }
    notes.push(
        "Device estimates are approximate, derived from interval data without per-device metering."
            .to_string(),
    );
    notes
}

// ── Tests ─────────────────────────────────────────────────────────────────────
