//! The concurrent pipeline runner.
//!
//! Stage order mirrors the sequential reference implementation in
//! `energy_data::analysis`; only the execution strategy differs. Summary,
//! disaggregation and timing are pure functions of the same immutable
//! [`NormalizedSeries`], so they run on separate blocking workers and the
//! recommendation stage acts as the join barrier. Both paths produce
//! identical reports.

use std::path::PathBuf;
use std::sync::Arc;

use energy_core::cancel::CancelToken;
use energy_core::config::AnalysisConfig;
use energy_core::error::{AnalysisError, Result};
use energy_core::models::AnalysisReport;
use energy_data::analysis::{standing_notes, HouseholdProfile};
use energy_data::{devices, ingest, normalize, recommend, report, series, summary, timing};
use tokio::task::JoinError;
use tracing::{debug, info};

/// One pipeline run per call; holds no cross-request state.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Analyze an interval CSV file on disk.
    ///
    /// Cancellation: trip `cancel` (e.g. when the client disconnects) and
    /// ingestion stops promptly; a cancelled run yields
    /// [`AnalysisError::Cancelled`], never a partial report.
    pub async fn analyze_file(
        &self,
        path: PathBuf,
        profile: HouseholdProfile,
        cancel: CancelToken,
    ) -> Result<AnalysisReport> {
        self.config.validate()?;

        // ── Ingest + normalize: sequential, off the async threads ────────────
        let config = self.config.clone();
        let ingest_cancel = cancel.clone();
        let (series_data, mut notes) = tokio::task::spawn_blocking(move || {
            let ingested = ingest::ingest_path(&path, &config, &ingest_cancel)?;
            info!(
                "ingested {} readings for meter {}",
                ingested.readings.len(),
                ingested.meter_id
            );
            let (series_data, normalize_notes) =
                normalize::normalize(&ingested.readings, &config)?;
            let mut notes = ingested.notes;
            notes.extend(normalize_notes);
            Ok::<_, AnalysisError>((series_data, notes))
        })
        .await
        .map_err(join_failure)??;

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        // ── Fan out the three analyzers over the shared series ───────────────
        let series_data = Arc::new(series_data);

        let summary_task = {
            let series_data = Arc::clone(&series_data);
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || {
                summary::summarize(&series_data, &config, profile.has_gas_heat)
            })
        };
        let devices_task = {
            let series_data = Arc::clone(&series_data);
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || devices::disaggregate(&series_data, &config))
        };
        let timing_task = {
            let series_data = Arc::clone(&series_data);
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || {
                (
                    timing::analyze_timing(&series_data, &config),
                    series::build_series_tables(&series_data),
                )
            })
        };

        // The recommendation stage may not start until all three complete.
        let (summary_res, devices_res, timing_res) =
            tokio::join!(summary_task, devices_task, timing_task);
        let summary_metrics = summary_res.map_err(join_failure)?;
        let device_analysis = devices_res.map_err(join_failure)?;
        let (timing_profile, series_tables) = timing_res.map_err(join_failure)?;
        debug!("analyzer fan-out complete");

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        // ── Recommend + assemble ─────────────────────────────────────────────
        let recommendations =
            recommend::recommend(&summary_metrics, &device_analysis.breakdown, &self.config);

        notes.extend(standing_notes(profile));

        report::assemble(
            summary_metrics,
            device_analysis,
            timing_profile,
            series_tables,
            recommendations,
            notes,
            &self.config,
        )
    }
}

/// A worker task that died did not return an error value; surface it as the
/// bug signal it is.
fn join_failure(err: JoinError) -> AnalysisError {
    AnalysisError::ReportValidation(format!("analysis worker failed: {err}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
