mod bootstrap;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use energy_core::cancel::CancelToken;
use energy_core::config::AnalysisConfig;
use energy_core::error::AnalysisError;
use energy_data::analysis::HouseholdProfile;
use energy_runtime::pipeline::AnalysisPipeline;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Analyze household smart-meter interval data into a structured report
#[derive(Parser, Debug, Clone)]
#[command(
    name = "energy-analyzer",
    about = "Analyze household smart-meter interval data into a structured report",
    version
)]
struct Settings {
    /// Interval readings CSV (ESIID, USAGE_DATE, USAGE_START_TIME, USAGE_KWH)
    input: PathBuf,

    /// The household heats with gas; suppresses electric-heating estimates
    #[arg(long)]
    has_gas_heat: bool,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Maximum number of recommendation cards
    #[arg(long, default_value = "6")]
    max_cards: usize,

    /// Longest gap (hours) filled by interpolation
    #[arg(long, default_value = "3")]
    gap_fill_max_hours: usize,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = Settings::parse();

    if let Err(e) = bootstrap::setup_logging(&settings.log_level) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("energy-analyzer v{} starting", env!("CARGO_PKG_VERSION"));

    let config = AnalysisConfig {
        max_cards: settings.max_cards,
        gap_fill_max_hours: settings.gap_fill_max_hours,
        ..Default::default()
    };
    let profile = HouseholdProfile {
        has_gas_heat: settings.has_gas_heat,
    };

    let cancel = CancelToken::new();
    let pipeline = AnalysisPipeline::new(config);

    // Ctrl+C cancels the run cleanly; a cancelled run prints no report.
    let report = tokio::select! {
        result = pipeline.analyze_file(settings.input.clone(), profile, cancel.clone()) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; cancelling analysis");
            cancel.cancel();
            Err(AnalysisError::Cancelled)
        }
    };

    match report {
        Ok(report) => match emit(&settings, &report) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error[io]: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error[{}]: {}", e.code(), e);
            match e {
                // Bad input is distinguishable from engine bugs.
                AnalysisError::Format(_)
                | AnalysisError::InsufficientData { .. }
                | AnalysisError::LowQualityData { .. } => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

/// Serialize the report to stdout or the requested file.
fn emit(settings: &Settings, report: &energy_core::models::AnalysisReport) -> anyhow::Result<()> {
    let json = if settings.pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };

    match &settings.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_parse_defaults() {
        let settings = Settings::parse_from(["energy-analyzer", "usage.csv"]);
        assert_eq!(settings.input, PathBuf::from("usage.csv"));
        assert!(!settings.has_gas_heat);
        assert!(!settings.pretty);
        assert_eq!(settings.max_cards, 6);
        assert_eq!(settings.gap_fill_max_hours, 3);
        assert_eq!(settings.log_level, "INFO");
    }

    #[test]
    fn test_settings_parse_flags() {
        let settings = Settings::parse_from([
            "energy-analyzer",
            "usage.csv",
            "--has-gas-heat",
            "--pretty",
            "--max-cards",
            "4",
            "--log-level",
            "DEBUG",
        ]);
        assert!(settings.has_gas_heat);
        assert!(settings.pretty);
        assert_eq!(settings.max_cards, 4);
        assert_eq!(settings.log_level, "DEBUG");
    }
}
