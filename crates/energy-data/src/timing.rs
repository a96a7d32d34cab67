//! Peak-timing analysis.
//!
//! Where does the daily peak window land, and which individual hours drove
//! the highest demand? Pure over the normalized series.

use std::collections::BTreeMap;

use energy_core::config::AnalysisConfig;
use energy_core::models::{DemandPeak, NormalizedSeries, TimingProfile};
use energy_core::stats::round2;

use crate::baseline;

/// Build the timing profile for one normalized series.
pub fn analyze_timing(series: &NormalizedSeries, config: &AnalysisConfig) -> TimingProfile {
    // Start-hour distribution of the daily top-4 windows. BTreeMap keys
    // keep serialization order deterministic.
    let mut top4_start_distribution: BTreeMap<String, u32> = BTreeMap::new();
    for day in series.days() {
        if let Some((start, _)) = baseline::day_top_window(&day, config.top_window_hours) {
            *top4_start_distribution
                .entry(format!("{start:02}"))
                .or_insert(0) += 1;
        }
    }

    // Highest-demand hours: kW descending, ties by earliest timestamp.
    // On the hourly grid kW numerically equals kWh per hour.
    let mut ranked: Vec<_> = series.samples().to_vec();
    ranked.sort_by(|a, b| b.kwh.total_cmp(&a.kwh).then_with(|| a.hour.cmp(&b.hour)));
    let top10_demand: Vec<DemandPeak> = ranked
        .into_iter()
        .take(config.top_demand_count)
        .map(|s| DemandPeak {
            timestamp: s.hour.format("%Y-%m-%d %H:%M").to_string(),
            kw: round2(s.kwh),
            kwh: round2(s.kwh),
        })
        .collect();

    TimingProfile {
        top4_start_distribution,
        top10_demand,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
