use std::ops::Range;

use crate::error::{AnalysisError, Result};

/// Tunable parameters for one analysis run.
///
/// Every pipeline stage receives this value explicitly; nothing is read from
/// ambient global state, so runs are reproducible and independently
/// testable. The numeric defaults are heuristic choices, not derivations;
/// they are the knobs an operator tunes when the disaggregation drifts from
/// a household's reality.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Longest run of consecutive missing hours filled by linear
    /// interpolation; longer gaps are zero-filled and noted.
    pub gap_fill_max_hours: usize,
    /// Missing-hour fraction above which the run fails with
    /// `LowQualityData` instead of producing a misleading report.
    pub max_missing_fraction: f64,
    /// Minimum distinct hours of coverage required after row filtering.
    pub min_coverage_hours: usize,

    /// Fraction of baseload attributed to refrigeration.
    pub fridge_fraction: f64,
    /// Fraction of baseload attributed to TVs and standby electronics.
    pub tv_fraction: f64,

    /// Months counted as cooling season (calendar proxy for temperature).
    pub cooling_months: [u32; 4],
    /// Months counted as heating season.
    pub heating_months: [u32; 3],
    /// Local hours considered for cooling excess, half-open.
    pub cooling_hours: Range<u32>,
    /// Local hours scanned for oven signatures, half-open.
    pub oven_hours: Range<u32>,
    /// Local hours of the evening share window, half-open.
    pub evening_hours: Range<u32>,

    /// Per-hour excess over baseload (kWh) that qualifies as an oven spike.
    pub oven_spike_kwh: f64,
    /// Daily cap on oven attribution (kWh), limiting double-counting of
    /// cooling spikes that fall in the same window.
    pub oven_daily_cap_kwh: f64,
    /// Per-hour excess over baseload (kWh) that qualifies as a dryer spike.
    pub dryer_spike_kwh: f64,
    /// Minimum consecutive qualifying hours for a dryer signature.
    pub dryer_min_run_hours: usize,

    /// Width of the daily peak window, in hours.
    pub top_window_hours: usize,
    /// Number of demand peaks reported in `top10_demand`.
    pub top_demand_count: usize,
    /// Maximum number of recommendation cards in the report.
    pub max_cards: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gap_fill_max_hours: 3,
            max_missing_fraction: 0.20,
            min_coverage_hours: 24,
            fridge_fraction: 0.30,
            tv_fraction: 0.40,
            cooling_months: [6, 7, 8, 9],
            heating_months: [12, 1, 2],
            cooling_hours: 10..20,
            oven_hours: 16..20,
            evening_hours: 19..23,
            oven_spike_kwh: 1.0,
            oven_daily_cap_kwh: 4.0,
            dryer_spike_kwh: 2.0,
            dryer_min_run_hours: 2,
            top_window_hours: 4,
            top_demand_count: 10,
            max_cards: 6,
        }
    }
}

impl AnalysisConfig {
    /// Check internal consistency before a run starts.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fridge_fraction)
            || !(0.0..=1.0).contains(&self.tv_fraction)
        {
            return Err(AnalysisError::Config(
                "fridge_fraction and tv_fraction must lie in [0, 1]".to_string(),
            ));
        }
        if self.fridge_fraction + self.tv_fraction > 1.0 {
            return Err(AnalysisError::Config(format!(
                "fridge_fraction + tv_fraction must not exceed 1.0 (got {})",
                self.fridge_fraction + self.tv_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.max_missing_fraction) {
            return Err(AnalysisError::Config(
                "max_missing_fraction must lie in [0, 1)".to_string(),
            ));
        }
        if self.min_coverage_hours == 0 || self.top_window_hours == 0 {
            return Err(AnalysisError::Config(
                "min_coverage_hours and top_window_hours must be positive".to_string(),
            ));
        }
        if self.oven_spike_kwh <= 0.0 || self.dryer_spike_kwh <= 0.0 {
            return Err(AnalysisError::Config(
                "spike thresholds must be positive".to_string(),
            ));
        }
        if self.dryer_min_run_hours < 1 {
            return Err(AnalysisError::Config(
                "dryer_min_run_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `month` (1-12) falls in the cooling season.
    pub fn is_cooling_month(&self, month: u32) -> bool {
        self.cooling_months.contains(&month)
    }

    /// Whether `month` (1-12) falls in the heating season.
    pub fn is_heating_month(&self, month: u32) -> bool {
        self.heating_months.contains(&month)
    }
}
