//! Shared per-day primitives: baseload, seasonal excess, peak windows.
//!
//! SummaryStatistics, the DeviceDisaggregator and the TimingAnalyzer all
//! build on the same notions of a day's always-on load and its peak
//! window. Keeping these as shared pure functions guarantees the stages
//! agree on cross-referenced figures (the disaggregator's cooling equals
//! the summary's) without one stage having to wait for another.

use chrono::Timelike;
use energy_core::config::AnalysisConfig;
use energy_core::models::{DaySlice, NormalizedSeries};
use energy_core::stats;

/// The day's top consumption window: `(start_hour, window_kwh)` of the
/// `width` consecutive hours with the highest combined energy. Ties break
/// toward the earliest start. `None` for days shorter than the window or
/// with no energy at all.
pub fn day_top_window(day: &DaySlice<'_>, width: usize) -> Option<(u32, f64)> {
    if day.total_kwh() <= 0.0 {
        return None;
    }
    let (index, sum) = stats::max_window_sum(&day.values(), width)?;
    Some((day.first_hour() + index as u32, sum))
}

/// A day's always-on load expressed per hour (kWh/h).
///
/// Median of the day's 4 lowest hourly values, robust to single-hour
/// outliers, capped at the day's mean hourly value so that baseload over a
/// day can never exceed the day's total energy.
pub fn day_baseload_hourly(day: &DaySlice<'_>) -> f64 {
    let values = day.values();
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let lowest = &sorted[..sorted.len().min(4)];
    stats::median(lowest).min(stats::mean(&values))
}

/// Total cooling energy: for cooling-season days, the excess of each
/// daytime hour's usage above that day's baseload.
pub fn cooling_kwh(series: &NormalizedSeries, config: &AnalysisConfig) -> f64 {
    series
        .days()
        .iter()
        .filter(|day| config.is_cooling_month(day.month()))
        .map(|day| {
            let base = day_baseload_hourly(day);
            day.samples
                .iter()
                .filter(|s| config.cooling_hours.contains(&s.hour.hour()))
                .map(|s| (s.kwh - base).max(0.0))
                .sum::<f64>()
        })
        .sum()
}

/// Total electric-heating energy: for heating-season days, the excess of
/// every hour's usage above that day's baseload. Zero when the household
/// heats with gas.
pub fn heating_kwh(series: &NormalizedSeries, config: &AnalysisConfig, has_gas_heat: bool) -> f64 {
    if has_gas_heat {
        return 0.0;
    }
    series
        .days()
        .iter()
        .filter(|day| config.is_heating_month(day.month()))
        .map(|day| {
            let base = day_baseload_hourly(day);
            day.samples
                .iter()
                .map(|s| (s.kwh - base).max(0.0))
                .sum::<f64>()
        })
        .sum()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
