//! Consumption summary statistics.
//!
//! A pure function over the normalized hourly series; no I/O, no shared
//! state, safe to run concurrently with the other analyzers.

use chrono::Timelike;
use energy_core::config::AnalysisConfig;
use energy_core::models::{NormalizedSeries, SummaryMetrics};
use energy_core::stats::{self, round1, round2};

use crate::baseline;

/// Fallback top-4 start modes when a weekday/weekend partition is empty.
const DEFAULT_WEEKDAY_MODE: u32 = 9;
const DEFAULT_WEEKEND_MODE: u32 = 10;

/// Compute the summary metrics for one normalized series.
///
/// `has_gas_heat` zeroes the electric-heating estimate: a gas-heated
/// household's winter excess is not electric resistance heat.
pub fn summarize(
    series: &NormalizedSeries,
    config: &AnalysisConfig,
    has_gas_heat: bool,
) -> SummaryMetrics {
    let days = series.days();
    let total_kwh = series.total_kwh();
    let day_count = days.len() as u32;

    // Peak hour: strictly-greater comparison keeps the earliest on ties.
    let mut peak_kw = 0.0_f64;
    let mut peak_time_local = String::new();
    for sample in series.samples() {
        if sample.kwh > peak_kw {
            peak_kw = sample.kwh;
            peak_time_local = sample.hour.format("%Y-%m-%d %H:%M").to_string();
        }
    }

    // Always-on load, averaged across days.
    let day_baseloads: Vec<f64> = days
        .iter()
        .map(|day| baseline::day_baseload_hourly(day) * 24.0)
        .collect();
    let baseload_kwh_per_day = stats::mean(&day_baseloads);

    // Per-day top-4 windows: share of the day plus start-hour modes.
    let mut shares = Vec::new();
    let mut weekday_starts = Vec::new();
    let mut weekend_starts = Vec::new();
    for day in &days {
        let Some((start, window_kwh)) = baseline::day_top_window(day, config.top_window_hours)
        else {
            continue;
        };
        shares.push(window_kwh / day.total_kwh() * 100.0);
        if day.is_weekend() {
            weekend_starts.push(start);
        } else {
            weekday_starts.push(start);
        }
    }
    let top4_share_pct = stats::mean(&shares);
    let top4_start_mode_weekday =
        format_mode(stats::mode_min(&weekday_starts).unwrap_or(DEFAULT_WEEKDAY_MODE));
    let top4_start_mode_weekend =
        format_mode(stats::mode_min(&weekend_starts).unwrap_or(DEFAULT_WEEKEND_MODE));

    // Evening share: 19:00-22:59, averaged across non-zero days.
    let evening_shares: Vec<f64> = days
        .iter()
        .filter(|day| day.total_kwh() > 0.0)
        .map(|day| {
            let evening: f64 = day
                .samples
                .iter()
                .filter(|s| config.evening_hours.contains(&s.hour.hour()))
                .map(|s| s.kwh)
                .sum();
            evening / day.total_kwh() * 100.0
        })
        .collect();
    let evening_share_pct = stats::mean(&evening_shares);

    let avg_daily_kwh = if day_count > 0 {
        total_kwh / day_count as f64
    } else {
        0.0
    };

    SummaryMetrics {
        total_kwh: round1(total_kwh),
        days: day_count,
        avg_daily_kwh: round1(avg_daily_kwh),
        peak_kw: round2(peak_kw),
        peak_time_local,
        baseload_kwh_per_day: round1(baseload_kwh_per_day),
        cooling_kwh: round1(baseline::cooling_kwh(series, config)),
        heating_kwh: round1(baseline::heating_kwh(series, config, has_gas_heat)),
        top4_share_pct: round1(top4_share_pct),
        top4_start_mode_weekday,
        top4_start_mode_weekend,
        evening_share_pct: round1(evening_share_pct),
    }
}

fn format_mode(hour: u32) -> String {
    format!("{hour:02}:00")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
