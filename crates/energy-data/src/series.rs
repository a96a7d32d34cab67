//! Chart-ready series tables: daily and monthly totals plus the mean
//! hourly profile. Grouping uses ordered maps so the tables serialize in
//! a deterministic order.

use std::collections::BTreeMap;

use chrono::Timelike;
use energy_core::models::{
    DailyEnergy, HourlyProfilePoint, MonthlyEnergy, NormalizedSeries, SeriesTables,
};
use energy_core::stats::round2;

/// Build the `series` section of the report.
pub fn build_series_tables(series: &NormalizedSeries) -> SeriesTables {
    let daily: Vec<DailyEnergy> = series
        .days()
        .iter()
        .map(|day| DailyEnergy {
            date: day.date.format("%Y-%m-%d").to_string(),
            kwh: round2(day.total_kwh()),
        })
        .collect();

    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for sample in series.samples() {
        *by_month
            .entry(sample.hour.format("%Y-%m").to_string())
            .or_insert(0.0) += sample.kwh;
    }
    let monthly: Vec<MonthlyEnergy> = by_month
        .into_iter()
        .map(|(month, kwh)| MonthlyEnergy {
            month,
            kwh: round2(kwh),
        })
        .collect();

    // Mean consumption per clock hour across the whole series.
    let mut sums = [0.0f64; 24];
    let mut counts = [0u32; 24];
    for sample in series.samples() {
        let h = sample.hour.hour() as usize;
        sums[h] += sample.kwh;
        counts[h] += 1;
    }
    let hourly_profile: Vec<HourlyProfilePoint> = (0..24)
        .filter(|&h| counts[h] > 0)
        .map(|h| HourlyProfilePoint {
            hour: h as u32,
            kwh_per_hour: round2(sums[h] / counts[h] as f64),
        })
        .collect();

    SeriesTables {
        daily,
        monthly,
        hourly_profile,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
