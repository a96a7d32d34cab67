//! Heuristic per-device energy disaggregation.
//!
//! Signature-based decomposition, not machine learning. Each category has
//! its own detector function so thresholds can be tuned in isolation; the
//! detectors claim hours exclusively (cooling, then oven, then dryer) so no
//! hour's excess is attributed twice. `other_kwh` absorbs whatever the
//! heuristics could not explain and is never negative.

use chrono::Timelike;
use energy_core::config::AnalysisConfig;
use energy_core::models::{
    ComponentTag, CompositionSlice, DaySlice, DeviceBreakdown, NormalizedSeries,
};
use energy_core::stats::{round1, round2};
use tracing::debug;

use crate::baseline;

/// Disaggregation output: the device breakdown plus the average top-4
/// window composition (which reuses the same hour claims).
#[derive(Debug, Clone)]
pub struct DeviceAnalysis {
    pub breakdown: DeviceBreakdown,
    pub composition_top4_avg: Vec<CompositionSlice>,
}

/// Which detector, if any, has claimed an hour's excess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Free,
    Cooling,
    Oven,
    Dryer,
}

/// Decompose the series into per-device estimates.
pub fn disaggregate(series: &NormalizedSeries, config: &AnalysisConfig) -> DeviceAnalysis {
    let days = series.days();
    let total_kwh = series.total_kwh();

    let mut cooling_kwh = 0.0;
    let mut oven_kwh = 0.0;
    let mut dryer_kwh = 0.0;
    let mut baseload_total_kwh = 0.0;

    // Per-day claims, kept for the window composition below.
    let mut day_claims: Vec<Vec<Claim>> = Vec::with_capacity(days.len());
    let mut day_baseloads: Vec<f64> = Vec::with_capacity(days.len());

    for day in &days {
        let base = baseline::day_baseload_hourly(day);
        let mut claims = vec![Claim::Free; day.samples.len()];

        cooling_kwh += claim_cooling(day, base, config, &mut claims);
        oven_kwh += claim_oven(day, base, config, &mut claims);
        dryer_kwh += claim_dryer(day, base, config, &mut claims);
        baseload_total_kwh += base * 24.0;

        day_claims.push(claims);
        day_baseloads.push(base);
    }

    let fridge_kwh_est = baseload_total_kwh * config.fridge_fraction;
    let tv_elec_kwh_est = baseload_total_kwh * config.tv_fraction;
    let misc_kwh_est = (baseload_total_kwh - fridge_kwh_est - tv_elec_kwh_est).max(0.0);

    let other_kwh =
        (total_kwh - (cooling_kwh + oven_kwh + dryer_kwh + baseload_total_kwh)).max(0.0);

    debug!(
        "disaggregated {:.1} kWh: cooling {:.1}, oven {:.1}, dryer {:.1}, baseload {:.1}, other {:.1}",
        total_kwh, cooling_kwh, oven_kwh, dryer_kwh, baseload_total_kwh, other_kwh
    );

    let composition_top4_avg =
        window_composition(&days, &day_claims, &day_baseloads, config);

    DeviceAnalysis {
        breakdown: DeviceBreakdown {
            cooling_kwh: round1(cooling_kwh),
            oven_kwh: round1(oven_kwh),
            dryer_kwh: round1(dryer_kwh),
            baseload_total_kwh: round1(baseload_total_kwh),
            fridge_kwh_est: round1(fridge_kwh_est),
            tv_elec_kwh_est: round1(tv_elec_kwh_est),
            misc_kwh_est: round1(misc_kwh_est),
            other_kwh: round1(other_kwh),
        },
        composition_top4_avg,
    }
}

// ── Detectors ─────────────────────────────────────────────────────────────────
//
// Each detector returns the kWh it attributes for one day and marks the
// hours it claimed. Detectors only ever touch `Claim::Free` hours.

/// Cooling: daytime excess above baseload on cooling-season days. Mirrors
/// the summary's cooling definition exactly (same shared baseline), so the
/// breakdown's figure is the cross-referenced value, not a recomputation.
fn claim_cooling(
    day: &DaySlice<'_>,
    base: f64,
    config: &AnalysisConfig,
    claims: &mut [Claim],
) -> f64 {
    if !config.is_cooling_month(day.month()) {
        return 0.0;
    }
    let mut attributed = 0.0;
    for (i, sample) in day.samples.iter().enumerate() {
        if config.cooling_hours.contains(&sample.hour.hour()) && sample.kwh > base {
            claims[i] = Claim::Cooling;
            attributed += sample.kwh - base;
        }
    }
    attributed
}

/// Oven: late-afternoon spikes well above baseload, capped per day so a
/// cooling spike sharing the window cannot be double-counted.
fn claim_oven(
    day: &DaySlice<'_>,
    base: f64,
    config: &AnalysisConfig,
    claims: &mut [Claim],
) -> f64 {
    let mut attributed = 0.0;
    for (i, sample) in day.samples.iter().enumerate() {
        if claims[i] != Claim::Free {
            continue;
        }
        if config.oven_hours.contains(&sample.hour.hour())
            && sample.kwh > base + config.oven_spike_kwh
        {
            claims[i] = Claim::Oven;
            attributed += sample.kwh - base;
        }
    }
    attributed.min(config.oven_daily_cap_kwh)
}

/// Dryer: a sustained spike (at least `dryer_min_run_hours` consecutive
/// hours above the higher threshold) on hours no other detector claimed.
fn claim_dryer(
    day: &DaySlice<'_>,
    base: f64,
    config: &AnalysisConfig,
    claims: &mut [Claim],
) -> f64 {
    fn qualifies(day: &DaySlice<'_>, claims: &[Claim], threshold: f64, i: usize) -> bool {
        claims[i] == Claim::Free && day.samples[i].kwh > threshold
    }
    let threshold = base + config.dryer_spike_kwh;

    let mut attributed = 0.0;
    let mut i = 0usize;
    while i < day.samples.len() {
        if !qualifies(day, claims, threshold, i) {
            i += 1;
            continue;
        }
        let start = i;
        while i < day.samples.len() && qualifies(day, claims, threshold, i) {
            i += 1;
        }
        if i - start >= config.dryer_min_run_hours {
            for j in start..i {
                claims[j] = Claim::Dryer;
                attributed += day.samples[j].kwh - base;
            }
        }
    }
    attributed
}

// ── Window composition ────────────────────────────────────────────────────────

/// Average composition of the daily top-4 window.
///
/// For each day with a window, the window's energy splits into baseload,
/// hvac, oven, dryer and a non-negative remainder; the splits are averaged
/// across days and expressed as kWh plus percent of the average window
/// total. Empty when no day has a window.
fn window_composition(
    days: &[DaySlice<'_>],
    day_claims: &[Vec<Claim>],
    day_baseloads: &[f64],
    config: &AnalysisConfig,
) -> Vec<CompositionSlice> {
    let width = config.top_window_hours;
    // [baseload, hvac, oven, dryer, other]
    let mut sums = [0.0f64; 5];
    let mut window_days = 0usize;

    for ((day, claims), &base) in days.iter().zip(day_claims).zip(day_baseloads) {
        let Some((start_hour, window_kwh)) = baseline::day_top_window(day, width) else {
            continue;
        };
        let start_idx = (start_hour - day.first_hour()) as usize;

        let mut hvac = 0.0;
        let mut oven = 0.0;
        let mut dryer = 0.0;
        for i in start_idx..start_idx + width {
            let excess = (day.samples[i].kwh - base).max(0.0);
            match claims[i] {
                Claim::Cooling => hvac += excess,
                Claim::Oven => oven += excess,
                Claim::Dryer => dryer += excess,
                Claim::Free => {}
            }
        }
        let base_part = base * width as f64;
        let other = (window_kwh - base_part - hvac - oven - dryer).max(0.0);

        sums[0] += base_part;
        sums[1] += hvac;
        sums[2] += oven;
        sums[3] += dryer;
        sums[4] += other;
        window_days += 1;
    }

    // Percentages are taken against the component sum, not the raw window
    // total, so they reconstruct 100% even when an unclaimed hour sat below
    // the day's baseload.
    let comp_total: f64 = sums.iter().sum();
    if window_days == 0 || comp_total <= 0.0 {
        return Vec::new();
    }

    let n = window_days as f64;
    let slice = |component: ComponentTag, sum: f64| CompositionSlice {
        component,
        kwh: round2(sum / n),
        pct: round1(sum / comp_total * 100.0),
    };

    vec![
        slice(ComponentTag::Hvac, sums[1]),
        slice(ComponentTag::Oven, sums[2]),
        slice(ComponentTag::Dryer, sums[3]),
        slice(ComponentTag::Baseload, sums[0]),
        slice(ComponentTag::Other, sums[4]),
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use energy_core::models::HourlySample;

    fn series_from_days(start: (i32, u32, u32), day_values: &[[f64; 24]]) -> NormalizedSeries {
        let first = NaiveDate::from_ymd_opt(start.0, start.1, start.2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut samples = Vec::new();
        for (d, values) in day_values.iter().enumerate() {
            for (h, &kwh) in values.iter().enumerate() {
                samples.push(HourlySample {
                    hour: first + chrono::Duration::hours((d * 24 + h) as i64),
                    kwh,
                });
            }
        }
        NormalizedSeries::new(samples)
    }

    fn cfg() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    // ── Whole-series reconciliation ───────────────────────────────────────────

    #[test]
    fn test_flat_month_all_baseload() {
        let days = [[1.0; 24]; 30];
        let series = series_from_days((2024, 3, 4), &days);
        let analysis = disaggregate(&series, &cfg());
        let b = &analysis.breakdown;

        assert_eq!(b.baseload_total_kwh, 720.0);
        assert_eq!(b.fridge_kwh_est, 216.0); // 30%
        assert_eq!(b.tv_elec_kwh_est, 288.0); // 40%
        assert_eq!(b.misc_kwh_est, 216.0); // remainder
        assert_eq!(b.cooling_kwh, 0.0);
        assert_eq!(b.oven_kwh, 0.0);
        assert_eq!(b.dryer_kwh, 0.0);
        assert_eq!(b.other_kwh, 0.0);
        assert!((b.partition_sum() - 720.0).abs() < 1e-6);
    }

    #[test]
    fn test_partition_sums_to_total_with_activity() {
        let mut day = [0.6; 24];
        day[18] = 3.0; // oven-ish spike
        day[21] = 3.0;
        day[22] = 3.0; // dryer run
        let days = vec![day; 10];
        let series = series_from_days((2024, 3, 4), &days);
        let analysis = disaggregate(&series, &cfg());
        let b = &analysis.breakdown;
        let total = series.total_kwh();
        assert!((b.partition_sum() - total).abs() <= total * 0.005 + 0.5);
        assert!(b.other_kwh >= 0.0);
    }

    // ── Oven detector ─────────────────────────────────────────────────────────

    #[test]
    fn test_single_evening_spike_reads_as_oven() {
        let mut day = [0.5; 24];
        day[18] = 10.0;
        let series = series_from_days((2024, 3, 4), &[day]);
        let analysis = disaggregate(&series, &cfg());
        // 9.5 kWh excess, capped at the daily maximum.
        assert_eq!(analysis.breakdown.oven_kwh, 4.0);
        assert_eq!(analysis.breakdown.dryer_kwh, 0.0);
    }

    #[test]
    fn test_oven_ignores_hours_outside_window() {
        let mut day = [0.5; 24];
        day[10] = 5.0; // strong spike, but mid-morning
        let series = series_from_days((2024, 3, 4), &[day]);
        let analysis = disaggregate(&series, &cfg());
        assert_eq!(analysis.breakdown.oven_kwh, 0.0);
    }

    #[test]
    fn test_oven_skips_hours_claimed_by_cooling() {
        // July afternoon: hours 16-17 hot enough to exceed both thresholds.
        let mut day = [0.5; 24];
        day[16] = 4.0;
        day[17] = 4.0;
        let series = series_from_days((2024, 7, 1), &[day]);
        let analysis = disaggregate(&series, &cfg());
        // Cooling claims 16 and 17 first (they sit in the cooling window of
        // a cooling-season day), so the oven sees nothing.
        assert!(analysis.breakdown.cooling_kwh > 0.0);
        assert_eq!(analysis.breakdown.oven_kwh, 0.0);
    }

    // ── Dryer detector ────────────────────────────────────────────────────────

    #[test]
    fn test_sustained_late_spike_reads_as_dryer() {
        let mut day = [0.5; 24];
        day[21] = 3.5;
        day[22] = 3.5; // two consecutive hours, 3.0 excess each
        let series = series_from_days((2024, 3, 4), &[day]);
        let analysis = disaggregate(&series, &cfg());
        assert_eq!(analysis.breakdown.dryer_kwh, 6.0);
        assert_eq!(analysis.breakdown.oven_kwh, 0.0);
    }

    #[test]
    fn test_one_hour_spike_is_not_a_dryer() {
        let mut day = [0.5; 24];
        day[21] = 3.5;
        let series = series_from_days((2024, 3, 4), &[day]);
        let analysis = disaggregate(&series, &cfg());
        assert_eq!(analysis.breakdown.dryer_kwh, 0.0);
    }

    #[test]
    fn test_dryer_excludes_oven_claimed_hours() {
        // 17:00-18:00 qualify for both detectors; the oven runs first.
        let mut day = [0.5; 24];
        day[17] = 4.0;
        day[18] = 4.0;
        let series = series_from_days((2024, 3, 4), &[day]);
        let analysis = disaggregate(&series, &cfg());
        assert!(analysis.breakdown.oven_kwh > 0.0);
        assert_eq!(analysis.breakdown.dryer_kwh, 0.0);
    }

    // ── Composition ───────────────────────────────────────────────────────────

    #[test]
    fn test_composition_flat_day_is_all_baseload() {
        let series = series_from_days((2024, 3, 4), &[[1.0; 24]]);
        let analysis = disaggregate(&series, &cfg());
        let comp = &analysis.composition_top4_avg;
        assert_eq!(comp.len(), 5);
        let baseload = comp
            .iter()
            .find(|c| c.component == ComponentTag::Baseload)
            .unwrap();
        assert_eq!(baseload.kwh, 4.0);
        assert_eq!(baseload.pct, 100.0);
        let pct_sum: f64 = comp.iter().map(|c| c.pct).sum();
        assert!((pct_sum - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_composition_percentages_sum_to_hundred() {
        let mut day = [0.5; 24];
        day[17] = 4.0;
        day[18] = 4.0;
        day[21] = 3.0;
        let days = vec![day; 5];
        let series = series_from_days((2024, 7, 1), &days);
        let analysis = disaggregate(&series, &cfg());
        let pct_sum: f64 = analysis.composition_top4_avg.iter().map(|c| c.pct).sum();
        assert!((pct_sum - 100.0).abs() < 0.5, "pct_sum = {pct_sum}");
    }

    #[test]
    fn test_composition_empty_for_zero_series() {
        let series = series_from_days((2024, 3, 4), &[[0.0; 24]]);
        let analysis = disaggregate(&series, &cfg());
        assert!(analysis.composition_top4_avg.is_empty());
    }
}
