//! Report assembly and cross-field invariant validation.
//!
//! The assembled report is the sole contract between the engine and every
//! consumer; an invariant violation here is always a bug signal and must
//! never reach a client silently wrong, so assembly fails loudly instead.

use energy_core::config::AnalysisConfig;
use energy_core::error::{AnalysisError, Result};
use energy_core::models::{AnalysisReport, Recommendations, SeriesTables, SummaryMetrics, TimingProfile};

use crate::devices::DeviceAnalysis;

/// Absolute slack added to the relative device-sum tolerance, covering
/// per-field rounding on small totals.
const ROUNDING_SLACK_KWH: f64 = 0.5;

/// Relative tolerance for the device partition sum.
const DEVICE_SUM_TOLERANCE: f64 = 0.005;

/// Compose and validate the final report.
pub fn assemble(
    summary: SummaryMetrics,
    device_analysis: DeviceAnalysis,
    timing: TimingProfile,
    series: SeriesTables,
    recommendations: Recommendations,
    notes: Vec<String>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    let report = AnalysisReport {
        summary,
        devices: device_analysis.breakdown,
        timing,
        series,
        composition_top4_avg: device_analysis.composition_top4_avg,
        recommendations,
        notes,
    };
    validate(&report, config)?;
    Ok(report)
}

/// Check every cross-component invariant, naming the violated one.
fn validate(report: &AnalysisReport, config: &AnalysisConfig) -> Result<()> {
    let summary = &report.summary;
    let devices = &report.devices;

    // Percentages live in [0, 100].
    for (name, value) in [
        ("summary.top4_share_pct", summary.top4_share_pct),
        ("summary.evening_share_pct", summary.evening_share_pct),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(AnalysisError::ReportValidation(format!(
                "{name} out of range: {value}"
            )));
        }
    }
    for slice in &report.composition_top4_avg {
        if !(0.0..=100.0).contains(&slice.pct) {
            return Err(AnalysisError::ReportValidation(format!(
                "composition pct for {} out of range: {}",
                slice.component.as_str(),
                slice.pct
            )));
        }
    }

    // Every device field is non-negative.
    for (name, value) in [
        ("cooling_kwh", devices.cooling_kwh),
        ("oven_kwh", devices.oven_kwh),
        ("dryer_kwh", devices.dryer_kwh),
        ("baseload_total_kwh", devices.baseload_total_kwh),
        ("fridge_kwh_est", devices.fridge_kwh_est),
        ("tv_elec_kwh_est", devices.tv_elec_kwh_est),
        ("misc_kwh_est", devices.misc_kwh_est),
        ("other_kwh", devices.other_kwh),
    ] {
        if value < 0.0 {
            return Err(AnalysisError::ReportValidation(format!(
                "devices.{name} is negative: {value}"
            )));
        }
    }

    // The device partition reconstructs the total.
    if summary.total_kwh > 0.0 {
        let tolerance = summary.total_kwh * DEVICE_SUM_TOLERANCE + ROUNDING_SLACK_KWH;
        let diff = (devices.partition_sum() - summary.total_kwh).abs();
        if diff > tolerance {
            return Err(AnalysisError::ReportValidation(format!(
                "device partition sum {:.2} differs from total {:.2} by {:.2} (tolerance {:.2})",
                devices.partition_sum(),
                summary.total_kwh,
                diff,
                tolerance
            )));
        }
        let split = devices.fridge_kwh_est + devices.tv_elec_kwh_est + devices.misc_kwh_est;
        if (split - devices.baseload_total_kwh).abs() > ROUNDING_SLACK_KWH {
            return Err(AnalysisError::ReportValidation(format!(
                "baseload split {:.2} differs from baseload_total_kwh {:.2}",
                split, devices.baseload_total_kwh
            )));
        }
    }

    // Demand peaks: bounded length, non-increasing.
    if report.timing.top10_demand.len() > config.top_demand_count {
        return Err(AnalysisError::ReportValidation(format!(
            "top10_demand has {} entries (limit {})",
            report.timing.top10_demand.len(),
            config.top_demand_count
        )));
    }
    if report
        .timing
        .top10_demand
        .windows(2)
        .any(|w| w[0].kw < w[1].kw)
    {
        return Err(AnalysisError::ReportValidation(
            "top10_demand is not sorted by descending kW".to_string(),
        ));
    }

    // Composition percentages sum to 100 within rounding.
    if !report.composition_top4_avg.is_empty() {
        let pct_sum: f64 = report.composition_top4_avg.iter().map(|s| s.pct).sum();
        if (pct_sum - 100.0).abs() > 0.5 {
            return Err(AnalysisError::ReportValidation(format!(
                "composition percentages sum to {pct_sum:.1}, expected 100"
            )));
        }
    }

    // Recommendations: capped, and present unless the data is degenerate.
    if report.recommendations.cards.len() > config.max_cards {
        return Err(AnalysisError::ReportValidation(format!(
            "{} recommendation cards exceed the cap of {}",
            report.recommendations.cards.len(),
            config.max_cards
        )));
    }
    if report.recommendations.cards.is_empty() && summary.total_kwh > 0.0 {
        return Err(AnalysisError::ReportValidation(
            "no recommendation cards for non-degenerate data".to_string(),
        ));
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use energy_core::models::{
        DemandPeak, DeviceBreakdown, ImpactTier, RecommendationCard,
    };
    use std::collections::BTreeMap;

    fn summary() -> SummaryMetrics {
        SummaryMetrics {
            total_kwh: 720.0,
            days: 30,
            avg_daily_kwh: 24.0,
            peak_kw: 1.0,
            peak_time_local: "2024-03-04 00:00".to_string(),
            baseload_kwh_per_day: 24.0,
            cooling_kwh: 0.0,
            heating_kwh: 0.0,
            top4_share_pct: 16.7,
            top4_start_mode_weekday: "00:00".to_string(),
            top4_start_mode_weekend: "00:00".to_string(),
            evening_share_pct: 16.7,
        }
    }

    fn devices() -> DeviceBreakdown {
        DeviceBreakdown {
            cooling_kwh: 0.0,
            oven_kwh: 0.0,
            dryer_kwh: 0.0,
            baseload_total_kwh: 720.0,
            fridge_kwh_est: 216.0,
            tv_elec_kwh_est: 288.0,
            misc_kwh_est: 216.0,
            other_kwh: 0.0,
        }
    }

    fn analysis() -> DeviceAnalysis {
        DeviceAnalysis {
            breakdown: devices(),
            composition_top4_avg: Vec::new(),
        }
    }

    fn timing() -> TimingProfile {
        TimingProfile {
            top4_start_distribution: BTreeMap::new(),
            top10_demand: vec![
                DemandPeak {
                    timestamp: "2024-03-04 18:00".to_string(),
                    kw: 2.0,
                    kwh: 2.0,
                },
                DemandPeak {
                    timestamp: "2024-03-04 19:00".to_string(),
                    kw: 1.0,
                    kwh: 1.0,
                },
            ],
        }
    }

    fn recommendations() -> Recommendations {
        Recommendations {
            cards: vec![RecommendationCard {
                title: "card".to_string(),
                impact: ImpactTier::Low,
                why: "why".to_string(),
                actions: vec!["do".to_string()],
            }],
            narrative: "narrative".to_string(),
        }
    }

    fn empty_series() -> SeriesTables {
        SeriesTables {
            daily: Vec::new(),
            monthly: Vec::new(),
            hourly_profile: Vec::new(),
        }
    }

    #[test]
    fn test_assemble_valid_report() {
        let report = assemble(
            summary(),
            analysis(),
            timing(),
            empty_series(),
            recommendations(),
            vec!["note".to_string()],
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(report.notes, vec!["note".to_string()]);
    }

    #[test]
    fn test_device_sum_mismatch_rejected() {
        let mut bad = analysis();
        bad.breakdown.other_kwh = 300.0; // partition now far exceeds total
        let err = assemble(
            summary(),
            bad,
            timing(),
            empty_series(),
            recommendations(),
            vec![],
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "report_validation");
        assert!(err.to_string().contains("partition sum"));
    }

    #[test]
    fn test_negative_device_field_rejected() {
        let mut bad = analysis();
        bad.breakdown.other_kwh = -1.0;
        let err = assemble(
            summary(),
            bad,
            timing(),
            empty_series(),
            recommendations(),
            vec![],
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_percentage_out_of_range_rejected() {
        let mut s = summary();
        s.evening_share_pct = 120.0;
        let err = assemble(
            s,
            analysis(),
            timing(),
            empty_series(),
            recommendations(),
            vec![],
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("evening_share_pct"));
    }

    #[test]
    fn test_unsorted_top10_rejected() {
        let mut t = timing();
        t.top10_demand.reverse();
        let err = assemble(
            summary(),
            analysis(),
            t,
            empty_series(),
            recommendations(),
            vec![],
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("descending"));
    }

    #[test]
    fn test_missing_cards_rejected_for_real_data() {
        let err = assemble(
            summary(),
            analysis(),
            timing(),
            empty_series(),
            Recommendations {
                cards: Vec::new(),
                narrative: String::new(),
            },
            vec![],
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no recommendation cards"));
    }

    #[test]
    fn test_missing_cards_allowed_for_degenerate_data() {
        let mut s = summary();
        s.total_kwh = 0.0;
        s.baseload_kwh_per_day = 0.0;
        let mut a = analysis();
        a.breakdown = DeviceBreakdown {
            cooling_kwh: 0.0,
            oven_kwh: 0.0,
            dryer_kwh: 0.0,
            baseload_total_kwh: 0.0,
            fridge_kwh_est: 0.0,
            tv_elec_kwh_est: 0.0,
            misc_kwh_est: 0.0,
            other_kwh: 0.0,
        };
        let report = assemble(
            s,
            a,
            TimingProfile {
                top4_start_distribution: BTreeMap::new(),
                top10_demand: Vec::new(),
            },
            empty_series(),
            Recommendations {
                cards: Vec::new(),
                narrative: String::new(),
            },
            vec![],
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert!(report.recommendations.cards.is_empty());
    }
}
