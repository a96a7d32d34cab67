//! Rule-based action recommendations.
//!
//! A fixed, ordered table of condition → card rules over the outputs of the
//! three analyzers. All satisfied rules are included, sorted by impact tier
//! then rule priority, capped at the configured maximum. No card ever
//! references a device category with zero estimated energy.

use energy_core::config::AnalysisConfig;
use energy_core::models::{
    DeviceBreakdown, ImpactTier, RecommendationCard, Recommendations, SummaryMetrics,
};
use tracing::debug;

// ── Rule table ────────────────────────────────────────────────────────────────

struct Rule {
    /// Lower sorts first within the same impact tier.
    priority: u8,
    build: fn(&SummaryMetrics, &DeviceBreakdown) -> Option<RecommendationCard>,
}

/// Fixed rule table, evaluated in order. Each builder returns `None` when
/// its condition is not satisfied.
const RULES: &[Rule] = &[
    Rule {
        priority: 10,
        build: hvac_precool,
    },
    Rule {
        priority: 20,
        build: baseload_cut,
    },
    Rule {
        priority: 30,
        build: peak_shift,
    },
    Rule {
        priority: 40,
        build: off_peak_plan,
    },
    Rule {
        priority: 50,
        build: cooking_shift,
    },
    Rule {
        priority: 60,
        build: laundry_off_peak,
    },
];

/// Cooling dominates the bill: share of total above 35%.
fn hvac_precool(summary: &SummaryMetrics, devices: &DeviceBreakdown) -> Option<RecommendationCard> {
    if summary.total_kwh <= 0.0 || devices.cooling_kwh <= 0.0 {
        return None;
    }
    let share = devices.cooling_kwh / summary.total_kwh * 100.0;
    if share <= 35.0 {
        return None;
    }
    Some(RecommendationCard {
        title: "Pre-cool before the evening peak, then let the thermostat float".to_string(),
        impact: ImpactTier::High,
        why: format!(
            "Cooling accounts for about {share:.0}% of your usage; shifting HVAC out of the \
             hottest hours cuts on-peak cooling."
        ),
        actions: vec![
            "Pre-cool 3-6 pm, then raise the setpoint 2\u{b0}F from 6-10 pm".to_string(),
            "Replace filters monthly".to_string(),
            "Seal ducts and shade sun-facing windows".to_string(),
        ],
    })
}

/// Always-on load is heavy: 10 kWh/day or more of baseload.
fn baseload_cut(summary: &SummaryMetrics, _devices: &DeviceBreakdown) -> Option<RecommendationCard> {
    if summary.baseload_kwh_per_day < 10.0 {
        return None;
    }
    Some(RecommendationCard {
        title: "Cut baseload ~20% with smart-plug schedules".to_string(),
        impact: ImpactTier::High,
        why: format!(
            "Always-on devices draw about {:.0} kWh every day, around the clock.",
            summary.baseload_kwh_per_day
        ),
        actions: vec![
            "Schedule power strips off overnight".to_string(),
            "Enable aggressive sleep on TVs and monitors".to_string(),
            "Set the fridge to 37-40\u{b0}F and clean the coils".to_string(),
        ],
    })
}

/// Usage concentrates in one window: top-4 share above 25%.
fn peak_shift(summary: &SummaryMetrics, _devices: &DeviceBreakdown) -> Option<RecommendationCard> {
    if summary.top4_share_pct <= 25.0 {
        return None;
    }
    Some(RecommendationCard {
        title: "Shift flexible loads out of your daily peak window".to_string(),
        impact: ImpactTier::Medium,
        why: format!(
            "Your biggest 4-hour window holds about {:.0}% of a typical day's usage.",
            summary.top4_share_pct
        ),
        actions: vec![
            format!(
                "Move dishwasher and laundry starts away from {}",
                summary.top4_start_mode_weekday
            ),
            "Use delay-start timers on large appliances".to_string(),
        ],
    })
}

/// Evenings are heavy: evening share above 30%.
fn off_peak_plan(summary: &SummaryMetrics, _devices: &DeviceBreakdown) -> Option<RecommendationCard> {
    if summary.evening_share_pct <= 30.0 {
        return None;
    }
    Some(RecommendationCard {
        title: "Compare fixed-rate vs time-of-use plans".to_string(),
        impact: ImpactTier::Medium,
        why: format!(
            "Evenings (7-11 pm) carry about {:.0}% of your daily usage, which time-of-use \
             and free-nights plans reward.",
            summary.evening_share_pct
        ),
        actions: vec![
            "Review the last 12 months of usage shape before switching".to_string(),
            "Nudge dishwasher and laundry starts past 9 pm".to_string(),
        ],
    })
}

/// Oven activity detected.
fn cooking_shift(_summary: &SummaryMetrics, devices: &DeviceBreakdown) -> Option<RecommendationCard> {
    if devices.oven_kwh <= 0.0 {
        return None;
    }
    Some(RecommendationCard {
        title: "Cook earlier; use convection or an air fryer for small meals".to_string(),
        impact: ImpactTier::Medium,
        why: "Cooking overlaps with cooling and laundry to create short, expensive peaks."
            .to_string(),
        actions: vec![
            "Batch-cook before 6 pm or after 8 pm".to_string(),
            "Prefer the microwave or air fryer over the full oven".to_string(),
        ],
    })
}

/// Dryer activity detected.
fn laundry_off_peak(
    _summary: &SummaryMetrics,
    devices: &DeviceBreakdown,
) -> Option<RecommendationCard> {
    if devices.dryer_kwh <= 0.0 {
        return None;
    }
    Some(RecommendationCard {
        title: "Run laundry off-peak and in full loads".to_string(),
        impact: ImpactTier::Low,
        why: "Dryer cycles are sustained multi-hour loads that are easy to move.".to_string(),
        actions: vec![
            "Start the dryer after 9 pm".to_string(),
            "Clean the lint filter to shorten cycles".to_string(),
        ],
    })
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Evaluate the rule table and produce the capped, ordered card list plus
/// the narrative paragraph.
pub fn recommend(
    summary: &SummaryMetrics,
    devices: &DeviceBreakdown,
    config: &AnalysisConfig,
) -> Recommendations {
    let mut fired: Vec<(u8, RecommendationCard)> = RULES
        .iter()
        .filter_map(|rule| (rule.build)(summary, devices).map(|card| (rule.priority, card)))
        .collect();

    if fired.is_empty() && summary.total_kwh > 0.0 {
        fired.push((
            u8::MAX,
            RecommendationCard {
                title: "Nice work - usage is balanced".to_string(),
                impact: ImpactTier::Low,
                why: "No strong load concentration detected.".to_string(),
                actions: vec![
                    "Keep filters fresh and thermostats on a schedule".to_string(),
                    "Review your plan annually".to_string(),
                ],
            },
        ));
    }

    fired.sort_by_key(|(priority, card)| (card.impact.rank(), *priority));
    let cards: Vec<RecommendationCard> = fired
        .into_iter()
        .take(config.max_cards)
        .map(|(_, card)| card)
        .collect();

    debug!("{} recommendation cards after cap", cards.len());

    Recommendations {
        narrative: narrative(summary, devices),
        cards,
    }
}

/// One-paragraph narrative interpolating the top contributing metrics.
fn narrative(summary: &SummaryMetrics, devices: &DeviceBreakdown) -> String {
    let dominant = dominant_category(devices);
    format!(
        "Your biggest 4-hour window holds about {:.1}% of a typical day and usually starts \
         around {} on weekdays; evenings (7-11 pm) run about {:.1}%. {} is the largest share \
         of your usage - focus there first.",
        summary.top4_share_pct,
        summary.top4_start_mode_weekday,
        summary.evening_share_pct,
        dominant
    )
}

/// Human name of the device category with the most estimated energy.
fn dominant_category(devices: &DeviceBreakdown) -> &'static str {
    let candidates = [
        (devices.cooling_kwh, "Cooling"),
        (devices.baseload_total_kwh, "Always-on baseload"),
        (devices.oven_kwh, "Cooking"),
        (devices.dryer_kwh, "Laundry"),
        (devices.other_kwh, "Uncategorised use"),
    ];
    candidates
        .iter()
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, name)| *name)
        .unwrap_or("Always-on baseload")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SummaryMetrics {
        SummaryMetrics {
            total_kwh: 900.0,
            days: 30,
            avg_daily_kwh: 30.0,
            peak_kw: 5.0,
            peak_time_local: "2024-07-15 17:00".to_string(),
            baseload_kwh_per_day: 8.0,
            cooling_kwh: 0.0,
            heating_kwh: 0.0,
            top4_share_pct: 20.0,
            top4_start_mode_weekday: "17:00".to_string(),
            top4_start_mode_weekend: "12:00".to_string(),
            evening_share_pct: 15.0,
        }
    }

    fn devices() -> DeviceBreakdown {
        DeviceBreakdown {
            cooling_kwh: 0.0,
            oven_kwh: 0.0,
            dryer_kwh: 0.0,
            baseload_total_kwh: 240.0,
            fridge_kwh_est: 72.0,
            tv_elec_kwh_est: 96.0,
            misc_kwh_est: 72.0,
            other_kwh: 660.0,
        }
    }

    #[test]
    fn test_hvac_card_fires_above_35_pct() {
        let mut d = devices();
        d.cooling_kwh = 400.0; // 44% of 900
        let recs = recommend(&summary(), &d, &AnalysisConfig::default());
        assert!(recs.cards.iter().any(|c| c.title.contains("Pre-cool")));
        assert_eq!(recs.cards[0].impact, ImpactTier::High);
    }

    #[test]
    fn test_hvac_card_silent_without_cooling() {
        let recs = recommend(&summary(), &devices(), &AnalysisConfig::default());
        assert!(!recs.cards.iter().any(|c| c.title.contains("Pre-cool")));
    }

    #[test]
    fn test_baseload_card_fires_at_10_kwh_per_day() {
        let mut s = summary();
        s.baseload_kwh_per_day = 12.0;
        let recs = recommend(&s, &devices(), &AnalysisConfig::default());
        assert!(recs.cards.iter().any(|c| c.title.contains("baseload")));
    }

    #[test]
    fn test_peak_and_evening_cards_are_medium() {
        let mut s = summary();
        s.top4_share_pct = 32.0;
        s.evening_share_pct = 34.0;
        let recs = recommend(&s, &devices(), &AnalysisConfig::default());
        let titles: Vec<&str> = recs.cards.iter().map(|c| c.title.as_str()).collect();
        assert!(titles.iter().any(|t| t.contains("peak window")));
        assert!(titles.iter().any(|t| t.contains("time-of-use")));
        assert!(recs
            .cards
            .iter()
            .filter(|c| !c.title.contains("balanced"))
            .all(|c| c.impact == ImpactTier::Medium));
    }

    #[test]
    fn test_cards_sorted_high_before_medium_before_low() {
        let mut s = summary();
        s.baseload_kwh_per_day = 12.0;
        s.top4_share_pct = 30.0;
        let mut d = devices();
        d.dryer_kwh = 40.0;
        let recs = recommend(&s, &d, &AnalysisConfig::default());
        let ranks: Vec<u8> = recs.cards.iter().map(|c| c.impact.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn test_cap_respected() {
        let mut s = summary();
        s.baseload_kwh_per_day = 12.0;
        s.top4_share_pct = 30.0;
        s.evening_share_pct = 35.0;
        let mut d = devices();
        d.cooling_kwh = 400.0;
        d.oven_kwh = 30.0;
        d.dryer_kwh = 40.0;
        let config = AnalysisConfig {
            max_cards: 3,
            ..Default::default()
        };
        let recs = recommend(&s, &d, &config);
        assert_eq!(recs.cards.len(), 3);
        // The highest-impact cards survive the cap.
        assert!(recs.cards.iter().all(|c| c.impact != ImpactTier::Low));
    }

    #[test]
    fn test_fallback_card_when_nothing_fires() {
        let recs = recommend(&summary(), &devices(), &AnalysisConfig::default());
        assert_eq!(recs.cards.len(), 1);
        assert!(recs.cards[0].title.contains("balanced"));
        assert_eq!(recs.cards[0].impact, ImpactTier::Low);
    }

    #[test]
    fn test_no_card_for_degenerate_data() {
        let mut s = summary();
        s.total_kwh = 0.0;
        let recs = recommend(&s, &devices(), &AnalysisConfig::default());
        assert!(recs.cards.is_empty());
    }

    #[test]
    fn test_no_card_references_zero_kwh_category() {
        let recs = recommend(&summary(), &devices(), &AnalysisConfig::default());
        // cooling, oven and dryer are all zero: their cards must be absent.
        for card in &recs.cards {
            assert!(!card.title.contains("Pre-cool"));
            assert!(!card.title.contains("air fryer"));
            assert!(!card.title.contains("laundry off-peak"));
        }
    }

    #[test]
    fn test_narrative_names_dominant_category() {
        let mut d = devices();
        d.cooling_kwh = 500.0;
        d.other_kwh = 100.0;
        let recs = recommend(&summary(), &d, &AnalysisConfig::default());
        assert!(recs.narrative.contains("Cooling is the largest share"));
        assert!(recs.narrative.contains("20.0%"));
        assert!(recs.narrative.contains("17:00"));
    }
}
