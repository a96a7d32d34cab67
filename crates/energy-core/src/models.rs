use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

// ── Input side ────────────────────────────────────────────────────────────────

/// A single validated interval reading from the meter.
///
/// `timestamp` is local wall-clock time as reported by the utility; the
/// source granularity is typically 15 minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub timestamp: NaiveDateTime,
    /// Energy consumed during the interval, kWh. Never negative.
    pub kwh: f64,
}

/// One hour of the normalized series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySample {
    /// Local datetime truncated to the hour.
    pub hour: NaiveDateTime,
    /// Energy for the hour, kWh. On an hourly grid this numerically equals
    /// average demand in kW.
    pub kwh: f64,
}

/// Contiguous hourly series covering the observed span, one sample per
/// clock hour, no duplicates. Owned exclusively by one pipeline run and
/// discarded after report assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    samples: Vec<HourlySample>,
}

impl NormalizedSeries {
    /// Wrap a pre-built sample vector. The normalizer guarantees ordering
    /// and contiguity; this constructor only asserts in debug builds.
    pub fn new(samples: Vec<HourlySample>) -> Self {
        debug_assert!(samples.windows(2).all(|w| {
            w[1].hour - w[0].hour == chrono::Duration::hours(1)
        }));
        Self { samples }
    }

    pub fn samples(&self) -> &[HourlySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of all hourly values.
    pub fn total_kwh(&self) -> f64 {
        self.samples.iter().map(|s| s.kwh).sum()
    }

    /// Split the series into per-calendar-day slices, in date order.
    ///
    /// The first and last day may be partial.
    pub fn days(&self) -> Vec<DaySlice<'_>> {
        let mut days = Vec::new();
        let mut start = 0usize;
        for i in 1..=self.samples.len() {
            let boundary = i == self.samples.len()
                || self.samples[i].hour.date() != self.samples[start].hour.date();
            if boundary {
                days.push(DaySlice {
                    date: self.samples[start].hour.date(),
                    samples: &self.samples[start..i],
                });
                start = i;
            }
        }
        days
    }
}

/// All samples of one calendar day, borrowed from the series.
#[derive(Debug, Clone, Copy)]
pub struct DaySlice<'a> {
    pub date: NaiveDate,
    pub samples: &'a [HourlySample],
}

impl DaySlice<'_> {
    /// The day's hourly kWh values, in hour order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.kwh).collect()
    }

    /// Total energy for the day, kWh.
    pub fn total_kwh(&self) -> f64 {
        self.samples.iter().map(|s| s.kwh).sum()
    }

    /// Local hour (0-23) of the first sample.
    pub fn first_hour(&self) -> u32 {
        self.samples.first().map(|s| s.hour.hour()).unwrap_or(0)
    }

    /// Whether this date is a Saturday or Sunday.
    pub fn is_weekend(&self) -> bool {
        matches!(
            self.date.weekday(),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        )
    }

    /// Calendar month of this day, 1-12.
    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

// ── Report contract ───────────────────────────────────────────────────────────
//
// Field names and nesting below are the wire format consumed by dashboards
// and exporters; any change to them is a breaking change.

/// Consumption summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_kwh: f64,
    pub days: u32,
    pub avg_daily_kwh: f64,
    pub peak_kw: f64,
    /// Local time of the peak hour, `"%Y-%m-%d %H:%M"`.
    pub peak_time_local: String,
    pub baseload_kwh_per_day: f64,
    pub cooling_kwh: f64,
    pub heating_kwh: f64,
    pub top4_share_pct: f64,
    /// Most frequent weekday start of the daily top-4 window, `"HH:00"`.
    pub top4_start_mode_weekday: String,
    /// Most frequent weekend start of the daily top-4 window, `"HH:00"`.
    pub top4_start_mode_weekend: String,
    pub evening_share_pct: f64,
}

/// Heuristic per-device energy decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBreakdown {
    pub cooling_kwh: f64,
    pub oven_kwh: f64,
    pub dryer_kwh: f64,
    pub baseload_total_kwh: f64,
    pub fridge_kwh_est: f64,
    pub tv_elec_kwh_est: f64,
    pub misc_kwh_est: f64,
    pub other_kwh: f64,
}

impl DeviceBreakdown {
    /// Sum of the true partition of total consumption. `baseload_total_kwh`
    /// is the parent of the fridge/tv/misc split, so it is not an extra
    /// term here.
    pub fn partition_sum(&self) -> f64 {
        self.cooling_kwh
            + self.oven_kwh
            + self.dryer_kwh
            + self.fridge_kwh_est
            + self.tv_elec_kwh_est
            + self.misc_kwh_est
            + self.other_kwh
    }
}

/// One of the ten highest-demand hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandPeak {
    /// Local time of the hour, `"%Y-%m-%d %H:%M"`.
    pub timestamp: String,
    #[serde(rename = "kW")]
    pub kw: f64,
    #[serde(rename = "kWh")]
    pub kwh: f64,
}

/// Peak-timing analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingProfile {
    /// Start hour (`"00"`-`"23"`) of each day's top-4 window → day count.
    /// Ordered map so serialization is deterministic.
    pub top4_start_distribution: BTreeMap<String, u32>,
    /// Highest-demand hours, descending by kW, ties by earliest timestamp.
    pub top10_demand: Vec<DemandPeak>,
}

/// Daily total for the `series.daily` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEnergy {
    /// `"%Y-%m-%d"`.
    pub date: String,
    #[serde(rename = "kWh")]
    pub kwh: f64,
}

/// Monthly total for the `series.monthly` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEnergy {
    /// `"%Y-%m"`.
    pub month: String,
    #[serde(rename = "kWh")]
    pub kwh: f64,
}

/// Mean consumption for one clock hour across all days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyProfilePoint {
    pub hour: u32,
    #[serde(rename = "kWh_per_hour")]
    pub kwh_per_hour: f64,
}

/// Chart-ready series tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTables {
    pub daily: Vec<DailyEnergy>,
    pub monthly: Vec<MonthlyEnergy>,
    pub hourly_profile: Vec<HourlyProfilePoint>,
}

/// Component categories of the top-4 window composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentTag {
    Baseload,
    Hvac,
    Oven,
    Dryer,
    Other,
}

impl ComponentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentTag::Baseload => "baseload",
            ComponentTag::Hvac => "hvac",
            ComponentTag::Oven => "oven",
            ComponentTag::Dryer => "dryer",
            ComponentTag::Other => "other",
        }
    }
}

/// One component of the average top-4 window composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSlice {
    pub component: ComponentTag,
    #[serde(rename = "kWh")]
    pub kwh: f64,
    pub pct: f64,
}

/// Savings-potential tier of a recommendation card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactTier {
    High,
    Medium,
    Low,
}

impl ImpactTier {
    /// Sort rank: high sorts before medium before low.
    pub fn rank(&self) -> u8 {
        match self {
            ImpactTier::High => 0,
            ImpactTier::Medium => 1,
            ImpactTier::Low => 2,
        }
    }
}

/// One prioritized action card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCard {
    pub title: String,
    pub impact: ImpactTier,
    pub why: String,
    pub actions: Vec<String>,
}

/// Cards plus the narrative paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub cards: Vec<RecommendationCard>,
    pub narrative: String,
}

/// The complete, validated analysis report. Immutable once assembled;
/// lifecycle is one pipeline run, no persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: SummaryMetrics,
    pub devices: DeviceBreakdown,
    pub timing: TimingProfile,
    pub series: SeriesTables,
    pub composition_top4_avg: Vec<CompositionSlice>,
    pub recommendations: Recommendations,
    /// Warnings accumulated during processing (skipped rows, filled gaps).
    pub notes: Vec<String>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
