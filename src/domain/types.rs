//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by any provider in the source chain
//! - used in-memory during aggregation
//! - exported to JSON/CSV and reloaded later

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Oldest boundary of the analysis horizon (days before `as_of`).
pub const HORIZON_DAYS: f64 = 1095.0;

/// Label of the trailing current-price marker.
pub const NOW_LABEL: &str = "NOW";

/// One of the six canonical lookback spans, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MajorSpan {
    /// 3 years ago → 1 year ago.
    #[serde(rename = "3Y")]
    ThreeYears,
    /// 1 year ago → 3 months ago.
    #[serde(rename = "1Y")]
    OneYear,
    /// 3 months ago → 1 month ago.
    #[serde(rename = "3M")]
    ThreeMonths,
    /// 1 month ago → 1 week ago.
    #[serde(rename = "1M")]
    OneMonth,
    /// 1 week ago → 1 day ago.
    #[serde(rename = "1W")]
    OneWeek,
    /// Yesterday → now.
    #[serde(rename = "1D")]
    OneDay,
}

impl MajorSpan {
    pub const ALL: [MajorSpan; 6] = [
        MajorSpan::ThreeYears,
        MajorSpan::OneYear,
        MajorSpan::ThreeMonths,
        MajorSpan::OneMonth,
        MajorSpan::OneWeek,
        MajorSpan::OneDay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MajorSpan::ThreeYears => "3Y",
            MajorSpan::OneYear => "1Y",
            MajorSpan::ThreeMonths => "3M",
            MajorSpan::OneMonth => "1M",
            MajorSpan::OneWeek => "1W",
            MajorSpan::OneDay => "1D",
        }
    }

    pub fn start_days_ago(self) -> f64 {
        match self {
            MajorSpan::ThreeYears => 1095.0,
            MajorSpan::OneYear => 365.0,
            MajorSpan::ThreeMonths => 90.0,
            MajorSpan::OneMonth => 30.0,
            MajorSpan::OneWeek => 7.0,
            MajorSpan::OneDay => 1.0,
        }
    }

    pub fn end_days_ago(self) -> f64 {
        match self {
            MajorSpan::ThreeYears => 365.0,
            MajorSpan::OneYear => 90.0,
            MajorSpan::ThreeMonths => 30.0,
            MajorSpan::OneMonth => 7.0,
            MajorSpan::OneWeek => 1.0,
            MajorSpan::OneDay => 0.0,
        }
    }
}

/// How many buckets the horizon is cut into.
///
/// Each preset is "one bucket per major span × k subdivisions" plus the NOW
/// marker: `7 = 6×1+1`, `19 = 6×3+1`, `55 = 6×9+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// 7 buckets (one per major span).
    Coarse,
    /// 19 buckets (three per major span).
    Medium,
    /// 55 buckets (nine per major span).
    Fine,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [DetailLevel::Coarse, DetailLevel::Medium, DetailLevel::Fine];

    pub fn bucket_count(self) -> usize {
        match self {
            DetailLevel::Coarse => 7,
            DetailLevel::Medium => 19,
            DetailLevel::Fine => 55,
        }
    }

    /// Map a raw bucket count onto the closest preset.
    pub fn from_bucket_count(count: usize) -> DetailLevel {
        match count {
            0..=12 => DetailLevel::Coarse,
            13..=36 => DetailLevel::Medium,
            _ => DetailLevel::Fine,
        }
    }

    /// The next preset (wrapping), used by the TUI.
    pub fn next(self) -> DetailLevel {
        match self {
            DetailLevel::Coarse => DetailLevel::Medium,
            DetailLevel::Medium => DetailLevel::Fine,
            DetailLevel::Fine => DetailLevel::Coarse,
        }
    }
}

/// What to do with an observation that carries no date at all.
///
/// Unparseable dates are always dropped; this only covers the absent case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingDatePolicy {
    /// Drop the observation.
    Drop,
    /// Place the observation on the `as_of` date.
    Today,
}

/// A date as delivered by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    Date(NaiveDate),
    Text(String),
    EpochMillis(i64),
    Other(serde_json::Value),
}

/// A number or a numeric string inside a nested amount object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountValue {
    Number(f64),
    Text(String),
}

/// Nested price object (`{ "amountIncl": 189.0, "amountExcl": 175.0 }`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAmount {
    #[serde(default)]
    pub amount_incl: Option<AmountValue>,
    #[serde(default)]
    pub amount_excl: Option<AmountValue>,
    #[serde(default)]
    pub amount: Option<AmountValue>,
}

/// A price as delivered by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
    Amount(PriceAmount),
    Other(serde_json::Value),
}

/// One record as received from a source. Nothing about it is trusted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(default, alias = "Date")]
    pub date: Option<RawDate>,
    #[serde(default, alias = "Price")]
    pub price: Option<RawPrice>,
}

impl RawObservation {
    /// Convenience constructor for a plain `(date, price)` pair.
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self {
            date: Some(RawDate::Date(date)),
            price: Some(RawPrice::Number(price)),
        }
    }
}

/// A canonical observation: the price was `price` starting on `date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// "Price P held for D days" inside one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSegment {
    pub price: f64,
    pub duration_days: f64,
}

/// A half-open slice of the horizon, `[start_days_ago, end_days_ago)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub label: String,
    pub start_days_ago: f64,
    pub end_days_ago: f64,
    /// First sub-bucket of a major span (labels only).
    pub is_major: bool,
}

impl Bucket {
    pub fn width_days(&self) -> f64 {
        self.start_days_ago - self.end_days_ago
    }
}

/// Time-weighted box statistics of one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Time-weighted mean.
    pub mean: f64,
}

/// What a period column shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PeriodValue {
    /// No observation before or inside the window.
    NoData,
    Box(BoxStats),
    /// The trailing marker; `price` is the current price.
    Now { price: f64 },
}

/// Statistics of one bucket (or of the NOW marker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatistics {
    pub label: String,
    pub start_days_ago: f64,
    pub end_days_ago: f64,
    pub is_major: bool,
    pub duration_days: f64,
    /// Observations dated inside the window.
    pub sample_count: usize,
    pub value: PeriodValue,
}

impl PeriodStatistics {
    pub fn box_stats(&self) -> Option<&BoxStats> {
        match &self.value {
            PeriodValue::Box(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn has_data(&self) -> bool {
        matches!(self.value, PeriodValue::Box(_))
    }
}

/// Whole-series facts that do not depend on bucketing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub observations: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub min: f64,
    pub max: f64,
}

/// Least-squares price trend over a recent window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    /// Fitted price change per 30 days.
    pub per_30_days: f64,
    pub window_days: u32,
    pub points: usize,
}

/// Buy/wait classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Good,
    Decent,
    Neutral,
    Caution,
    Wait,
}

impl Tier {
    /// Short heading for terminal output.
    pub fn title(self) -> &'static str {
        match self {
            Tier::Good => "Good price - buy",
            Tier::Decent => "OK price - buy",
            Tier::Neutral => "Average price",
            Tier::Caution => "Above average - consider waiting",
            Tier::Wait => "High price - wait",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub tier: Tier,
    /// `(current - reference) / reference * 100`.
    pub diff_percent: Option<f64>,
    pub reference_label: Option<String>,
    pub reference_average: Option<f64>,
    pub insufficient_data: bool,
}

/// Inputs of one analysis run besides the observations themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// "Today"; every days-ago boundary is relative to this date.
    pub as_of: NaiveDate,
    pub detail: DetailLevel,
    /// Use this instead of the last observed price.
    pub current_override: Option<f64>,
    pub missing_date: MissingDatePolicy,
}

impl AnalysisConfig {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            detail: DetailLevel::Coarse,
            current_override: None,
            missing_date: MissingDatePolicy::Drop,
        }
    }
}

/// Everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub as_of: NaiveDate,
    pub detail: DetailLevel,
    pub current: Option<f64>,
    /// Oldest first, NOW marker last.
    pub periods: Vec<PeriodStatistics>,
    /// Whole-span statistics per major span, oldest first.
    pub spans: Vec<PeriodStatistics>,
    /// Statistics over the full horizon.
    pub overall: PeriodStatistics,
    pub history: Option<HistorySummary>,
    pub price_position_percent: Option<f64>,
    pub trend: Option<Trend>,
    pub recommendation: Recommendation,
}

impl AnalysisResult {
    /// True when no bucket carries any price data.
    pub fn is_empty(&self) -> bool {
        !self.periods.iter().any(PeriodStatistics::has_data)
    }
}
