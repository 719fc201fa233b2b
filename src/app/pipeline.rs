//! Shared analysis pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! normalize -> bucket -> aggregate -> recommend
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).
//! Nothing here touches the network, the filesystem or the clock: `as_of`
//! comes in through `AnalysisConfig`, so a run is a pure function of its
//! inputs.

use crate::domain::{AnalysisConfig, AnalysisResult, PricePoint, RawObservation};
use crate::io::normalize::{NormalizeReport, normalize};
use crate::report::recommend::recommend;
use crate::stats::buckets::{major_span_statistics, overall_statistics, period_statistics};
use crate::stats::trend::{history_summary, price_position_percent, recent_trend};

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub points: Vec<PricePoint>,
    pub normalize: NormalizeReport,
    pub result: AnalysisResult,
}

/// Analyze raw observations.
pub fn analyze(raw: &[RawObservation], config: &AnalysisConfig) -> AnalysisResult {
    run_analysis(raw, config).result
}

/// Analyze raw observations, keeping the canonical series and counters.
pub fn run_analysis(raw: &[RawObservation], config: &AnalysisConfig) -> RunOutput {
    let normalized = normalize(raw, config.missing_date, config.as_of);
    let result = analyze_points(&normalized.points, config);
    RunOutput {
        points: normalized.points,
        normalize: normalized.report,
        result,
    }
}

/// Analyze an already normalized series.
///
/// The TUI uses this to switch detail levels without re-normalizing.
pub fn analyze_points(points: &[PricePoint], config: &AnalysisConfig) -> AnalysisResult {
    let current = current_price(points, config.current_override);

    let periods = period_statistics(points, config.as_of, config.detail, current);
    let spans = major_span_statistics(points, config.as_of);
    let overall = overall_statistics(points, config.as_of);

    let history = history_summary(points);
    let price_position_percent = match (current, &history) {
        (Some(c), Some(h)) => Some(price_position_percent(c, h)),
        _ => None,
    };
    let trend = recent_trend(points, config.as_of);
    let recommendation = recommend(current, &spans, &overall);

    tracing::info!(
        points = points.len(),
        detail = ?config.detail,
        current = ?current,
        tier = ?recommendation.tier,
        "analysis complete"
    );

    AnalysisResult {
        as_of: config.as_of,
        detail: config.detail,
        current,
        periods,
        spans,
        overall,
        history,
        price_position_percent,
        trend,
        recommendation,
    }
}

/// The override when it is a usable price, else the last observation.
pub fn current_price(points: &[PricePoint], override_price: Option<f64>) -> Option<f64> {
    match override_price {
        Some(p) if p.is_finite() && p > 0.0 => Some(p),
        Some(p) => {
            tracing::warn!(price = p, "ignoring invalid current price override");
            points.last().map(|p| p.price)
        }
        None => points.last().map(|p| p.price),
    }
}
