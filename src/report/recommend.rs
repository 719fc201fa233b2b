//! Buy/wait recommendation.
//!
//! The current price is compared with a time-weighted reference average and
//! the relative difference is mapped onto five tiers.

use crate::domain::{MajorSpan, PeriodStatistics, Recommendation, Tier};

/// Major spans tried as the reference, most relevant first.
pub const REFERENCE_ORDER: [MajorSpan; 4] = [
    MajorSpan::ThreeMonths,
    MajorSpan::OneMonth,
    MajorSpan::OneYear,
    MajorSpan::ThreeYears,
];

/// Classify a relative difference (percent) into a tier.
pub fn tier_for_diff(diff: f64) -> Tier {
    if diff <= -10.0 {
        Tier::Good
    } else if diff <= -5.0 {
        Tier::Decent
    } else if diff >= 10.0 {
        Tier::Wait
    } else if diff >= 5.0 {
        Tier::Caution
    } else {
        Tier::Neutral
    }
}

/// Recommend based on `current` and the whole-span statistics.
///
/// The reference is the mean of the first span in [`REFERENCE_ORDER`] that
/// has data, falling back to the full-horizon mean.
pub fn recommend(current: Option<f64>, spans: &[PeriodStatistics], overall: &PeriodStatistics) -> Recommendation {
    let reference = REFERENCE_ORDER
        .iter()
        .filter_map(|span| spans.iter().find(|s| s.label == span.label()))
        .chain(std::iter::once(overall))
        .find_map(|s| s.box_stats().map(|b| (s.label.clone(), b.mean)))
        .filter(|(_, mean)| *mean > 0.0);

    let (Some(current), Some((label, average))) = (current, reference) else {
        return Recommendation {
            tier: Tier::Neutral,
            diff_percent: None,
            reference_label: None,
            reference_average: None,
            insufficient_data: true,
        };
    };

    let diff = (current - average) / average * 100.0;
    tracing::debug!(current, reference = %label, average, diff, "recommendation");

    Recommendation {
        tier: tier_for_diff(diff),
        diff_percent: Some(diff),
        reference_label: Some(label),
        reference_average: Some(average),
        insufficient_data: false,
    }
}

/// Short text next to the tier title (`"12% below avg"`, `"+3% vs avg"`).
pub fn recommendation_text(rec: &Recommendation) -> String {
    let Some(diff) = rec.diff_percent else {
        return "not enough price history".to_string();
    };
    match rec.tier {
        Tier::Good | Tier::Decent => format!("{:.0}% below avg", diff.abs()),
        Tier::Caution | Tier::Wait => format!("{diff:.0}% above avg"),
        Tier::Neutral => {
            let sign = if diff >= 0.0 { "+" } else { "" };
            format!("{sign}{diff:.0}% vs avg")
        }
    }
}
