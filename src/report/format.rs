//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the statistics code stays clean and testable
//! - output changes are localized (the golden tests below pin them)

use crate::domain::{AnalysisResult, PeriodStatistics};
use crate::io::normalize::NormalizeReport;
use crate::report::recommend::recommendation_text;

/// Shown instead of tables when no period has data.
pub const NO_HISTORY_MESSAGE: &str = "No price history available for this product.";

/// Format the full run summary (inputs, history facts, span table, verdict).
pub fn format_report(result: &AnalysisResult, source: Option<&str>, normalize: &NormalizeReport) -> String {
    let mut out = String::new();

    out.push_str("=== phist - Price History Analysis ===\n");
    out.push_str(&format!("As-of: {} | detail: {:?}\n", result.as_of, result.detail));
    out.push_str(&format!(
        "Source: {} | read={} kept={} dropped(price)={} dropped(date)={}\n",
        source.unwrap_or("none"),
        normalize.read,
        normalize.kept,
        normalize.dropped_price,
        normalize.dropped_date,
    ));

    if result.is_empty() {
        out.push('\n');
        out.push_str(NO_HISTORY_MESSAGE);
        out.push('\n');
        return out;
    }

    if let Some(h) = &result.history {
        out.push_str(&format!(
            "History: n={} | {} .. {} | price=[{:.2}, {:.2}]\n",
            h.observations, h.first_date, h.last_date, h.min, h.max
        ));
    }
    if let Some(current) = result.current {
        out.push_str(&format!("Current: {current:.2}"));
        if let Some(pos) = result.price_position_percent {
            out.push_str(&format!(" | position={pos:.0}% of range"));
        }
        out.push('\n');
    }
    if let Some(t) = &result.trend {
        out.push_str(&format!(
            "Trend ({}d): {:+.2} per 30 days (n={})\n",
            t.window_days, t.per_30_days, t.points
        ));
    }

    out.push('\n');
    out.push_str(&format_span_table(&result.spans, &result.overall));
    out.push('\n');
    out.push_str(&format_recommendation(result));

    out
}

/// Whole-span statistics plus the full-horizon row.
pub fn format_span_table(spans: &[PeriodStatistics], overall: &PeriodStatistics) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<6} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "span", "samples", "min", "q1", "median", "q3", "max", "mean"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<6} {:-<7} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10}",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for s in spans.iter().chain(std::iter::once(overall)) {
        let row = match s.box_stats() {
            Some(b) => format!(
                "{:<6} {:>7} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                s.label, s.sample_count, b.min, b.q1, b.median, b.q3, b.max, b.mean
            ),
            None => format!("{:<6} {:>7} {:>10}", s.label, s.sample_count, "no data"),
        };
        out.push_str(row.trim_end());
        out.push('\n');
    }

    out
}

/// The verdict line(s).
pub fn format_recommendation(result: &AnalysisResult) -> String {
    let rec = &result.recommendation;
    let mut out = format!("Recommendation: {} ({})\n", rec.tier.title(), recommendation_text(rec));
    if let (Some(label), Some(avg)) = (&rec.reference_label, rec.reference_average) {
        out.push_str(&format!("Reference: {label} time-weighted average {avg:.2}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::app::pipeline::run_analysis;
    use crate::domain::{AnalysisConfig, RawObservation};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn empty_history_message() {
        let run = run_analysis(&[], &AnalysisConfig::new(d(2025, 1, 1)));
        let text = format_report(&run.result, None, &run.normalize);

        assert!(text.ends_with("No price history available for this product.\n"));
        assert!(text.contains("Source: none | read=0 kept=0"));
        assert!(!text.contains("Recommendation"));
    }

    #[test]
    fn populated_report() {
        let as_of = d(2025, 1, 1);
        let raw = vec![
            RawObservation::new(d(2024, 1, 1), 100.0),
            RawObservation::new(d(2024, 11, 1), 120.0),
            RawObservation::new(d(2024, 12, 20), 90.0),
        ];
        let run = run_analysis(&raw, &AnalysisConfig::new(as_of));
        let text = format_report(&run.result, Some("csv"), &run.normalize);

        assert!(text.contains("Source: csv | read=3 kept=3"));
        assert!(text.contains("History: n=3 | 2024-01-01 .. 2024-12-20 | price=[90.00, 120.00]"));
        assert!(text.contains("Current: 90.00 | position=0% of range"));
        // 3M span [90, 30) days ago holds 100 then 120, mean above 100.
        assert!(text.contains("Recommendation: Good price - buy"));
        assert!(text.contains("Reference: 3M time-weighted average"));
    }

    #[test]
    fn span_table_golden() {
        let as_of = d(2024, 7, 1);
        let raw = vec![RawObservation::new(d(2024, 6, 1), 50.0)];
        let run = run_analysis(&raw, &AnalysisConfig::new(as_of));
        let table = format_span_table(&run.result.spans, &run.result.overall);

        let expected = "\
span   samples        min         q1     median         q3        max       mean
------ ------- ---------- ---------- ---------- ---------- ---------- ----------
3Y           0    no data
1Y           0    no data
3M           0    no data
1M           1      50.00      50.00      50.00      50.00      50.00      50.00
1W           0      50.00      50.00      50.00      50.00      50.00      50.00
1D           0      50.00      50.00      50.00      50.00      50.00      50.00
ALL          1      50.00      50.00      50.00      50.00      50.00      50.00
";
        assert_eq!(table, expected);
    }
}
