//! Period bucketing.
//!
//! The horizon `[0, 1095)` days is cut at fixed major boundaries
//! (3Y, 1Y, 3M, 1M, 1W, 1D, now). Each of the six major spans is split into
//! `k` equal sub-buckets, and every sub-bucket is aggregated on its own.
//!
//! Buckets are exclusive: a column shows what the price did in *that* slice
//! of history only, never a cumulative "last N days" window.

use chrono::NaiveDate;

use crate::domain::{
    Bucket, DetailLevel, HORIZON_DAYS, MajorSpan, NOW_LABEL, PeriodStatistics, PeriodValue, PricePoint,
};
use crate::stats::aggregate::aggregate_window;

/// Label of the full-horizon statistic.
pub const OVERALL_LABEL: &str = "ALL";

/// Sub-buckets per major span for a total bucket count (NOW included).
pub fn subdivisions(bucket_count: usize) -> usize {
    let k = (bucket_count.saturating_sub(1) as f64 / MajorSpan::ALL.len() as f64).round() as usize;
    k.max(1)
}

/// Build the aggregated buckets (NOW marker excluded), oldest first.
pub fn build_buckets(bucket_count: usize) -> Vec<Bucket> {
    let k = subdivisions(bucket_count);
    let mut buckets = Vec::with_capacity(MajorSpan::ALL.len() * k);

    for span in MajorSpan::ALL {
        let start = span.start_days_ago();
        let end = span.end_days_ago();
        for i in 0..k {
            let sub_start = interpolate(start, end, i, k);
            let sub_end = if i + 1 == k { end } else { interpolate(start, end, i + 1, k) };
            buckets.push(Bucket {
                label: if i == 0 { span.label().to_string() } else { String::new() },
                start_days_ago: sub_start,
                end_days_ago: sub_end,
                is_major: i == 0,
            });
        }
    }

    buckets
}

fn interpolate(start: f64, end: f64, i: usize, k: usize) -> f64 {
    if i == 0 {
        return start;
    }
    start + (end - start) * i as f64 / k as f64
}

/// Statistics for every bucket of `detail`, oldest first, NOW marker last.
pub fn period_statistics(
    points: &[PricePoint],
    as_of: NaiveDate,
    detail: DetailLevel,
    current: Option<f64>,
) -> Vec<PeriodStatistics> {
    let buckets = build_buckets(detail.bucket_count());
    let mut out = Vec::with_capacity(buckets.len() + 1);

    for bucket in &buckets {
        let stats = window_statistics(
            points,
            as_of,
            bucket.label.clone(),
            bucket.start_days_ago,
            bucket.end_days_ago,
            bucket.is_major,
        );
        if bucket.is_major {
            log_period(&stats);
        }
        out.push(stats);
    }

    out.push(now_marker(current));
    out
}

/// One whole-span statistic per major span, oldest first.
pub fn major_span_statistics(points: &[PricePoint], as_of: NaiveDate) -> Vec<PeriodStatistics> {
    MajorSpan::ALL
        .iter()
        .map(|span| {
            window_statistics(
                points,
                as_of,
                span.label().to_string(),
                span.start_days_ago(),
                span.end_days_ago(),
                true,
            )
        })
        .collect()
}

/// Statistic over the full horizon.
pub fn overall_statistics(points: &[PricePoint], as_of: NaiveDate) -> PeriodStatistics {
    window_statistics(points, as_of, OVERALL_LABEL.to_string(), HORIZON_DAYS, 0.0, true)
}

fn window_statistics(
    points: &[PricePoint],
    as_of: NaiveDate,
    label: String,
    start_days_ago: f64,
    end_days_ago: f64,
    is_major: bool,
) -> PeriodStatistics {
    let summary = aggregate_window(points, as_of, start_days_ago, end_days_ago);
    PeriodStatistics {
        label,
        start_days_ago,
        end_days_ago,
        is_major,
        duration_days: summary.duration_days,
        sample_count: summary.sample_count,
        value: summary.stats.map_or(PeriodValue::NoData, PeriodValue::Box),
    }
}

fn now_marker(current: Option<f64>) -> PeriodStatistics {
    PeriodStatistics {
        label: NOW_LABEL.to_string(),
        start_days_ago: 0.0,
        end_days_ago: 0.0,
        is_major: true,
        duration_days: 0.0,
        sample_count: 0,
        value: current.map_or(PeriodValue::NoData, |price| PeriodValue::Now { price }),
    }
}

fn log_period(stats: &PeriodStatistics) {
    match stats.box_stats() {
        Some(b) => tracing::debug!(
            label = %stats.label,
            samples = stats.sample_count,
            min = b.min,
            q1 = b.q1,
            median = b.median,
            q3 = b.q3,
            max = b.max,
            "period statistics"
        ),
        None => tracing::debug!(label = %stats.label, "period has no data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekly_series(as_of: NaiveDate, weeks: i64) -> Vec<PricePoint> {
        (0..weeks)
            .map(|i| PricePoint {
                date: as_of - chrono::Duration::days(7 * (weeks - i)),
                price: 200.0 + ((i * 37) % 23) as f64 - 11.0,
            })
            .collect()
    }

    #[test]
    fn subdivisions_for_presets() {
        assert_eq!(subdivisions(7), 1);
        assert_eq!(subdivisions(19), 3);
        assert_eq!(subdivisions(55), 9);
        assert_eq!(subdivisions(1), 1);
        assert_eq!(subdivisions(0), 1);
    }

    #[test]
    fn buckets_tile_the_horizon() {
        for detail in DetailLevel::ALL {
            let buckets = build_buckets(detail.bucket_count());
            assert_eq!(buckets.len() + 1, detail.bucket_count());
            assert_eq!(buckets[0].start_days_ago, HORIZON_DAYS);
            assert_eq!(buckets.last().unwrap().end_days_ago, 0.0);
            for pair in buckets.windows(2) {
                assert_eq!(pair[0].end_days_ago, pair[1].start_days_ago);
            }
            assert!(buckets.iter().all(|b| b.start_days_ago > b.end_days_ago));
            let total: f64 = buckets.iter().map(Bucket::width_days).sum();
            assert!((total - HORIZON_DAYS).abs() < 1e-9);
        }
    }

    #[test]
    fn only_first_sub_bucket_is_labeled() {
        let buckets = build_buckets(19);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["3Y", "", "", "1Y", "", "", "3M", "", "", "1M", "", "", "1W", "", "", "1D", "", ""]
        );
        assert_eq!(buckets.iter().filter(|b| b.is_major).count(), 6);
        assert!((buckets[1].start_days_ago - (1095.0 - 730.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_series_is_all_no_data() {
        let periods = period_statistics(&[], d(2024, 1, 1), DetailLevel::Medium, None);
        assert_eq!(periods.len(), 19);
        assert!(periods.iter().all(|p| p.value == PeriodValue::NoData));
        assert_eq!(periods.last().unwrap().label, NOW_LABEL);
    }

    #[test]
    fn quartiles_are_ordered_everywhere() {
        let as_of = d(2025, 6, 30);
        let points = weekly_series(as_of, 170);

        for detail in DetailLevel::ALL {
            let periods = period_statistics(&points, as_of, detail, Some(190.0));
            assert_eq!(periods.len(), detail.bucket_count());
            for p in &periods[..periods.len() - 1] {
                let b = p.box_stats().unwrap();
                assert!(b.min <= b.q1 && b.q1 <= b.median && b.median <= b.q3 && b.q3 <= b.max, "{p:?}");
                assert!(b.min <= b.mean && b.mean <= b.max);
            }
            assert_eq!(periods.last().unwrap().value, PeriodValue::Now { price: 190.0 });
        }
    }

    #[test]
    fn buckets_are_exclusive() {
        let as_of = d(2024, 12, 31);
        // One price two years ago, a drop 60 days ago.
        let points = vec![
            PricePoint { date: d(2022, 12, 31), price: 500.0 },
            PricePoint { date: as_of - chrono::Duration::days(60), price: 300.0 },
        ];

        let periods = period_statistics(&points, as_of, DetailLevel::Coarse, None);
        let by_label = |label: &str| periods.iter().find(|p| p.label == label).unwrap().box_stats().copied();

        assert_eq!(by_label("1Y").unwrap().max, 500.0);
        let m3 = by_label("3M").unwrap();
        assert_eq!((m3.min, m3.max), (300.0, 500.0));
        assert_eq!(m3.mean, 400.0);
        let m1 = by_label("1M").unwrap();
        assert_eq!((m1.min, m1.max), (300.0, 300.0));
        assert!(by_label("3Y").is_some());
    }

    #[test]
    fn pipeline_is_idempotent() {
        let as_of = d(2025, 1, 15);
        let points = weekly_series(as_of, 60);
        let a = period_statistics(&points, as_of, DetailLevel::Fine, Some(201.0));
        let b = period_statistics(&points, as_of, DetailLevel::Fine, Some(201.0));
        assert_eq!(a, b);
        assert_eq!(major_span_statistics(&points, as_of), major_span_statistics(&points, as_of));
    }

    #[test]
    fn overall_covers_the_horizon() {
        let as_of = d(2025, 1, 15);
        let overall = overall_statistics(&weekly_series(as_of, 10), as_of);
        assert_eq!(overall.label, OVERALL_LABEL);
        assert_eq!(overall.duration_days, HORIZON_DAYS);
        assert_eq!(overall.sample_count, 10);
    }
}
