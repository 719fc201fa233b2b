//! Time-weighted aggregation over one window of the horizon.
//!
//! A canonical series is read as a step function: each observed price stays
//! in effect until the next observation supersedes it. Statistics are then
//! weighted by how many days each price was in effect, not by how many times
//! it was observed.
//!
//! Windows are expressed in days before `as_of` and are half-open:
//! `[start_days_ago, end_days_ago)`. Observation dates have day resolution;
//! window bounds may be fractional (sub-buckets interpolate).

use chrono::NaiveDate;

use crate::domain::{BoxStats, PricePoint, PriceSegment};

/// Relative tolerance for cumulative-duration comparisons.
const DURATION_EPS: f64 = 1e-9;

/// Step-function view of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSegments {
    /// Chronological segments; zero-length ones are omitted.
    pub segments: Vec<PriceSegment>,
    /// Range of the step function: prior price plus every in-window price.
    pub min: f64,
    pub max: f64,
    /// Observations dated inside the window.
    pub sample_count: usize,
}

/// Aggregation output for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    /// `None` when nothing was observed before or inside the window.
    pub stats: Option<BoxStats>,
    pub sample_count: usize,
    pub duration_days: f64,
}

/// Signed day offset of `date` relative to `as_of` (negative = past).
pub fn day_offset(date: NaiveDate, as_of: NaiveDate) -> f64 {
    (date - as_of).num_days() as f64
}

/// Build the step-function segments of `[start_days_ago, end_days_ago)`.
///
/// `points` must be sorted by date (the normalizer guarantees this).
///
/// The price in effect at the window start is the last observation strictly
/// before it; without one, the earliest in-window observation is used for the
/// leading stretch as well. Returns `None` if neither exists or the window
/// is empty.
///
/// # Panics
/// Panics if the bounds are not finite or `start_days_ago < end_days_ago`.
pub fn build_segments(
    points: &[PricePoint],
    as_of: NaiveDate,
    start_days_ago: f64,
    end_days_ago: f64,
) -> Option<WindowSegments> {
    assert!(
        start_days_ago.is_finite() && end_days_ago.is_finite(),
        "window bounds must be finite (start={start_days_ago}, end={end_days_ago})"
    );
    assert!(
        start_days_ago >= end_days_ago,
        "window start must not be after its end (start={start_days_ago}, end={end_days_ago})"
    );

    let t0 = -start_days_ago;
    let t1 = -end_days_ago;
    let width = t1 - t0;
    if width <= 0.0 {
        return None;
    }

    let first_in = points.partition_point(|p| day_offset(p.date, as_of) < t0);
    let first_after = points.partition_point(|p| day_offset(p.date, as_of) < t1);
    let prior = points[..first_in].last();
    let in_window = &points[first_in..first_after];

    let initial = prior.or_else(|| in_window.first())?.price;

    let mut min = initial;
    let mut max = initial;
    let mut segments = Vec::with_capacity(in_window.len() + 1);
    let mut cursor = t0;
    let mut price = initial;

    for p in in_window {
        let t = day_offset(p.date, as_of);
        let duration = t - cursor;
        if duration > 0.0 {
            segments.push(PriceSegment {
                price,
                duration_days: duration,
            });
            cursor = t;
        }
        price = p.price;
        min = min.min(p.price);
        max = max.max(p.price);
    }

    let tail = t1 - cursor;
    if tail > 0.0 {
        segments.push(PriceSegment {
            price,
            duration_days: tail,
        });
    }

    let total: f64 = segments.iter().map(|s| s.duration_days).sum();
    assert!(
        (total - width).abs() <= 1e-6 * width.max(1.0),
        "segment durations ({total}) do not cover the window ({width})"
    );

    Some(WindowSegments {
        segments,
        min,
        max,
        sample_count: in_window.len(),
    })
}

/// Time-weighted percentile with "lower" semantics.
///
/// Segments are ordered by price; the result is the price of the first
/// segment whose cumulative duration reaches `p/100` of the total.
pub fn weighted_percentile(segments: &[PriceSegment], p: f64) -> Option<f64> {
    let mut sorted = segments.to_vec();
    sort_by_price(&mut sorted);
    percentile_sorted(&sorted, total_duration(&sorted), p)
}

/// Duration-weighted mean price.
pub fn weighted_mean(segments: &[PriceSegment]) -> Option<f64> {
    let total = total_duration(segments);
    if total <= 0.0 {
        return None;
    }
    let weighted: f64 = segments.iter().map(|s| s.price * s.duration_days).sum();
    Some(weighted / total)
}

/// Box statistics of a window (full precision).
pub fn box_stats(window: &WindowSegments) -> Option<BoxStats> {
    let mut sorted = window.segments.clone();
    sort_by_price(&mut sorted);
    let total = total_duration(&sorted);

    Some(BoxStats {
        min: window.min,
        q1: percentile_sorted(&sorted, total, 25.0)?,
        median: percentile_sorted(&sorted, total, 50.0)?,
        q3: percentile_sorted(&sorted, total, 75.0)?,
        max: window.max,
        // Summation error must not push the mean outside the step range.
        mean: weighted_mean(&sorted)?.clamp(window.min, window.max),
    })
}

/// Aggregate one window into a summary.
pub fn aggregate_window(
    points: &[PricePoint],
    as_of: NaiveDate,
    start_days_ago: f64,
    end_days_ago: f64,
) -> WindowSummary {
    let duration_days = start_days_ago - end_days_ago;
    match build_segments(points, as_of, start_days_ago, end_days_ago) {
        Some(window) => WindowSummary {
            stats: box_stats(&window),
            sample_count: window.sample_count,
            duration_days,
        },
        None => WindowSummary {
            stats: None,
            sample_count: 0,
            duration_days,
        },
    }
}

fn sort_by_price(segments: &mut [PriceSegment]) {
    segments.sort_by(|a, b| a.price.total_cmp(&b.price));
}

fn total_duration(segments: &[PriceSegment]) -> f64 {
    segments.iter().map(|s| s.duration_days).sum()
}

fn percentile_sorted(sorted: &[PriceSegment], total: f64, p: f64) -> Option<f64> {
    if total <= 0.0 {
        return None;
    }
    let threshold = p / 100.0 * total;
    let mut cumulative = 0.0;
    for s in sorted {
        cumulative += s.duration_days;
        if cumulative >= threshold - DURATION_EPS * total {
            return Some(s.price);
        }
    }
    sorted.last().map(|s| s.price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pt(y: i32, m: u32, day: u32, price: f64) -> PricePoint {
        PricePoint { date: d(y, m, day), price }
    }

    #[test]
    fn two_step_half_year() {
        // 2024-01-01..2024-07-01 is 182 days: 91 at 100, then 91 at 200.
        let points = vec![pt(2024, 1, 1, 100.0), pt(2024, 4, 1, 200.0)];
        let as_of = d(2024, 7, 1);

        let window = build_segments(&points, as_of, 182.0, 0.0).unwrap();
        assert_eq!(
            window.segments,
            vec![
                PriceSegment { price: 100.0, duration_days: 91.0 },
                PriceSegment { price: 200.0, duration_days: 91.0 },
            ]
        );

        let stats = box_stats(&window).unwrap();
        assert!((stats.mean - 150.0).abs() < 1e-9);
        // The 100-segment reaches exactly half of the duration; the inclusive
        // rule stops there.
        assert_eq!(stats.median, 100.0);
        assert_eq!(stats.q1, 100.0);
        assert_eq!(stats.q3, 200.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 200.0);
        assert_eq!(window.sample_count, 2);
    }

    #[test]
    fn weighting_is_by_time_not_count() {
        // Ten observations of 50 within two days, then 100 for 28 days.
        let mut points: Vec<PricePoint> = (0..10).map(|_| pt(2024, 3, 1, 50.0)).collect();
        points.push(pt(2024, 3, 3, 100.0));
        let as_of = d(2024, 3, 31);

        let window = build_segments(&points, as_of, 30.0, 0.0).unwrap();
        let stats = box_stats(&window).unwrap();
        assert_eq!(stats.median, 100.0);
        assert_eq!(stats.min, 50.0);
        assert_eq!(window.sample_count, 11);
        assert!((stats.mean - (2.0 * 50.0 + 28.0 * 100.0) / 30.0).abs() < 1e-9);
    }

    #[test]
    fn prior_price_carries_into_window() {
        let points = vec![pt(2023, 6, 1, 80.0), pt(2024, 1, 11, 90.0)];
        let as_of = d(2024, 1, 21);

        // Window 2024-01-01..2024-01-21: 10 days at 80, 10 days at 90.
        let window = build_segments(&points, as_of, 20.0, 0.0).unwrap();
        assert_eq!(window.segments.len(), 2);
        assert_eq!(window.segments[0].price, 80.0);
        assert_eq!(window.segments[0].duration_days, 10.0);
        assert_eq!(window.sample_count, 1);

        // A window with only the prior observation is flat.
        let flat = aggregate_window(&points, as_of, 100.0, 50.0);
        let stats = flat.stats.unwrap();
        assert_eq!((stats.min, stats.median, stats.max), (80.0, 80.0, 80.0));
        assert_eq!(flat.sample_count, 0);
    }

    #[test]
    fn first_in_window_price_backfills_without_prior() {
        let points = vec![pt(2024, 1, 15, 70.0), pt(2024, 1, 25, 60.0)];
        let as_of = d(2024, 1, 31);

        // Window starts 2024-01-01: 14 days backfilled at 70, 10 more at 70, 6 at 60.
        let window = build_segments(&points, as_of, 30.0, 0.0).unwrap();
        assert_eq!(
            window.segments,
            vec![
                PriceSegment { price: 70.0, duration_days: 14.0 },
                PriceSegment { price: 70.0, duration_days: 10.0 },
                PriceSegment { price: 60.0, duration_days: 6.0 },
            ]
        );
        assert_eq!((window.min, window.max), (60.0, 70.0));
    }

    #[test]
    fn latest_same_date_observation_wins_as_prior() {
        let points = vec![pt(2024, 1, 1, 10.0), pt(2024, 1, 1, 20.0)];
        let as_of = d(2024, 2, 1);

        let stats = aggregate_window(&points, as_of, 10.0, 0.0).stats.unwrap();
        assert_eq!(stats.median, 20.0);
        assert_eq!(stats.min, 20.0);
    }

    #[test]
    fn no_data_and_zero_width() {
        let as_of = d(2024, 1, 1);
        assert!(build_segments(&[], as_of, 30.0, 0.0).is_none());

        // Only observations after the window.
        let later = vec![pt(2024, 1, 1, 5.0)];
        assert!(aggregate_window(&later, as_of, 30.0, 7.0).stats.is_none());

        let points = vec![pt(2023, 12, 1, 5.0)];
        let empty = aggregate_window(&points, as_of, 7.0, 7.0);
        assert!(empty.stats.is_none());
        assert_eq!(empty.duration_days, 0.0);
    }

    #[test]
    #[should_panic(expected = "window start must not be after its end")]
    fn inverted_window_panics() {
        let _ = build_segments(&[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0, 7.0);
    }

    #[test]
    fn fractional_bounds_sum_to_width() {
        let points: Vec<PricePoint> = (0..40)
            .map(|i| PricePoint {
                date: d(2024, 1, 1) + chrono::Duration::days(i * 3),
                price: 100.0 + (i % 7) as f64,
            })
            .collect();
        let as_of = d(2024, 5, 1);

        for (start, end) in [(95.5, 12.25), (30.0, 22.333_333_333), (1.0, 0.0), (121.0, 0.5)] {
            let window = build_segments(&points, as_of, start, end).unwrap();
            let total: f64 = window.segments.iter().map(|s| s.duration_days).sum();
            assert!((total - (start - end)).abs() < 1e-6, "start={start} end={end} total={total}");
            assert!(window.segments.iter().all(|s| s.duration_days > 0.0));
        }
    }

    #[test]
    fn flat_price_mean_is_exact_with_fractional_bounds() {
        let points = vec![pt(2022, 1, 1, 209.0), pt(2023, 6, 1, 209.0), pt(2024, 11, 20, 209.0)];
        let as_of = d(2025, 1, 1);

        let bounds = [
            (1095.0, 1095.0 - 730.0 / 3.0),
            (1095.0 - 730.0 / 3.0, 1095.0 - 1460.0 / 3.0),
            (90.0, 90.0 - 60.0 / 9.0),
            (7.0, 7.0 - 6.0 / 9.0),
            (1.0 / 3.0, 0.0),
        ];
        for (start, end) in bounds {
            let stats = aggregate_window(&points, as_of, start, end).stats.unwrap();
            assert_eq!(stats.mean, 209.0, "start={start} end={end}");
            assert_eq!((stats.min, stats.max), (209.0, 209.0));
        }
    }

    #[test]
    fn percentile_edges() {
        let segments = vec![
            PriceSegment { price: 3.0, duration_days: 1.0 },
            PriceSegment { price: 1.0, duration_days: 1.0 },
            PriceSegment { price: 2.0, duration_days: 2.0 },
        ];
        assert_eq!(weighted_percentile(&segments, 0.0), Some(1.0));
        assert_eq!(weighted_percentile(&segments, 25.0), Some(1.0));
        assert_eq!(weighted_percentile(&segments, 50.0), Some(2.0));
        assert_eq!(weighted_percentile(&segments, 100.0), Some(3.0));
        assert_eq!(weighted_percentile(&[], 50.0), None);
        assert_eq!(weighted_mean(&segments), Some(2.0));
    }
}
