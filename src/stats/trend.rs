//! Recent price trend and whole-history facts.

use chrono::NaiveDate;

use crate::domain::{HistorySummary, PricePoint, Trend};
use crate::math::fit_line;
use crate::stats::aggregate::day_offset;

/// Lookback of the trend line, in days before `as_of`.
pub const TREND_WINDOW_DAYS: u32 = 90;

/// Least-squares slope of the observations dated in the last
/// [`TREND_WINDOW_DAYS`] days (up to and including `as_of`), scaled to a
/// 30-day price change.
pub fn recent_trend(points: &[PricePoint], as_of: NaiveDate) -> Option<Trend> {
    let from = -(TREND_WINDOW_DAYS as f64);
    let (xs, ys): (Vec<f64>, Vec<f64>) = points
        .iter()
        .map(|p| (day_offset(p.date, as_of), p.price))
        .filter(|(x, _)| *x >= from && *x <= 0.0)
        .unzip();

    let fit = fit_line(&xs, &ys)?;
    Some(Trend {
        per_30_days: fit.slope * 30.0,
        window_days: TREND_WINDOW_DAYS,
        points: xs.len(),
    })
}

/// Count, date range and price range of the whole canonical series.
pub fn history_summary(points: &[PricePoint]) -> Option<HistorySummary> {
    let first = points.first()?;
    let last = points.last()?;
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.price), hi.max(p.price)));

    Some(HistorySummary {
        observations: points.len(),
        first_date: first.date,
        last_date: last.date,
        min,
        max,
    })
}

/// Where `current` sits inside the historical min–max range, in percent.
///
/// Clamped to `0..=100`; a flat history reports 50.
pub fn price_position_percent(current: f64, history: &HistorySummary) -> f64 {
    let range = history.max - history.min;
    if range <= 0.0 {
        return 50.0;
    }
    ((current - history.min) / range * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn p(date: NaiveDate, price: f64) -> PricePoint {
        PricePoint { date, price }
    }

    #[test]
    fn falling_prices_have_negative_trend() {
        let as_of = d(2025, 3, 31);
        let points: Vec<PricePoint> = (0..10)
            .map(|i| p(as_of - chrono::Duration::days(90 - 10 * i), 300.0 - 2.0 * (10 * i) as f64))
            .collect();

        let trend = recent_trend(&points, as_of).unwrap();
        assert!((trend.per_30_days + 60.0).abs() < 1e-6);
        assert_eq!(trend.points, 10);
        assert_eq!(trend.window_days, 90);
    }

    #[test]
    fn trend_ignores_old_observations() {
        let as_of = d(2025, 3, 31);
        let points = vec![p(d(2023, 1, 1), 10.0), p(as_of - chrono::Duration::days(5), 200.0)];
        assert!(recent_trend(&points, as_of).is_none());
        assert!(recent_trend(&[], as_of).is_none());
    }

    #[test]
    fn history_and_position() {
        let points = vec![p(d(2024, 1, 1), 120.0), p(d(2024, 2, 1), 80.0), p(d(2024, 3, 1), 100.0)];
        let history = history_summary(&points).unwrap();
        assert_eq!(history.observations, 3);
        assert_eq!((history.min, history.max), (80.0, 120.0));
        assert_eq!(history.first_date, d(2024, 1, 1));
        assert_eq!(history.last_date, d(2024, 3, 1));

        assert_eq!(price_position_percent(100.0, &history), 50.0);
        assert_eq!(price_position_percent(60.0, &history), 0.0);
        assert_eq!(price_position_percent(500.0, &history), 100.0);
        assert!(history_summary(&[]).is_none());
    }

    #[test]
    fn flat_history_is_mid_range() {
        let history = history_summary(&[p(d(2024, 1, 1), 50.0)]).unwrap();
        assert_eq!(price_position_percent(50.0, &history), 50.0);
        assert_eq!(price_position_percent(75.0, &history), 50.0);
    }
}
