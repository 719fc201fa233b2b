//! ASCII box/whisker chart for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements, one column per period (oldest left):
//! - whisker min→max: `|`
//! - box q1→q3: `#`
//! - median: `=`
//! - NOW marker: `*`
//! - current price: dashed `-` line underneath everything

use crate::domain::{PeriodStatistics, PeriodValue};

/// Render the periods of an analysis as a box chart.
pub fn render_box_chart(periods: &[PeriodStatistics], current: Option<f64>, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((y_min, y_max)) = y_range(periods, current) else {
        return "Plot: no price data\n".to_string();
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let n = periods.len().max(1);
    let col_w = (width / n).max(1);
    let grid_w = col_w * n;
    let mut grid = vec![vec![' '; grid_w]; height];

    if let Some(price) = current {
        let row = map_y(price, y_min, y_max, height);
        for x in (0..grid_w).step_by(2) {
            grid[row][x] = '-';
        }
    }

    for (i, period) in periods.iter().enumerate() {
        let center = i * col_w + col_w / 2;
        match period.value {
            PeriodValue::NoData => {}
            PeriodValue::Now { price } => {
                grid[map_y(price, y_min, y_max, height)][center] = '*';
            }
            PeriodValue::Box(b) => {
                let half = (col_w.saturating_sub(1).clamp(1, 3)) / 2;
                let left = center.saturating_sub(half);
                let right = (center + half).min(grid_w - 1);

                fill_rows(&mut grid, center, center, map_y(b.max, y_min, y_max, height), map_y(b.min, y_min, y_max, height), '|');
                fill_rows(&mut grid, left, right, map_y(b.q3, y_min, y_max, height), map_y(b.q1, y_min, y_max, height), '#');
                let median = map_y(b.median, y_min, y_max, height);
                fill_rows(&mut grid, left, right, median, median, '=');
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Plot: price=[{y_min:.2}, {y_max:.2}] | periods={}", periods.len()));
    if let Some(price) = current {
        out.push_str(&format!(" | now={price:.2}"));
    }
    out.push('\n');

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out.push_str(&label_row(periods, col_w));
    out.push('\n');

    out
}

/// Major labels placed at the start of their column; a label that would
/// touch the previous one is skipped.
fn label_row(periods: &[PeriodStatistics], col_w: usize) -> String {
    let mut row = String::new();
    for (i, period) in periods.iter().enumerate() {
        if period.label.is_empty() {
            continue;
        }
        let start = i * col_w;
        let used = row.chars().count();
        if used > 0 && start <= used {
            continue;
        }
        row.push_str(&" ".repeat(start - used));
        row.push_str(&period.label);
    }
    row
}

fn fill_rows(grid: &mut [Vec<char>], x0: usize, x1: usize, top: usize, bottom: usize, ch: char) {
    for row in grid.iter_mut().take(bottom + 1).skip(top) {
        for cell in row.iter_mut().take(x1 + 1).skip(x0) {
            *cell = ch;
        }
    }
}

fn y_range(periods: &[PeriodStatistics], current: Option<f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for p in periods {
        match p.value {
            PeriodValue::Box(b) => {
                min_y = min_y.min(b.min);
                max_y = max_y.max(b.max);
            }
            PeriodValue::Now { price } => {
                min_y = min_y.min(price);
                max_y = max_y.max(price);
            }
            PeriodValue::NoData => {}
        }
    }
    if let Some(price) = current {
        min_y = min_y.min(price);
        max_y = max_y.max(price);
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // Flat history: give it some room so the box sits mid-chart.
        let pad = (min_y.abs() * 0.05).max(1.0);
        Some((min_y - pad, max_y + pad))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BoxStats;

    fn period(label: &str, value: PeriodValue) -> PeriodStatistics {
        PeriodStatistics {
            label: label.to_string(),
            start_days_ago: 0.0,
            end_days_ago: 0.0,
            is_major: !label.is_empty(),
            duration_days: 0.0,
            sample_count: 0,
            value,
        }
    }

    fn spread_box() -> PeriodValue {
        PeriodValue::Box(BoxStats {
            min: 0.0,
            q1: 25.0,
            median: 50.0,
            q3: 75.0,
            max: 100.0,
            mean: 50.0,
        })
    }

    #[test]
    fn golden_single_box() {
        let periods = vec![period("3Y", spread_box()), period("NOW", PeriodValue::Now { price: 50.0 })];
        let plot = render_box_chart(&periods, Some(50.0), 10, 11);

        let expected = "\
Plot: price=[-5.00, 105.00] | periods=2 | now=50.00
  |
  |
  |
 ###
 ###
-===- -*-
 ###
 ###
  |
  |
  |
3Y   NOW
";
        assert_eq!(plot, expected);
    }

    #[test]
    fn no_data_is_reported() {
        let periods = vec![period("3Y", PeriodValue::NoData), period("NOW", PeriodValue::NoData)];
        assert_eq!(render_box_chart(&periods, None, 40, 10), "Plot: no price data\n");
    }

    #[test]
    fn output_is_deterministic_and_sized() {
        let periods: Vec<PeriodStatistics> = (0..18)
            .map(|i| period(if i % 3 == 0 { "1Y" } else { "" }, spread_box()))
            .chain(std::iter::once(period("NOW", PeriodValue::Now { price: 80.0 })))
            .collect();

        let a = render_box_chart(&periods, Some(80.0), 60, 12);
        let b = render_box_chart(&periods, Some(80.0), 60, 12);
        assert_eq!(a, b);
        // header + grid + labels
        assert_eq!(a.lines().count(), 1 + 12 + 1);
        assert!(a.lines().all(|l| l.chars().count() <= 60));
        assert!(a.contains('*'));
    }

    #[test]
    fn flat_history_still_draws() {
        let flat = PeriodValue::Box(BoxStats {
            min: 80.0,
            q1: 80.0,
            median: 80.0,
            q3: 80.0,
            max: 80.0,
            mean: 80.0,
        });
        let plot = render_box_chart(&[period("3Y", flat)], None, 10, 5);
        assert!(plot.contains('='));
    }
}
