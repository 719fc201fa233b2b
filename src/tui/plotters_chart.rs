//! Plotters-powered box chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - boxes and whiskers are plain path elements in Plotters
//! - nicer axis + mesh rendering
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One box in chart coordinates (`x` is the period index).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBox {
    pub x: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct BoxPlottersChart<'a> {
    pub boxes: &'a [ChartBox],
    /// NOW marker position.
    pub now: Option<(f64, f64)>,
    /// Current price, drawn as a horizontal reference line.
    pub current: Option<f64>,
    /// Half the box width in x units.
    pub half_width: f64,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    /// Tick label per period index.
    pub labels: &'a [String],
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for BoxPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(self.labels.len().max(2))
                .y_labels(5)
                .x_label_formatter(&|v| label_at(self.labels, *v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let whisker_color = RGBColor(160, 160, 160);
            let box_color = RGBColor(0, 255, 255); // cyan
            let median_color = WHITE;
            let current_color = RGBColor(255, 255, 0); // yellow
            let now_color = RGBColor(0, 255, 0); // green

            // 1) Current price underneath everything.
            if let Some(price) = self.current {
                chart.draw_series(LineSeries::new([(x0, price), (x1, price)], &current_color))?;
            }

            // 2) Whiskers.
            chart.draw_series(
                self.boxes
                    .iter()
                    .map(|b| PathElement::new(vec![(b.x, b.min), (b.x, b.max)], whisker_color)),
            )?;

            // 3) Box outlines. Closed paths rather than `Rectangle`, which the
            // backend fills when drawn into the canvas.
            let w = self.half_width;
            chart.draw_series(self.boxes.iter().map(|b| {
                PathElement::new(
                    vec![
                        (b.x - w, b.q1),
                        (b.x + w, b.q1),
                        (b.x + w, b.q3),
                        (b.x - w, b.q3),
                        (b.x - w, b.q1),
                    ],
                    box_color,
                )
            }))?;

            // 4) Medians.
            chart.draw_series(
                self.boxes
                    .iter()
                    .map(|b| PathElement::new(vec![(b.x - w, b.median), (b.x + w, b.median)], median_color)),
            )?;

            // 5) NOW marker. Circle radii are mis-scaled by the backend, so
            // draw a small cross instead.
            if let Some((x, y)) = self.now {
                let dy = (y1 - y0) * 0.02;
                chart.draw_series([
                    PathElement::new(vec![(x - w, y), (x + w, y)], now_color),
                    PathElement::new(vec![(x, y - dy), (x, y + dy)], now_color),
                ])?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Label of the period at integer position `v`, empty elsewhere.
pub fn label_at(labels: &[String], v: f64) -> String {
    let rounded = v.round();
    if (v - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}
