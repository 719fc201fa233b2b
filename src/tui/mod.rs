//! Ratatui-based terminal UI.
//!
//! The TUI loads a price history once, then renders the box chart, the span
//! table and the recommendation. `d` cycles the detail level without touching
//! the sources again; `r` reloads them.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};

use crate::app::pipeline::{self, RunOutput};
use crate::cli::AnalyzeArgs;
use crate::domain::{AnalysisConfig, AnalysisResult, PeriodValue, Tier};
use crate::error::{AppError, EXIT_RUNTIME};

mod plotters_chart;

use plotters_chart::{BoxPlottersChart, ChartBox};

/// Start the TUI.
pub fn run(args: AnalyzeArgs) -> Result<(), AppError> {
    // Fail on a bad source list before the terminal is switched over.
    let mut app = App::new(args)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(EXIT_RUNTIME, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    args: AnalyzeArgs,
    config: AnalysisConfig,
    source: Option<String>,
    run: RunOutput,
    status: String,
}

impl App {
    fn new(args: AnalyzeArgs) -> Result<Self, AppError> {
        let (source, config, run) = load(&args)?;
        let status = load_status(source.as_deref(), &run);
        Ok(Self {
            args,
            config,
            source,
            run,
            status,
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('d') => {
                self.config.detail = self.config.detail.next();
                self.run.result = pipeline::analyze_points(&self.run.points, &self.config);
                self.status = format!(
                    "detail: {:?} ({} buckets)",
                    self.config.detail,
                    self.config.detail.bucket_count()
                );
            }
            KeyCode::Char('r') => match load(&self.args) {
                Ok((source, mut config, mut run)) => {
                    // Keep the detail level the user picked.
                    if config.detail != self.config.detail {
                        config.detail = self.config.detail;
                        run.result = pipeline::analyze_points(&run.points, &config);
                    }
                    self.status = load_status(source.as_deref(), &run);
                    self.source = source;
                    self.config = config;
                    self.run = run;
                }
                Err(err) => {
                    self.status = format!("Reload failed: {err}");
                }
            },
            _ => {}
        }

        Ok(false)
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let result = &self.run.result;
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("phist", Style::default().fg(Color::Cyan)),
            Span::raw(" - time-weighted price history"),
        ]));

        let current = result.current.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        let position = result
            .price_position_percent
            .map_or_else(|| "-".to_string(), |p| format!("{p:.0}%"));
        lines.push(Line::from(Span::styled(
            format!(
                "as-of: {} | detail: {:?} | source: {} | current: {current} | position: {position}",
                result.as_of,
                result.detail,
                self.source.as_deref().unwrap_or("-"),
            ),
            Style::default().fg(Color::Gray),
        )));

        let rec = &result.recommendation;
        lines.push(Line::from(vec![
            Span::styled(
                rec.tier.title(),
                Style::default().fg(tier_color(rec.tier)).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" ({})", crate::report::recommendation_text(rec))),
        ]));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(10)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_table(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Price history").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let result = &self.run.result;
        let Some(series) = chart_series(result) else {
            let msg = Paragraph::new(crate::report::NO_HISTORY_MESSAGE)
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = BoxPlottersChart {
            boxes: &series.boxes,
            now: series.now,
            current: result.current,
            half_width: 0.3,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            labels: &series.labels,
            fmt_y: fmt_axis_price,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &series.labels, series.y_bounds);
        }
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let result = &self.run.result;
        let text = if result.is_empty() {
            crate::report::NO_HISTORY_MESSAGE.to_string()
        } else {
            crate::report::format_span_table(&result.spans, &result.overall)
        };
        let p = Paragraph::new(text).block(Block::default().title("Spans").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "d detail  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Fetch from the source chain and analyze.
fn load(args: &AnalyzeArgs) -> Result<(Option<String>, AnalysisConfig, RunOutput), AppError> {
    let as_of = args.as_of.unwrap_or_else(crate::app::today);
    let chain = crate::app::source_chain(&args.source, as_of)?;
    let fetched = chain.fetch();
    let config = crate::app::analysis_config_from_args(args, as_of, fetched.current_hint);
    let run = pipeline::run_analysis(&fetched.observations, &config);
    Ok((fetched.source, config, run))
}

fn load_status(source: Option<&str>, run: &RunOutput) -> String {
    match source {
        Some(name) => format!("{} observations from {name}", run.normalize.kept),
        None => "No source returned price history.".to_string(),
    }
}

fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::Good => Color::Green,
        Tier::Decent => Color::LightGreen,
        Tier::Neutral => Color::Gray,
        Tier::Caution => Color::LightRed,
        Tier::Wait => Color::Red,
    }
}

/// Chart data in plot coordinates: period `i` sits at `x = i`.
#[derive(Debug, Clone, PartialEq)]
struct ChartSeries {
    boxes: Vec<ChartBox>,
    now: Option<(f64, f64)>,
    labels: Vec<String>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series for Plotters. `None` when nothing has a price.
fn chart_series(result: &AnalysisResult) -> Option<ChartSeries> {
    let mut boxes = Vec::new();
    let mut now = None;
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);

    for (i, period) in result.periods.iter().enumerate() {
        let x = i as f64;
        match period.value {
            PeriodValue::Box(b) => {
                boxes.push(ChartBox {
                    x,
                    min: b.min,
                    q1: b.q1,
                    median: b.median,
                    q3: b.q3,
                    max: b.max,
                });
                y_min = y_min.min(b.min);
                y_max = y_max.max(b.max);
            }
            PeriodValue::Now { price } => {
                now = Some((x, price));
                y_min = y_min.min(price);
                y_max = y_max.max(price);
            }
            PeriodValue::NoData => {}
        }
    }

    if !y_min.is_finite() || !y_max.is_finite() {
        return None;
    }

    let pad = if y_max > y_min {
        (y_max - y_min) * 0.05
    } else {
        (y_max.abs() * 0.05).max(1.0)
    };

    Some(ChartSeries {
        boxes,
        now,
        labels: result.periods.iter().map(|p| p.label.clone()).collect(),
        x_bounds: [-0.5, result.periods.len() as f64 - 0.5],
        y_bounds: [y_min - pad, y_max + pad],
    })
}

fn fmt_axis_price(v: f64) -> String {
    format!("{v:.0}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

/// Major labels under their columns, price ticks on the left.
fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    labels: &[String],
    y_bounds: [f64; 2],
) {
    let style = Style::default().fg(Color::Gray);
    let n = labels.len().max(1) as f64;

    let y = chart.y + chart.height;
    if y < inner.y + inner.height - 1 {
        let mut next_free = chart.x;
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            let u = (i as f64 + 0.5) / n;
            let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
            let label_len = label.len() as u16;
            let start = x.saturating_sub(label_len / 2).max(next_free);
            if start + label_len > chart.x + chart.width {
                break;
            }
            frame.render_widget(
                Paragraph::new(label.as_str()).style(style),
                Rect {
                    x: start,
                    y,
                    width: label_len,
                    height: 1,
                },
            );
            next_free = start + label_len + 1;
        }
    }

    let ticks = 5usize;
    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_price(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("period")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("price")
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{DetailLevel, RawObservation};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn series_places_periods_by_index() {
        let raw = vec![
            RawObservation::new(as_of() - chrono::Duration::days(400), 120.0),
            RawObservation::new(as_of() - chrono::Duration::days(20), 90.0),
        ];
        let result = pipeline::analyze(&raw, &AnalysisConfig::new(as_of()));
        let series = chart_series(&result).unwrap();

        assert_eq!(series.labels, vec!["3Y", "1Y", "3M", "1M", "1W", "1D", "NOW"]);
        assert_eq!(series.x_bounds, [-0.5, 6.5]);
        assert_eq!(series.now, Some((6.0, 90.0)));
        // 3Y has a price from day -400 onwards; every later span too.
        assert_eq!(series.boxes.len(), 6);
        assert_eq!(series.boxes[0].x, 0.0);
        assert_eq!(series.boxes[0].max, 120.0);

        let pad = (120.0 - 90.0) * 0.05;
        assert_eq!(series.y_bounds, [90.0 - pad, 120.0 + pad]);
    }

    #[test]
    fn series_is_none_without_prices() {
        let result = pipeline::analyze(&[], &AnalysisConfig::new(as_of()));
        assert_eq!(chart_series(&result), None);
    }

    #[test]
    fn flat_series_gets_padding() {
        let raw = vec![RawObservation::new(as_of() - chrono::Duration::days(10), 50.0)];
        let mut config = AnalysisConfig::new(as_of());
        config.detail = DetailLevel::Medium;
        let series = chart_series(&pipeline::analyze(&raw, &config)).unwrap();
        assert_eq!(series.y_bounds, [47.5, 52.5]);
        assert_eq!(series.labels.len(), 19);
    }

    #[test]
    fn layout_reserves_axis_space() {
        let inner = Rect::new(0, 0, 80, 20);
        let (rect, insets) = chart_layout(inner);
        assert!(insets.is_some());
        assert_eq!(rect, Rect::new(8, 1, 70, 17));

        let (small, none) = chart_layout(Rect::new(0, 0, 15, 6));
        assert!(none.is_none());
        assert_eq!(small, Rect::new(0, 0, 15, 6));
    }
}
