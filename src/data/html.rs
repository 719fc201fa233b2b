//! Saved product pages.
//!
//! Lookup order inside the page:
//! 1. the `__NEXT_DATA__` script (searched like any JSON document)
//! 2. inline scripts containing a literal `"priceHistory": [...]` array
//! 3. the rendered recharts chart: y-axis labels give the price range, the
//!    line path gives one point per day ending on the chart end date
//!
//! The visible price description ("Der aktuelle Preis liegt bei 189.–")
//! additionally yields a current price, and the canonical link a product id.
//!
//! Pages given by path are read on first use, so an unreadable file fails
//! inside the source chain like any other source.

use std::path::PathBuf;
use std::sync::{LazyLock, OnceLock};

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde_json::Value;

use crate::data::json::observations_from_document;
use crate::data::source::Source;
use crate::domain::RawObservation;
use crate::error::AppError;
use crate::io::ingest::observations_from_values;
use crate::io::normalize::parse_price_text;

static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script[^>]*id=["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#).expect("valid regex")
});
static INLINE_HISTORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""priceHistory"\s*:\s*(\[[^\]]+\])"#).expect("valid regex"));
static CURRENT_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)aktuelle[rn]?\s+Preis\s+(?:liegt\s+)?bei\s+(?:CHF\s*)?([\d'’.,]+[–-]?)").expect("valid regex")
});
static CANONICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link[^>]*rel=["']canonical["'][^>]*href=["']([^"']+)["']"#).expect("valid regex")
});
static PRODUCT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-(\d+)/?$").expect("valid regex"));

static CHART_SURFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(<svg[^>]*class=["'][^"']*recharts-surface[^"']*["'][^>]*>)(.*?)</svg>"#).expect("valid regex")
});
static SVG_HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sheight=["']([\d.]+)["']"#).expect("valid regex"));
static SVG_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static AXIS_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d'’,.]+)[–-]?$").expect("valid regex"));
static LINE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<path[^>]*class=["'][^"']*recharts-line-curve[^"']*["'][^>]*>"#).expect("valid regex")
});
static PATH_D_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\sd=["']([^"']*)["']"#).expect("valid regex"));
static PATH_POINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([ML])([\d.]+),([\d.]+)").expect("valid regex"));

/// SVG height when the surface has none.
const DEFAULT_SVG_HEIGHT: f64 = 250.0;
/// Plot area padding inside the surface (top, and bottom for the x axis).
const PLOT_TOP: f64 = 5.0;
const PLOT_BOTTOM_PAD: f64 = 35.0;
/// Path points closer than this (in x) are the same day.
const MIN_X_STEP: f64 = 0.5;

/// A product page, from disk or already in memory.
pub struct HtmlPageSource {
    path: Option<PathBuf>,
    html: OnceLock<Result<String, AppError>>,
    chart_end: NaiveDate,
}

impl HtmlPageSource {
    /// A page on disk; it is read on first use. `chart_end` dates the last
    /// point of the rendered chart.
    pub fn from_path(path: impl Into<PathBuf>, chart_end: NaiveDate) -> Self {
        Self {
            path: Some(path.into()),
            html: OnceLock::new(),
            chart_end,
        }
    }

    pub fn from_html(html: impl Into<String>, chart_end: NaiveDate) -> Self {
        Self {
            path: None,
            html: OnceLock::from(Ok(html.into())),
            chart_end,
        }
    }

    fn html(&self) -> Result<&str, AppError> {
        let loaded = self.html.get_or_init(|| {
            let Some(path) = &self.path else {
                return Ok(String::new());
            };
            std::fs::read_to_string(path)
                .map_err(|e| AppError::input(format!("Failed to read HTML '{}': {e}", path.display())))
        });
        match loaded {
            Ok(html) => Ok(html.as_str()),
            Err(e) => Err(e.clone()),
        }
    }

    /// Product URL from the canonical link, if the page has one.
    pub fn canonical_url(&self) -> Option<&str> {
        let html = self.html().ok()?;
        CANONICAL_RE.captures(html).and_then(|c| c.get(1)).map(|m| m.as_str())
    }

    /// Product id from the canonical link.
    pub fn product_id(&self) -> Option<u64> {
        self.canonical_url().and_then(product_id_from_path)
    }

    fn history_from_next_data(html: &str) -> Option<Vec<RawObservation>> {
        let script = NEXT_DATA_RE.captures(html)?.get(1)?.as_str();
        match serde_json::from_str::<Value>(script.trim()) {
            Ok(doc) => observations_from_document(&doc),
            Err(e) => {
                tracing::debug!(error = %e, "unparseable __NEXT_DATA__");
                None
            }
        }
    }

    fn history_from_inline_scripts(html: &str) -> Option<Vec<RawObservation>> {
        INLINE_HISTORY_RE.captures_iter(html).find_map(|caps| {
            let items: Vec<Value> = serde_json::from_str(caps.get(1)?.as_str()).ok()?;
            let observations = observations_from_values(&items);
            (!observations.is_empty()).then_some(observations)
        })
    }
}

impl Source for HtmlPageSource {
    fn name(&self) -> &str {
        "html"
    }

    fn fetch(&self) -> Result<Option<Vec<RawObservation>>, AppError> {
        let html = self.html()?;
        Ok(Self::history_from_next_data(html)
            .or_else(|| Self::history_from_inline_scripts(html))
            .or_else(|| history_from_chart(html, self.chart_end)))
    }

    fn current_price_hint(&self) -> Option<f64> {
        let text = CURRENT_PRICE_RE.captures(self.html().ok()?)?.get(1)?.as_str();
        parse_price_text(text).filter(|p| *p > 0.0)
    }
}

/// Rebuild a history from rendered recharts markup.
///
/// The y-axis labels only bound the range, so prices are approximate and
/// one path point is taken per day, the last one on `chart_end`.
pub fn history_from_chart(html: &str, chart_end: NaiveDate) -> Option<Vec<RawObservation>> {
    let caps = CHART_SURFACE_RE.captures(html)?;
    let svg_tag = caps.get(1)?.as_str();
    let body = caps.get(2)?.as_str();

    let axis_prices: Vec<f64> = SVG_TEXT_RE
        .captures_iter(body)
        .filter_map(|c| {
            let text = TAG_RE.replace_all(c.get(1)?.as_str(), "");
            let label = AXIS_PRICE_RE.captures(text.trim())?.get(1)?.as_str().to_string();
            parse_price_text(&label).filter(|p| *p > 0.0)
        })
        .collect();
    if axis_prices.len() < 2 {
        tracing::debug!("chart has no y-axis prices");
        return None;
    }
    let min_price = axis_prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max_price = axis_prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let path_tag = LINE_PATH_RE.find(body)?.as_str();
    let d = PATH_D_RE.captures(path_tag)?.get(1)?.as_str();
    let points: Vec<(f64, f64)> = PATH_POINT_RE
        .captures_iter(d)
        .filter_map(|c| Some((c.get(2)?.as_str().parse().ok()?, c.get(3)?.as_str().parse().ok()?)))
        .collect();
    if points.len() < 3 {
        return None;
    }

    let mut daily: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    let mut last_x = f64::NEG_INFINITY;
    for (x, y) in points {
        if (x - last_x).abs() > MIN_X_STEP {
            daily.push((x, y));
            last_x = x;
        }
    }

    let svg_height = SVG_HEIGHT_RE
        .captures(svg_tag)
        .and_then(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .filter(|h| *h > PLOT_TOP + PLOT_BOTTOM_PAD)
        .unwrap_or(DEFAULT_SVG_HEIGHT);
    let plot_bottom = svg_height - PLOT_BOTTOM_PAD;
    let plot_height = plot_bottom - PLOT_TOP;

    let last = daily.len() - 1;
    let observations: Vec<RawObservation> = daily
        .iter()
        .enumerate()
        .map(|(i, &(_, y))| {
            // SVG y grows downwards.
            let ratio = (plot_bottom - y) / plot_height;
            let price = min_price + ratio * (max_price - min_price);
            let date = chart_end - Duration::days((last - i) as i64);
            RawObservation::new(date, (price * 100.0).round() / 100.0)
        })
        .collect();

    tracing::debug!(points = observations.len(), min_price, max_price, "history from chart markup");
    Some(observations)
}

/// Trailing `-<digits>` of a product URL or path (`/en/s1/product/foo-12345`).
pub fn product_id_from_path(url: &str) -> Option<u64> {
    let path = url.split(['?', '#']).next()?;
    PRODUCT_ID_RE.captures(path)?.get(1)?.as_str().parse().ok()
}
