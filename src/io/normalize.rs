//! Observation normalization.
//!
//! This module turns whatever a source produced into a clean, chronologically
//! sorted series of `PricePoint`s that is safe to aggregate.
//!
//! Design goals:
//! - **Soft failure**: malformed records are dropped and counted, never raised
//! - **Deterministic behavior**: stable sort, no dedup, no hidden "now"
//! - **Separation of concerns**: no aggregation logic here

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{AmountValue, MissingDatePolicy, PriceAmount, PricePoint, RawDate, RawObservation, RawPrice};

/// Counters describing what normalization kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    pub read: usize,
    pub kept: usize,
    /// Missing, unparseable, non-finite or non-positive price.
    pub dropped_price: usize,
    /// Missing (under `MissingDatePolicy::Drop`) or unparseable date.
    pub dropped_date: usize,
}

/// Normalizer output: canonical points plus counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub points: Vec<PricePoint>,
    pub report: NormalizeReport,
}

/// Normalize raw observations into a sorted canonical series.
///
/// `today` is only consulted when `policy` is [`MissingDatePolicy::Today`].
pub fn normalize(raw: &[RawObservation], policy: MissingDatePolicy, today: NaiveDate) -> Normalized {
    let mut report = NormalizeReport {
        read: raw.len(),
        ..NormalizeReport::default()
    };
    let mut points = Vec::with_capacity(raw.len());

    for (idx, obs) in raw.iter().enumerate() {
        let Some(price) = obs.price.as_ref().and_then(parse_price).filter(|p| *p > 0.0) else {
            tracing::trace!(idx, price = ?obs.price, "dropping observation: invalid price");
            report.dropped_price += 1;
            continue;
        };

        let date = match &obs.date {
            Some(raw_date) => parse_raw_date(raw_date),
            None => match policy {
                MissingDatePolicy::Drop => None,
                MissingDatePolicy::Today => Some(today),
            },
        };
        let Some(date) = date else {
            tracing::trace!(idx, date = ?obs.date, "dropping observation: invalid date");
            report.dropped_date += 1;
            continue;
        };

        points.push(PricePoint { date, price });
    }

    // Stable: same-date records keep their input order, so "last wins"
    // lookups further down see the later record.
    points.sort_by_key(|p| p.date);
    report.kept = points.len();

    tracing::debug!(
        read = report.read,
        kept = report.kept,
        dropped_price = report.dropped_price,
        dropped_date = report.dropped_date,
        "normalized observations"
    );

    Normalized { points, report }
}

/// Extract a finite number from a raw price (sign is not checked here).
pub fn parse_price(raw: &RawPrice) -> Option<f64> {
    match raw {
        RawPrice::Number(v) => v.is_finite().then_some(*v),
        RawPrice::Text(s) => parse_price_text(s),
        RawPrice::Amount(amount) => parse_amount(amount),
        RawPrice::Other(_) => None,
    }
}

/// Inclusive amount first, then the generic one, then the exclusive one.
fn parse_amount(amount: &PriceAmount) -> Option<f64> {
    [&amount.amount_incl, &amount.amount, &amount.amount_excl]
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            AmountValue::Number(n) => n.is_finite().then_some(*n),
            AmountValue::Text(s) => parse_price_text(s),
        })
}

const CURRENCY_PREFIXES: [&str; 5] = ["CHF", "EUR", "Fr.", "€", "$"];

/// Parse a price as it is printed on product pages.
///
/// Accepts `189`, `189.50`, `1'299.–`, `1,299.00`, `CHF 189.–`. Thousands
/// separators (`'`, `’`, `,`) and dash placeholders for cents are dropped.
/// Anything with other characters is rejected.
pub fn parse_price_text(s: &str) -> Option<f64> {
    let mut s = s.trim();
    for prefix in CURRENCY_PREFIXES {
        if let Some(rest) = strip_prefix_ignore_case(s, prefix) {
            s = rest.trim_start();
            break;
        }
    }

    let negative = s.starts_with('-');
    let mut digits = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '0'..='9' | '.' => digits.push(ch),
            '\'' | '’' | ',' | ' ' | '\u{a0}' | '\u{2009}' | '–' | '-' => {}
            _ => return None,
        }
    }

    let v = digits.trim_end_matches('.').parse::<f64>().ok()?;
    let v = if negative { -v } else { v };
    v.is_finite().then_some(v)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

fn parse_raw_date(raw: &RawDate) -> Option<NaiveDate> {
    match raw {
        RawDate::Date(d) => Some(*d),
        RawDate::Text(s) => parse_date_text(s),
        RawDate::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms).map(|dt| dt.date_naive()),
        RawDate::Other(_) => None,
    }
}

/// Parse the date formats seen in page data and exports.
///
/// Timestamps keep the date as written (the local date of their offset);
/// the time of day is discarded.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    const DATE_FMTS: [&str; 5] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}
