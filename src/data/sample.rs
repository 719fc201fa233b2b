//! Synthetic price history for demos.
//!
//! Retail prices do not move every day: most days nothing changes, now and
//! then the list price steps (log-normal jump), and occasionally a sale
//! drops it for a few days before it returns. Only change days are emitted,
//! like a real price-history feed.
//!
//! Output is deterministic for a given `SampleConfig` (seeded `StdRng`).

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::PricePoint;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    /// Length of the history, ending at `end`.
    pub days: u32,
    pub end: NaiveDate,
    pub seed: u64,
    pub start_price: f64,
    /// Daily probability of a list price step.
    pub change_prob: f64,
    /// Log std dev of one list price step.
    pub step_vol: f64,
    /// Daily probability of a sale starting.
    pub sale_prob: f64,
    /// Fractional discount during a sale.
    pub sale_depth: f64,
}

impl SampleConfig {
    pub fn new(end: NaiveDate, seed: u64) -> Self {
        Self {
            days: 1095,
            end,
            seed,
            start_price: 249.0,
            change_prob: 0.03,
            step_vol: 0.06,
            sale_prob: 0.01,
            sale_depth: 0.2,
        }
    }
}

const SALE_DAYS: std::ops::RangeInclusive<u32> = 3..=10;
/// Prices are quoted in steps of 0.05.
const TICK: f64 = 0.05;

/// Generate a random-walk history, oldest first.
pub fn generate_history(config: &SampleConfig) -> Result<Vec<PricePoint>, AppError> {
    if config.days == 0 {
        return Err(AppError::input("Sample length must be > 0 days."));
    }
    if !(config.start_price.is_finite() && config.start_price > 0.0) {
        return Err(AppError::input("Start price must be a positive number."));
    }
    for (name, p) in [("change", config.change_prob), ("sale", config.sale_prob)] {
        if !(0.0..=1.0).contains(&p) {
            return Err(AppError::input(format!("Invalid {name} probability {p}.")));
        }
    }
    if !(0.0..1.0).contains(&config.sale_depth) {
        return Err(AppError::input("Sale depth must be in [0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.step_vol.max(0.0))
        .map_err(|e| AppError::runtime(format!("Noise distribution error: {e}")))?;

    let start = config.end - Duration::days(i64::from(config.days));
    let mut list_price = config.start_price;
    let mut sale_left = 0u32;
    let mut last_emitted: Option<f64> = None;
    let mut out = Vec::new();

    for day in 0..config.days {
        // The first day always shows the list price.
        if day > 0 {
            if sale_left > 0 {
                sale_left -= 1;
            } else if rng.r#gen::<f64>() < config.sale_prob {
                sale_left = rng.gen_range(SALE_DAYS);
            } else if rng.r#gen::<f64>() < config.change_prob {
                // Mean-corrected so list prices do not drift on average.
                let z: f64 = normal.sample(&mut rng);
                list_price *= (z - 0.5 * config.step_vol * config.step_vol).exp();
            }
        }

        let effective = if sale_left > 0 { list_price * (1.0 - config.sale_depth) } else { list_price };
        let price = round_to_tick(effective);

        if last_emitted != Some(price) {
            out.push(PricePoint {
                date: start + Duration::days(i64::from(day)),
                price,
            });
            last_emitted = Some(price);
        }
    }

    tracing::debug!(points = out.len(), seed = config.seed, "generated synthetic history");
    Ok(out)
}

fn round_to_tick(price: f64) -> f64 {
    ((price / TICK).round() * TICK).max(TICK)
}
