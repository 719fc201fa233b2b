//! Time-weighted statistics over the analysis horizon.
//!
//! - `aggregate`: step-function segments and weighted quartiles for one window
//! - `buckets`: the bucket layout and per-period statistics
//! - `trend`: recent slope, history range and price position

pub mod aggregate;
pub mod buckets;
pub mod trend;
