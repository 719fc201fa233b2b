//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw source records (`RawObservation`, `RawDate`, `RawPrice`)
//! - the canonical series (`PricePoint`) and its derived segments
//! - bucketing and output types (`Bucket`, `PeriodStatistics`, `AnalysisResult`)

pub mod types;

pub use types::*;
