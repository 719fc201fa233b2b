//! Input/output helpers.
//!
//! - CSV/JSON file ingest (`ingest`)
//! - observation cleanup into a canonical series (`normalize`)
//! - analysis exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;
pub mod normalize;

pub use export::*;
pub use ingest::*;
pub use normalize::*;
