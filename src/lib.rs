//! `price-history` library crate.
//!
//! The binary (`phist`) is a thin wrapper around this library so that:
//!
//! - the statistics engine is testable without spawning processes
//! - sources, reports and plots are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod stats;
pub mod tui;
