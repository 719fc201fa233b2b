//! Command-line parsing for the price history analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the statistics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DetailLevel, MissingDatePolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "phist", version, about = "Time-weighted price history analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a price history, print the report and chart, optionally export.
    Analyze(AnalyzeArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same analysis pipeline as `phist analyze`, but renders
    /// the box chart with Ratatui; `d` cycles the detail level.
    Tui(AnalyzeArgs),
    /// Plot a previously exported analysis JSON.
    Plot(PlotArgs),
    /// Write a synthetic price history (seeded random walk) as JSON.
    Sample(SampleArgs),
}

/// Where the history comes from. Sources are tried in the order
/// HTML pages, JSON documents, CSV files, then the API for `--url`.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Input file (repeatable). `.html`/`.htm` is read as a saved product
    /// page, `.csv` as a `date,price` table, anything else as JSON.
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Product URL; its price history is requested from the site's GraphQL API.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

/// Options for analysis (CLI and TUI).
#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Bucket detail: coarse (7), medium (19) or fine (55).
    #[arg(short = 'd', long, value_enum, default_value_t = DetailLevel::Coarse)]
    pub detail: DetailLevel,

    /// Total bucket count; mapped onto the closest detail preset.
    #[arg(long, value_name = "N", conflicts_with = "detail", value_parser = clap::value_parser!(u32).range(1..))]
    pub buckets: Option<u32>,

    /// Analysis date (YYYY-MM-DD); defaults to today.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Current price; defaults to the page's price or the last observation.
    #[arg(long, value_name = "PRICE")]
    pub current: Option<f64>,

    /// What to do with observations that have no date.
    #[arg(long, value_enum, default_value_t = MissingDatePolicy::Drop)]
    pub missing_date: MissingDatePolicy,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,

    /// Export the analysis to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Export per-period statistics to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

/// Options for plotting a saved analysis.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Analysis JSON produced by `phist analyze --export`.
    #[arg(long, value_name = "JSON")]
    pub analysis: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

/// Options for synthetic history generation.
#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Output file; prints to stdout when omitted.
    #[arg(short = 'o', long, value_name = "JSON")]
    pub out: Option<PathBuf>,

    /// History length in days.
    #[arg(long, default_value_t = 1095)]
    pub days: u32,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Initial list price.
    #[arg(long, default_value_t = 249.0)]
    pub start_price: f64,

    /// Daily probability of a list price change.
    #[arg(long, default_value_t = 0.03)]
    pub change_prob: f64,

    /// Daily probability of a sale starting.
    #[arg(long, default_value_t = 0.01)]
    pub sale_prob: f64,

    /// Last day of the history is the day before this date; defaults to today.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_flags() {
        let cli = Cli::parse_from([
            "phist", "analyze", "-i", "page.html", "-i", "prices.csv", "--detail", "fine", "--as-of", "2025-01-31",
            "--missing-date", "today", "--export-csv", "out.csv",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.source.inputs.len(), 2);
        assert_eq!(args.detail, DetailLevel::Fine);
        assert_eq!(args.as_of, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert_eq!(args.missing_date, MissingDatePolicy::Today);
        assert_eq!(args.export_csv, Some(PathBuf::from("out.csv")));
        assert!(!args.no_plot);
    }

    #[test]
    fn sample_defaults() {
        let cli = Cli::parse_from(["phist", "sample"]);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.days, 1095);
        assert_eq!(args.seed, 42);
        assert!(args.out.is_none());
    }

    #[test]
    fn bucket_count_flag() {
        let cli = Cli::parse_from(["phist", "analyze", "--buckets", "19"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.buckets, Some(19));

        assert!(Cli::try_parse_from(["phist", "analyze", "--buckets", "0"]).is_err());
        assert!(Cli::try_parse_from(["phist", "analyze", "--buckets", "19", "--detail", "fine"]).is_err());
    }

    #[test]
    fn bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["phist", "analyze", "--as-of", "yesterday"]).is_err());
    }
}
