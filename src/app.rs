//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the source chain and fetches raw observations
//! - runs the analysis pipeline
//! - prints reports/plots
//! - writes optional exports

use std::path::Path;

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalyzeArgs, Command, PlotArgs, SampleArgs, SourceArgs};
use crate::data::{CsvSource, GraphqlSource, HtmlPageSource, JsonDocumentSource, SampleConfig, SourceChain};
use crate::domain::{AnalysisConfig, DetailLevel};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `phist` binary.
pub fn run() -> Result<(), AppError> {
    // `phist -i page.html` behaves like `phist analyze -i page.html`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // Log lines would tear through the alternate screen.
    init_tracing(if matches!(cli.command, Command::Tui(_)) { "off" } else { "warn" });

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Tui(args) => handle_tui(args),
        Command::Plot(args) => handle_plot(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// `RUST_LOG` wins; otherwise `default_filter`. Logs go to stderr so stdout
/// stays clean for reports and `phist sample`.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(today);
    let chain = source_chain(&args.source, as_of)?;
    let fetched = chain.fetch();
    let config = analysis_config_from_args(&args, as_of, fetched.current_hint);

    let run = pipeline::run_analysis(&fetched.observations, &config);
    let result = &run.result;

    println!(
        "{}",
        crate::report::format_report(result, fetched.source.as_deref(), &run.normalize)
    );

    if !args.no_plot && !result.is_empty() {
        let plot = crate::plot::render_box_chart(&result.periods, result.current, args.width, args.height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &args.export {
        let file = crate::io::export::AnalysisFile::new(fetched.source.clone(), run.normalize, run.result.clone());
        crate::io::export::write_analysis_json(path, &file)?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::export::write_periods_csv(path, &run.result)?;
    }

    Ok(())
}

fn handle_tui(args: AnalyzeArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::export::read_analysis_json(&args.analysis)?;
    let analysis = &file.analysis;

    if analysis.is_empty() {
        println!("{}", crate::report::NO_HISTORY_MESSAGE);
        return Ok(());
    }

    let plot = crate::plot::render_box_chart(&analysis.periods, analysis.current, args.width, args.height);
    println!("{plot}");
    print!("{}", crate::report::format_recommendation(analysis));
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let mut config = SampleConfig::new(args.as_of.unwrap_or_else(today), args.seed);
    config.days = args.days;
    config.start_price = args.start_price;
    config.change_prob = args.change_prob;
    config.sale_prob = args.sale_prob;

    let points = crate::data::generate_history(&config)?;

    match &args.out {
        Some(path) => {
            crate::io::export::write_points_json(path, &points)?;
            eprintln!("Wrote {} synthetic observations to {}", points.len(), path.display());
        }
        None => {
            let json = serde_json::to_string_pretty(&points)
                .map_err(|e| AppError::runtime(format!("Failed to serialize sample: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Build the source chain: pages, JSON documents, CSV files, then the API.
///
/// Without `--url`, the first page with a canonical product link stands in
/// for it. `as_of` dates the last point of a rendered page chart.
pub fn source_chain(args: &SourceArgs, as_of: NaiveDate) -> Result<SourceChain, AppError> {
    let mut pages = Vec::new();
    let mut documents = Vec::new();
    let mut tables = Vec::new();

    for path in &args.inputs {
        match InputKind::of(path) {
            InputKind::Html => pages.push(HtmlPageSource::from_path(path, as_of)),
            InputKind::Json => documents.push(JsonDocumentSource::new(path)),
            InputKind::Csv => tables.push(CsvSource::new(path)),
        }
    }

    let api = match &args.url {
        Some(url) => Some(GraphqlSource::from_env(url)?),
        None => page_api_source(&pages),
    };

    let mut chain = SourceChain::new();
    for source in pages {
        chain.push(source);
    }
    for source in documents {
        chain.push(source);
    }
    for source in tables {
        chain.push(source);
    }
    if let Some(api) = api {
        chain.push(api);
    }

    if chain.is_empty() {
        return Err(AppError::input(
            "No price history source given. Use `-i <FILE>` (HTML, JSON or CSV) or `--url <URL>`.",
        ));
    }
    tracing::debug!(sources = ?chain.names(), "source chain");
    Ok(chain)
}

/// API source for the first page that links its product; best effort.
fn page_api_source(pages: &[HtmlPageSource]) -> Option<GraphqlSource> {
    let url = pages.iter().find_map(|p| p.product_id().and(p.canonical_url()))?;
    match GraphqlSource::from_env(url) {
        Ok(source) => {
            tracing::debug!(url, "using the page's product link for the API");
            Some(source)
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "cannot query the API for the page's product");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Html,
    Json,
    Csv,
}

impl InputKind {
    fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" => InputKind::Html,
            "csv" => InputKind::Csv,
            _ => InputKind::Json,
        }
    }
}

/// `--current` wins over the page's current-price hint, `--buckets` over
/// `--detail`.
pub fn analysis_config_from_args(args: &AnalyzeArgs, as_of: NaiveDate, current_hint: Option<f64>) -> AnalysisConfig {
    AnalysisConfig {
        as_of,
        detail: args
            .buckets
            .map_or(args.detail, |n| DetailLevel::from_bucket_count(n as usize)),
        current_override: args.current.or(current_hint),
        missing_date: args.missing_date,
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Rewrite argv so flags without a subcommand mean `analyze`.
///
/// Rules:
/// - `phist -i page.html ...`  -> `phist analyze -i page.html ...`
/// - `phist --help/--version`  -> unchanged (show top-level help/version)
/// - anything else             -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1) else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version");
    if !is_top_level_help_or_version && arg1.starts_with('-') {
        argv.insert(1, "analyze".to_string());
    }
    argv
}
