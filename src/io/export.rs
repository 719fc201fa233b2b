//! Analysis exports.
//!
//! - JSON: the full `AnalysisResult` plus run metadata, reloadable with
//!   [`read_analysis_json`] (used by `phist plot`)
//! - CSV: one row per period, meant for spreadsheets
//! - sample JSON: a plain `[{date, price}]` array, readable as input again

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{AnalysisResult, PeriodValue, PricePoint};
use crate::error::AppError;
use crate::io::normalize::NormalizeReport;

/// On-disk shape of `--export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFile {
    pub tool: String,
    /// Source chain entry that delivered the history.
    pub source: Option<String>,
    pub normalize: NormalizeReport,
    pub analysis: AnalysisResult,
}

impl AnalysisFile {
    pub fn new(source: Option<String>, normalize: NormalizeReport, analysis: AnalysisResult) -> Self {
        Self {
            tool: "phist".to_string(),
            source,
            normalize,
            analysis,
        }
    }
}

#[derive(Debug, Serialize)]
struct PeriodRow<'a> {
    label: &'a str,
    start_days_ago: f64,
    end_days_ago: f64,
    samples: usize,
    min: Option<f64>,
    q1: Option<f64>,
    median: Option<f64>,
    q3: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
}

/// Write the analysis as pretty JSON.
pub fn write_analysis_json(path: &Path, file: &AnalysisFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(out), file)
        .map_err(|e| AppError::runtime(format!("Failed to write export JSON: {e}")))?;
    tracing::debug!(path = %path.display(), "wrote analysis JSON");
    Ok(())
}

/// Read a file written by [`write_analysis_json`].
pub fn read_analysis_json(path: &Path) -> Result<AnalysisFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open analysis JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::input(format!("Invalid analysis JSON '{}': {e}", path.display())))
}

/// Write one CSV row per period. The NOW row carries the current price in
/// the `median` column; periods without data leave the statistics empty.
pub fn write_periods_csv(path: &Path, result: &AnalysisResult) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for p in &result.periods {
        let mut row = PeriodRow {
            label: &p.label,
            start_days_ago: p.start_days_ago,
            end_days_ago: p.end_days_ago,
            samples: p.sample_count,
            min: None,
            q1: None,
            median: None,
            q3: None,
            max: None,
            mean: None,
        };
        match p.value {
            PeriodValue::Box(b) => {
                row.min = Some(b.min);
                row.q1 = Some(b.q1);
                row.median = Some(b.median);
                row.q3 = Some(b.q3);
                row.max = Some(b.max);
                row.mean = Some(b.mean);
            }
            PeriodValue::Now { price } => row.median = Some(price),
            PeriodValue::NoData => {}
        }
        writer
            .serialize(&row)
            .map_err(|e| AppError::runtime(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write canonical points as a `[{date, price}]` JSON array.
pub fn write_points_json(path: &Path, points: &[PricePoint]) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(out), points)
        .map_err(|e| AppError::runtime(format!("Failed to write sample JSON: {e}")))
}
