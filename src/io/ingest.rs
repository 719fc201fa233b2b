//! File ingest: CSV and JSON files into raw observations.
//!
//! Nothing here validates prices or dates; that is the normalizer's job.
//! This module only deals with file-level problems:
//! - **Strict schema** for CSV headers (clear errors + exit code 2)
//! - **Row-level tolerance** (broken rows are reported, not fatal)

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use serde_json::Value;

use crate::domain::{RawDate, RawObservation, RawPrice};
use crate::error::AppError;

const DATE_COLUMNS: [&str; 3] = ["date", "day", "timestamp"];
const PRICE_COLUMNS: [&str; 4] = ["price", "amountincl", "amount", "value"];

/// A row-level error encountered during CSV ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// CSV ingest output.
#[derive(Debug, Clone)]
pub struct CsvIngest {
    pub observations: Vec<RawObservation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read a `date,price` CSV file.
pub fn read_csv_observations(path: &Path) -> Result<CsvIngest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = find_column(&header_map, &DATE_COLUMNS)
        .ok_or_else(|| AppError::input("Missing required column: `date`"))?;
    let price_idx = find_column(&header_map, &PRICE_COLUMNS)
        .ok_or_else(|| AppError::input("Missing required column: `price`"))?;

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping unreadable CSV row");
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        observations.push(RawObservation {
            date: cell(&record, date_idx).map(|s| RawDate::Text(s.to_string())),
            price: cell(&record, price_idx).map(|s| RawPrice::Text(s.to_string())),
        });
    }

    Ok(CsvIngest {
        observations,
        row_errors,
        rows_read,
    })
}

/// Read and parse a JSON file.
pub fn read_json_document(path: &Path) -> Result<Value, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::input(format!("Invalid JSON in '{}': {e}", path.display())))
}

/// Convert a JSON array into observations, skipping entries that are not objects.
pub fn observations_from_values(values: &[Value]) -> Vec<RawObservation> {
    values
        .iter()
        .filter_map(|v| match serde_json::from_value::<RawObservation>(v.clone()) {
            Ok(obs) if v.is_object() => Some(obs),
            Ok(_) => None,
            Err(e) => {
                tracing::trace!(error = %e, "skipping non-observation entry");
                None
            }
        })
        .collect()
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| header_map.get(*n).copied())
}

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::domain::MissingDatePolicy;
    use crate::io::normalize::normalize;
    use chrono::NaiveDate;

    #[test]
    fn csv_with_bom_and_aliases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}Day,Price\n2024-01-01,100\n2024-01-05,\n2024-01-09,\"1'050.–\"\n").unwrap();

        let ingest = read_csv_observations(file.path()).unwrap();
        assert_eq!(ingest.rows_read, 3);
        assert_eq!(ingest.observations.len(), 3);
        assert!(ingest.observations[1].price.is_none());

        let out = normalize(
            &ingest.observations,
            MissingDatePolicy::Drop,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        let prices: Vec<f64> = out.points.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![100.0, 1050.0]);
    }

    #[test]
    fn csv_without_price_column_is_an_input_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "date,qty\n2024-01-01,1\n").unwrap();

        let err = read_csv_observations(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }

    #[test]
    fn values_skip_non_objects() {
        let values: Vec<Value> = serde_json::from_str(r#"[{"date":"2024-01-01","price":1}, 7, "x", null]"#).unwrap();
        assert_eq!(observations_from_values(&values).len(), 1);
    }
}
