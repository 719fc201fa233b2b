//! `date,price` CSV files as a source.

use std::path::PathBuf;

use crate::data::source::Source;
use crate::domain::RawObservation;
use crate::error::AppError;
use crate::io::ingest::read_csv_observations;

pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self) -> Result<Option<Vec<RawObservation>>, AppError> {
        let ingest = read_csv_observations(&self.path)?;
        if !ingest.row_errors.is_empty() {
            tracing::warn!(
                rows = ingest.rows_read,
                errors = ingest.row_errors.len(),
                first_line = ingest.row_errors[0].line,
                "CSV rows skipped"
            );
        }
        Ok((!ingest.observations.is_empty()).then_some(ingest.observations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn header_only_file_has_no_history() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,price").unwrap();
        assert_eq!(CsvSource::new(file.path()).fetch().unwrap(), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CsvSource::new("/nonexistent/prices.csv").fetch().unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }
}
