//! Price history inside arbitrary JSON documents.
//!
//! Product pages ship their data in different envelopes (`__NEXT_DATA__`,
//! an Apollo cache dump, a GraphQL response). Rather than modelling each
//! one, we search for a well-known key holding a non-empty array.

use std::path::PathBuf;

use serde_json::Value;

use crate::data::source::Source;
use crate::domain::RawObservation;
use crate::error::AppError;
use crate::io::ingest::{observations_from_values, read_json_document};

/// Keys under which pages store the history, in lookup order.
pub const HISTORY_KEYS: [&str; 4] = ["priceHistory", "PriceHistory", "priceEvolution", "priceDevelopment"];

/// Deepest nesting level searched.
pub const MAX_DEPTH: usize = 15;

/// Find the first non-empty array stored under one of `keys`.
///
/// At every object the keys are checked directly before descending into
/// children, so a shallow match wins over a deeper one on the same path.
/// Children are visited in document order.
pub fn find_price_history<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a [Value]> {
    find_at_depth(value, keys, 0)
}

fn find_at_depth<'a>(value: &'a Value, keys: &[&str], depth: usize) -> Option<&'a [Value]> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            let direct = keys.iter().find_map(|k| match map.get(*k) {
                Some(Value::Array(items)) if !items.is_empty() => Some(items.as_slice()),
                _ => None,
            });
            direct.or_else(|| map.values().find_map(|v| find_at_depth(v, keys, depth + 1)))
        }
        Value::Array(items) => items.iter().find_map(|v| find_at_depth(v, keys, depth + 1)),
        _ => None,
    }
}

/// Observations from a parsed JSON document.
///
/// A top-level array is taken as the history itself.
pub fn observations_from_document(doc: &Value) -> Option<Vec<RawObservation>> {
    let items = match doc {
        Value::Array(items) => items.as_slice(),
        other => find_price_history(other, &HISTORY_KEYS)?,
    };
    let observations = observations_from_values(items);
    (!observations.is_empty()).then_some(observations)
}

/// A JSON file on disk.
pub struct JsonDocumentSource {
    path: PathBuf,
}

impl JsonDocumentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for JsonDocumentSource {
    fn name(&self) -> &str {
        "json"
    }

    fn fetch(&self) -> Result<Option<Vec<RawObservation>>, AppError> {
        let doc = read_json_document(&self.path)?;
        Ok(observations_from_document(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn finds_nested_history() {
        let doc = json!({
            "props": {
                "pageProps": {
                    "product": {
                        "priceHistory": [],
                        "priceDevelopment": {
                            "priceHistory": [{"date": "2024-01-01", "price": {"amountIncl": 99.0}}]
                        }
                    }
                }
            }
        });
        let found = find_price_history(&doc, &HISTORY_KEYS).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(observations_from_document(&doc).unwrap().len(), 1);
    }

    #[test]
    fn searches_inside_arrays_and_stops_at_depth() {
        let doc = json!({"queries": [{"state": {"data": {"PriceHistory": [{"date": "2024-01-01", "price": 1}]}}}]});
        assert!(find_price_history(&doc, &HISTORY_KEYS).is_some());

        let mut deep = json!({"priceHistory": [{"date": "2024-01-01", "price": 1}]});
        for _ in 0..(MAX_DEPTH + 1) {
            deep = json!({ "child": deep });
        }
        assert!(find_price_history(&deep, &HISTORY_KEYS).is_none());
    }

    #[test]
    fn first_candidate_in_document_order_wins() {
        let doc: Value = serde_json::from_str(
            r#"{
                "zeta": {"priceHistory": [{"date": "2024-01-01", "price": 1}]},
                "alpha": {"priceHistory": [{"date": "2024-01-01", "price": 2}, {"date": "2024-01-02", "price": 3}]}
            }"#,
        )
        .unwrap();
        assert_eq!(find_price_history(&doc, &HISTORY_KEYS).unwrap().len(), 1);
    }

    #[test]
    fn plain_array_document() {
        let doc = json!([{"date": "2024-01-01", "price": 5}, {"date": "2024-01-02", "price": 6}]);
        assert_eq!(observations_from_document(&doc).unwrap().len(), 2);
        assert!(observations_from_document(&json!({"foo": 1})).is_none());
    }

    #[test]
    fn reads_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"data":{{"product":{{"priceHistory":[{{"date":"2024-05-01","price":"129.–"}}]}}}}}}"#).unwrap();

        let source = JsonDocumentSource::new(file.path());
        let observations = source.fetch().unwrap().unwrap();
        assert_eq!(observations.len(), 1);
    }
}
