//! Ranked source chain.
//!
//! Each provider knows one way of getting raw observations (a saved page, a
//! JSON document, a CSV file, the GraphQL API). The chain asks them in
//! priority order and keeps the first non-empty answer. A provider that
//! fails is logged and skipped; extraction is best effort.

use crate::domain::RawObservation;
use crate::error::AppError;

/// One way of obtaining raw observations.
pub trait Source {
    /// Short name for logs and the report.
    fn name(&self) -> &str;

    /// `Ok(None)` (or an empty list) means "nothing here, try the next one".
    fn fetch(&self) -> Result<Option<Vec<RawObservation>>, AppError>;

    /// A current price the source saw outside the history itself.
    fn current_price_hint(&self) -> Option<f64> {
        None
    }
}

/// What the chain produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainOutput {
    /// Name of the source that delivered `observations`.
    pub source: Option<String>,
    pub observations: Vec<RawObservation>,
    /// First current-price hint of any source, in priority order.
    pub current_hint: Option<f64>,
}

#[derive(Default)]
pub struct SourceChain {
    sources: Vec<Box<dyn Source>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl Source + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn with(mut self, source: impl Source + 'static) -> Self {
        self.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Try every source in order until one yields observations.
    pub fn fetch(&self) -> ChainOutput {
        let current_hint = self.sources.iter().find_map(|s| s.current_price_hint());
        if let Some(price) = current_hint {
            tracing::debug!(price, "current price hint");
        }

        for source in &self.sources {
            match source.fetch() {
                Ok(Some(observations)) if !observations.is_empty() => {
                    tracing::info!(source = source.name(), count = observations.len(), "price history found");
                    return ChainOutput {
                        source: Some(source.name().to_string()),
                        observations,
                        current_hint,
                    };
                }
                Ok(_) => tracing::debug!(source = source.name(), "no price history"),
                Err(e) => tracing::warn!(source = source.name(), error = %e, "source failed"),
            }
        }

        tracing::warn!("no source produced price history");
        ChainOutput {
            source: None,
            observations: Vec::new(),
            current_hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Fixed {
        name: &'static str,
        result: Result<Option<Vec<RawObservation>>, AppError>,
        hint: Option<f64>,
    }

    impl Source for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self) -> Result<Option<Vec<RawObservation>>, AppError> {
            self.result.clone()
        }

        fn current_price_hint(&self) -> Option<f64> {
            self.hint
        }
    }

    fn one_point() -> Vec<RawObservation> {
        vec![RawObservation::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 10.0)]
    }

    #[test]
    fn first_non_empty_source_wins() {
        let chain = SourceChain::new()
            .with(Fixed { name: "broken", result: Err(AppError::runtime("timeout")), hint: None })
            .with(Fixed { name: "empty", result: Ok(Some(Vec::new())), hint: Some(189.0) })
            .with(Fixed { name: "none", result: Ok(None), hint: None })
            .with(Fixed { name: "page", result: Ok(Some(one_point())), hint: None })
            .with(Fixed { name: "later", result: Ok(Some(one_point())), hint: Some(1.0) });

        assert_eq!(chain.len(), 5);
        let out = chain.fetch();
        assert_eq!(out.source.as_deref(), Some("page"));
        assert_eq!(out.observations.len(), 1);
        assert_eq!(out.current_hint, Some(189.0));
    }

    #[test]
    fn exhausted_chain_is_empty() {
        let chain = SourceChain::new().with(Fixed { name: "none", result: Ok(None), hint: None });
        let out = chain.fetch();
        assert_eq!(out, ChainOutput::default());
        assert!(SourceChain::new().is_empty());
    }
}
