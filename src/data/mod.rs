//! Where price history comes from: the source chain and its providers,
//! plus the synthetic generator used by `phist sample`.

pub mod csv;
pub mod graphql;
pub mod html;
pub mod json;
pub mod sample;
pub mod source;

pub use self::csv::CsvSource;
pub use graphql::GraphqlSource;
pub use html::HtmlPageSource;
pub use json::JsonDocumentSource;
pub use sample::{SampleConfig, generate_history};
pub use source::{ChainOutput, Source, SourceChain};
