//! Connector-aware segmentation, density statistics and group comparison
//! for corpora of labeled text responses.

pub mod analyzers;
pub mod annotation;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod parsers;
pub mod tokenizer;
pub mod types;

pub use dictionary::{CompiledMatcher, ConnectorDictionary, ConnectorEntry, MatcherCache};
pub use error::{AnalysisError, AnalysisResult};
