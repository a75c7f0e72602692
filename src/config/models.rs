use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analyzers::comparison::ComparisonConfig;
use crate::analyzers::segmenter::SegmentationMode;
use crate::analyzers::stats::{DEFAULT_BASE, DEFAULT_SHORT_SEGMENT_THRESHOLD};
use crate::dictionary::MatcherOptions;
use crate::tokenizer::TokenizationMode;

/// Schema of `.connector-lens.yaml`.
/// The global (`$HOME`) and project files are deep-merged before decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connector dictionary (JSON).
    pub dictionary: Option<PathBuf>,
    /// Annotation lexicon (JSON). Needed by constrained entries and the
    /// linguistic tokenizer.
    pub lexicon: Option<PathBuf>,
    pub matcher: MatcherOptions,
    pub density: DensityConfig,
    pub segmentation: SegmentationConfig,
    pub comparison: ComparisonConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    pub base: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self { base: DEFAULT_BASE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub mode: SegmentationMode,
    pub tokenizer: TokenizationMode,
    pub short_segment_threshold: usize,
    pub keep_unbounded_text: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            mode: SegmentationMode::default(),
            tokenizer: TokenizationMode::default(),
            short_segment_threshold: DEFAULT_SHORT_SEGMENT_THRESHOLD,
            keep_unbounded_text: false,
        }
    }
}
