use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One response of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub id: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
}

impl CorpusRow {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: BTreeMap::new(),
            text: text.into(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Value of `variable` for this row. Blank values count as missing.
    pub fn modality(&self, variable: &str) -> Option<&str> {
        self.metadata
            .get(variable)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalityGroup {
    pub modality: String,
    pub row_ids: Vec<String>,
}

/// Density of one unit (a response, or a whole modality).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityRecord {
    pub unit: String,
    pub modality: String,
    pub word_count: usize,
    pub connector_count: usize,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDensityRecord {
    pub modality: String,
    pub label: String,
    pub word_count: usize,
    pub connector_count: usize,
    pub density: f64,
}

/// Segment-length indicators of one response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentLengthSummary {
    /// Mean segment length, in words.
    pub lms: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub median: f64,
    /// Share of segments no longer than the short-segment threshold.
    pub short_proportion: f64,
    pub segment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseLengthSummary {
    pub id: String,
    pub modality: String,
    #[serde(flatten)]
    pub summary: SegmentLengthSummary,
}

/// LMS and sigma of the pooled segments of one modality.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalityLms {
    pub modality: String,
    pub segment_count: usize,
    pub lms: f64,
    pub std_dev: f64,
}

/// Per-modality aggregation of response summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalityLengthStats {
    pub modality: String,
    pub response_count: usize,
    pub mean_lms: f64,
    pub median_of_medians: f64,
    pub mean_std_dev: f64,
    pub mean_coefficient_of_variation: f64,
    pub mean_short_proportion: f64,
}
