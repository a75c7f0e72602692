//! Segment-length views: LMS and sigma per modality, per-response summaries.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::segmenter::Segmenter;
use super::stats::{mean_and_std, median, summarize_lengths, DEFAULT_SHORT_SEGMENT_THRESHOLD};
use crate::error::AnalysisResult;
use crate::types::{CorpusRow, ModalityLengthStats, ModalityLms, ResponseLengthSummary};

pub struct LengthAnalyzer<'s, 'a> {
    segmenter: &'s Segmenter<'a>,
    short_threshold: usize,
}

impl<'s, 'a> LengthAnalyzer<'s, 'a> {
    pub fn new(segmenter: &'s Segmenter<'a>) -> Self {
        Self {
            segmenter,
            short_threshold: DEFAULT_SHORT_SEGMENT_THRESHOLD,
        }
    }

    pub fn short_threshold(mut self, threshold: usize) -> Self {
        self.short_threshold = threshold;
        self
    }

    /// Segment lengths of every row, pooled by modality. Rows are segmented
    /// one by one so no boundary is created between two responses.
    pub fn lengths_per_modality(
        &self,
        rows: &[CorpusRow],
        variable: &str,
    ) -> AnalysisResult<BTreeMap<String, Vec<f64>>> {
        let mut pooled: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in rows {
            let Some(modality) = row.modality(variable) else {
                warn!(id = %row.id, variable, "row has no modality, skipped");
                continue;
            };
            let lengths = self.segmenter.segment_lengths(&row.text)?;
            pooled
                .entry(modality.to_string())
                .or_default()
                .extend(lengths.into_iter().map(|l| l as f64));
        }
        Ok(pooled)
    }

    pub fn lms_per_modality(&self, rows: &[CorpusRow], variable: &str) -> AnalysisResult<Vec<ModalityLms>> {
        let pooled = self.lengths_per_modality(rows, variable)?;
        Ok(pooled
            .into_iter()
            .map(|(modality, lengths)| {
                let (lms, std_dev) = mean_and_std(&lengths);
                ModalityLms {
                    modality,
                    segment_count: lengths.len(),
                    lms,
                    std_dev,
                }
            })
            .collect())
    }

    /// One summary per row that has a modality and at least one segment.
    pub fn summaries_per_response(
        &self,
        rows: &[CorpusRow],
        variable: &str,
    ) -> AnalysisResult<Vec<ResponseLengthSummary>> {
        let mut summaries = Vec::new();
        for row in rows {
            let Some(modality) = row.modality(variable) else {
                warn!(id = %row.id, variable, "row has no modality, skipped");
                continue;
            };
            let lengths = self.segmenter.segment_lengths(&row.text)?;
            match summarize_lengths(&lengths, self.short_threshold) {
                Some(summary) => summaries.push(ResponseLengthSummary {
                    id: row.id.clone(),
                    modality: modality.to_string(),
                    summary,
                }),
                None => debug!(id = %row.id, "response has no retained segment"),
            }
        }
        Ok(summaries)
    }
}

/// Mean LMS, median of medians, mean sigma, mean CV and mean short-segment
/// proportion per modality.
pub fn stats_per_modality(summaries: &[ResponseLengthSummary]) -> Vec<ModalityLengthStats> {
    let mut grouped: BTreeMap<&str, Vec<&ResponseLengthSummary>> = BTreeMap::new();
    for s in summaries {
        grouped.entry(s.modality.as_str()).or_default().push(s);
    }

    grouped
        .into_iter()
        .map(|(modality, group)| {
            let column = |f: fn(&ResponseLengthSummary) -> f64| -> Vec<f64> {
                group.iter().map(|s| f(s)).collect()
            };
            ModalityLengthStats {
                modality: modality.to_string(),
                response_count: group.len(),
                mean_lms: mean_and_std(&column(|s| s.summary.lms)).0,
                median_of_medians: median(&column(|s| s.summary.median)),
                mean_std_dev: mean_and_std(&column(|s| s.summary.std_dev)).0,
                mean_coefficient_of_variation: mean_and_std(&column(|s| {
                    s.summary.coefficient_of_variation
                }))
                .0,
                mean_short_proportion: mean_and_std(&column(|s| s.summary.short_proportion)).0,
            }
        })
        .collect()
}
