//! Connector density per response, per modality and per label.
//!
//! Density always counts raw matcher occurrences over the metadata-stripped
//! row text; it never depends on segmentation.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::segmenter::remove_metadata_lines;
use super::stats::{count_words, density, DEFAULT_BASE};
use crate::annotation::Annotator;
use crate::dictionary::CompiledMatcher;
use crate::error::AnalysisResult;
use crate::types::{CorpusRow, DensityRecord, LabelDensityRecord};

pub struct DensityAnalyzer<'a> {
    matcher: &'a CompiledMatcher,
    annotator: Option<&'a dyn Annotator>,
    base: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    words: usize,
    connectors: usize,
}

impl<'a> DensityAnalyzer<'a> {
    pub fn new(matcher: &'a CompiledMatcher) -> Self {
        Self {
            matcher,
            annotator: None,
            base: DEFAULT_BASE,
        }
    }

    pub fn annotator(mut self, annotator: Option<&'a dyn Annotator>) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    /// One record per row that has a value for `variable`, in corpus order.
    pub fn per_response(&self, rows: &[CorpusRow], variable: &str) -> AnalysisResult<Vec<DensityRecord>> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(modality) = row.modality(variable) else {
                warn!(id = %row.id, variable, "row has no modality, skipped");
                continue;
            };
            let text = remove_metadata_lines(&row.text);
            let words = count_words(&text);
            let connectors = self.matcher.count(&text, self.annotator)?;
            records.push(DensityRecord {
                unit: row.id.clone(),
                modality: modality.to_string(),
                word_count: words,
                connector_count: connectors,
                density: density(connectors, words, self.base),
            });
        }
        debug!(responses = records.len(), "computed per-response density");
        Ok(records)
    }

    /// Totals summed over the rows of each modality, sorted by modality.
    pub fn per_modality(&self, rows: &[CorpusRow], variable: &str) -> AnalysisResult<Vec<DensityRecord>> {
        let mut totals: BTreeMap<String, Totals> = BTreeMap::new();
        for record in self.per_response(rows, variable)? {
            let entry = totals.entry(record.modality).or_default();
            entry.words += record.word_count;
            entry.connectors += record.connector_count;
        }

        Ok(totals
            .into_iter()
            .map(|(modality, t)| DensityRecord {
                unit: modality.clone(),
                modality,
                word_count: t.words,
                connector_count: t.connectors,
                density: density(t.connectors, t.words, self.base),
            })
            .collect())
    }

    /// Density of every compiled label within each modality. Labels that
    /// never occur in a modality get a zero record.
    pub fn per_label(&self, rows: &[CorpusRow], variable: &str) -> AnalysisResult<Vec<LabelDensityRecord>> {
        let labels = self.matcher.labels();
        let mut words: BTreeMap<String, usize> = BTreeMap::new();
        let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();

        for row in rows {
            let Some(modality) = row.modality(variable) else {
                warn!(id = %row.id, variable, "row has no modality, skipped");
                continue;
            };
            let text = remove_metadata_lines(&row.text);
            *words.entry(modality.to_string()).or_insert(0) += count_words(&text);
            for (label, n) in self.matcher.count_by_label(&text, self.annotator)? {
                *counts.entry((modality.to_string(), label)).or_insert(0) += n;
            }
        }

        let mut records = Vec::with_capacity(words.len() * labels.len());
        for (modality, word_count) in &words {
            for label in &labels {
                let connector_count = counts
                    .get(&(modality.clone(), label.clone()))
                    .copied()
                    .unwrap_or(0);
                records.push(LabelDensityRecord {
                    modality: modality.clone(),
                    label: label.clone(),
                    word_count: *word_count,
                    connector_count,
                    density: density(connector_count, *word_count, self.base),
                });
            }
        }
        Ok(records)
    }
}
