//! JSON Lines corpus: one response per line,
//! `{"id": "r1", "metadata": {"model": "gpt"}, "text": "..."}`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{CorpusRow, ModalityGroup};

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    text: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    rows: Vec<CorpusRow>,
}

impl Corpus {
    pub fn from_rows(rows: Vec<CorpusRow>) -> Self {
        Self { rows }
    }

    pub fn load_jsonl(path: &Path) -> AnalysisResult<Self> {
        let file = File::open(path)
            .map_err(|e| AnalysisError::Corpus(format!("cannot open {}: {e}", path.display())))?;
        let corpus = Self::from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), rows = corpus.len(), "loaded corpus");
        Ok(corpus)
    }

    /// Blank lines are skipped. A row without `id` is identified by its
    /// 1-based line number; a row without `text` is rejected.
    pub fn from_reader(reader: impl BufRead) -> AnalysisResult<Self> {
        let mut rows = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| AnalysisError::Corpus(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(parse_row(&line, line_num + 1)?);
        }
        Ok(Self { rows })
    }

    pub fn from_jsonl_str(content: &str) -> AnalysisResult<Self> {
        Self::from_reader(content.as_bytes())
    }

    pub fn rows(&self) -> &[CorpusRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct values of `variable`, sorted.
    pub fn modalities(&self, variable: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.modality(variable))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows whose `variable` is one of `values`, in corpus order. An empty
    /// selection keeps every row that has a value for `variable`.
    pub fn rows_for_modalities(&self, variable: &str, values: &[String]) -> Vec<CorpusRow> {
        self.rows
            .iter()
            .filter(|r| match r.modality(variable) {
                Some(m) => values.is_empty() || values.iter().any(|v| v == m),
                None => false,
            })
            .cloned()
            .collect()
    }

    pub fn group_by(&self, variable: &str) -> Vec<ModalityGroup> {
        let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for row in &self.rows {
            if let Some(m) = row.modality(variable) {
                groups.entry(m).or_default().push(row.id.clone());
            }
        }
        groups
            .into_iter()
            .map(|(modality, row_ids)| ModalityGroup {
                modality: modality.to_string(),
                row_ids,
            })
            .collect()
    }
}

fn parse_row(line: &str, line_num: usize) -> AnalysisResult<CorpusRow> {
    let raw: RawRow = serde_json::from_str(line)
        .map_err(|e| AnalysisError::Corpus(format!("line {line_num}: {e}")))?;
    let text = raw
        .text
        .ok_or_else(|| AnalysisError::Corpus(format!("line {line_num}: missing \"text\" field")))?;

    let id = match raw.id {
        None | Some(serde_json::Value::Null) => line_num.to_string(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    let metadata = raw
        .metadata
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect();

    Ok(CorpusRow { id, metadata, text })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"id": "r1", "metadata": {"model": "gpt", "prompt": 1}, "text": "un et deux"}

{"metadata": {"model": "claude"}, "text": "trois"}
{"id": 7, "metadata": {"model": null}, "text": "quatre"}
{"id": "r4", "metadata": {"model": "gpt"}, "text": "cinq"}
"#;

    #[test]
    fn parses_rows_and_defaults_ids() {
        let corpus = Corpus::from_jsonl_str(SAMPLE).unwrap();
        assert_eq!(corpus.len(), 4);
        let ids: Vec<&str> = corpus.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "3", "7", "r4"]);
        assert_eq!(corpus.rows()[0].metadata["prompt"], "1");
        assert!(corpus.rows()[2].modality("model").is_none());
    }

    #[test]
    fn filters_and_groups_by_modality() {
        let corpus = Corpus::from_jsonl_str(SAMPLE).unwrap();
        assert_eq!(corpus.modalities("model"), vec!["claude", "gpt"]);

        let gpt = corpus.rows_for_modalities("model", &["gpt".to_string()]);
        assert_eq!(gpt.len(), 2);
        assert_eq!(corpus.rows_for_modalities("model", &[]).len(), 3);

        let groups = corpus.group_by("model");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].modality, "gpt");
        assert_eq!(groups[1].row_ids, vec!["r1", "r4"]);
    }

    #[test]
    fn malformed_rows_are_rejected_with_line_number() {
        let err = Corpus::from_jsonl_str("{\"text\": \"ok\"}\nnot json").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = Corpus::from_jsonl_str("{\"id\": \"x\"}").unwrap_err();
        assert!(err.to_string().contains("missing \"text\""));
    }
}
