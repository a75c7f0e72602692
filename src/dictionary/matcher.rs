use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ConnectorEntry, NEWLINE};
use crate::annotation::{AnnotatedToken, Annotator};
use crate::error::{AnalysisError, AnalysisResult};

/// Matching options that participate in the compiled matcher identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherOptions {
    pub case_insensitive: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

/// One connector occurrence. Offsets are bytes into the searched text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub surface: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorCount {
    pub connector: String,
    pub label: String,
    pub occurrences: usize,
}

#[derive(Debug)]
struct CompiledEntry {
    entry: ConnectorEntry,
    regex: Regex,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    end: usize,
    entry: usize,
}

/// Immutable matcher compiled from a set of connector entries.
///
/// Entries are kept longest-first so that, at a given start position, a
/// longer connector always wins over a shorter one ("ou bien" over "ou").
#[derive(Debug)]
pub struct CompiledMatcher {
    entries: Vec<CompiledEntry>,
    pattern: String,
    alternation: Option<Regex>,
    labels: HashMap<String, String>,
    options: MatcherOptions,
    has_constraints: bool,
}

impl CompiledMatcher {
    pub fn compile(entries: &[ConnectorEntry], options: MatcherOptions) -> AnalysisResult<Self> {
        if let Some(bad) = entries.iter().find(|e| e.surface().is_empty()) {
            return Err(AnalysisError::InvalidEntry {
                label: bad.label().to_string(),
            });
        }

        let mut ordered: Vec<ConnectorEntry> = entries.to_vec();
        ordered.sort_by(|a, b| {
            b.surface()
                .chars()
                .count()
                .cmp(&a.surface().chars().count())
                .then_with(|| a.surface().cmp(b.surface()))
                .then_with(|| a.cmp(b))
        });
        ordered.dedup();

        let flags = if options.case_insensitive { "(?i)" } else { "" };
        let mut compiled = Vec::with_capacity(ordered.len());
        let mut alternatives = Vec::with_capacity(ordered.len());
        let mut labels = HashMap::new();

        for entry in ordered {
            let source = connector_regex(entry.surface());
            let regex = Regex::new(&format!("{flags}{source}"))?;
            labels
                .entry(entry.surface().to_lowercase())
                .or_insert_with(|| entry.label().to_string());
            alternatives.push(source);
            compiled.push(CompiledEntry { entry, regex });
        }

        let pattern = if alternatives.is_empty() {
            String::new()
        } else {
            format!("{flags}(?:{})", alternatives.join("|"))
        };
        let alternation = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(&pattern)?)
        };
        let has_constraints = compiled.iter().any(|c| c.entry.constraints().is_some());

        debug!(
            entries = compiled.len(),
            has_constraints,
            "compiled connector matcher"
        );

        Ok(Self {
            entries: compiled,
            pattern,
            alternation,
            labels,
            options,
            has_constraints,
        })
    }

    /// The alternation pattern source, longest connector first.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> MatcherOptions {
        self.options
    }

    pub fn has_constraints(&self) -> bool {
        self.has_constraints
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConnectorEntry> {
        self.entries.iter().map(|c| &c.entry)
    }

    /// Distinct labels of the compiled entries, sorted.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.entries().map(|e| e.label().to_string()).collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Label registered for a matched surface text.
    pub fn label_of(&self, matched: &str) -> Option<&str> {
        let key = if matched == "\r\n" {
            NEWLINE.to_string()
        } else {
            matched.to_lowercase()
        };
        self.labels.get(&key).map(String::as_str)
    }

    /// All connector occurrences: non-overlapping, earliest start first,
    /// longest match on equal start.
    ///
    /// Constrained entries need an annotator; without one the call fails with
    /// `AnnotationUnavailable` instead of silently matching on surface only.
    pub fn find_all(
        &self,
        text: &str,
        annotator: Option<&dyn Annotator>,
    ) -> AnalysisResult<Vec<ConnectorMatch>> {
        let Some(alternation) = &self.alternation else {
            return Ok(Vec::new());
        };
        if text.is_empty() || !alternation.is_match(text) {
            return Ok(Vec::new());
        }

        let tokens = if self.has_constraints {
            let annotator = annotator.ok_or_else(|| {
                AnalysisError::AnnotationUnavailable(
                    "the selected connectors carry lemma/POS/morphology constraints but no annotator is configured"
                        .to_string(),
                )
            })?;
            annotator.annotate(text)?
        } else {
            Vec::new()
        };
        let token_at: HashMap<usize, &AnnotatedToken> =
            tokens.iter().map(|t| (t.start, t)).collect();

        let mut candidates = Vec::new();
        for (index, compiled) in self.entries.iter().enumerate() {
            let mut pos = 0;
            while pos <= text.len() {
                let Some(m) = compiled.regex.find_at(text, pos) else {
                    break;
                };
                let accepted = match compiled.entry.constraints() {
                    None => true,
                    Some(constraints) => token_at
                        .get(&m.start())
                        .is_some_and(|token| constraints.accepts(token)),
                };
                if accepted {
                    candidates.push(Candidate {
                        start: m.start(),
                        end: m.end(),
                        entry: index,
                    });
                }
                pos = next_char_boundary(text, m.start());
            }
        }

        candidates.sort_by_key(|c| (c.start, Reverse(c.end - c.start), c.entry));

        let mut matches = Vec::new();
        let mut cursor = 0;
        for candidate in candidates {
            if candidate.start < cursor {
                continue;
            }
            let entry = &self.entries[candidate.entry].entry;
            matches.push(ConnectorMatch {
                start: candidate.start,
                end: candidate.end,
                text: text[candidate.start..candidate.end].to_string(),
                surface: entry.surface().to_string(),
                label: entry.label().to_string(),
            });
            cursor = candidate.end;
        }

        Ok(matches)
    }

    pub fn count(&self, text: &str, annotator: Option<&dyn Annotator>) -> AnalysisResult<usize> {
        Ok(self.find_all(text, annotator)?.len())
    }

    /// Occurrences aggregated by label.
    pub fn count_by_label(
        &self,
        text: &str,
        annotator: Option<&dyn Annotator>,
    ) -> AnalysisResult<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for m in self.find_all(text, annotator)? {
            *counts.entry(m.label).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Occurrences per registered connector, sorted by label then connector.
    /// Connectors that never occur are omitted.
    pub fn count_by_connector(
        &self,
        text: &str,
        annotator: Option<&dyn Annotator>,
    ) -> AnalysisResult<Vec<ConnectorCount>> {
        let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
        for m in self.find_all(text, annotator)? {
            *counts.entry((m.label, m.surface)).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((label, connector), occurrences)| ConnectorCount {
                connector,
                label,
                occurrences,
            })
            .collect())
    }
}

/// Regex source for one connector.
///
/// Word boundaries are only added on sides that start/end with a word
/// character: `\b` next to punctuation would never match.
fn connector_regex(surface: &str) -> String {
    if surface == NEWLINE {
        return r"\r?\n".to_string();
    }

    let escaped = regex::escape(surface);
    let leading = surface.chars().next().is_some_and(is_word_char);
    let trailing = surface.chars().last().is_some_and(is_word_char);

    format!(
        "{}{}{}",
        if leading { r"\b" } else { "" },
        escaped,
        if trailing { r"\b" } else { "" }
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text[from..]
        .chars()
        .next()
        .map(|c| from + c.len_utf8())
        .unwrap_or(text.len() + 1)
}
