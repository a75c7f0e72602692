//! Connector dictionary
//!
//! A dictionary maps connector surface strings to category labels. Entries
//! can optionally carry lemma / part-of-speech / morphology constraints that
//! are checked against an external annotator at match time.

pub mod cache;
pub mod matcher;

pub use cache::MatcherCache;
pub use matcher::{CompiledMatcher, ConnectorCount, ConnectorMatch, MatcherOptions};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::annotation::AnnotatedToken;
use crate::error::{AnalysisError, AnalysisResult};

/// Canonical line-break connector.
pub const NEWLINE: &str = "\n";
const NEWLINE_ALIASES: &[&str] = &["\n", "\r\n"];

/// Structured disambiguation constraints. Every non-empty list must be
/// satisfied by the token that starts the candidate occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConstraints {
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub lemma: Vec<String>,
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub pos: Vec<String>,
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub morph: Vec<String>,
}

impl MatchConstraints {
    pub fn is_empty(&self) -> bool {
        self.lemma.is_empty() && self.pos.is_empty() && self.morph.is_empty()
    }

    pub fn accepts(&self, token: &AnnotatedToken) -> bool {
        let lemma_ok = self.lemma.is_empty()
            || self
                .lemma
                .iter()
                .any(|l| l.to_lowercase() == token.lemma.to_lowercase());
        let pos_ok = self.pos.is_empty() || self.pos.iter().any(|p| p.eq_ignore_ascii_case(&token.pos));
        let morph_ok = self
            .morph
            .iter()
            .all(|feature| token.morph_features().any(|f| f == feature));
        lemma_ok && pos_ok && morph_ok
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// A registered connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConnectorEntry {
    /// Matched on surface text alone.
    Simple { surface: String, label: String },
    /// Matched on surface text, then filtered by annotation.
    Constrained {
        surface: String,
        label: String,
        constraints: MatchConstraints,
    },
}

impl ConnectorEntry {
    pub fn simple(surface: impl Into<String>, label: impl Into<String>) -> Self {
        ConnectorEntry::Simple {
            surface: surface.into(),
            label: label.into(),
        }
    }

    /// Builds a constrained entry; empty constraints collapse to `Simple`.
    pub fn constrained(
        surface: impl Into<String>,
        label: impl Into<String>,
        constraints: MatchConstraints,
    ) -> Self {
        if constraints.is_empty() {
            return Self::simple(surface, label);
        }
        ConnectorEntry::Constrained {
            surface: surface.into(),
            label: label.into(),
            constraints,
        }
    }

    pub fn surface(&self) -> &str {
        match self {
            ConnectorEntry::Simple { surface, .. } | ConnectorEntry::Constrained { surface, .. } => {
                surface
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ConnectorEntry::Simple { label, .. } | ConnectorEntry::Constrained { label, .. } => label,
        }
    }

    pub fn constraints(&self) -> Option<&MatchConstraints> {
        match self {
            ConnectorEntry::Simple { .. } => None,
            ConnectorEntry::Constrained { constraints, .. } => Some(constraints),
        }
    }

    pub fn is_newline(&self) -> bool {
        self.surface() == NEWLINE
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Label(String),
    Detailed {
        label: String,
        #[serde(default)]
        constraints: MatchConstraints,
    },
}

/// The loaded connector dictionary, ordered by surface.
#[derive(Debug, Clone, Default)]
pub struct ConnectorDictionary {
    entries: Vec<ConnectorEntry>,
}

impl ConnectorDictionary {
    pub fn from_entries(entries: Vec<ConnectorEntry>) -> Self {
        Self { entries }
    }

    /// Parse a `{"surface": "LABEL"}` or `{"surface": {"label": .., "constraints": ..}}` object.
    ///
    /// Keys are trimmed of spaces and tabs only so that line-break connectors
    /// survive; `"\r\n"` is folded into `"\n"`. Keys empty after trimming are skipped.
    pub fn from_json_str(content: &str) -> AnalysisResult<Self> {
        let raw: BTreeMap<String, RawEntry> = serde_json::from_str(content).map_err(|e| {
            AnalysisError::Dictionary(format!(
                "expected a JSON object of connector -> label: {e}"
            ))
        })?;

        let mut cleaned: BTreeMap<String, ConnectorEntry> = BTreeMap::new();
        for (key, value) in raw {
            let surface = key.trim_matches(|c| c == ' ' || c == '\t');
            if surface.is_empty() {
                debug!(key = ?key, "skipping blank connector key");
                continue;
            }
            let surface = if NEWLINE_ALIASES.contains(&surface) {
                NEWLINE
            } else {
                surface
            };

            let entry = match value {
                RawEntry::Label(label) => ConnectorEntry::simple(surface, clean_label(&label)),
                RawEntry::Detailed { label, constraints } => {
                    ConnectorEntry::constrained(surface, clean_label(&label), constraints)
                }
            };
            cleaned.insert(surface.to_string(), entry);
        }

        if cleaned.is_empty() {
            return Err(AnalysisError::Dictionary(
                "no valid connector found in dictionary".to_string(),
            ));
        }

        Ok(Self {
            entries: cleaned.into_values().collect(),
        })
    }

    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Dictionary(format!("cannot read {}: {e}", path.display()))
        })?;
        let dictionary = Self::from_json_str(&content)?;
        debug!(
            path = %path.display(),
            entries = dictionary.len(),
            "loaded connector dictionary"
        );
        Ok(dictionary)
    }

    pub fn entries(&self) -> &[ConnectorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct labels, sorted.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.label().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Entries whose label is in `labels`. An empty selection keeps everything.
    pub fn select_labels(&self, labels: &[String]) -> Vec<ConnectorEntry> {
        if labels.is_empty() {
            return self.entries.clone();
        }
        self.entries
            .iter()
            .filter(|e| labels.iter().any(|l| l == e.label()))
            .cloned()
            .collect()
    }

    pub fn compile(&self, options: MatcherOptions) -> AnalysisResult<CompiledMatcher> {
        CompiledMatcher::compile(&self.entries, options)
    }
}

fn clean_label(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        label.to_string()
    } else {
        trimmed.to_string()
    }
}
