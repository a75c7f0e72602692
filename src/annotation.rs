//! Linguistic annotation capability
//!
//! The core never lemmatizes or tags text itself. Constrained connector
//! entries and the linguistic tokenization mode both ask an `Annotator` for
//! `{surface, lemma, pos, morph}` tokens. Two implementations ship here:
//! a lexicon-backed annotator driven by a JSON file, and (behind the
//! `lindera-korean` feature) a lindera morphological analyzer.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{AnalysisError, AnalysisResult};

#[cfg(feature = "lindera-korean")]
use lindera::dictionary::{load_embedded_dictionary, DictionaryKind};
#[cfg(feature = "lindera-korean")]
use lindera::mode::Mode;
#[cfg(feature = "lindera-korean")]
use lindera::segmenter::Segmenter;
#[cfg(feature = "lindera-korean")]
use lindera::tokenizer::Tokenizer as LinderaTokenizer;

pub const PUNCT_TAG: &str = "PUNCT";
pub const SPACE_TAG: &str = "SPACE";

/// One annotated token. `start`/`end` are byte offsets into the annotated text.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedToken {
    pub surface: String,
    pub lemma: String,
    pub pos: String,
    pub morph: String,
    pub start: usize,
    pub end: usize,
}

impl AnnotatedToken {
    pub fn is_punct(&self) -> bool {
        self.pos == PUNCT_TAG || (!self.is_space() && !self.surface.chars().any(char::is_alphanumeric))
    }

    pub fn is_space(&self) -> bool {
        self.pos == SPACE_TAG || self.surface.trim().is_empty()
    }

    /// Morphological features in `Key=Value|Key=Value` form.
    pub fn morph_features(&self) -> impl Iterator<Item = &str> {
        self.morph.split('|').map(str::trim).filter(|f| !f.is_empty())
    }
}

/// External linguistic annotator. Treated as a pure function of its input.
pub trait Annotator {
    fn annotate(&self, text: &str) -> AnalysisResult<Vec<AnnotatedToken>>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
struct LexiconRecord {
    #[serde(default)]
    lemma: Option<String>,
    #[serde(default)]
    pos: Option<String>,
    #[serde(default)]
    morph: Option<String>,
}

static LEXICON_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+|[^\w\s]+").expect("static token pattern")
});

/// Annotator backed by a surface -> {lemma, pos, morph} lexicon.
///
/// Unknown words get their lower-cased surface as lemma and the `X` tag.
/// Runs of non-word characters are tagged `PUNCT`.
#[derive(Debug, Clone, Default)]
pub struct LexiconAnnotator {
    entries: HashMap<String, LexiconRecord>,
}

impl LexiconAnnotator {
    pub fn from_json_str(content: &str) -> AnalysisResult<Self> {
        let raw: HashMap<String, LexiconRecord> = serde_json::from_str(content).map_err(|e| {
            AnalysisError::AnnotationUnavailable(format!("invalid lexicon: {e}"))
        })?;
        let entries = raw
            .into_iter()
            .map(|(surface, record)| (surface.trim().to_lowercase(), record))
            .filter(|(surface, _)| !surface.is_empty())
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::AnnotationUnavailable(format!(
                "cannot read lexicon {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Register one word programmatically.
    pub fn insert(&mut self, surface: &str, lemma: &str, pos: &str, morph: &str) {
        self.entries.insert(
            surface.to_lowercase(),
            LexiconRecord {
                lemma: Some(lemma.to_string()),
                pos: Some(pos.to_string()),
                morph: Some(morph.to_string()),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Annotator for LexiconAnnotator {
    fn annotate(&self, text: &str) -> AnalysisResult<Vec<AnnotatedToken>> {
        let tokens = LEXICON_TOKEN_RE
            .find_iter(text)
            .map(|m| {
                let surface = m.as_str();
                let key = surface.to_lowercase();
                let is_word = surface.chars().any(|c| c.is_alphanumeric() || c == '_');

                let (lemma, pos, morph) = match self.entries.get(&key) {
                    Some(record) => (
                        record.lemma.clone().unwrap_or_else(|| key.clone()),
                        record.pos.clone().unwrap_or_else(|| "X".to_string()),
                        record.morph.clone().unwrap_or_default(),
                    ),
                    None if !is_word => (surface.to_string(), PUNCT_TAG.to_string(), String::new()),
                    None => (key.clone(), "X".to_string(), String::new()),
                };

                AnnotatedToken {
                    surface: surface.to_string(),
                    lemma,
                    pos,
                    morph,
                    start: m.start(),
                    end: m.end(),
                }
            })
            .collect();
        Ok(tokens)
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Korean morphological annotator (ko-dic).
#[cfg(feature = "lindera-korean")]
pub struct LinderaAnnotator {
    tokenizer: LinderaTokenizer,
}

#[cfg(feature = "lindera-korean")]
impl LinderaAnnotator {
    pub fn new() -> AnalysisResult<Self> {
        let dictionary = load_embedded_dictionary(DictionaryKind::KoDic)
            .map_err(|e| AnalysisError::AnnotationUnavailable(e.to_string()))?;
        let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
        Ok(Self {
            tokenizer: LinderaTokenizer::new(segmenter),
        })
    }
}

#[cfg(feature = "lindera-korean")]
impl Annotator for LinderaAnnotator {
    fn annotate(&self, text: &str) -> AnalysisResult<Vec<AnnotatedToken>> {
        let tokens = self
            .tokenizer
            .tokenize(text)
            .map_err(|e| AnalysisError::AnnotationUnavailable(e.to_string()))?;

        Ok(tokens
            .iter()
            .map(|t| {
                let details: Vec<String> = t
                    .details
                    .as_ref()
                    .map(|d| d.iter().map(|s| s.to_string()).collect())
                    .unwrap_or_default();
                let tag = details.first().map(String::as_str).unwrap_or("*");
                // ko-dic punctuation tags: SF, SP, SS*, SE, SO, SC, SY
                let pos = if tag.starts_with('S') && !matches!(tag, "SL" | "SH" | "SN") {
                    PUNCT_TAG.to_string()
                } else {
                    tag.to_string()
                };
                AnnotatedToken {
                    surface: t.surface.to_string(),
                    lemma: t.surface.to_string(),
                    pos,
                    morph: details.iter().skip(1).cloned().collect::<Vec<_>>().join("|"),
                    start: t.byte_start,
                    end: t.byte_end,
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "lindera-ko-dic"
    }
}
