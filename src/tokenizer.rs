//! Segment tokenization
//!
//! Two interchangeable strategies: a language-agnostic word-run tokenizer,
//! and a linguistic tokenizer that delegates to an external annotator and
//! drops punctuation and whitespace tokens.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotation::Annotator;
use crate::error::{AnalysisError, AnalysisResult};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("static word pattern"));

/// Tokenization capability used by the segmenter.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> AnalysisResult<Vec<String>>;

    fn name(&self) -> &str;
}

/// Unicode alphanumeric runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn words(text: &str) -> impl Iterator<Item = &str> {
        WORD_RE.find_iter(text).map(|m| m.as_str())
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> AnalysisResult<Vec<String>> {
        Ok(Self::words(text).map(str::to_string).collect())
    }

    fn name(&self) -> &str {
        "word"
    }
}

/// Tokens from an external annotator, without punctuation and whitespace.
pub struct LinguisticTokenizer<'a> {
    annotator: &'a dyn Annotator,
}

impl<'a> LinguisticTokenizer<'a> {
    pub fn new(annotator: &'a dyn Annotator) -> Self {
        Self { annotator }
    }
}

impl Tokenizer for LinguisticTokenizer<'_> {
    fn tokenize(&self, text: &str) -> AnalysisResult<Vec<String>> {
        Ok(self
            .annotator
            .annotate(text)?
            .into_iter()
            .filter(|t| !t.is_space() && !t.is_punct())
            .map(|t| t.surface)
            .collect())
    }

    fn name(&self) -> &str {
        "linguistic"
    }
}

/// Which tokenizer a request wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenizationMode {
    #[default]
    Word,
    Linguistic,
}

impl TokenizationMode {
    /// Resolve the mode to a tokenizer. The linguistic mode fails rather than
    /// falling back to word runs when no annotator is available.
    pub fn tokenizer<'a>(
        &self,
        annotator: Option<&'a dyn Annotator>,
    ) -> AnalysisResult<Box<dyn Tokenizer + 'a>> {
        match self {
            TokenizationMode::Word => Ok(Box::new(WordTokenizer)),
            TokenizationMode::Linguistic => {
                let annotator = annotator.ok_or_else(|| {
                    AnalysisError::AnnotationUnavailable(
                        "linguistic tokenization requested but no annotator is configured"
                            .to_string(),
                    )
                })?;
                Ok(Box::new(LinguisticTokenizer::new(annotator)))
            }
        }
    }
}

impl std::fmt::Display for TokenizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenizationMode::Word => write!(f, "word"),
            TokenizationMode::Linguistic => write!(f, "linguistic"),
        }
    }
}

impl std::str::FromStr for TokenizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "word" | "regex" => Ok(TokenizationMode::Word),
            "linguistic" | "annotator" => Ok(TokenizationMode::Linguistic),
            _ => Err(format!(
                "invalid tokenizer '{}': expected word or linguistic",
                s
            )),
        }
    }
}
