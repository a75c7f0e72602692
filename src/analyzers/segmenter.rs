use std::borrow::Cow;
use std::cmp::Reverse;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::Annotator;
use crate::dictionary::CompiledMatcher;
use crate::error::AnalysisResult;
use crate::tokenizer::Tokenizer;

/// Metadata header lines start with four asterisks (leading blanks allowed).
const METADATA_MARKER: &str = "****";

static STRONG_PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?;:]+").expect("static punctuation pattern"));

/// Which boundaries split a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentationMode {
    /// Connector matches only.
    #[default]
    Connectors,
    /// Connector matches plus runs of `. ! ? ; :`.
    ConnectorsAndPunctuation,
}

impl std::fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentationMode::Connectors => write!(f, "connectors"),
            SegmentationMode::ConnectorsAndPunctuation => write!(f, "connectors-and-punctuation"),
        }
    }
}

impl std::str::FromStr for SegmentationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "connectors" => Ok(SegmentationMode::Connectors),
            "connectors-and-punctuation" | "punctuation" => {
                Ok(SegmentationMode::ConnectorsAndPunctuation)
            }
            _ => Err(format!(
                "invalid segmentation mode '{}': expected connectors or connectors-and-punctuation",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BoundaryKind {
    Connector { label: String },
    Punctuation,
}

/// A split point. Offsets are bytes into the metadata-stripped text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub kind: BoundaryKind,
}

impl Boundary {
    pub fn is_connector(&self) -> bool {
        matches!(self.kind, BoundaryKind::Connector { .. })
    }

    fn display(&self) -> Cow<'_, str> {
        if self.text.contains('\n') {
            Cow::Borrowed("↵")
        } else {
            Cow::Borrowed(self.text.as_str())
        }
    }
}

/// A retained, connector-bounded span of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Trimmed segment text.
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub word_count: usize,
    pub tokens: Vec<String>,
    pub previous_boundary: Option<Boundary>,
    pub next_boundary: Option<Boundary>,
}

impl Segment {
    /// `[prev] text [next]`, line-break boundaries shown as `↵`.
    pub fn with_markers(&self) -> String {
        let mut parts: Vec<Cow<'_, str>> = Vec::with_capacity(3);
        if let Some(prev) = &self.previous_boundary {
            parts.push(Cow::Owned(format!("[{}]", prev.display())));
        }
        parts.push(Cow::Borrowed(self.text.as_str()));
        if let Some(next) = &self.next_boundary {
            parts.push(Cow::Owned(format!("[{}]", next.display())));
        }
        parts.join(" ")
    }
}

/// Drop metadata header lines. Text without such lines is returned untouched.
pub fn remove_metadata_lines(text: &str) -> Cow<'_, str> {
    let lines: Vec<&str> = text.lines().collect();
    let kept: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| !line.trim_start().starts_with(METADATA_MARKER))
        .collect();

    if kept.len() == lines.len() {
        return Cow::Borrowed(text);
    }
    Cow::Owned(kept.join("\n").trim_start().to_string())
}

/// Splits texts at connector (and optionally punctuation) boundaries.
pub struct Segmenter<'a> {
    matcher: &'a CompiledMatcher,
    tokenizer: &'a dyn Tokenizer,
    annotator: Option<&'a dyn Annotator>,
    mode: SegmentationMode,
    keep_unbounded_text: bool,
}

impl<'a> Segmenter<'a> {
    pub fn new(matcher: &'a CompiledMatcher, tokenizer: &'a dyn Tokenizer) -> Self {
        Self {
            matcher,
            tokenizer,
            annotator: None,
            mode: SegmentationMode::default(),
            keep_unbounded_text: false,
        }
    }

    pub fn mode(mut self, mode: SegmentationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Annotator used by constrained connector entries.
    pub fn annotator(mut self, annotator: Option<&'a dyn Annotator>) -> Self {
        self.annotator = annotator;
        self
    }

    /// Keep a connector-free text as a single unbounded segment.
    pub fn keep_unbounded_text(mut self, keep: bool) -> Self {
        self.keep_unbounded_text = keep;
        self
    }

    pub fn segment(&self, text: &str) -> AnalysisResult<Vec<Segment>> {
        let cleaned = remove_metadata_lines(text);
        if cleaned.trim().is_empty() {
            return Ok(Vec::new());
        }

        let connectors = self.matcher.find_all(&cleaned, self.annotator)?;
        if connectors.is_empty() {
            if !self.keep_unbounded_text {
                return Ok(Vec::new());
            }
            let tokens = self.tokenizer.tokenize(&cleaned)?;
            if tokens.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![Segment {
                text: cleaned.trim().to_string(),
                start: 0,
                end: cleaned.len(),
                word_count: tokens.len(),
                tokens,
                previous_boundary: None,
                next_boundary: None,
            }]);
        }

        let mut boundaries: Vec<(Boundary, u8)> = connectors
            .into_iter()
            .map(|m| {
                (
                    Boundary {
                        start: m.start,
                        end: m.end,
                        text: m.text,
                        kind: BoundaryKind::Connector { label: m.label },
                    },
                    0,
                )
            })
            .collect();

        if self.mode == SegmentationMode::ConnectorsAndPunctuation {
            let mut pos = 0;
            while let Some(m) = STRONG_PUNCTUATION_RE.find_at(&cleaned, pos) {
                boundaries.push((
                    Boundary {
                        start: m.start(),
                        end: m.end(),
                        text: m.as_str().to_string(),
                        kind: BoundaryKind::Punctuation,
                    },
                    1,
                ));
                // every punctuation char is a byte, so start + 1 is a char boundary
                pos = m.start() + 1;
            }
        }

        // leftmost first; on equal start a connector beats punctuation
        boundaries.sort_by_key(|(b, rank)| (b.start, *rank, Reverse(b.end - b.start)));
        let mut resolved: Vec<Boundary> = Vec::with_capacity(boundaries.len());
        let mut cursor = 0;
        for (boundary, _) in boundaries {
            if boundary.start < cursor {
                continue;
            }
            cursor = boundary.end;
            resolved.push(boundary);
        }

        let mut segments = Vec::new();
        let mut last_end = 0;
        let mut previous: Option<&Boundary> = None;

        for boundary in &resolved {
            let span = &cleaned[last_end..boundary.start];
            let bounded = previous.is_some_and(Boundary::is_connector) || boundary.is_connector();
            if bounded && !span.trim().is_empty() {
                self.push_segment(&mut segments, span, last_end, previous, Some(boundary))?;
            }
            previous = Some(boundary);
            last_end = boundary.end;
        }

        let trailing = &cleaned[last_end..];
        if previous.is_some_and(Boundary::is_connector) && !trailing.trim().is_empty() {
            self.push_segment(&mut segments, trailing, last_end, previous, None)?;
        }

        debug!(
            boundaries = resolved.len(),
            segments = segments.len(),
            mode = %self.mode,
            tokenizer = self.tokenizer.name(),
            "segmented text"
        );
        Ok(segments)
    }

    /// Word count of every retained segment.
    pub fn segment_lengths(&self, text: &str) -> AnalysisResult<Vec<usize>> {
        Ok(self.segment(text)?.into_iter().map(|s| s.word_count).collect())
    }

    fn push_segment(
        &self,
        segments: &mut Vec<Segment>,
        span: &str,
        offset: usize,
        previous: Option<&Boundary>,
        next: Option<&Boundary>,
    ) -> AnalysisResult<()> {
        let tokens = self.tokenizer.tokenize(span)?;
        if tokens.is_empty() {
            return Ok(());
        }
        segments.push(Segment {
            text: span.trim().to_string(),
            start: offset,
            end: offset + span.len(),
            word_count: tokens.len(),
            tokens,
            previous_boundary: previous.cloned(),
            next_boundary: next.cloned(),
        });
        Ok(())
    }
}
