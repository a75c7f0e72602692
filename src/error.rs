use thiserror::Error;

/// Errors surfaced by the analysis core.
///
/// Degenerate numeric inputs (empty texts, zero word counts) are not errors:
/// they produce explicit `0.0` values. A comparison that cannot run is a
/// `ComparisonOutcome::NotPerformed`, and only turns into
/// `InsufficientGroups` when a caller asks for the report as a `Result`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid connector entry for label '{label}': surface string is empty")]
    InvalidEntry { label: String },

    #[error("dictionary error: {0}")]
    Dictionary(String),

    #[error("test not performed: {valid_groups} group(s) with data, at least 2 required")]
    InsufficientGroups { valid_groups: usize },

    #[error("test not performed: {0}")]
    Degenerate(String),

    #[error("linguistic annotation unavailable, this mode cannot run: {0}")]
    AnnotationUnavailable(String),

    #[error("statistics backend error: {0}")]
    Statistics(String),

    #[error("corpus error: {0}")]
    Corpus(String),

    #[error("invalid connector pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
