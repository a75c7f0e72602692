//! Numeric primitives shared by the density and length views.

use crate::tokenizer::WordTokenizer;
use crate::types::SegmentLengthSummary;

/// Connectors per this many words.
pub const DEFAULT_BASE: f64 = 1000.0;

/// Segments of at most this many words count as short.
pub const DEFAULT_SHORT_SEGMENT_THRESHOLD: usize = 10;

/// Mean and population standard deviation. `(0.0, 0.0)` for empty input.
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Sample variance (n - 1 denominator). 0 below two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let (mean, _) = mean_and_std(values);
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// `connectors / words * base`, or 0 when there are no words.
pub fn density(connectors: usize, words: usize, base: f64) -> f64 {
    if words == 0 {
        return 0.0;
    }
    connectors as f64 / words as f64 * base
}

/// Unicode alphanumeric word runs.
pub fn count_words(text: &str) -> usize {
    WordTokenizer::words(text).count()
}

/// Length indicators of one response's segments. `None` without segments.
///
/// With a zero threshold the short-segment proportion is 0.
pub fn summarize_lengths(lengths: &[usize], short_threshold: usize) -> Option<SegmentLengthSummary> {
    if lengths.is_empty() {
        return None;
    }

    let values: Vec<f64> = lengths.iter().map(|&l| l as f64).collect();
    let (lms, std_dev) = mean_and_std(&values);
    let coefficient_of_variation = if lms == 0.0 { 0.0 } else { std_dev / lms };
    let short_proportion = if short_threshold > 0 {
        lengths.iter().filter(|&&l| l <= short_threshold).count() as f64 / lengths.len() as f64
    } else {
        0.0
    };

    Some(SegmentLengthSummary {
        lms,
        std_dev,
        coefficient_of_variation,
        median: median(&values),
        short_proportion,
        segment_count: lengths.len(),
    })
}
