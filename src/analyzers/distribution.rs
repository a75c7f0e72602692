//! Segment-length distribution comparison.
//!
//! Pooled segment lengths per modality are compared pair by pair with the
//! two-sample Kolmogorov-Smirnov test. Pairs run in canonical order, their
//! p-values are corrected jointly, and an optional permutation p-value is
//! estimated per pair from a seeded generator.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::backend::{ks_statistic, Correction, StatisticsBackend};
use super::comparison::{ComparisonOutcome, GroupSummary, NotPerformedReason, SkippedPair, DEFAULT_ALPHA};
use super::stats::mean_and_std;
use crate::error::{AnalysisError, AnalysisResult};

/// Where the two ECDFs are furthest apart. `length` is the first value
/// reaching the maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxGap {
    pub length: f64,
    pub proportion_a: f64,
    pub proportion_b: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResult {
    pub modality_a: String,
    pub modality_b: String,
    /// KS statistic D.
    pub statistic: f64,
    pub p_raw: f64,
    pub p_adjusted: f64,
    pub n_a: usize,
    pub n_b: usize,
    pub reject: bool,
    pub max_gap: MaxGap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_permutation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionReport {
    pub groups: Vec<GroupSummary>,
    /// Sorted by adjusted p-value, ties in canonical pair order.
    pub pairwise: Vec<DistributionResult>,
    pub skipped_pairs: Vec<SkippedPair>,
    pub correction: Correction,
    pub correction_applied: bool,
    pub alpha: f64,
    pub permutations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

pub struct LengthDistributionComparison<'a> {
    backend: &'a dyn StatisticsBackend,
    correction: Correction,
    alpha: f64,
    permutations: usize,
    seed: Option<u64>,
}

impl<'a> LengthDistributionComparison<'a> {
    pub fn new(backend: &'a dyn StatisticsBackend) -> Self {
        Self {
            backend,
            correction: Correction::default(),
            alpha: DEFAULT_ALPHA,
            permutations: 0,
            seed: None,
        }
    }

    pub fn correction(mut self, correction: Correction) -> Self {
        self.correction = correction;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Number of label shuffles per pair; 0 disables the permutation p-value.
    pub fn permutations(mut self, permutations: usize) -> Self {
        self.permutations = permutations;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn compare(
        &self,
        lengths: &BTreeMap<String, Vec<f64>>,
    ) -> AnalysisResult<ComparisonOutcome<DistributionReport>> {
        let valid: BTreeMap<&str, Vec<f64>> = lengths
            .iter()
            .map(|(modality, values)| {
                let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                (modality.as_str(), clean)
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();

        if valid.len() < 2 {
            info!(valid_groups = valid.len(), "distribution comparison not performed");
            return Ok(ComparisonOutcome::NotPerformed {
                reason: NotPerformedReason::InsufficientGroups {
                    valid_groups: valid.len(),
                },
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let modalities: Vec<&str> = valid.keys().copied().collect();
        let mut computed = Vec::new();
        let mut skipped_pairs = Vec::new();
        for (i, &a) in modalities.iter().enumerate() {
            for &b in &modalities[i + 1..] {
                let (va, vb) = (&valid[a], &valid[b]);
                match self.backend.kolmogorov_smirnov(va, vb) {
                    Ok(stat) => {
                        let p_permutation = permutation_p_value(va, vb, self.permutations, &mut rng);
                        debug!(modality_a = a, modality_b = b, d = stat.statistic, "pair tested");
                        computed.push((a, b, stat, max_gap(va, vb), p_permutation));
                    }
                    Err(AnalysisError::Degenerate(reason)) => {
                        warn!(modality_a = a, modality_b = b, %reason, "pair skipped");
                        skipped_pairs.push(SkippedPair {
                            modality_a: a.to_string(),
                            modality_b: b.to_string(),
                            reason,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let raw: Vec<f64> = computed.iter().map(|(_, _, stat, _, _)| stat.p_value).collect();
        let adjusted = self.backend.adjust_p_values(&raw, self.correction);

        let mut pairwise: Vec<DistributionResult> = computed
            .into_iter()
            .zip(adjusted)
            .map(|((a, b, stat, max_gap, p_permutation), p_adjusted)| DistributionResult {
                modality_a: a.to_string(),
                modality_b: b.to_string(),
                statistic: stat.statistic,
                p_raw: stat.p_value,
                p_adjusted,
                n_a: valid[a].len(),
                n_b: valid[b].len(),
                reject: p_adjusted <= self.alpha,
                max_gap,
                p_permutation,
            })
            .collect();
        pairwise.sort_by(|x, y| x.p_adjusted.total_cmp(&y.p_adjusted));

        let groups = valid
            .iter()
            .map(|(modality, values)| {
                let (mean, std_dev) = mean_and_std(values);
                GroupSummary {
                    modality: modality.to_string(),
                    n: values.len(),
                    mean,
                    std_dev,
                }
            })
            .collect();

        info!(
            groups = valid.len(),
            pairs = pairwise.len(),
            skipped = skipped_pairs.len(),
            permutations = self.permutations,
            "distribution comparison performed"
        );

        Ok(ComparisonOutcome::Performed(DistributionReport {
            groups,
            pairwise,
            skipped_pairs,
            correction: self.correction,
            correction_applied: self.correction != Correction::None,
            alpha: self.alpha,
            permutations: self.permutations,
            seed: self.seed,
        }))
    }
}

/// Location of the largest ECDF difference between `a` and `b`.
pub fn max_gap(a: &[f64], b: &[f64]) -> MaxGap {
    let mut sa = a.to_vec();
    let mut sb = b.to_vec();
    sa.sort_by(f64::total_cmp);
    sb.sort_by(f64::total_cmp);

    let mut values: Vec<f64> = sa.iter().chain(&sb).copied().collect();
    values.sort_by(f64::total_cmp);
    values.dedup();

    let mut best = MaxGap {
        length: 0.0,
        proportion_a: 0.0,
        proportion_b: 0.0,
        gap: 0.0,
    };
    let (mut i, mut j) = (0, 0);
    for x in values {
        while i < sa.len() && sa[i] <= x {
            i += 1;
        }
        while j < sb.len() && sb[j] <= x {
            j += 1;
        }
        let proportion_a = i as f64 / sa.len().max(1) as f64;
        let proportion_b = j as f64 / sb.len().max(1) as f64;
        let gap = (proportion_a - proportion_b).abs();
        if gap > best.gap {
            best = MaxGap {
                length: x,
                proportion_a,
                proportion_b,
                gap,
            };
        }
    }
    best
}

/// Share of label shuffles whose KS statistic is at least the observed one.
/// `None` when either sample is empty or no permutation is requested.
pub fn permutation_p_value<R: Rng + ?Sized>(
    a: &[f64],
    b: &[f64],
    permutations: usize,
    rng: &mut R,
) -> Option<f64> {
    if a.is_empty() || b.is_empty() || permutations == 0 {
        return None;
    }

    let observed = ks_statistic(a, b);
    let mut pool: Vec<f64> = a.iter().chain(b).copied().collect();
    let mut extreme = 0usize;
    for _ in 0..permutations {
        pool.shuffle(rng);
        let (pa, pb) = pool.split_at(a.len());
        if ks_statistic(pa, pb) >= observed {
            extreme += 1;
        }
    }
    Some(extreme as f64 / permutations as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::backend::StatrsBackend;

    fn lengths(pairs: &[(&str, &[f64])]) -> BTreeMap<String, Vec<f64>> {
        pairs
            .iter()
            .map(|(m, v)| (m.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn one_group_is_not_performed() {
        let outcome = LengthDistributionComparison::new(&StatrsBackend)
            .compare(&lengths(&[("gpt", &[1.0, 2.0]), ("claude", &[])]))
            .unwrap();
        assert_eq!(
            outcome,
            ComparisonOutcome::NotPerformed {
                reason: NotPerformedReason::InsufficientGroups { valid_groups: 1 }
            }
        );
    }

    #[test]
    fn pairs_are_corrected_jointly() {
        let data = lengths(&[
            ("claude", &[4.0, 5.0, 6.0]),
            ("gpt", &[1.0, 2.0, 3.0]),
            ("mistral", &[1.5, 2.5, 3.5]),
        ]);
        let report = LengthDistributionComparison::new(&StatrsBackend)
            .correction(Correction::Bonferroni)
            .compare(&data)
            .unwrap()
            .report()
            .unwrap();

        assert_eq!(report.pairwise.len(), 3);
        assert!(report.correction_applied);
        assert!(report.skipped_pairs.is_empty());

        // claude is fully separated from both others: D = 1, exact p = 0.1
        let first = &report.pairwise[0];
        assert_eq!((first.modality_a.as_str(), first.modality_b.as_str()), ("claude", "gpt"));
        assert_eq!(first.statistic, 1.0);
        assert!((first.p_raw - 0.1).abs() < 1e-12);
        assert!((first.p_adjusted - 0.3).abs() < 1e-12);
        assert_eq!(first.max_gap.length, 3.0);
        assert!(!first.reject);
        assert!(first.p_permutation.is_none());

        let second = &report.pairwise[1];
        assert_eq!((second.modality_a.as_str(), second.modality_b.as_str()), ("claude", "mistral"));

        let last = &report.pairwise[2];
        assert_eq!((last.modality_a.as_str(), last.modality_b.as_str()), ("gpt", "mistral"));
        assert!(last.p_adjusted >= last.p_raw);
        assert!(last.p_adjusted <= 1.0);
    }

    #[test]
    fn max_gap_reports_first_maximum() {
        let gap = max_gap(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert_eq!(gap.length, 3.0);
        assert_eq!(gap.proportion_a, 1.0);
        assert_eq!(gap.proportion_b, 0.0);
        assert_eq!(gap.gap, 1.0);

        let tied = max_gap(&[2.0, 2.0, 3.0, 5.0], &[2.0, 4.0]);
        // at 2: 0.5 vs 0.5 ; at 3: 0.75 vs 0.5 ; at 4: 0.75 vs 1.0
        assert_eq!(tied.length, 3.0);
        assert!((tied.gap - 0.25).abs() < 1e-12);

        assert_eq!(max_gap(&[1.0], &[1.0]).gap, 0.0);
    }

    #[test]
    fn permutation_p_value_is_reproducible_with_a_seed() {
        let a = [1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 5.0];
        let b = [3.0, 5.0, 6.0, 6.0, 7.0, 8.0];

        let first = permutation_p_value(&a, &b, 500, &mut StdRng::seed_from_u64(7)).unwrap();
        let second = permutation_p_value(&a, &b, 500, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(first, second);
        assert!(first > 0.0 && first < 0.5);

        // identical samples: every shuffle is at least as extreme
        let same = permutation_p_value(&a, &a, 50, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(same, 1.0);

        assert!(permutation_p_value(&a, &b, 0, &mut StdRng::seed_from_u64(1)).is_none());
        assert!(permutation_p_value(&[], &b, 10, &mut StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn seeded_reports_carry_permutation_p_values() {
        let data = lengths(&[("gpt", &[1.0, 2.0, 3.0, 4.0]), ("claude", &[2.0, 3.0, 4.0, 5.0, 6.0])]);
        let run = || {
            LengthDistributionComparison::new(&StatrsBackend)
                .permutations(200)
                .seed(Some(42))
                .compare(&data)
                .unwrap()
                .report()
                .unwrap()
        };
        let (first, second) = (run(), run());
        assert_eq!(first, second);
        assert_eq!(first.seed, Some(42));
        let p = first.pairwise[0].p_permutation.unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
