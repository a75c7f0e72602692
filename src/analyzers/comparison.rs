//! Group comparison pipeline over per-response densities.
//!
//! filter -> group by modality -> validate -> omnibus test -> pairwise tests
//! -> joint p-value correction -> order by adjusted p-value.
//!
//! A comparison that cannot run ends in `ComparisonOutcome::NotPerformed`
//! rather than an error, so callers render "test not performed" instead of
//! a fabricated statistic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::{Correction, StatisticsBackend, TestStatistic};
use super::stats::mean_and_std;
use crate::error::{AnalysisError, AnalysisResult};
use crate::types::DensityRecord;

pub const DEFAULT_ALPHA: f64 = 0.05;

/// Test family: ANOVA + t-tests, or Kruskal-Wallis + Mann-Whitney.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestFamily {
    #[default]
    Parametric,
    Nonparametric,
}

impl std::fmt::Display for TestFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestFamily::Parametric => write!(f, "parametric"),
            TestFamily::Nonparametric => write!(f, "nonparametric"),
        }
    }
}

impl std::str::FromStr for TestFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parametric" | "anova" => Ok(TestFamily::Parametric),
            "nonparametric" | "non-parametric" | "kruskal" => Ok(TestFamily::Nonparametric),
            _ => Err(format!(
                "invalid test family '{}': expected parametric or nonparametric",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub test: TestFamily,
    pub correction: Correction,
    /// Pooled-variance t-test when true, Welch otherwise.
    pub equal_variance: bool,
    pub alpha: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            test: TestFamily::default(),
            correction: Correction::default(),
            equal_variance: false,
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub modality: String,
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OmnibusResult {
    pub statistic: f64,
    pub p_value: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub total: usize,
    pub groups: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub modality_a: String,
    pub modality_b: String,
    pub statistic: f64,
    pub p_raw: f64,
    pub p_adjusted: f64,
    pub n_a: usize,
    pub n_b: usize,
    /// Adjusted p-value at or below alpha.
    pub reject: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPair {
    pub modality_a: String,
    pub modality_b: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub test: TestFamily,
    pub groups: Vec<GroupSummary>,
    pub omnibus: OmnibusResult,
    /// Sorted by adjusted p-value, ties in canonical pair order.
    pub pairwise: Vec<ComparisonResult>,
    pub skipped_pairs: Vec<SkippedPair>,
    pub correction: Correction,
    /// False when adjusted p-values are the raw ones.
    pub correction_applied: bool,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NotPerformedReason {
    #[serde(rename_all = "camelCase")]
    InsufficientGroups { valid_groups: usize },
    Degenerate { detail: String },
}

impl std::fmt::Display for NotPerformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotPerformedReason::InsufficientGroups { valid_groups } => write!(
                f,
                "{} group(s) with data, at least 2 required",
                valid_groups
            ),
            NotPerformedReason::Degenerate { detail } => write!(f, "{}", detail),
        }
    }
}

impl From<NotPerformedReason> for AnalysisError {
    fn from(reason: NotPerformedReason) -> Self {
        match reason {
            NotPerformedReason::InsufficientGroups { valid_groups } => {
                AnalysisError::InsufficientGroups { valid_groups }
            }
            NotPerformedReason::Degenerate { detail } => AnalysisError::Degenerate(detail),
        }
    }
}

/// Result of a comparison pipeline. Generic over the report so the
/// density and length-distribution comparisons share the same shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ComparisonOutcome<R = ComparisonReport> {
    Performed(R),
    NotPerformed { reason: NotPerformedReason },
}

impl<R> ComparisonOutcome<R> {
    pub fn is_performed(&self) -> bool {
        matches!(self, ComparisonOutcome::Performed(_))
    }

    pub fn as_report(&self) -> Option<&R> {
        match self {
            ComparisonOutcome::Performed(report) => Some(report),
            ComparisonOutcome::NotPerformed { .. } => None,
        }
    }

    /// The report, or the not-performed reason as an error.
    pub fn report(self) -> AnalysisResult<R> {
        match self {
            ComparisonOutcome::Performed(report) => Ok(report),
            ComparisonOutcome::NotPerformed { reason } => Err(reason.into()),
        }
    }
}

pub struct GroupComparisonEngine<'a> {
    backend: &'a dyn StatisticsBackend,
    config: ComparisonConfig,
}

impl<'a> GroupComparisonEngine<'a> {
    pub fn new(backend: &'a dyn StatisticsBackend, config: ComparisonConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Densities grouped by modality. Responses without words, with a
    /// non-finite density or without modality are dropped.
    pub fn group_densities(records: &[DensityRecord]) -> BTreeMap<String, Vec<f64>> {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records {
            if record.word_count == 0 || !record.density.is_finite() || record.modality.trim().is_empty() {
                continue;
            }
            groups
                .entry(record.modality.clone())
                .or_default()
                .push(record.density);
        }
        groups
    }

    pub fn compare(&self, records: &[DensityRecord]) -> AnalysisResult<ComparisonOutcome> {
        self.compare_groups(&Self::group_densities(records))
    }

    /// Runs the pipeline on already grouped values. Non-finite values and
    /// empty groups are ignored.
    pub fn compare_groups(&self, groups: &BTreeMap<String, Vec<f64>>) -> AnalysisResult<ComparisonOutcome> {
        let valid: BTreeMap<&str, Vec<f64>> = groups
            .iter()
            .map(|(modality, values)| {
                let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                (modality.as_str(), clean)
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();

        if valid.len() < 2 {
            info!(valid_groups = valid.len(), "comparison not performed");
            return Ok(ComparisonOutcome::NotPerformed {
                reason: NotPerformedReason::InsufficientGroups {
                    valid_groups: valid.len(),
                },
            });
        }

        let samples: Vec<&[f64]> = valid.values().map(Vec::as_slice).collect();
        let omnibus = match self.config.test {
            TestFamily::Parametric => self.backend.one_way_anova(&samples),
            TestFamily::Nonparametric => self.backend.kruskal_wallis(&samples),
        };
        let omnibus = match omnibus {
            Ok(stat) => stat,
            Err(AnalysisError::Degenerate(detail)) => {
                info!(%detail, "comparison not performed");
                return Ok(ComparisonOutcome::NotPerformed {
                    reason: NotPerformedReason::Degenerate { detail },
                });
            }
            Err(e) => return Err(e),
        };

        let total: usize = samples.iter().map(|s| s.len()).sum();
        let omnibus = OmnibusResult {
            statistic: omnibus.statistic,
            p_value: omnibus.p_value,
            df_between: valid.len() - 1,
            df_within: total - valid.len(),
            total,
            groups: valid.len(),
        };

        let (pairwise, skipped_pairs) = self.pairwise(&valid)?;

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
            test = %self.config.test,
            groups = omnibus.groups,
            total = omnibus.total,
            p_value = omnibus.p_value,
            pairs = pairwise.len(),
            skipped = skipped_pairs.len(),
            "comparison performed"
        );

        Ok(ComparisonOutcome::Performed(ComparisonReport {
            test: self.config.test,
            groups,
            omnibus,
            pairwise,
            skipped_pairs,
            correction: self.config.correction,
            correction_applied: self.config.correction != Correction::None,
            alpha: self.config.alpha,
        }))
    }

    fn pairwise(
        &self,
        valid: &BTreeMap<&str, Vec<f64>>,
    ) -> AnalysisResult<(Vec<ComparisonResult>, Vec<SkippedPair>)> {
        let modalities: Vec<&str> = valid.keys().copied().collect();
        let mut computed: Vec<(&str, &str, TestStatistic, usize, usize)> = Vec::new();
        let mut skipped = Vec::new();

        for (i, &a) in modalities.iter().enumerate() {
            for &b in &modalities[i + 1..] {
                let (va, vb) = (&valid[a], &valid[b]);
                let result = match self.config.test {
                    TestFamily::Parametric => {
                        self.backend.two_sample_test(va, vb, self.config.equal_variance)
                    }
                    TestFamily::Nonparametric => self.backend.mann_whitney(va, vb),
                };
                match result {
                    Ok(stat) => computed.push((a, b, stat, va.len(), vb.len())),
                    Err(AnalysisError::Degenerate(reason)) => {
                        warn!(modality_a = a, modality_b = b, %reason, "pair skipped");
                        skipped.push(SkippedPair {
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
        let adjusted = self.backend.adjust_p_values(&raw, self.config.correction);

        let mut results: Vec<ComparisonResult> = computed
            .into_iter()
            .zip(adjusted)
            .map(|((a, b, stat, n_a, n_b), p_adjusted)| ComparisonResult {
                modality_a: a.to_string(),
                modality_b: b.to_string(),
                statistic: stat.statistic,
                p_raw: stat.p_value,
                p_adjusted,
                n_a,
                n_b,
                reject: p_adjusted <= self.config.alpha,
            })
            .collect();
        // stable: equal adjusted p-values keep canonical order
        results.sort_by(|x, y| x.p_adjusted.total_cmp(&y.p_adjusted));

        Ok((results, skipped))
    }
}
