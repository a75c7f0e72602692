//! Statistical test backend.
//!
//! The comparison engine only orchestrates; the test formulas and the
//! distribution tails live behind `StatisticsBackend`. `StatrsBackend` is the
//! default implementation, using `statrs` distributions for p-values and
//! exact permutation distributions for small rank and KS samples.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use super::stats::{mean_and_std, sample_variance};
use crate::error::{AnalysisError, AnalysisResult};

/// Multiple-comparison correction applied jointly to all pairwise p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Correction {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "bonferroni")]
    Bonferroni,
    #[serde(rename = "holm")]
    Holm,
    #[serde(rename = "fdr-bh", alias = "fdr_bh")]
    BenjaminiHochberg,
}

impl std::fmt::Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Correction::None => write!(f, "none"),
            Correction::Bonferroni => write!(f, "bonferroni"),
            Correction::Holm => write!(f, "holm"),
            Correction::BenjaminiHochberg => write!(f, "fdr-bh"),
        }
    }
}

impl std::str::FromStr for Correction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "none" => Ok(Correction::None),
            "bonferroni" => Ok(Correction::Bonferroni),
            "holm" => Ok(Correction::Holm),
            "fdr-bh" | "bh" | "benjamini-hochberg" => Ok(Correction::BenjaminiHochberg),
            _ => Err(format!(
                "invalid correction '{}': expected none, bonferroni, holm or fdr-bh",
                s
            )),
        }
    }
}

/// Statistic and two-sided (or upper-tail, for omnibus tests) p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestStatistic {
    pub statistic: f64,
    pub p_value: f64,
}

/// Test formulas used by the comparison engine.
///
/// Inputs are already filtered (finite values, non-empty groups). A test
/// that is undefined for its input returns `AnalysisError::Degenerate`.
pub trait StatisticsBackend {
    /// One-way ANOVA F test.
    fn one_way_anova(&self, groups: &[&[f64]]) -> AnalysisResult<TestStatistic>;

    /// Independent two-sample t-test; Welch when `equal_variance` is false.
    fn two_sample_test(&self, a: &[f64], b: &[f64], equal_variance: bool) -> AnalysisResult<TestStatistic>;

    /// Kruskal-Wallis H test, tie-corrected.
    fn kruskal_wallis(&self, groups: &[&[f64]]) -> AnalysisResult<TestStatistic>;

    /// Two-sided Mann-Whitney U test. The statistic is U of `a`.
    fn mann_whitney(&self, a: &[f64], b: &[f64]) -> AnalysisResult<TestStatistic>;

    /// Two-sided two-sample Kolmogorov-Smirnov test. The statistic is D.
    fn kolmogorov_smirnov(&self, a: &[f64], b: &[f64]) -> AnalysisResult<TestStatistic>;

    fn adjust_p_values(&self, p_values: &[f64], correction: Correction) -> Vec<f64> {
        adjust_p_values(p_values, correction)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatrsBackend;

impl StatisticsBackend for StatrsBackend {
    fn one_way_anova(&self, groups: &[&[f64]]) -> AnalysisResult<TestStatistic> {
        let k = groups.len();
        let n: usize = groups.iter().map(|g| g.len()).sum();
        if k < 2 || groups.iter().any(|g| g.is_empty()) {
            return Err(AnalysisError::Degenerate(
                "ANOVA needs at least two non-empty groups".to_string(),
            ));
        }
        if n <= k {
            return Err(AnalysisError::Degenerate(
                "no within-group degrees of freedom".to_string(),
            ));
        }

        let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
        let (grand_mean, _) = mean_and_std(&all);

        let mut ss_between = 0.0;
        let mut ss_within = 0.0;
        for group in groups {
            let (mean, _) = mean_and_std(group);
            ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
            ss_within += group.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        }
        if ss_within <= f64::EPSILON * all.len() as f64 {
            return Err(AnalysisError::Degenerate(
                "zero within-group variance".to_string(),
            ));
        }

        let df_between = (k - 1) as f64;
        let df_within = (n - k) as f64;
        let statistic = (ss_between / df_between) / (ss_within / df_within);
        let dist = FisherSnedecor::new(df_between, df_within)
            .map_err(|e| AnalysisError::Statistics(e.to_string()))?;

        Ok(TestStatistic {
            statistic,
            p_value: dist.sf(statistic).clamp(0.0, 1.0),
        })
    }

    fn two_sample_test(&self, a: &[f64], b: &[f64], equal_variance: bool) -> AnalysisResult<TestStatistic> {
        if a.len() < 2 || b.len() < 2 {
            return Err(AnalysisError::Degenerate(
                "t-test needs at least two values per group".to_string(),
            ));
        }

        let (na, nb) = (a.len() as f64, b.len() as f64);
        let (mean_a, _) = mean_and_std(a);
        let (mean_b, _) = mean_and_std(b);
        let (var_a, var_b) = (sample_variance(a), sample_variance(b));

        let (se, df) = if equal_variance {
            let df = na + nb - 2.0;
            let pooled = ((na - 1.0) * var_a + (nb - 1.0) * var_b) / df;
            ((pooled * (1.0 / na + 1.0 / nb)).sqrt(), df)
        } else {
            let (qa, qb) = (var_a / na, var_b / nb);
            let df = (qa + qb).powi(2) / (qa.powi(2) / (na - 1.0) + qb.powi(2) / (nb - 1.0));
            ((qa + qb).sqrt(), df)
        };
        if se == 0.0 || !df.is_finite() {
            return Err(AnalysisError::Degenerate("zero standard error".to_string()));
        }

        let statistic = (mean_a - mean_b) / se;
        let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| AnalysisError::Statistics(e.to_string()))?;

        Ok(TestStatistic {
            statistic,
            p_value: (2.0 * dist.sf(statistic.abs())).clamp(0.0, 1.0),
        })
    }

    fn kruskal_wallis(&self, groups: &[&[f64]]) -> AnalysisResult<TestStatistic> {
        let k = groups.len();
        if k < 2 || groups.iter().any(|g| g.is_empty()) {
            return Err(AnalysisError::Degenerate(
                "Kruskal-Wallis needs at least two non-empty groups".to_string(),
            ));
        }

        let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
        let (ranks, tie_term) = rank(&all);
        let n = all.len() as f64;
        let tie_correction = 1.0 - tie_term / (n.powi(3) - n);
        if tie_correction <= 0.0 {
            return Err(AnalysisError::Degenerate("all values are identical".to_string()));
        }

        let mut offset = 0;
        let mut rank_term = 0.0;
        for group in groups {
            let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
            rank_term += rank_sum.powi(2) / group.len() as f64;
            offset += group.len();
        }
        let statistic = (12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0)) / tie_correction;
        let dist = ChiSquared::new((k - 1) as f64).map_err(|e| AnalysisError::Statistics(e.to_string()))?;

        Ok(TestStatistic {
            statistic,
            p_value: dist.sf(statistic).clamp(0.0, 1.0),
        })
    }

    fn mann_whitney(&self, a: &[f64], b: &[f64]) -> AnalysisResult<TestStatistic> {
        if a.is_empty() || b.is_empty() {
            return Err(AnalysisError::Degenerate(
                "Mann-Whitney needs at least one value per group".to_string(),
            ));
        }

        let (na, nb) = (a.len() as f64, b.len() as f64);
        let all: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        let (ranks, tie_term) = rank(&all);
        let n = na + nb;

        let rank_sum_a: f64 = ranks[..a.len()].iter().sum();
        let u_a = rank_sum_a - na * (na + 1.0) / 2.0;
        let u_max = u_a.max(na * nb - u_a);

        if a.len() <= EXACT_MANN_WHITNEY_MAX_N && b.len() <= EXACT_MANN_WHITNEY_MAX_N && tie_term == 0.0 {
            return Ok(TestStatistic {
                statistic: u_a,
                p_value: (2.0 * exact_u_sf(a.len(), b.len(), u_max)).clamp(0.0, 1.0),
            });
        }

        let mu = na * nb / 2.0;
        let sigma = (na * nb / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
        if sigma == 0.0 || !sigma.is_finite() {
            return Err(AnalysisError::Degenerate("all values are identical".to_string()));
        }

        // normal approximation with continuity correction
        let z = (u_max - mu - 0.5) / sigma;
        let normal = Normal::new(0.0, 1.0).map_err(|e| AnalysisError::Statistics(e.to_string()))?;

        Ok(TestStatistic {
            statistic: u_a,
            p_value: (2.0 * normal.sf(z)).clamp(0.0, 1.0),
        })
    }

    fn kolmogorov_smirnov(&self, a: &[f64], b: &[f64]) -> AnalysisResult<TestStatistic> {
        if a.is_empty() || b.is_empty() {
            return Err(AnalysisError::Degenerate(
                "Kolmogorov-Smirnov needs at least one value per group".to_string(),
            ));
        }

        let (m, n) = (a.len(), b.len());
        let gap = ecdf_gap(a, b);
        let statistic = gap as f64 / (m as f64 * n as f64);

        let p_value = if m.max(n) <= EXACT_KS_MAX_N && m * n <= EXACT_KS_MAX_CELLS {
            exact_ks_sf(m, n, gap)
        } else {
            let en = (m as f64 * n as f64) / (m + n) as f64;
            let lambda = (en.sqrt() + 0.12 + 0.11 / en.sqrt()) * statistic;
            kolmogorov_sf(lambda)
        };

        Ok(TestStatistic {
            statistic,
            p_value: p_value.clamp(0.0, 1.0),
        })
    }
}

/// Both samples at most this size and no ties: exact Mann-Whitney p-value.
const EXACT_MANN_WHITNEY_MAX_N: usize = 8;

/// Exact KS p-values up to these sizes, the asymptotic distribution beyond.
const EXACT_KS_MAX_N: usize = 10_000;
const EXACT_KS_MAX_CELLS: usize = 10_000_000;

/// P(U >= u) under H0 for samples of sizes `m` and `n`, from the frequency
/// of every U value over all arrangements.
fn exact_u_sf(m: usize, n: usize, u: f64) -> f64 {
    // freq[i][j] = counts of U for sizes (i, j), built row by row
    let mut previous: Vec<Vec<f64>> = vec![vec![1.0]; n + 1];
    for i in 1..=m {
        let mut current: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        current.push(vec![1.0]);
        for j in 1..=n {
            let mut counts = vec![0.0; i * j + 1];
            for (value, count) in previous[j].iter().enumerate() {
                counts[value + j] += count;
            }
            for (value, count) in current[j - 1].iter().enumerate() {
                counts[value] += count;
            }
            current.push(counts);
        }
        previous = current;
    }

    let counts = &previous[n];
    let total: f64 = counts.iter().sum();
    let from = u.ceil().max(0.0) as usize;
    counts.iter().skip(from).sum::<f64>() / total
}

/// Largest ECDF difference, scaled by `len(a) * len(b)` so it stays integral.
fn ecdf_gap(a: &[f64], b: &[f64]) -> u64 {
    let mut sa = a.to_vec();
    let mut sb = b.to_vec();
    sa.sort_by(f64::total_cmp);
    sb.sort_by(f64::total_cmp);
    let (m, n) = (sa.len() as i64, sb.len() as i64);

    let (mut i, mut j) = (0usize, 0usize);
    let mut gap = 0u64;
    while i < sa.len() || j < sb.len() {
        let x = match (sa.get(i), sb.get(j)) {
            (Some(&x), Some(&y)) => x.min(y),
            (Some(&x), None) => x,
            (None, Some(&y)) => y,
            (None, None) => break,
        };
        while i < sa.len() && sa[i] <= x {
            i += 1;
        }
        while j < sb.len() && sb[j] <= x {
            j += 1;
        }
        gap = gap.max((i as i64 * n - j as i64 * m).unsigned_abs());
    }
    gap
}

/// P(D >= gap / (m n)) under H0, by walking the lattice of merged orderings
/// and collecting the probability of paths that first reach the band edge.
fn exact_ks_sf(m: usize, n: usize, gap: u64) -> f64 {
    let (mi, ni) = (m as i64, n as i64);
    let mut outside = 0.0;
    let mut row = vec![0.0; n + 1];
    row[0] = 1.0;

    for i in 0..=m {
        let mut next = vec![0.0; n + 1];
        let mut from_left = 0.0;
        for j in 0..=n {
            let mut mass = row[j] + from_left;
            from_left = 0.0;
            if (i as i64 * ni - j as i64 * mi).unsigned_abs() >= gap {
                outside += mass;
                mass = 0.0;
            }
            let remaining = (m - i + n - j) as f64;
            if remaining > 0.0 {
                if i < m {
                    next[j] = mass * (m - i) as f64 / remaining;
                }
                if j < n {
                    from_left = mass * (n - j) as f64 / remaining;
                }
            }
        }
        row = next;
    }
    outside
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda < 0.2 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..=100u32 {
        let kf = f64::from(k);
        let term = (-2.0 * kf * kf * lambda * lambda).exp();
        sum += if k % 2 == 1 { term } else { -term };
        if term < 1e-16 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Two-sample KS statistic: the largest distance between the two ECDFs.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    ecdf_gap(a, b) as f64 / (a.len() as f64 * b.len() as f64)
}

/// Average ranks (1-based) in input order, plus the tie term sum(t^3 - t).
fn rank(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let average = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = average;
        }
        let t = (j - i + 1) as f64;
        tie_term += t.powi(3) - t;
        i = j + 1;
    }
    (ranks, tie_term)
}

/// Adjusted p-values, in input order, capped at 1.
pub fn adjust_p_values(p_values: &[f64], correction: Correction) -> Vec<f64> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| p_values[i].total_cmp(&p_values[j]));
    let mut adjusted = vec![0.0; m];

    match correction {
        Correction::None => return p_values.to_vec(),
        Correction::Bonferroni => {
            return p_values.iter().map(|p| (p * m as f64).min(1.0)).collect();
        }
        Correction::Holm => {
            let mut running = 0.0_f64;
            for (rank, &idx) in order.iter().enumerate() {
                let value = ((m - rank) as f64 * p_values[idx]).min(1.0);
                running = running.max(value);
                adjusted[idx] = running;
            }
        }
        Correction::BenjaminiHochberg => {
            let mut running = 1.0_f64;
            for (rank, &idx) in order.iter().enumerate().rev() {
                let value = (p_values[idx] * m as f64 / (rank + 1) as f64).min(1.0);
                running = running.min(value);
                adjusted[idx] = running;
            }
        }
    }
    adjusted
}
