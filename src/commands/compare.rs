use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use connector_lens::analyzers::{
    ComparisonConfig, ComparisonOutcome, ComparisonReport, Correction, DensityAnalyzer,
    GroupComparisonEngine, StatrsBackend, TestFamily,
};

use super::{load_rows, print_json, OutputFormat, Workspace};

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Corpus file (JSON Lines)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Metadata variable defining the groups
    #[arg(long)]
    pub variable: String,

    /// Restrict to these modalities (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub modalities: Vec<String>,

    /// Restrict to connectors with these labels (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// p-value correction: none, bonferroni, holm or fdr-bh
    #[arg(long)]
    pub correction: Option<String>,

    /// Pooled-variance t-tests instead of Welch
    #[arg(long)]
    pub equal_variance: bool,

    /// Kruskal-Wallis + Mann-Whitney instead of ANOVA + t-tests
    #[arg(long)]
    pub nonparametric: bool,

    /// Significance level for the reject flag
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Connectors per this many words (overrides config)
    #[arg(long)]
    pub base: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareOutput<'a> {
    variable: &'a str,
    responses: usize,
    outcome: &'a ComparisonOutcome,
}

pub fn run(workspace: &mut Workspace, args: &CompareArgs) -> Result<()> {
    let config = comparison_config(workspace.config.comparison, args)?;
    let base = workspace.density_base(args.base)?;

    let matcher = workspace.matcher(&args.labels)?;
    let rows = load_rows(&args.corpus, &args.variable, &args.modalities)?;
    let records = DensityAnalyzer::new(&matcher)
        .annotator(workspace.annotator())
        .base(base)
        .per_response(&rows, &args.variable)?;

    let backend = StatrsBackend;
    let outcome = GroupComparisonEngine::new(&backend, config).compare(&records)?;

    if workspace.format == OutputFormat::Json {
        return print_json(&CompareOutput {
            variable: &args.variable,
            responses: records.len(),
            outcome: &outcome,
        });
    }

    println!(
        "Connector density per {} words by {} ({} responses)",
        base,
        args.variable,
        records.len()
    );
    match &outcome {
        ComparisonOutcome::NotPerformed { reason } => {
            println!("test not performed: {}", reason);
        }
        ComparisonOutcome::Performed(report) => print_report(report),
    }
    Ok(())
}

fn comparison_config(mut config: ComparisonConfig, args: &CompareArgs) -> Result<ComparisonConfig> {
    if let Some(c) = &args.correction {
        config.correction = c.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if args.equal_variance {
        config.equal_variance = true;
    }
    if args.nonparametric {
        config.test = TestFamily::Nonparametric;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if !(config.alpha > 0.0 && config.alpha < 1.0) {
        anyhow::bail!("alpha must be between 0 and 1, got {}", config.alpha);
    }
    Ok(config)
}

fn print_report(report: &ComparisonReport) {
    println!("\n{:<20} {:>6} {:>10} {:>10}", "Modality", "N", "Mean", "SD");
    println!("{}", "-".repeat(50));
    for g in &report.groups {
        println!("{:<20} {:>6} {:>10.2} {:>10.2}", g.modality, g.n, g.mean, g.std_dev);
    }

    let o = &report.omnibus;
    match report.test {
        TestFamily::Parametric => println!(
            "\nANOVA: F({}, {}) = {:.4}, p = {:.4}",
            o.df_between, o.df_within, o.statistic, o.p_value
        ),
        TestFamily::Nonparametric => println!(
            "\nKruskal-Wallis: H({}) = {:.4}, p = {:.4}",
            o.df_between, o.statistic, o.p_value
        ),
    }

    let correction = if report.correction_applied {
        report.correction.to_string()
    } else {
        format!("{} (adjusted = raw)", Correction::None)
    };
    println!("Pairwise comparisons, correction: {}, alpha: {}", correction, report.alpha);
    if report.pairwise.is_empty() {
        println!("  (no pair could be tested)");
    } else {
        println!(
            "{:<16} {:<16} {:>10} {:>10} {:>10} {:>5} {:>5} {:>7}",
            "A", "B", "Statistic", "p raw", "p adj", "nA", "nB", "Reject"
        );
        println!("{}", "-".repeat(86));
        for r in &report.pairwise {
            println!(
                "{:<16} {:<16} {:>10.4} {:>10.4} {:>10.4} {:>5} {:>5} {:>7}",
                r.modality_a,
                r.modality_b,
                r.statistic,
                r.p_raw,
                r.p_adjusted,
                r.n_a,
                r.n_b,
                if r.reject { "yes" } else { "no" }
            );
        }
    }
    for s in &report.skipped_pairs {
        println!("skipped {} vs {}: {}", s.modality_a, s.modality_b, s.reason);
    }
}
