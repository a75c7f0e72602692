use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use connector_lens::analyzers::lengths::stats_per_modality;
use connector_lens::analyzers::{
    ComparisonOutcome, Correction, DistributionReport, LengthAnalyzer, LengthDistributionComparison,
    Segment, SegmentationMode, Segmenter, StatrsBackend,
};
use connector_lens::tokenizer::TokenizationMode;
use connector_lens::types::{ModalityLengthStats, ModalityLms, ResponseLengthSummary};

use super::{load_rows, print_json, OutputFormat, Workspace};

#[derive(Debug, Args)]
pub struct SegmentsArgs {
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

    /// Boundaries: connectors or connectors-and-punctuation
    #[arg(long)]
    pub mode: Option<String>,

    /// Tokenizer: word or linguistic
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Segments of at most this many words count as short
    #[arg(long)]
    pub short_threshold: Option<usize>,

    /// Keep texts without any connector as one segment
    #[arg(long)]
    pub keep_unbounded: bool,

    /// Print every segment with its boundaries
    #[arg(long)]
    pub show: bool,

    /// Compare segment-length distributions pairwise (Kolmogorov-Smirnov)
    #[arg(long)]
    pub compare: bool,

    /// p-value correction for --compare: none, bonferroni, holm or fdr-bh
    #[arg(long, requires = "compare")]
    pub correction: Option<String>,

    /// Significance level for the reject flag
    #[arg(long, requires = "compare")]
    pub alpha: Option<f64>,

    /// Label shuffles per pair for a permutation p-value (0 disables)
    #[arg(long, default_value_t = 0, requires = "compare")]
    pub permutations: usize,

    /// Seed for the permutation shuffles
    #[arg(long, requires = "compare")]
    pub seed: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseSegments {
    id: String,
    modality: String,
    segments: Vec<Segment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentsReport {
    variable: String,
    mode: SegmentationMode,
    tokenizer: TokenizationMode,
    lms: Vec<ModalityLms>,
    modalities: Vec<ModalityLengthStats>,
    responses: Vec<ResponseLengthSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    segments: Option<Vec<ResponseSegments>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distribution: Option<ComparisonOutcome<DistributionReport>>,
}

pub fn run(workspace: &mut Workspace, args: &SegmentsArgs) -> Result<()> {
    let settings = workspace.config.segmentation;
    let mode: SegmentationMode = match &args.mode {
        Some(m) => m.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => settings.mode,
    };
    let tokenization: TokenizationMode = match &args.tokenizer {
        Some(t) => t.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => settings.tokenizer,
    };
    let short_threshold = args.short_threshold.unwrap_or(settings.short_segment_threshold);
    let correction: Correction = match &args.correction {
        Some(c) => c.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => workspace.config.comparison.correction,
    };
    let alpha = args.alpha.unwrap_or(workspace.config.comparison.alpha);
    if !(alpha > 0.0 && alpha < 1.0) {
        anyhow::bail!("alpha must be between 0 and 1, got {}", alpha);
    }
    let keep_unbounded = args.keep_unbounded || settings.keep_unbounded_text;

    let matcher = workspace.matcher(&args.labels)?;
    let rows = load_rows(&args.corpus, &args.variable, &args.modalities)?;

    let tokenizer = tokenization.tokenizer(workspace.annotator())?;
    let segmenter = Segmenter::new(&matcher, tokenizer.as_ref())
        .mode(mode)
        .annotator(workspace.annotator())
        .keep_unbounded_text(keep_unbounded);
    let lengths = LengthAnalyzer::new(&segmenter).short_threshold(short_threshold);

    let responses = lengths.summaries_per_response(&rows, &args.variable)?;
    let segments = if args.show {
        let mut shown = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(modality) = row.modality(&args.variable) {
                shown.push(ResponseSegments {
                    id: row.id.clone(),
                    modality: modality.to_string(),
                    segments: segmenter.segment(&row.text)?,
                });
            }
        }
        Some(shown)
    } else {
        None
    };

    let distribution = if args.compare {
        let pooled = lengths.lengths_per_modality(&rows, &args.variable)?;
        let backend = StatrsBackend;
        Some(
            LengthDistributionComparison::new(&backend)
                .correction(correction)
                .alpha(alpha)
                .permutations(args.permutations)
                .seed(args.seed)
                .compare(&pooled)?,
        )
    } else {
        None
    };

    let report = SegmentsReport {
        variable: args.variable.clone(),
        mode,
        tokenizer: tokenization,
        lms: lengths.lms_per_modality(&rows, &args.variable)?,
        modalities: stats_per_modality(&responses),
        responses,
        segments,
        distribution,
    };

    if workspace.format == OutputFormat::Json {
        return print_json(&report);
    }

    println!(
        "Segment lengths by {} (mode: {}, tokenizer: {})",
        report.variable, report.mode, report.tokenizer
    );
    if report.lms.is_empty() {
        println!("No response with a value for '{}'.", report.variable);
        return Ok(());
    }

    println!(
        "{:<20} {:>9} {:>8} {:>8}",
        "Modality", "Segments", "LMS", "Sigma"
    );
    println!("{}", "-".repeat(48));
    for m in &report.lms {
        println!(
            "{:<20} {:>9} {:>8.2} {:>8.2}",
            m.modality, m.segment_count, m.lms, m.std_dev
        );
    }

    if !report.modalities.is_empty() {
        println!("\nPer-response indicators (averaged by modality):");
        println!(
            "{:<20} {:>9} {:>9} {:>9} {:>9} {:>8} {:>8}",
            "Modality", "Responses", "MeanLMS", "Median", "MeanSD", "MeanCV", "Short%"
        );
        println!("{}", "-".repeat(78));
        for s in &report.modalities {
            println!(
                "{:<20} {:>9} {:>9.2} {:>9.2} {:>9.2} {:>8.2} {:>8.0}",
                s.modality,
                s.response_count,
                s.mean_lms,
                s.median_of_medians,
                s.mean_std_dev,
                s.mean_coefficient_of_variation,
                s.mean_short_proportion * 100.0
            );
        }
    }

    match &report.distribution {
        Some(ComparisonOutcome::NotPerformed { reason }) => {
            println!("\nDistribution comparison not performed: {}", reason);
        }
        Some(ComparisonOutcome::Performed(distribution)) => print_distribution(distribution),
        None => {}
    }

    if let Some(shown) = &report.segments {
        for response in shown {
            println!("\n[{}] {}", response.modality, response.id);
            if response.segments.is_empty() {
                println!("  (no bounded segment)");
            }
            for (i, segment) in response.segments.iter().enumerate() {
                println!("  {}. ({} words) {}", i + 1, segment.word_count, segment.with_markers());
            }
        }
    }
    Ok(())
}

fn print_distribution(report: &DistributionReport) {
    let correction = if report.correction_applied {
        report.correction.to_string()
    } else {
        format!("{} (adjusted = raw)", Correction::None)
    };
    println!(
        "\nKolmogorov-Smirnov on segment lengths, correction: {}, alpha: {}",
        correction, report.alpha
    );
    if report.pairwise.is_empty() {
        println!("  (no pair could be tested)");
    } else {
        println!(
            "{:<16} {:<16} {:>7} {:>10} {:>10} {:>6} {:>6} {:>10} {:>7}",
            "A", "B", "D", "p raw", "p adj", "nA", "nB", "Max gap at", "Reject"
        );
        println!("{}", "-".repeat(96));
        for r in &report.pairwise {
            println!(
                "{:<16} {:<16} {:>7.4} {:>10.4} {:>10.4} {:>6} {:>6} {:>10} {:>7}",
                r.modality_a,
                r.modality_b,
                r.statistic,
                r.p_raw,
                r.p_adjusted,
                r.n_a,
                r.n_b,
                r.max_gap.length,
                if r.reject { "yes" } else { "no" }
            );
            if let Some(p) = r.p_permutation {
                println!("  permutation p = {:.4} ({} shuffles)", p, report.permutations);
            }
        }
    }
    for s in &report.skipped_pairs {
        println!("skipped {} vs {}: {}", s.modality_a, s.modality_b, s.reason);
    }
}
