use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use connector_lens::analyzers::DensityAnalyzer;
use connector_lens::types::{DensityRecord, LabelDensityRecord};

use super::{load_rows, print_json, OutputFormat, Workspace};

#[derive(Debug, Args)]
pub struct DensityArgs {
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

    /// Connectors per this many words (overrides config)
    #[arg(long)]
    pub base: Option<f64>,

    /// One row per modality and label
    #[arg(long)]
    pub by_label: bool,

    /// One row per response
    #[arg(long)]
    pub per_response: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DensityReport {
    variable: String,
    base: f64,
    modalities: Vec<DensityRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    responses: Option<Vec<DensityRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<LabelDensityRecord>>,
}

pub fn run(workspace: &mut Workspace, args: &DensityArgs) -> Result<()> {
    let matcher = workspace.matcher(&args.labels)?;
    let rows = load_rows(&args.corpus, &args.variable, &args.modalities)?;
    let base = workspace.density_base(args.base)?;

    let analyzer = DensityAnalyzer::new(&matcher)
        .annotator(workspace.annotator())
        .base(base);

    let report = DensityReport {
        variable: args.variable.clone(),
        base,
        modalities: analyzer.per_modality(&rows, &args.variable)?,
        responses: if args.per_response {
            Some(analyzer.per_response(&rows, &args.variable)?)
        } else {
            None
        },
        labels: if args.by_label {
            Some(analyzer.per_label(&rows, &args.variable)?)
        } else {
            None
        },
    };

    if workspace.format == OutputFormat::Json {
        return print_json(&report);
    }

    if report.modalities.is_empty() {
        println!("No response with a value for '{}'.", report.variable);
        return Ok(());
    }

    println!("Connector density per {} words, by {}", report.base, report.variable);
    print_density_table("Modality", &report.modalities);

    if let Some(responses) = &report.responses {
        println!("\nPer response:");
        print_density_table("Response", responses);
    }

    if let Some(labels) = &report.labels {
        println!("\nPer label:");
        println!(
            "{:<20} {:<20} {:>8} {:>10} {:>10}",
            "Modality", "Label", "Words", "Connectors", "Density"
        );
        println!("{}", "-".repeat(72));
        for r in labels {
            println!(
                "{:<20} {:<20} {:>8} {:>10} {:>10.2}",
                r.modality, r.label, r.word_count, r.connector_count, r.density
            );
        }
    }
    Ok(())
}

fn print_density_table(unit: &str, records: &[DensityRecord]) {
    println!(
        "{:<20} {:<20} {:>8} {:>10} {:>10}",
        unit, "Modality", "Words", "Connectors", "Density"
    );
    println!("{}", "-".repeat(72));
    for r in records {
        println!(
            "{:<20} {:<20} {:>8} {:>10} {:>10.2}",
            r.unit, r.modality, r.word_count, r.connector_count, r.density
        );
    }
}
