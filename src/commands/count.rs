use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use connector_lens::analyzers::remove_metadata_lines;
use connector_lens::analyzers::stats::count_words;
use connector_lens::dictionary::ConnectorCount;
use connector_lens::parsers::Corpus;

use super::{display_surface, print_json, OutputFormat, Workspace};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CountReport {
    responses: usize,
    words: usize,
    total: usize,
    by_label: BTreeMap<String, usize>,
    by_connector: Vec<ConnectorCount>,
}

/// Connector occurrences over the whole corpus.
pub fn run(workspace: &mut Workspace, corpus: &Path, labels: &[String]) -> Result<()> {
    let matcher = workspace.matcher(labels)?;
    let corpus = Corpus::load_jsonl(corpus)
        .with_context(|| format!("failed to load corpus: {}", corpus.display()))?;

    let mut words = 0;
    let mut by_label: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_connector: BTreeMap<(String, String), usize> = BTreeMap::new();
    for row in corpus.rows() {
        let text = remove_metadata_lines(&row.text);
        words += count_words(&text);
        for count in matcher.count_by_connector(&text, workspace.annotator())? {
            *by_label.entry(count.label.clone()).or_insert(0) += count.occurrences;
            *by_connector.entry((count.label, count.connector)).or_insert(0) += count.occurrences;
        }
    }

    let report = CountReport {
        responses: corpus.len(),
        words,
        total: by_label.values().sum(),
        by_label,
        by_connector: by_connector
            .into_iter()
            .map(|((label, connector), occurrences)| ConnectorCount {
                connector,
                label,
                occurrences,
            })
            .collect(),
    };

    if workspace.format == OutputFormat::Json {
        return print_json(&report);
    }

    println!(
        "{} responses, {} words, {} connector occurrences",
        report.responses, report.words, report.total
    );
    if report.total == 0 {
        println!("No connector found.");
        return Ok(());
    }

    println!("\nBy label:");
    for (label, n) in &report.by_label {
        println!("  {:<20} {}", label, n);
    }
    println!("\nBy connector:");
    println!("  {:<24} {:<20} {}", "Connector", "Label", "Count");
    for c in &report.by_connector {
        println!(
            "  {:<24} {:<20} {}",
            display_surface(&c.connector),
            c.label,
            c.occurrences
        );
    }
    Ok(())
}
