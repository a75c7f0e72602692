use anyhow::Result;
use serde::Serialize;

use connector_lens::dictionary::ConnectorEntry;

use super::{display_surface, print_json, OutputFormat, Workspace};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectorListing<'a> {
    labels: Vec<String>,
    pattern: &'a str,
    entries: Vec<&'a ConnectorEntry>,
}

pub fn run(workspace: &mut Workspace, labels: &[String]) -> Result<()> {
    let matcher = workspace.matcher(labels)?;
    let listing = ConnectorListing {
        labels: matcher.labels(),
        pattern: matcher.pattern(),
        entries: matcher.entries().collect(),
    };

    if workspace.format == OutputFormat::Json {
        return print_json(&listing);
    }

    println!(
        "{} of {} connectors, {} labels: {}",
        listing.entries.len(),
        workspace.dictionary().len(),
        listing.labels.len(),
        listing.labels.join(", ")
    );
    println!("{:<24} {:<20} {}", "Connector", "Label", "Constraints");
    println!("{}", "-".repeat(64));
    for entry in &listing.entries {
        let constraints = entry
            .constraints()
            .map(|c| {
                let mut parts = Vec::new();
                if !c.lemma.is_empty() {
                    parts.push(format!("lemma={}", c.lemma.join("|")));
                }
                if !c.pos.is_empty() {
                    parts.push(format!("pos={}", c.pos.join("|")));
                }
                if !c.morph.is_empty() {
                    parts.push(format!("morph={}", c.morph.join("|")));
                }
                parts.join(" ")
            })
            .unwrap_or_default();
        println!(
            "{:<24} {:<20} {}",
            display_surface(entry.surface()),
            entry.label(),
            constraints
        );
    }
    Ok(())
}
