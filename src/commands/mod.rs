pub mod compare;
pub mod connectors;
pub mod count;
pub mod density;
pub mod segments;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use connector_lens::annotation::{Annotator, LexiconAnnotator};
use connector_lens::config::Config;
use connector_lens::dictionary::{CompiledMatcher, ConnectorDictionary, MatcherCache};
use connector_lens::parsers::Corpus;
use connector_lens::types::CorpusRow;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("invalid format '{}': expected text or json", s)),
        }
    }
}

/// Everything a command needs: effective configuration, the loaded
/// dictionary and the optional annotator.
pub struct Workspace {
    pub config: Config,
    pub format: OutputFormat,
    dictionary: ConnectorDictionary,
    annotator: Option<Box<dyn Annotator>>,
    cache: MatcherCache,
}

impl Workspace {
    pub fn open(config: Config, format: OutputFormat) -> Result<Self> {
        let path = config.dictionary.clone().context(
            "no connector dictionary configured: pass --dictionary or set `dictionary` in .connector-lens.yaml",
        )?;
        let dictionary = ConnectorDictionary::load(&path)
            .with_context(|| format!("failed to load dictionary: {}", path.display()))?;
        let annotator = load_annotator(config.lexicon.as_deref())?;

        info!(
            dictionary = %path.display(),
            entries = dictionary.len(),
            annotator = annotator.as_ref().map(|a| a.name()).unwrap_or("none"),
            "workspace ready"
        );

        Ok(Self {
            config,
            format,
            dictionary,
            annotator,
            cache: MatcherCache::new(),
        })
    }

    pub fn dictionary(&self) -> &ConnectorDictionary {
        &self.dictionary
    }

    pub fn annotator(&self) -> Option<&dyn Annotator> {
        self.annotator.as_deref()
    }

    /// Matcher for the entries carrying one of `labels` (all when empty).
    /// Every requested label must exist in the dictionary.
    pub fn matcher(&mut self, labels: &[String]) -> Result<Arc<CompiledMatcher>> {
        let available = self.dictionary.labels();
        let unknown: Vec<&str> = labels
            .iter()
            .filter(|l| !available.contains(l))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            anyhow::bail!(
                "unknown connector label(s): {} (available: {})",
                unknown.join(", "),
                available.join(", ")
            );
        }

        let entries = self.dictionary.select_labels(labels);
        Ok(self.cache.get_or_compile(&entries, self.config.matcher)?)
    }

    /// Density base from the command line or the configuration.
    pub fn density_base(&self, arg: Option<f64>) -> Result<f64> {
        let base = arg.unwrap_or(self.config.density.base);
        if !(base.is_finite() && base > 0.0) {
            anyhow::bail!("density base must be a positive number, got {}", base);
        }
        Ok(base)
    }
}

fn load_annotator(lexicon: Option<&Path>) -> Result<Option<Box<dyn Annotator>>> {
    if let Some(path) = lexicon {
        let lexicon = LexiconAnnotator::load(path)
            .with_context(|| format!("failed to load lexicon: {}", path.display()))?;
        return Ok(Some(Box::new(lexicon)));
    }

    #[cfg(feature = "lindera-korean")]
    {
        let korean = connector_lens::annotation::LinderaAnnotator::new()?;
        return Ok(Some(Box::new(korean)));
    }

    #[cfg(not(feature = "lindera-korean"))]
    Ok(None)
}

/// Corpus rows restricted to `modalities` of `variable`.
pub fn load_rows(path: &Path, variable: &str, modalities: &[String]) -> Result<Vec<CorpusRow>> {
    let corpus = Corpus::load_jsonl(path)
        .with_context(|| format!("failed to load corpus: {}", path.display()))?;
    let rows = corpus.rows_for_modalities(variable, modalities);
    info!(total = corpus.len(), selected = rows.len(), variable, "corpus filtered");
    Ok(rows)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Connector surface as shown in tables: line breaks made visible.
pub fn display_surface(surface: &str) -> String {
    surface.replace('\r', "\\r").replace('\n', "\\n")
}
