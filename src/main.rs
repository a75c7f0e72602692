use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::compare::CompareArgs;
use commands::density::DensityArgs;
use commands::segments::SegmentsArgs;
use commands::{OutputFormat, Workspace};
use connector_lens::config::{self, loader};

#[derive(Parser)]
#[command(name = "connector-lens", version)]
#[command(about = "Connector density, segment lengths and group comparisons over labeled text corpora")]
struct Cli {
    /// Configuration file, layered over ~/.connector-lens.yaml and ./.connector-lens.yaml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Connector dictionary (JSON object: connector -> label)
    #[arg(long, global = true)]
    dictionary: Option<PathBuf>,

    /// Annotation lexicon (JSON object: word -> {lemma, pos, morph})
    #[arg(long, global = true)]
    lexicon: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List dictionary connectors and labels
    Connectors {
        /// Restrict to these labels (comma separated)
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
    },
    /// Count connector occurrences over a corpus
    Count {
        /// Corpus file (JSON Lines)
        #[arg(long)]
        corpus: PathBuf,
        /// Restrict to these labels (comma separated)
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
    },
    /// Connector density per modality, response or label
    Density(DensityArgs),
    /// Segment lengths (LMS, sigma) per modality
    Segments(SegmentsArgs),
    /// ANOVA (or Kruskal-Wallis) and pairwise tests on per-response density
    Compare(CompareArgs),
    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("connector_lens=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let format: OutputFormat = cli.format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let env = config::RealEnv;
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let mut cfg = match &cli.config {
        Some(path) => loader::load_with_override(&env, Some(&cwd), path)?,
        None => loader::load_merged(&env, Some(&cwd)),
    };
    if let Some(dictionary) = cli.dictionary {
        cfg.dictionary = Some(dictionary);
    }
    if let Some(lexicon) = cli.lexicon {
        cfg.lexicon = Some(lexicon);
    }

    if let Commands::Config = cli.command {
        match format {
            OutputFormat::Json => commands::print_json(&cfg)?,
            OutputFormat::Text => print!("{}", serde_yaml::to_string(&cfg)?),
        }
        return Ok(());
    }

    let mut workspace = Workspace::open(cfg, format)?;
    match cli.command {
        Commands::Connectors { labels } => commands::connectors::run(&mut workspace, &labels),
        Commands::Count { corpus, labels } => commands::count::run(&mut workspace, &corpus, &labels),
        Commands::Density(args) => commands::density::run(&mut workspace, &args),
        Commands::Segments(args) => commands::segments::run(&mut workspace, &args),
        Commands::Compare(args) => commands::compare::run(&mut workspace, &args),
        Commands::Config => Ok(()),
    }
}
