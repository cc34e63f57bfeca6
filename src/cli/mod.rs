use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::document::Document;
use crate::info_print;
use crate::merge::ListMerger;
use crate::output;
use crate::search::FusionPipeline;
use crate::warn_print;

mod demo;

/// Multi-signal relevance fusion and rank merging
#[derive(Parser, Debug)]
#[command(name = "fuserank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output (only show results/errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rerank retrieval results and keep the most relevant documents
    Fuse {
        /// Query the documents were retrieved for
        #[arg(long)]
        query: String,

        /// Ranked results of one embedding model, as MODEL=PATH (repeatable)
        #[arg(short, long = "input", value_name = "MODEL=PATH", required = true)]
        inputs: Vec<String>,

        /// Number of documents to return (overrides config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Score with the built-in mock reranker (no reranking service is wired in)
        #[arg(long)]
        mock_rerank: bool,

        /// Show document content
        #[arg(short, long)]
        content: bool,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge two scored result lists into one
    Merge {
        /// First ranked list (JSON)
        first: PathBuf,

        /// Second ranked list (JSON)
        second: PathBuf,

        /// Number of documents to return (overrides config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Power-mean exponent (overrides config)
        #[arg(short = 'p', long)]
        exponent: Option<f64>,

        /// Show document content
        #[arg(short, long)]
        content: bool,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a pipeline on built-in sample data
    Demo {
        #[arg(value_enum)]
        kind: DemoKind,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Print the configuration JSON schema instead
        #[arg(long)]
        schema: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoKind {
    /// Relevance fusion over two mock embedding lists
    Fuse,
    /// Power-mean merge of two mock lists
    Merge,
}

pub async fn run(cli: Cli) -> Result<()> {
    if cli.quiet {
        output::set_quiet(true);
    }

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fuse {
            query,
            inputs,
            top_k,
            mock_rerank,
            content,
            json,
        } => {
            require_mock_rerank(mock_rerank)?;
            if let Some(k) = top_k {
                config.fusion.top_k = k;
                config.validate()?;
            }
            let results = read_inputs(&inputs)?;
            fuse(&config, &query, &results, content, json).await
        }
        Commands::Merge {
            first,
            second,
            top_k,
            exponent,
            content,
            json,
        } => {
            if let Some(k) = top_k {
                config.merge.top_k = k;
            }
            if let Some(p) = exponent {
                config.merge.exponent = p;
            }
            config.validate()?;
            let first = read_documents(&first)?;
            let second = read_documents(&second)?;
            merge(&config, &first, &second, content, json)
        }
        Commands::Demo { kind, json } => demo::run(&config, kind, json).await,
        Commands::Config { schema } => {
            let rendered = if schema {
                serde_json::to_string_pretty(&Config::schema())?
            } else {
                serde_json::to_string_pretty(&config)?
            };
            println!("{rendered}");
            Ok(())
        }
    }
}

async fn fuse(
    config: &Config,
    query: &str,
    results: &HashMap<String, Vec<Document>>,
    content: bool,
    json: bool,
) -> Result<()> {
    warn_print!(
        "{}",
        "warning: reranker scores come from the mock transport and ignore document text".yellow()
    );
    let pipeline = FusionPipeline::with_mock_transport(config)?;

    let start = Instant::now();
    let fused = pipeline.fuse(query, results).await?;
    debug!("Fusion took {:?}", start.elapsed());

    if json {
        return output::print_json(&fused);
    }
    info_print!("Query: \"{}\"", query);
    output::print_ranked("Fused results", &fused, content);
    Ok(())
}

fn merge(config: &Config, first: &[Document], second: &[Document], content: bool, json: bool) -> Result<()> {
    let merger = ListMerger::from_config(&config.merge);
    let merged = merger.merge(first, second);

    if json {
        return output::print_json(&merged);
    }
    output::print_ranked(
        &format!("Merged results (p = {})", merger.exponent()),
        &merged,
        content,
    );
    Ok(())
}

/// Only the mock reranker ships, so `fuse` runs only when asked for it explicitly
fn require_mock_rerank(mock_rerank: bool) -> Result<()> {
    if !mock_rerank {
        bail!(
            "No reranking service is configured; pass --mock-rerank to score with the \
             built-in mock reranker (its scores depend on input position, not text)"
        );
    }
    Ok(())
}

/// Parse `MODEL=PATH` arguments and load each file
fn read_inputs(inputs: &[String]) -> Result<HashMap<String, Vec<Document>>> {
    let mut results = HashMap::new();
    for input in inputs {
        let (model, path) = parse_input(input)?;
        let documents = read_documents(Path::new(path))?;
        debug!("Loaded {} documents for '{}'", documents.len(), model);
        if results.insert(model.to_string(), documents).is_some() {
            bail!("Model '{}' given more than once", model);
        }
    }
    Ok(results)
}

fn parse_input(input: &str) -> Result<(&str, &str)> {
    input
        .split_once('=')
        .filter(|(model, path)| !model.is_empty() && !path.is_empty())
        .ok_or_else(|| anyhow!("Expected MODEL=PATH, got '{}'", input))
}

/// A bare array of documents, or the `{"result": [...]}` this tool prints
#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    List(Vec<Document>),
    Wrapped { result: Vec<Document> },
}

fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: DocumentFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse documents in {}", path.display()))?;
    Ok(match parsed {
        DocumentFile::List(docs) => docs,
        DocumentFile::Wrapped { result } => result,
    })
}
