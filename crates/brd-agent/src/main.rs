//! # BRD Agent CLI (`brd`)
//!
//! The `brd` binary is the primary interface for BRD Agent. It can run the
//! JSON HTTP server or perform a one-shot analysis of a local text file.
//!
//! ## Usage
//!
//! ```bash
//! brd --config ./config/brd.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `brd serve` | Start the JSON HTTP server |
//! | `brd analyze <path>` | Analyze a plain-text file and print the result |
//! | `brd analyze --text "..."` | Analyze inline text |
//!
//! ## Examples
//!
//! ```bash
//! # Start the HTTP server
//! brd serve --config ./config/brd.toml
//!
//! # Analyze a meeting-notes file and ask a follow-up question
//! brd analyze notes.txt --channel meeting --ask "what is the uptime requirement?"
//!
//! # Analyze pasted text, machine-readable output
//! brd analyze --text "We need 99.9% uptime and OTP login." --json
//! ```

mod analyze;
mod chat;
mod config;
mod embedding;
mod generation;
mod progress;
mod server;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use brd_agent_core::models::InputKind;
use brd_agent_core::store::memory::MemoryStore;
use brd_agent_core::store::Store;

use crate::analyze::{build_document, Analyzer};
use crate::chat::Responder;
use crate::config::Config;
use crate::progress::{NoProgress, ProgressMode};

/// BRD Agent — extract structured business requirements from project
/// communications and chat over the source with retrieval-augmented
/// context.
#[derive(Parser)]
#[command(
    name = "brd",
    about = "BRD Agent — AI-assisted business requirements extraction and retrieval",
    version,
    long_about = "BRD Agent ingests project communications (pasted text, plain-text files, \
    meeting transcripts), extracts structured business requirements with a generative model, \
    and serves the results with an embedding-based retrieval layer for grounded follow-up chat."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// All provider, analysis, and server settings are read from this
    /// file; missing sections fall back to built-in defaults.
    #[arg(long, global = true, default_value = "./config/brd.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the JSON HTTP server.
    ///
    /// Serves document submission, analysis orchestration, status polling,
    /// result retrieval, and chat on the configured bind address.
    Serve,

    /// Analyze a communication and print the extracted requirements.
    ///
    /// Runs the full pipeline in-process (chunk, embed, extract, render)
    /// and prints the insights and narrative document. With `--ask`, also
    /// answers follow-up questions against the fresh result.
    Analyze {
        /// Path to a plain-text file to analyze.
        path: Option<PathBuf>,

        /// Analyze this text instead of reading a file.
        #[arg(long, conflicts_with = "path")]
        text: Option<String>,

        /// Communication channel tag recorded with the document.
        #[arg(long, default_value = "email")]
        channel: String,

        /// Follow-up question answered against the analysis result.
        /// May be repeated.
        #[arg(long)]
        ask: Vec<String>,

        /// Print the full analysis result as JSON instead of a summary.
        #[arg(long)]
        json: bool,

        /// Progress reporting on stderr: `human`, `json`, or `off`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => run_serve(&config).await,
        Commands::Analyze {
            path,
            text,
            channel,
            ask,
            json,
            progress,
        } => run_analyze(&config, path, text, channel, ask, json, progress).await,
    }
}

async fn run_serve(config: &Config) -> Result<()> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let embedder = embedding::create_embedder(&config.embedding)?;
    let generator = generation::create_generator(&config.generation)?;

    let analyzer = Analyzer::new(
        store.clone(),
        embedder.clone(),
        generator.clone(),
        config.analysis.clone(),
        Arc::new(NoProgress),
    );
    let responder = Responder::new(
        store.clone(),
        embedder,
        generator,
        config.analysis.context_top_k,
    );

    server::run_server(config, store, analyzer, responder).await
}

#[allow(clippy::too_many_arguments)]
async fn run_analyze(
    config: &Config,
    path: Option<PathBuf>,
    text: Option<String>,
    channel: String,
    ask: Vec<String>,
    json: bool,
    progress: Option<String>,
) -> Result<()> {
    let (content, file_name, kind) = match (path, text) {
        (Some(path), None) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            (content, name, InputKind::File)
        }
        (None, Some(text)) => (text, "Pasted Text Snippet".to_string(), InputKind::Text),
        _ => bail!("Provide a file path or --text"),
    };

    let mode = match progress.as_deref() {
        None => ProgressMode::default_for_tty(),
        Some("human") => ProgressMode::Human,
        Some("json") => ProgressMode::Json,
        Some("off") => ProgressMode::Off,
        Some(other) => bail!("Unknown progress mode: {}. Use human, json, or off.", other),
    };

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let embedder = embedding::create_embedder(&config.embedding)?;
    let generator = generation::create_generator(&config.generation)?;

    let analyzer = Analyzer::new(
        store.clone(),
        embedder.clone(),
        generator.clone(),
        config.analysis.clone(),
        mode.reporter(),
    );

    let doc = build_document(
        file_name,
        channel,
        kind,
        &content,
        config.analysis.max_content_chars,
    );
    store.put_document(&doc).await?;

    let (job_id, result_id) = analyzer.analyze_now(&doc).await?;
    let result = store
        .get_result(&result_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("result {} not found after analysis", result_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("analysis complete");
        println!("  job: {}", job_id);
        println!("  result: {}", result.id);
        println!("  confidence: {}", result.insights.confidence_score);
        println!("  project: {}", result.insights.project_name);
        println!(
            "  functional requirements: {}",
            result.insights.functional_requirements.len()
        );
        println!(
            "  non-functional requirements: {}",
            result.insights.non_functional_requirements.len()
        );
        println!("  vector records: {}", result.records.len());
        println!();
        println!("{}", result.narrative);
    }

    if !ask.is_empty() {
        let responder = Responder::new(
            store.clone(),
            embedder,
            generator,
            config.analysis.context_top_k,
        );
        for question in ask {
            println!();
            println!("Q: {}", question);
            match responder.answer(&result.id, &question).await {
                Ok(reply) => println!("A: {}", reply),
                Err(e) => eprintln!("Warning: chat failed: {}", e),
            }
        }
    }

    Ok(())
}
