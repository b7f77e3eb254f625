//! studykit CLI
//!
//! Commands:
//!   generate  - Summary, flashcards and quiz for a PDF
//!   extract   - Extract and sentence-split a PDF without calling the model
//!   normalize - Repair saved model output into JSON
//!   config    - Show the resolved configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use studykit::{
    normalize, serialize_map, ArtifactKind, Config, Generator, OpenAIProvider, PdfExtractor,
    Pipeline, PipelineError, PipelineOptions, ProgressTracker, ResultWriter, RunReport,
    SentenceSplitter, TextExtractor,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "studykit")]
#[command(about = "Turn PDF documents into summaries, flashcards and quizzes")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate study materials from a PDF
    Generate {
        /// Path to the PDF document
        path: PathBuf,

        /// Only generate these artifacts (comma-separated: summary,flashcards,quiz)
        #[arg(long, value_delimiter = ',')]
        only: Vec<ArtifactKind>,

        /// Directory for result files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print results without saving them
        #[arg(long)]
        no_save: bool,

        /// Call the model for one artifact at a time
        #[arg(long)]
        sequential: bool,

        /// Chat model identifier
        #[arg(short, long)]
        model: Option<String>,

        /// Base URL of an OpenAI-compatible API
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Extract text and split it into sentences
    Extract {
        /// Path to the PDF document
        path: PathBuf,

        /// Number of sentences to print
        #[arg(short, long, default_value = "5")]
        sentences: usize,
    },

    /// Normalize raw model output from a file (or stdin) into JSON
    Normalize {
        /// File with raw model output; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Show the resolved configuration
    Config,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tokio::select! {
        result = run(cli.command) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report_error(&e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nProcess interrupted by user. Exiting...");
            ExitCode::SUCCESS
        }
    }
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<PipelineError>() {
        Some(PipelineError::NotFound(_)) => eprintln!("{}", error.to_string().red()),
        Some(_) => eprintln!("{} {}", "Error:".red(), error),
        None => eprintln!("{} {:#}", "Error:".red(), error),
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            path,
            only,
            output_dir,
            no_save,
            sequential,
            model,
            base_url,
        } => {
            let mut config = Config::load()?;
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }

            let provider = OpenAIProvider::from_config(&config)?;
            eprintln!("Using model {} at {}", config.model.cyan(), provider.endpoint());

            let options = PipelineOptions {
                kinds: if only.is_empty() { ArtifactKind::all() } else { dedup(only) },
                sequential,
                writer: (!no_save).then(|| ResultWriter::new(&config.output_dir)),
            };
            let pipeline = Pipeline::new(
                Arc::new(PdfExtractor::new()),
                Generator::new(Arc::new(provider)),
                options,
            );

            let mut progress = ProgressTracker::new();
            let report = pipeline.run(&path, &mut progress).await?;
            print_report(&report);
        }

        Commands::Extract { path, sentences } => {
            let text = PdfExtractor::new().extract(&path).map_err(PipelineError::from)?;
            if text.trim().is_empty() {
                return Err(PipelineError::EmptyDocument.into());
            }

            let splitter = SentenceSplitter::new();
            let all: Vec<String> = splitter.split(&text).collect();

            println!("Extracted {} characters, {} sentences.\n", text.len(), all.len());
            for sentence in all.iter().take(sentences) {
                println!("  - {}", sentence);
            }
        }

        Commands::Normalize { file } => {
            let raw = match file {
                Some(file) => std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            println!("{}", serialize_map(&normalize(Some(raw.trim()))));
        }

        Commands::Config => {
            let config = Config::load()?;
            if let Ok(path) = Config::path() {
                let state = if path.exists() { "" } else { " (not present)" };
                println!("{} {}{}", "Config file:".bold(), path.display(), state);
            }
            println!("  model:       {}", config.model);
            println!("  base_url:    {}", config.base_url);
            println!("  api_key:     {}", config.masked_api_key());
            println!("  output_dir:  {}", config.output_dir.display());
            if let Some(t) = config.temperature {
                println!("  temperature: {}", t);
            }
            if let Some(secs) = config.timeout_secs {
                println!("  timeout:     {}s", secs);
            }
        }
    }

    Ok(())
}

/// Keep the first occurrence of each kind, in the order given.
fn dedup(kinds: Vec<ArtifactKind>) -> Vec<ArtifactKind> {
    let mut out = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
    out
}

fn print_report(report: &RunReport) {
    println!("\n{}", "=== RESULTS ===".bold());
    for outcome in &report.outcomes {
        println!("\n--- {} ---", outcome.kind.tag().to_uppercase());
        println!("{}", outcome.json);
    }

    let failed = report.error_count();
    if failed > 0 {
        eprintln!(
            "\n{} {} of {} artifacts came back as errors",
            "!".yellow(),
            failed,
            report.outcomes.len()
        );
    }
    if !report.save_failures.is_empty() {
        eprintln!(
            "{} {} result files could not be saved",
            "!".yellow(),
            report.save_failures.len()
        );
    }
}
