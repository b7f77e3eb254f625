//! Study-material pipeline
//!
//! One run: extract text from a PDF, split it into sentences, generate the
//! selected artifacts, and persist each result.
//!
//! Input problems (missing file, unreadable PDF, no text) stop the run.
//! Generation and persistence problems are recorded per artifact and the run
//! carries on.

pub mod progress;
pub mod writer;

pub use progress::ProgressTracker;
pub use writer::ResultWriter;

use crate::artifact::ArtifactKind;
use crate::document::{ExtractError, SentenceSplitter, TextExtractor};
use crate::generate::{GenerationOutcome, Generator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Failures that end a run before generation starts
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Error: The file at {} was not found.", .0.display())]
    NotFound(PathBuf),
    #[error("An error occurred during PDF processing: {0}")]
    Extraction(String),
    #[error("No text extracted from the PDF.")]
    EmptyDocument,
}

impl From<ExtractError> for PipelineError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::NotFound(path) => Self::NotFound(path),
            other => Self::Extraction(other.to_string()),
        }
    }
}

/// Run options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Artifacts to generate, in output order
    pub kinds: Vec<ArtifactKind>,
    /// Issue generation calls one after another instead of concurrently
    pub sequential: bool,
    /// Where to save results; None disables saving
    pub writer: Option<ResultWriter>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            kinds: ArtifactKind::all(),
            sequential: false,
            writer: Some(ResultWriter::new(crate::config::DEFAULT_OUTPUT_DIR)),
        }
    }
}

/// A result file that could not be written
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFailure {
    pub kind: ArtifactKind,
    pub message: String,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub source: PathBuf,
    pub sentence_count: usize,
    pub outcomes: Vec<GenerationOutcome>,
    pub saved: Vec<PathBuf>,
    pub save_failures: Vec<SaveFailure>,
}

impl RunReport {
    /// Number of artifacts that came back as error objects
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error).count()
    }
}

pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    splitter: SentenceSplitter,
    generator: Generator,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(extractor: Arc<dyn TextExtractor>, generator: Generator, options: PipelineOptions) -> Self {
        Self {
            extractor,
            splitter: SentenceSplitter::new(),
            generator,
            options,
        }
    }

    /// Extract and validate the document text, returning it with its sentence count
    pub fn prepare(&self, path: &Path, progress: &mut ProgressTracker) -> Result<(String, usize), PipelineError> {
        progress.start_phase("Extracting text from PDF");
        let text = match self.extractor.extract(path) {
            Ok(text) => text,
            Err(e) => {
                progress.fail_phase("failed");
                return Err(e.into());
            }
        };
        if text.trim().is_empty() {
            progress.fail_phase("no text");
            return Err(PipelineError::EmptyDocument);
        }
        progress.finish_phase();

        progress.start_phase("Tokenizing text into sentences");
        let sentence_count = self.splitter.split(&text).count();
        progress.finish_phase();
        progress.note(&format!("Extracted {} sentences.", sentence_count));
        info!(path = %path.display(), chars = text.len(), sentences = sentence_count, "document prepared");

        Ok((text, sentence_count))
    }

    /// Run the whole pipeline for one document
    pub async fn run(&self, path: &Path, progress: &mut ProgressTracker) -> Result<RunReport, PipelineError> {
        let (text, sentence_count) = self.prepare(path, progress)?;

        let kinds = &self.options.kinds;
        let outcomes = if self.options.sequential {
            let mut outcomes = Vec::with_capacity(kinds.len());
            for &kind in kinds {
                progress.start_phase(&format!("Generating {}", kind));
                let outcome = self.generator.generate_outcome(kind, &text).await;
                finish_generation(progress, &outcome);
                outcomes.push(outcome);
            }
            outcomes
        } else {
            let names: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
            progress.start_phase(&format!("Generating {}", names.join(", ")));
            let outcomes = self.generator.generate_all(kinds, &text).await;
            progress.finish_phase();
            outcomes
        };

        let mut report = RunReport {
            source: path.to_path_buf(),
            sentence_count,
            outcomes,
            saved: Vec::new(),
            save_failures: Vec::new(),
        };

        if let Some(writer) = &self.options.writer {
            for outcome in &report.outcomes {
                match writer.save(&outcome.json, outcome.kind.tag(), path) {
                    Ok(saved) => {
                        progress.note(&format!("Saved {} result to: {}", outcome.kind, saved.display()));
                        report.saved.push(saved);
                    }
                    Err(e) => {
                        let message = format!("{:#}", e);
                        warn!(kind = %outcome.kind, error = %message, "failed to save result");
                        progress.note(&format!("Failed to save {} result: {}", outcome.kind, message));
                        report.save_failures.push(SaveFailure {
                            kind: outcome.kind,
                            message,
                        });
                    }
                }
            }
        }

        Ok(report)
    }
}

fn finish_generation(progress: &mut ProgressTracker, outcome: &GenerationOutcome) {
    if outcome.is_error {
        progress.fail_phase("returned an error");
    } else {
        progress.finish_phase();
    }
}
