//! studykit: study materials from PDF documents
//!
//! Extracts the text of a PDF, asks a chat model for a summary, flashcards
//! and a quiz, and repairs whatever the model sends back into JSON.

pub mod artifact;
pub mod config;
pub mod document;
pub mod generate;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod serialize;

pub use artifact::{ArtifactKind, ArtifactShape, FlashcardDeck, Quiz, Summary};
pub use config::Config;
pub use document::{ExtractError, PdfExtractor, SentenceSplitter, TextExtractor};
pub use generate::{GenerationOutcome, Generator};
pub use llm::{LLMProvider, OpenAIProvider};
pub use normalize::{normalize, try_normalize, JsonMap, NormalizeError};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, ProgressTracker, ResultWriter, RunReport};
pub use serialize::{serialize, serialize_map};
