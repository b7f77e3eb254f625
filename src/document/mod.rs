//! Document layer
//!
//! Source text comes from a [`TextExtractor`] (PDF via pdf_oxide) and is
//! split into sentences by [`SentenceSplitter`].

pub mod pdf;
pub mod sentences;

pub use pdf::{ExtractError, PdfExtractor, TextExtractor};
pub use sentences::{SentenceSplitter, Sentences};
