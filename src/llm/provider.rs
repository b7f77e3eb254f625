//! The provider abstraction.
//!
//! Any chat-completion backend (a hosted API or a test stub) implements
//! [`LLMProvider`]; the generation service only sees the trait.

use super::types::{CompletionResponse, Message};
use anyhow::Result;
use async_trait::async_trait;

/// What the provider is configured to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMetadata {
    pub id: String,
    pub context_window: usize,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Model identifier and context window.
    fn metadata(&self) -> ModelMetadata;

    /// Rough token estimate, used to warn about oversized documents.
    fn count_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }

    /// Send a chat completion request and return the first completion.
    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse>;
}
