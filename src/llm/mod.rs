//! LLM layer
//!
//! Everything that talks to a chat-completion model:
//! - Provider abstraction (`LLMProvider`)
//! - Provider-neutral message and response types
//! - The OpenAI-compatible HTTP provider
//! - Transport error classification

pub mod error;
pub mod openai;
pub mod provider;
pub mod types;

pub use error::LlmError;
pub use openai::OpenAIProvider;
pub use provider::{LLMProvider, ModelMetadata};
pub use types::{CompletionResponse, Message, Role, Usage};
