//! OpenAI-compatible chat completions provider.
//!
//! Works against api.openai.com or any endpoint speaking the same
//! `/chat/completions` protocol (set `base_url`).

use super::error::LlmError;
use super::provider::{LLMProvider, ModelMetadata};
use super::types::{CompletionResponse, Message, Usage};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct OpenAIProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>, base_url: &str, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: completions_url(base_url),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
        }
    }

    /// Build a provider from resolved configuration.
    ///
    /// Fails when no API key is configured or the HTTP client can't be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: completions_url(&config.base_url),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, messages: &[Message]) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(ApiMessage::from).collect(),
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn metadata(&self) -> ModelMetadata {
        let window = match self.model.as_str() {
            m if m.starts_with("gpt-4o") || m.starts_with("gpt-4-turbo") => 128_000,
            m if m.starts_with("gpt-4.1") => 1_047_576,
            "gpt-4" => 8_192,
            "gpt-3.5-turbo" => 16_385,
            _ => 8_192,
        };

        ModelMetadata {
            id: self.model.clone(),
            context_window: window,
        }
    }

    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let request = self.build_request(messages);
        debug!(endpoint = %self.endpoint, model = %self.model, messages = messages.len(), "sending chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(LlmError::from)?;
        if !status.is_success() {
            return Err(LlmError::from_status(status, body).into());
        }

        let completion = parse_chat_response(&body)?;
        debug!(
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "chat completion received"
        );
        Ok(completion)
    }
}

/// `{base}/chat/completions`, tolerating a trailing slash on the base.
fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Read the first choice's text out of a chat completions response body.
pub fn parse_chat_response(body: &str) -> Result<CompletionResponse, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let choice = response.choices.into_iter().next().ok_or(LlmError::NoChoices)?;
    let content = choice.message.content.ok_or(LlmError::NoContent)?;

    Ok(CompletionResponse {
        content,
        usage: response.usage.map(Usage::from).unwrap_or_default(),
    })
}

// -----------------------------------------------------------------------------
// Wire types
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for ApiMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}
