//! Transport and API failures from the LLM endpoint.

use reqwest::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("Request timed out")]
    Timeout,
    #[error("Got {0} response, check the API key")]
    Credential(StatusCode),
    #[error("API returned {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to deserialize response: {0}")]
    Deserialization(String),
    #[error("No choices returned from the model")]
    NoChoices,
    #[error("Completion contained no text content")]
    NoContent,
}

impl LlmError {
    /// Classify a non-success HTTP response.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Credential(status)
        } else {
            Self::HttpStatus { status, body }
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = error.status() {
            return Self::from_status(status, error.to_string());
        }
        if error.is_decode() {
            return Self::Deserialization(error.to_string());
        }
        Self::Network(error.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(error: serde_json::Error) -> Self {
        Self::Deserialization(error.to_string())
    }
}
