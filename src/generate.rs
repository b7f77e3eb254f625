//! Generation Service
//!
//! One prompt/response round-trip per artifact kind. The model reply goes
//! through the normalizer and serializer, so callers always get JSON text:
//! either the artifact or an object with an `error` key.

use crate::artifact::ArtifactKind;
use crate::llm::{LLMProvider, Message};
use crate::normalize::{try_normalize, JsonMap};
use crate::serialize::{error_json, serialize_map};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The JSON produced for one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub kind: ArtifactKind,
    pub json: String,
    /// True when `json` is an error object rather than the artifact.
    pub is_error: bool,
}

/// Sends documents to a chat model and returns normalized artifact JSON.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LLMProvider>,
}

impl Generator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Generate one artifact as JSON text. Never fails.
    pub async fn generate(&self, kind: ArtifactKind, document_text: &str) -> String {
        self.generate_outcome(kind, document_text).await.json
    }

    /// Generate one artifact and report whether it came back as an error.
    pub async fn generate_outcome(&self, kind: ArtifactKind, document_text: &str) -> GenerationOutcome {
        let metadata = self.provider.metadata();
        let estimated = self.provider.count_tokens(document_text);
        if estimated > metadata.context_window {
            warn!(
                model = %metadata.id,
                estimated_tokens = estimated,
                context_window = metadata.context_window,
                "document may not fit the model context window"
            );
        }

        let messages = [
            Message::system(kind.system_prompt()),
            Message::user(document_text),
        ];

        match self.provider.completion(&messages).await {
            Ok(response) => {
                debug!(%kind, chars = response.content.len(), "model replied");
                match try_normalize(Some(response.content.trim())) {
                    Ok(map) => {
                        check_shape(kind, &map);
                        GenerationOutcome {
                            kind,
                            json: serialize_map(&map),
                            is_error: false,
                        }
                    }
                    Err(e) => {
                        warn!(%kind, error = %e, "model output could not be normalized");
                        GenerationOutcome {
                            kind,
                            json: serialize_map(&e.to_map()),
                            is_error: true,
                        }
                    }
                }
            }
            Err(e) => {
                let message = format!("{} generation failed: {:#}", kind.label(), e);
                error!(%kind, "{}", message);
                GenerationOutcome {
                    kind,
                    json: error_json(&message),
                    is_error: true,
                }
            }
        }
    }

    /// Generate several artifacts concurrently; results follow `kinds` order.
    pub async fn generate_all(&self, kinds: &[ArtifactKind], document_text: &str) -> Vec<GenerationOutcome> {
        info!(count = kinds.len(), "generating artifacts concurrently");
        join_all(kinds.iter().map(|&kind| self.generate_outcome(kind, document_text))).await
    }

    /// Generate several artifacts one after another.
    pub async fn generate_sequential(&self, kinds: &[ArtifactKind], document_text: &str) -> Vec<GenerationOutcome> {
        let mut outcomes = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            outcomes.push(self.generate_outcome(kind, document_text).await);
        }
        outcomes
    }
}

fn check_shape(kind: ArtifactKind, map: &JsonMap) {
    match kind.check_shape(map) {
        Ok(shape) => debug!(%kind, title = shape.title(), items = shape.item_count(), "artifact matches schema"),
        Err(e) => warn!(%kind, error = %e, "artifact does not match the expected schema"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, ModelMetadata};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replies with a canned text per artifact, picked by the system prompt it receives.
    pub(crate) struct MockProvider {
        pub replies: HashMap<ArtifactKind, Result<String, String>>,
        pub seen: Mutex<Vec<Vec<Message>>>,
    }

    impl MockProvider {
        pub(crate) fn new(replies: Vec<(ArtifactKind, Result<String, String>)>) -> Self {
            Self {
                replies: replies.into_iter().collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        fn metadata(&self) -> ModelMetadata {
            ModelMetadata {
                id: "mock".to_string(),
                context_window: 1_000,
            }
        }

        async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let kind = ArtifactKind::all()
                .into_iter()
                .find(|k| messages[0].content == k.system_prompt())
                .ok_or_else(|| anyhow!("unknown prompt"))?;
            match self.replies.get(&kind) {
                Some(Ok(text)) => Ok(CompletionResponse::text(text.clone())),
                Some(Err(msg)) => Err(anyhow!(msg.clone())),
                None => Err(anyhow!("no reply configured")),
            }
        }
    }

    fn generator(replies: Vec<(ArtifactKind, Result<String, String>)>) -> (Generator, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider::new(replies));
        (Generator::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_fenced_summary_end_to_end() {
        let reply = "```json\n{\"title\":\"Geo\",\"content\":\"<p>Paris</p>\"}\n```";
        let (generator, provider) = generator(vec![(ArtifactKind::Summary, Ok(reply.to_string()))]);

        let json = generator
            .generate(ArtifactKind::Summary, "Paris is the capital of France.")
            .await;

        assert_eq!(json, "{\n  \"title\": \"Geo\",\n  \"content\": \"<p>Paris</p>\"\n}");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0], Message::system(ArtifactKind::Summary.system_prompt()));
        assert_eq!(seen[0][1], Message::user("Paris is the capital of France."));
    }

    #[tokio::test]
    async fn test_provider_failure_is_contained() {
        let (generator, _) = generator(vec![
            (ArtifactKind::Summary, Err("connection refused".to_string())),
            (ArtifactKind::Flashcards, Ok("{'title': 'T', 'flashcards': []}".to_string())),
            (ArtifactKind::Quiz, Err("rate limited".to_string())),
        ]);

        let outcomes = generator.generate_all(&ArtifactKind::all(), "text").await;
        assert_eq!(outcomes.len(), 3);

        let summary: Value = serde_json::from_str(&outcomes[0].json).unwrap();
        assert_eq!(summary, json!({"error": "Summary generation failed: connection refused"}));
        assert!(outcomes[0].is_error);

        let cards: Value = serde_json::from_str(&outcomes[1].json).unwrap();
        assert_eq!(cards, json!({"title": "T", "flashcards": []}));
        assert!(!outcomes[1].is_error);

        let quiz: Value = serde_json::from_str(&outcomes[2].json).unwrap();
        assert_eq!(quiz, json!({"error": "Quiz generation failed: rate limited"}));
    }

    #[tokio::test]
    async fn test_flashcard_label() {
        let (generator, _) = generator(vec![(ArtifactKind::Flashcards, Err("boom".to_string()))]);
        let json = generator.generate(ArtifactKind::Flashcards, "text").await;
        assert!(json.contains("Flashcard generation failed: boom"));
    }

    #[tokio::test]
    async fn test_unparsable_reply_becomes_error_object() {
        let (generator, _) = generator(vec![(ArtifactKind::Quiz, Ok("   \n".to_string()))]);
        let outcome = generator.generate_outcome(ArtifactKind::Quiz, "text").await;
        assert!(outcome.is_error);
        let value: Value = serde_json::from_str(&outcome.json).unwrap();
        // Trimmed to nothing before normalizing.
        assert_eq!(value, json!({"error": "Empty response from model."}));
    }

    #[tokio::test]
    async fn test_sequential_keeps_order() {
        let (generator, provider) = generator(vec![
            (ArtifactKind::Summary, Ok("{\"title\": \"s\", \"content\": \"c\"}".to_string())),
            (ArtifactKind::Quiz, Ok("{\"title\": \"q\", \"quiz_content\": []}".to_string())),
        ]);
        let kinds = [ArtifactKind::Quiz, ArtifactKind::Summary];
        let outcomes = generator.generate_sequential(&kinds, "text").await;
        assert_eq!(outcomes[0].kind, ArtifactKind::Quiz);
        assert_eq!(outcomes[1].kind, ArtifactKind::Summary);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0][0].content, ArtifactKind::Quiz.system_prompt());
    }
}
