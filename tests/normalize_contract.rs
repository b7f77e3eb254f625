//! Public contract of the normalizer, serializer and generator.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use studykit::llm::{CompletionResponse, Message, ModelMetadata};
use studykit::{normalize, serialize, serialize_map, ArtifactKind, Generator, LLMProvider};

fn value(raw: Option<&str>) -> Value {
    Value::Object(normalize(raw))
}

#[test]
fn empty_input_has_only_an_error_key() {
    assert_eq!(value(None), json!({"error": "Empty response from model."}));
    assert_eq!(value(Some("")), json!({"error": "Empty response from model."}));
}

#[test]
fn strict_json_is_returned_exactly() {
    let raw = r#"{"title": "Cells", "flashcards": [{"front": "ATP", "back": "energy currency"}], "n": 1.5}"#;
    let expected: Value = serde_json::from_str(raw).unwrap();
    assert_eq!(value(Some(raw)), expected);
    assert_eq!(value(Some(&format!("```json\n{}\n```", raw))), expected);
    assert_eq!(value(Some(&format!("```\n{}\n```", raw))), expected);
}

#[test]
fn python_dict_syntax() {
    assert_eq!(
        value(Some("{'title': 'Quiz', 'quiz_content': [{'question': 'Q?', 'options': ['a', 'b'], 'correctAnswers': [0]}]}")),
        json!({"title": "Quiz", "quiz_content": [{"question": "Q?", "options": ["a", "b"], "correctAnswers": [0]}]})
    );
}

#[test]
fn json_embedded_in_prose() {
    assert_eq!(value(Some(r#"Sure! {"a": 1} thanks"#)), json!({"a": 1}));
    assert_eq!(
        value(Some("Here is your summary:\n\n{\n  \"title\": \"T\",\n  \"content\": \"<p>x</p>\"\n}\n\nLet me know!")),
        json!({"title": "T", "content": "<p>x</p>"})
    );
}

#[test]
fn non_mapping_and_garbage() {
    assert_eq!(
        value(Some("[1,2,3]")),
        json!({"error": "Parsed output is not a dictionary.", "raw": "[1,2,3]"})
    );
    assert_eq!(
        value(Some("```json\n[1, 2]\n```")),
        json!({"error": "Parsed output is not a dictionary.", "raw": "[1, 2]"})
    );
    let garbage = value(Some("not json at all {{{"));
    assert_eq!(garbage["error"], "Failed to parse model output as JSON.");
}

#[test]
fn serialized_output_is_always_valid_json() {
    let samples = [
        None,
        Some(""),
        Some("{"),
        Some("'''"),
        Some("{'a': \"it's\"}"),
        Some("```json\n{\"emoji\": \"🧪\"}\n```"),
        Some("{\"a\": 1} {\"b\": 2}"),
        Some("True"),
    ];
    for raw in samples {
        let text = serialize_map(&normalize(raw));
        let parsed: Value = serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("invalid JSON for {:?}: {}", raw, e));
        assert!(parsed.is_object());
    }
    assert_eq!(
        serialize(&json!([1])),
        "{\n  \"error\": \"Invalid data structure returned.\"\n}"
    );
}

#[test]
fn round_trip_is_stable_for_mappings() {
    let samples = [
        "{\"z\": 1, \"a\": {\"nested\": [true, null, \"ü\"]}}",
        "```json\n{'title': 'T', 'content': '<h1 class=\"text-4xl\">T</h1>'}\n```",
        "Sure! {\"a\": 1} thanks",
        "{'a': \"it's\", 'b': (1, 2), 'c': None}",
    ];
    for raw in samples {
        let first = normalize(Some(raw));
        assert!(!first.contains_key("error"), "unexpected error for {:?}", raw);
        let again = normalize(Some(&serialize_map(&first)));
        assert_eq!(again, first);
    }
}

struct FencedReply;

#[async_trait]
impl LLMProvider for FencedReply {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            id: "stub".to_string(),
            context_window: 128_000,
        }
    }

    async fn completion(&self, _messages: &[Message]) -> anyhow::Result<CompletionResponse> {
        Ok(CompletionResponse::text(
            "\n```json\n{\"title\":\"Geo\",\"content\":\"<p>Paris</p>\"}\n```\n",
        ))
    }
}

#[tokio::test]
async fn generator_end_to_end_with_stub() {
    let generator = Generator::new(Arc::new(FencedReply));
    let json = generator
        .generate(ArtifactKind::Summary, "Paris is the capital of France.")
        .await;
    assert_eq!(
        json,
        "{\n  \"title\": \"Geo\",\n  \"content\": \"<p>Paris</p>\"\n}"
    );
}
