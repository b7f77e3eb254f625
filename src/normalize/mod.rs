//! Response Normalizer
//!
//! Turns raw, possibly malformed model output into a JSON mapping.
//!
//! Models wrap JSON in code fences, answer with Python dict syntax, or bury the
//! object inside prose. The normalizer walks an ordered fallback chain and the
//! first step that yields a mapping wins:
//!
//! 1. strict JSON of the fence-stripped text
//! 2. strict JSON of the `{ ... }` span after single-quote repair
//! 3. a permissive Python literal read of the fence-stripped text
//!
//! Every failure is reported as a [`NormalizeError`], which renders to an
//! error mapping with an `error` key (and `raw` where useful).

pub mod literal;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// A JSON object with keys kept in insertion order.
pub type JsonMap = serde_json::Map<String, Value>;

/// Why model output could not be turned into a mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Empty response from model.")]
    Empty,
    #[error("Parsed output is not a dictionary.")]
    NotAMapping { raw: String },
    #[error("Failed to parse model output as JSON.")]
    Unparsable { raw: String },
}

impl NormalizeError {
    /// The cleaned model text, when the failure kept it for diagnostics.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::NotAMapping { raw } | Self::Unparsable { raw } => Some(raw),
        }
    }

    /// Render as an error mapping: `{"error": ..., "raw": ...}`.
    pub fn to_map(&self) -> JsonMap {
        let mut map = JsonMap::new();
        map.insert("error".to_string(), Value::String(self.to_string()));
        if let Some(raw) = self.raw() {
            map.insert("raw".to_string(), Value::String(raw.to_string()));
        }
        map
    }
}

/// Normalize model output, folding failures into an error mapping.
///
/// Never fails. Use [`try_normalize`] to tell success from a recovered error.
pub fn normalize(raw: Option<&str>) -> JsonMap {
    match try_normalize(raw) {
        Ok(map) => map,
        Err(e) => e.to_map(),
    }
}

/// Normalize model output into a mapping or a typed failure.
pub fn try_normalize(raw: Option<&str>) -> Result<JsonMap, NormalizeError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(NormalizeError::Empty),
    };

    let cleaned = strip_code_fences(raw);

    match parse_json(&cleaned) {
        Some(Value::Object(map)) => {
            debug!("model output parsed as strict JSON");
            return Ok(map);
        }
        Some(_) => {
            debug!("model output is strict JSON but not a mapping");
            return Err(NormalizeError::NotAMapping { raw: cleaned });
        }
        None => {}
    }

    let repaired = replace_single_quotes(extract_braced_span(&cleaned).unwrap_or(cleaned.as_str()));
    if let Some(Value::Object(map)) = parse_json(&repaired) {
        debug!("model output parsed after brace extraction and quote repair");
        return Ok(map);
    }

    match literal::parse(&cleaned) {
        Ok(value) if value.is_dict() => match value.into_json() {
            Ok(Value::Object(map)) => {
                debug!("model output parsed as a Python literal");
                Ok(map)
            }
            Ok(_) => Err(NormalizeError::NotAMapping { raw: cleaned }),
            Err(e) => {
                debug!(error = %e, "Python literal has no JSON form");
                Err(NormalizeError::Unparsable { raw: cleaned })
            }
        },
        Ok(_) => {
            debug!("model output is a literal but not a mapping");
            Err(NormalizeError::NotAMapping { raw: cleaned })
        }
        Err(e) => {
            debug!(error = %e, "all parse attempts failed");
            Err(NormalizeError::Unparsable { raw: cleaned })
        }
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?m)^```[A-Za-z0-9_+\-]*|```$").expect("fence pattern is valid")
    })
}

/// Remove Markdown code-fence markers and surrounding whitespace.
///
/// An opening marker (with optional language tag) is only recognised at the
/// start of a line, a closing one only at the end of a line.
pub fn strip_code_fences(raw: &str) -> String {
    fence_regex().replace_all(raw.trim(), "").trim().to_string()
}

/// The span from the first `{` to the last `}`, if both exist in that order.
pub fn extract_braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Replace every `'` not directly preceded by a backslash with `"`.
///
/// String boundaries are not tracked, so apostrophes inside double-quoted
/// values are rewritten too.
pub fn replace_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for c in text.chars() {
        if c == '\'' && prev != Some('\\') {
            out.push('"');
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Deepest array/object nesting handed to the JSON parser.
const MAX_JSON_DEPTH: usize = 1_000;

/// Strict JSON parse without serde_json's 128-level cap. The stack grows on
/// the heap as needed, and input nested deeper than [`MAX_JSON_DEPTH`] is
/// refused up front.
fn parse_json(text: &str) -> Option<Value> {
    if nesting_depth(text) > MAX_JSON_DEPTH {
        return None;
    }
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de)).ok()?;
    de.end().ok()?;
    Some(value)
}

/// Maximum bracket nesting outside double-quoted strings.
fn nesting_depth(text: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => {
                depth += 1;
                max = max.max(depth);
            }
            ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_value(map: JsonMap) -> Value {
        Value::Object(map)
    }

    #[test]
    fn test_empty_input() {
        for raw in [None, Some("")] {
            let map = normalize(raw);
            assert_eq!(as_value(map), json!({"error": "Empty response from model."}));
        }
    }

    #[test]
    fn test_whitespace_only_is_not_empty() {
        let err = try_normalize(Some("  \n ")).unwrap_err();
        assert_eq!(err, NormalizeError::Unparsable { raw: String::new() });
    }

    #[test]
    fn test_plain_json() {
        let map = normalize(Some(r#"{"title": "Geo", "content": "x"}"#));
        assert_eq!(as_value(map), json!({"title": "Geo", "content": "x"}));
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"title\":\"Geo\",\"content\":\"<p>Paris</p>\"}\n```";
        let map = normalize(Some(raw));
        assert_eq!(as_value(map), json!({"title": "Geo", "content": "<p>Paris</p>"}));
    }

    #[test]
    fn test_fence_with_other_language_tag() {
        let raw = "```javascript\n{\"a\": 1}\n```";
        assert_eq!(as_value(normalize(Some(raw))), json!({"a": 1}));
    }

    #[test]
    fn test_key_order_preserved() {
        let map = normalize(Some(r#"{"z": 1, "a": 2, "m": 3}"#));
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_single_quoted_dict() {
        let map = normalize(Some("{'title': 'Cells', 'flashcards': [{'front': 'ATP', 'back': 'energy'}]}"));
        assert_eq!(
            as_value(map),
            json!({"title": "Cells", "flashcards": [{"front": "ATP", "back": "energy"}]})
        );
    }

    #[test]
    fn test_json_inside_prose() {
        let map = normalize(Some(r#"Sure! {"a": 1} thanks"#));
        assert_eq!(as_value(map), json!({"a": 1}));
    }

    #[test]
    fn test_apostrophe_falls_through_to_literal() {
        // Quote repair corrupts "it's", the literal reader still gets it.
        let raw = r#"{'title': "it's alive", 'n': True, 'm': None}"#;
        let map = normalize(Some(raw));
        assert_eq!(as_value(map), json!({"title": "it's alive", "n": true, "m": null}));
    }

    #[test]
    fn test_non_mapping() {
        let err = try_normalize(Some("[1,2,3]")).unwrap_err();
        assert_eq!(err, NormalizeError::NotAMapping { raw: "[1,2,3]".to_string() });
        assert_eq!(
            as_value(err.to_map()),
            json!({"error": "Parsed output is not a dictionary.", "raw": "[1,2,3]"})
        );
    }

    #[test]
    fn test_json_array_of_objects_is_not_a_mapping() {
        let raw = r#"[{"question": "Q1", "options": ["a"], "correctAnswers": [0]}]"#;
        let err = try_normalize(Some(raw)).unwrap_err();
        assert_eq!(err, NormalizeError::NotAMapping { raw: raw.to_string() });
    }

    #[test]
    fn test_deeply_nested_json() {
        let raw = format!("{}true{}", "{\"a\":".repeat(200), "}".repeat(200));
        let map = try_normalize(Some(&raw)).unwrap();

        let mut value = &map["a"];
        for _ in 1..200 {
            value = &value["a"];
        }
        assert_eq!(value, &Value::Bool(true));
    }

    #[test]
    fn test_runaway_nesting_is_unparsable() {
        let raw = "[".repeat(100_000);
        let err = try_normalize(Some(&raw)).unwrap_err();
        assert!(matches!(err, NormalizeError::Unparsable { .. }));
    }

    #[test]
    fn test_nesting_depth_ignores_strings() {
        assert_eq!(nesting_depth(r#"{"a": [1, {"b": "[[[{"}]}"#), 3);
        assert_eq!(nesting_depth(r#"["\"[", []]"#), 2);
        assert_eq!(nesting_depth("plain"), 0);
    }

    #[test]
    fn test_quoted_string_is_not_a_mapping() {
        let map = normalize(Some("'hello'"));
        assert_eq!(map["error"], json!("Parsed output is not a dictionary."));
        assert_eq!(map["raw"], json!("'hello'"));
    }

    #[test]
    fn test_garbage() {
        let map = normalize(Some("not json at all {{{"));
        assert_eq!(
            as_value(map),
            json!({"error": "Failed to parse model output as JSON.", "raw": "not json at all {{{"})
        );
    }

    #[test]
    fn test_set_values_are_unparsable() {
        let err = try_normalize(Some("{'tags': {'a', 'b'},}")).unwrap_err();
        assert!(matches!(err, NormalizeError::Unparsable { .. }));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("  ```json\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("plain"), "plain");
    }

    #[test]
    fn test_extract_braced_span() {
        assert_eq!(extract_braced_span("a {b} c {d} e"), Some("{b} c {d}"));
        assert_eq!(extract_braced_span("x\n{\n1\n}\ny"), Some("{\n1\n}"));
        assert_eq!(extract_braced_span("} before {"), None);
        assert_eq!(extract_braced_span("none"), None);
    }

    #[test]
    fn test_replace_single_quotes_respects_backslash() {
        assert_eq!(replace_single_quotes(r"{'a': 'b\'c'}"), r#"{"a": "b\'c"}"#);
    }

    #[test]
    fn test_idempotent_on_success() {
        let first = normalize(Some("```json\n{'a': [1, 2.5, 'ü']}\n```"));
        let text = crate::serialize::serialize_map(&first);
        assert_eq!(normalize(Some(&text)), first);
    }
}
