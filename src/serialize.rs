//! Output Serializer
//!
//! Canonical JSON text for normalized results: 2-space indentation, non-ASCII
//! characters kept as-is, keys in insertion order.

use crate::normalize::JsonMap;
use serde_json::{json, Value};

const INVALID_STRUCTURE: &str = "Invalid data structure returned.";

/// Serialize a value that is expected to be a mapping.
///
/// Anything other than an object is replaced by an error object, so the
/// output is always a JSON mapping.
pub fn serialize(value: &Value) -> String {
    match value {
        Value::Object(map) => serialize_map(map),
        _ => error_json(INVALID_STRUCTURE),
    }
}

/// Serialize a mapping as pretty JSON.
pub fn serialize_map(map: &JsonMap) -> String {
    serde_json::to_string_pretty(map).unwrap_or_else(|_| error_json(INVALID_STRUCTURE))
}

/// `{"error": message}` as pretty JSON.
pub fn error_json(message: &str) -> String {
    let value = json!({ "error": message });
    serde_json::to_string_pretty(&value)
        .unwrap_or_else(|_| String::from("{\n  \"error\": \"Invalid data structure returned.\"\n}"))
}
