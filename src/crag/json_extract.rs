//! Best-effort recovery of JSON embedded in model output.
//!
//! Models wrap their JSON in prose, markdown fences or trailing remarks. Every
//! helper here returns a default instead of an error: callers treat "nothing
//! parseable" the same as "nothing relevant".

use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// First `open` to last `close`, inclusive.
fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// First bracket-balanced span starting at `open`, skipping brackets inside
/// string literals.
fn balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + offset + ch.len_utf8()]);
            }
        }
    }
    None
}

/// Parses the outer span, then the first balanced span if that fails.
fn extract_value(text: &str, open: char, close: char) -> Option<Value> {
    [outer_span(text, open, close), balanced_span(text, open, close)]
        .into_iter()
        .flatten()
        .find_map(|span| serde_json::from_str::<Value>(span).ok())
}

/// The JSON array embedded in `text`, or an empty array.
pub fn extract_json_array(text: &str) -> Vec<Value> {
    match extract_value(text, '[', ']') {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Only the object members of the embedded array.
pub fn parse_json_list(text: &str) -> Vec<JsonObject> {
    extract_json_array(text)
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// The JSON object embedded in `text`, if any.
pub fn parse_json_object(text: &str) -> Option<JsonObject> {
    match extract_value(text, '{', '}') {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Reads `key` as text. Strings are trimmed, other scalars are rendered,
/// lists of scalars are joined with ", ". Missing and null give "".
pub fn string_field(object: &JsonObject, key: &str) -> String {
    object.get(key).map(value_to_text).unwrap_or_default()
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Reads `key` as a list of non-blank strings. A bare string becomes a
/// one-element list.
pub fn string_list_field(object: &JsonObject, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
