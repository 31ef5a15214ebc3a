//! Key escaping for stores that forbid `.` in mapping keys.
//!
//! Only text keys are rewritten. Values, including text values, are
//! never touched, and non-text keys pass through unchanged.

use verdoc_storage::{Document, Value};

/// Replacement for `.` in escaped keys.
pub const DOT_ESCAPE: &str = "\u{2764}";

/// Replaces `from` with `to` in every text key of `value`, recursively.
///
/// Maps, arrays, and sets are walked; everything else is returned as is.
pub fn escape_keys(from: &str, to: &str, value: &Value) -> Value {
    if from.is_empty() {
        return value.clone();
    }
    match value {
        Value::Map(pairs) => Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (escape_key(from, to, k), escape_keys(from, to, v)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| escape_keys(from, to, v)).collect())
        }
        // Rewritten members may sort differently.
        Value::Set(items) => Value::set(items.iter().map(|v| escape_keys(from, to, v)).collect()),
        other => other.clone(),
    }
}

fn escape_key(from: &str, to: &str, key: &Value) -> Value {
    match key {
        Value::Text(text) if text.contains(from) => Value::Text(text.replace(from, to)),
        other => other.clone(),
    }
}

/// Replaces `.` with [`DOT_ESCAPE`] in every text key.
pub fn dot_escape(value: &Value) -> Value {
    escape_keys(".", DOT_ESCAPE, value)
}

/// Reverses [`dot_escape`].
pub fn dot_unescape(value: &Value) -> Value {
    escape_keys(DOT_ESCAPE, ".", value)
}

/// Escapes the top-level field names and every nested key of a document.
pub fn escape_document(document: &Document) -> Document {
    document
        .iter()
        .map(|(k, v)| (k.replace('.', DOT_ESCAPE), dot_escape(v)))
        .collect()
}

/// Reverses [`escape_document`].
pub fn unescape_document(document: &Document) -> Document {
    document
        .iter()
        .map(|(k, v)| (k.replace(DOT_ESCAPE, "."), dot_unescape(v)))
        .collect()
}
