//! Top-level stored document.

use crate::id::RecordId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Field holding the store-assigned record identifier.
pub const ID_FIELD: &str = "_id";

/// A stored document: text field names mapped to values.
///
/// Fields are kept in name order. Nested structure lives in
/// [`Value::Map`], [`Value::Array`] and [`Value::Set`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Removes a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Returns a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Resolves a dotted path: the first segment names a top-level field,
    /// the rest walk nested text-keyed maps.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            None => self.0.get(path),
            Some((head, rest)) => self.0.get(head)?.get_path(rest),
        }
    }

    /// Returns true if the field is present.
    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns a field as an integer.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_integer)
    }

    /// Returns a field as text.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_text)
    }

    /// Returns a field as a boolean.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Returns the record identifier, if assigned.
    pub fn id(&self) -> Option<RecordId> {
        self.get(ID_FIELD).and_then(Value::as_id)
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copies every field of `other` into this document, overwriting.
    pub fn extend(&mut self, other: Document) {
        self.0.extend(other.0);
    }

    /// Keeps only the named fields, plus the record identifier.
    #[must_use]
    pub fn project(mut self, fields: &[String]) -> Self {
        self.0
            .retain(|name, _| name == ID_FIELD || fields.iter().any(|f| f == name));
        self
    }

    /// Converts into a map value with text keys.
    pub fn into_value(self) -> Value {
        Value::Map(
            self.0
                .into_iter()
                .map(|(k, v)| (Value::Text(k), v))
                .collect(),
        )
    }

    /// Builds a document from a map value.
    ///
    /// Returns `None` if the value is not a map or has a non-text key.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Map(pairs) => pairs
                .into_iter()
                .map(|(k, v)| match k {
                    Value::Text(k) => Some((k, v)),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
