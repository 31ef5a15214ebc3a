//! Sample model types used across the test suites.

use std::collections::BTreeMap;
use verdoc_core::escape::{dot_escape, dot_unescape};
use verdoc_core::{CoreError, CoreResult, Model, VersionMeta};
use verdoc_storage::{Document, IndexSpec, Sort, SortOrder, Value};

/// A note with a title and a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Note {
    /// Version bookkeeping.
    pub meta: VersionMeta,
    /// Title.
    pub title: String,
    /// Body text.
    pub body: String,
}

impl Note {
    /// Creates an unsaved note.
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            ..Self::default()
        }
    }
}

impl Model for Note {
    const COLLECTION_NAME: &'static str = "notes";
    const MODEL_NAME: &'static str = "Note";

    fn meta(&self) -> &VersionMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut VersionMeta {
        &mut self.meta
    }

    fn db_fields(&self) -> CoreResult<Document> {
        Ok(Document::new()
            .with("title", self.title.as_str())
            .with("body", self.body.as_str()))
    }

    fn api_fields(&self) -> serde_json::Value {
        serde_json::json!({ "title": self.title, "body": self.body })
    }

    fn load_fields(&mut self, document: &Document) -> CoreResult<()> {
        self.title = required_text(document, "title")?;
        self.body = required_text(document, "body")?;
        Ok(())
    }
}

/// A user profile with free-form labels.
///
/// Label keys may contain `.`; they are escaped on the way into the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    /// Version bookkeeping.
    pub meta: VersionMeta,
    /// Display name.
    pub name: String,
    /// Free-form labels.
    pub labels: BTreeMap<String, String>,
}

impl Profile {
    /// Creates an unsaved profile.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }
}

impl Model for Profile {
    const COLLECTION_NAME: &'static str = "profiles";
    const MODEL_NAME: &'static str = "Profile";

    fn meta(&self) -> &VersionMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut VersionMeta {
        &mut self.meta
    }

    fn default_sort() -> Sort {
        Sort::ascending("name")
    }

    fn extra_indexes() -> Vec<IndexSpec> {
        vec![IndexSpec::new("index_name").key("name", SortOrder::Ascending)]
    }

    fn db_fields(&self) -> CoreResult<Document> {
        let labels = Value::text_map(
            self.labels
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str()))),
        );
        Ok(Document::new()
            .with("name", self.name.as_str())
            .with("labels", dot_escape(&labels)))
    }

    fn api_fields(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name, "labels": self.labels })
    }

    fn load_fields(&mut self, document: &Document) -> CoreResult<()> {
        self.name = required_text(document, "name")?;
        let labels = document
            .get("labels")
            .map(dot_unescape)
            .ok_or_else(|| CoreError::invalid_document("missing labels"))?;
        let pairs = labels
            .as_map()
            .ok_or_else(|| CoreError::invalid_document("labels is not a map"))?;
        self.labels = pairs
            .iter()
            .map(|(k, v)| match (k.as_text(), v.as_text()) {
                (Some(k), Some(v)) => Ok((k.to_string(), v.to_string())),
                _ => Err(CoreError::invalid_document("labels must map text to text")),
            })
            .collect::<CoreResult<_>>()?;
        Ok(())
    }
}

fn required_text(document: &Document, field: &str) -> CoreResult<String> {
    document
        .get_str(field)
        .map(str::to_string)
        .ok_or_else(|| CoreError::invalid_document(format!("missing text field {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdoc_core::escape::DOT_ESCAPE;

    #[test]
    fn profile_labels_are_escaped_in_storage() {
        let profile = Profile::new("ada").label("team.lead", "yes");
        let doc = profile.make_db_document().unwrap();
        let labels = doc.get("labels").unwrap();
        let key = format!("team{DOT_ESCAPE}lead");
        assert_eq!(labels.get(&key).and_then(Value::as_text), Some("yes"));
        assert!(labels.get("team.lead").is_none());
    }

    #[test]
    fn note_api_fields() {
        let note = Note::new("t", "b");
        let api = note.to_api_document();
        assert_eq!(api.data["title"], "t");
        assert_eq!(api.data["body"], "b");
        assert_eq!(api.model, "Note");
    }
}
