//! Secondary index specifications and their in-memory state.

use crate::document::{Document, ID_FIELD};
use crate::error::{StorageError, StorageResult};
use crate::id::RecordId;
use crate::query::{Filter, SortOrder};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Name of the implicit unique index on `_id`.
pub const ID_INDEX: &str = "_id_";

/// Specification for an index on a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Name of the index.
    pub name: String,
    /// Indexed fields with their directions.
    pub keys: Vec<(String, SortOrder)>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Only documents matching this filter are indexed.
    pub partial_filter: Option<Filter>,
}

impl IndexSpec {
    /// Creates a new index specification with no keys.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
            partial_filter: None,
        }
    }

    /// Appends an indexed field.
    #[must_use]
    pub fn key(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.keys.push((field.into(), order));
        self
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Restricts the index to documents matching `filter`.
    #[must_use]
    pub fn partial(mut self, filter: Filter) -> Self {
        self.partial_filter = Some(filter);
        self
    }

    pub(crate) fn id_index() -> Self {
        Self::new(ID_INDEX).key(ID_FIELD, SortOrder::Ascending).unique()
    }

    pub(crate) fn validate(&self) -> StorageResult<()> {
        if self.name.is_empty() {
            return Err(StorageError::invalid_query("index name is empty"));
        }
        if self.keys.is_empty() {
            return Err(StorageError::invalid_query(format!(
                "index {} has no keys",
                self.name
            )));
        }
        if let Some(filter) = &self.partial_filter {
            filter.validate()?;
        }
        Ok(())
    }
}

/// An index key: the indexed field values in key order.
pub(crate) type IndexKey = Vec<Value>;

/// Ordered key to record mapping for one index.
#[derive(Debug, Clone)]
pub(crate) struct IndexState {
    spec: IndexSpec,
    entries: BTreeMap<IndexKey, BTreeSet<RecordId>>,
}

impl IndexState {
    pub(crate) fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Computes the key for a document, or `None` if the partial filter
    /// excludes it. Missing fields index as null.
    pub(crate) fn key_for(&self, doc: &Document) -> Option<IndexKey> {
        if let Some(filter) = &self.spec.partial_filter {
            if !filter.matches(doc) {
                return None;
            }
        }
        Some(
            self.spec
                .keys
                .iter()
                .map(|(field, _)| doc.get_path(field).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Returns true if adding `key` would break uniqueness.
    ///
    /// An entry held by `owner` itself does not count as a conflict.
    pub(crate) fn conflicts(&self, key: &IndexKey, owner: Option<RecordId>) -> bool {
        self.spec.unique
            && self
                .entries
                .get(key)
                .is_some_and(|ids| ids.iter().any(|existing| Some(*existing) != owner))
    }

    pub(crate) fn insert(&mut self, key: IndexKey, id: RecordId) {
        self.entries.entry(key).or_default().insert(id);
    }

    pub(crate) fn remove(&mut self, key: &IndexKey, id: RecordId) {
        if let Some(ids) = self.entries.get_mut(key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// Answers a filter from the index when the filter pins every indexed
    /// field by equality and implies the partial filter.
    pub(crate) fn lookup(&self, filter: &Filter) -> Option<Vec<RecordId>> {
        if let Some(partial) = &self.spec.partial_filter {
            if !filter.implies(partial) {
                return None;
            }
        }
        let key: IndexKey = self
            .spec
            .keys
            .iter()
            .map(|(field, _)| filter.equality(field).cloned())
            .collect::<Option<_>>()?;

        Some(
            self.entries
                .get(&key)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
        )
    }

    /// Number of indexed records.
    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_index() -> IndexState {
        IndexState::new(
            IndexSpec::new("index_latest")
                .key("is_latest", SortOrder::Descending)
                .partial(Filter::new().eq("is_latest", true)),
        )
    }

    #[test]
    fn builder() {
        let spec = IndexSpec::new("uv")
            .key("model_id", SortOrder::Ascending)
            .key("version", SortOrder::Ascending)
            .unique();
        assert_eq!(spec.keys.len(), 2);
        assert!(spec.unique);
        assert!(spec.partial_filter.is_none());
        assert!(spec.validate().is_ok());
        assert!(IndexSpec::new("empty").validate().is_err());
    }

    #[test]
    fn partial_filter_excludes_documents() {
        let index = latest_index();
        let latest = Document::new().with("is_latest", true);
        let old = Document::new().with("is_latest", false);
        assert_eq!(index.key_for(&latest), Some(vec![Value::Bool(true)]));
        assert_eq!(index.key_for(&old), None);
    }

    #[test]
    fn unique_conflicts_ignore_same_record() {
        let mut index =
            IndexState::new(IndexSpec::new("u").key("k", SortOrder::Ascending).unique());
        let a = RecordId::new();
        let b = RecordId::new();
        let key = vec![Value::from(1)];
        index.insert(key.clone(), a);
        assert!(index.conflicts(&key, Some(b)));
        assert!(index.conflicts(&key, None));
        assert!(!index.conflicts(&key, Some(a)));
        index.remove(&key, a);
        assert!(!index.conflicts(&key, None));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn lookup_requires_partial_implication() {
        let mut index = latest_index();
        let id = RecordId::new();
        index.insert(vec![Value::Bool(true)], id);

        let hit = index.lookup(&Filter::new().eq("is_latest", true).eq("model_id", "m"));
        assert_eq!(hit, Some(vec![id]));
        assert_eq!(index.lookup(&Filter::new().eq("model_id", "m")), None);
    }
}
