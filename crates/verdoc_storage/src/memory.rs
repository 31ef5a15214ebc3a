//! In-memory document store.

use crate::document::{Document, ID_FIELD};
use crate::error::{StorageError, StorageResult};
use crate::id::RecordId;
use crate::index::{IndexKey, IndexSpec, IndexState};
use crate::query::{Filter, FindOptions, Update};
use crate::store::DocumentStore;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory document store.
///
/// Rows are kept CBOR-encoded, so every read decodes a fresh copy and
/// callers can never alias stored state. Indexes are ordered maps from
/// key to record ids. A query whose filter pins every field of an index
/// by equality is answered from that index instead of a full scan.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Embedding the versioning layer without an external database
///
/// # Thread Safety
///
/// All operations on a store take one lock; writes are exclusive, so
/// single-document inserts and multi-document updates are atomic.
///
/// # Example
///
/// ```rust
/// use verdoc_storage::{Document, DocumentStore, Filter, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// let id = store.insert("things", Document::new().with("name", "a")).unwrap();
/// let found = store.find_one("things", &Filter::new().eq("_id", id)).unwrap();
/// assert_eq!(found.unwrap().get_str("name"), Some("a"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, CollectionState>>,
}

#[derive(Debug)]
struct Row {
    id: RecordId,
    payload: Vec<u8>,
}

#[derive(Debug)]
struct CollectionState {
    /// Rows in insertion order.
    rows: Vec<Row>,
    /// Record id to row position.
    positions: HashMap<RecordId, usize>,
    /// The first entry is always the `_id` index.
    indexes: Vec<IndexState>,
}

struct PendingChange {
    position: usize,
    id: RecordId,
    payload: Vec<u8>,
    old_keys: Vec<Option<IndexKey>>,
    new_keys: Vec<Option<IndexKey>>,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            positions: HashMap::new(),
            indexes: vec![IndexState::new(IndexSpec::id_index())],
        }
    }

    fn index_keys(&self, doc: &Document) -> Vec<Option<IndexKey>> {
        self.indexes.iter().map(|index| index.key_for(doc)).collect()
    }

    /// Row positions that may match, in insertion order.
    fn candidates(&self, filter: &Filter) -> Vec<usize> {
        for index in &self.indexes {
            if let Some(ids) = index.lookup(filter) {
                let mut positions: Vec<usize> = ids
                    .iter()
                    .filter_map(|id| self.positions.get(id).copied())
                    .collect();
                positions.sort_unstable();
                return positions;
            }
        }
        (0..self.rows.len()).collect()
    }

    fn matching(&self, filter: &Filter) -> StorageResult<Vec<(usize, Document)>> {
        let mut result = Vec::new();
        for position in self.candidates(filter) {
            let doc = decode(&self.rows[position].payload)?;
            if filter.matches(&doc) {
                result.push((position, doc));
            }
        }
        Ok(result)
    }
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all collections, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of documents in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |state| state.rows.len())
    }

    /// Returns true if the collection holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Returns how many documents an index covers, if the index exists.
    ///
    /// Useful for checking partial index behavior.
    #[must_use]
    pub fn index_entry_count(&self, collection: &str, index: &str) -> Option<usize> {
        self.collections.read().get(collection).and_then(|state| {
            state
                .indexes
                .iter()
                .find(|i| i.spec().name == index)
                .map(IndexState::len)
        })
    }
}

impl DocumentStore for InMemoryStore {
    fn insert(&self, collection: &str, mut document: Document) -> StorageResult<RecordId> {
        validate_document(&document)?;
        let id = match document.get(ID_FIELD) {
            None => {
                let id = RecordId::new();
                document.insert(ID_FIELD, id);
                id
            }
            Some(Value::Id(id)) => *id,
            Some(_) => {
                return Err(StorageError::invalid_document(
                    "_id must hold a record id",
                ))
            }
        };
        let payload = encode(&document)?;

        let mut collections = self.collections.write();
        let state = collections
            .entry(collection.to_string())
            .or_insert_with(CollectionState::new);

        let keys = state.index_keys(&document);
        for (index, key) in state.indexes.iter().zip(&keys) {
            if let Some(key) = key {
                if index.conflicts(key, None) {
                    return Err(StorageError::DuplicateKey {
                        collection: collection.to_string(),
                        index: index.spec().name.clone(),
                    });
                }
            }
        }

        for (index, key) in state.indexes.iter_mut().zip(keys) {
            if let Some(key) = key {
                index.insert(key, id);
            }
        }
        state.positions.insert(id, state.rows.len());
        state.rows.push(Row { id, payload });

        Ok(id)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>> {
        filter.validate()?;
        if let Some(sort) = &options.sort {
            sort.validate()?;
        }

        let collections = self.collections.read();
        let Some(state) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut docs: Vec<Document> = state
            .matching(filter)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        drop(collections);

        if let Some(sort) = &options.sort {
            // Stable: ties keep insertion order.
            docs.sort_by(|a, b| sort.compare(a, b));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(docs
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &options.projection {
                Some(fields) => doc.project(fields),
                None => doc,
            })
            .collect())
    }

    fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        filter.validate()?;
        let collections = self.collections.read();
        let Some(state) = collections.get(collection) else {
            return Ok(0);
        };
        Ok(state.matching(filter)?.len() as u64)
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StorageResult<u64> {
        filter.validate()?;
        update.validate()?;
        for (field, value) in update.assignments() {
            if field == ID_FIELD {
                return Err(StorageError::invalid_query("_id cannot be updated"));
            }
            validate_key(field)?;
            validate_value(value)?;
        }

        let mut collections = self.collections.write();
        let Some(state) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut changes = Vec::new();
        for (position, mut doc) in state.matching(filter)? {
            let old_keys = state.index_keys(&doc);
            if !update.apply(&mut doc) {
                continue;
            }
            changes.push(PendingChange {
                position,
                id: state.rows[position].id,
                payload: encode(&doc)?,
                old_keys,
                new_keys: state.index_keys(&doc),
            });
        }

        // Check unique indexes against a scratch copy so a failure changes nothing.
        for (i, index) in state.indexes.iter().enumerate() {
            if !index.spec().unique || changes.iter().all(|c| c.old_keys[i] == c.new_keys[i]) {
                continue;
            }
            let mut scratch = index.clone();
            for change in &changes {
                if let Some(key) = &change.old_keys[i] {
                    scratch.remove(key, change.id);
                }
            }
            for change in &changes {
                if let Some(key) = &change.new_keys[i] {
                    if scratch.conflicts(key, None) {
                        return Err(StorageError::DuplicateKey {
                            collection: collection.to_string(),
                            index: index.spec().name.clone(),
                        });
                    }
                    scratch.insert(key.clone(), change.id);
                }
            }
        }

        let changed = changes.len() as u64;
        for change in changes {
            for (i, index) in state.indexes.iter_mut().enumerate() {
                if change.old_keys[i] == change.new_keys[i] {
                    continue;
                }
                if let Some(key) = &change.old_keys[i] {
                    index.remove(key, change.id);
                }
                if let Some(key) = &change.new_keys[i] {
                    index.insert(key.clone(), change.id);
                }
            }
            state.rows[change.position].payload = change.payload;
        }

        Ok(changed)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> StorageResult<()> {
        spec.validate()?;

        let mut collections = self.collections.write();
        let state = collections
            .entry(collection.to_string())
            .or_insert_with(CollectionState::new);

        if let Some(existing) = state.indexes.iter().find(|i| i.spec().name == spec.name) {
            if existing.spec() == spec {
                return Ok(());
            }
            return Err(StorageError::IndexConflict {
                collection: collection.to_string(),
                name: spec.name.clone(),
            });
        }

        let mut index = IndexState::new(spec.clone());
        for row in &state.rows {
            let doc = decode(&row.payload)?;
            if let Some(key) = index.key_for(&doc) {
                if index.conflicts(&key, None) {
                    return Err(StorageError::DuplicateKey {
                        collection: collection.to_string(),
                        index: spec.name.clone(),
                    });
                }
                index.insert(key, row.id);
            }
        }
        state.indexes.push(index);

        Ok(())
    }

    fn list_indexes(&self, collection: &str) -> StorageResult<Vec<IndexSpec>> {
        let collections = self.collections.read();
        Ok(match collections.get(collection) {
            Some(state) => state.indexes.iter().map(|i| i.spec().clone()).collect(),
            None => vec![IndexSpec::id_index()],
        })
    }
}

fn encode(doc: &Document) -> StorageResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(doc, &mut payload).map_err(|e| StorageError::Codec(e.to_string()))?;
    Ok(payload)
}

fn decode(payload: &[u8]) -> StorageResult<Document> {
    ciborium::from_reader(payload).map_err(|e| StorageError::Codec(e.to_string()))
}

fn validate_document(doc: &Document) -> StorageResult<()> {
    for (key, value) in doc {
        validate_key(key)?;
        validate_value(value)?;
    }
    Ok(())
}

/// Text keys may not be empty, contain `.`, or start with `$`.
fn validate_key(key: &str) -> StorageResult<()> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.contains('.') {
        "key contains '.'"
    } else if key.starts_with('$') {
        "key starts with '$'"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

fn validate_value(value: &Value) -> StorageResult<()> {
    match value {
        Value::Map(pairs) => {
            for (key, nested) in pairs {
                if let Value::Text(key) = key {
                    validate_key(key)?;
                }
                validate_value(nested)?;
            }
            Ok(())
        }
        Value::Array(items) | Value::Set(items) => items.iter().try_for_each(validate_value),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Sort, SortOrder};

    fn version_index() -> IndexSpec {
        IndexSpec::new("index_unique_version")
            .key("model_id", SortOrder::Ascending)
            .key("version", SortOrder::Ascending)
            .unique()
    }

    fn row(model_id: &str, version: i64) -> Document {
        Document::new()
            .with("model_id", model_id)
            .with("version", version)
            .with("is_latest", true)
    }

    #[test]
    fn insert_assigns_id() {
        let store = InMemoryStore::new();
        let id = store.insert("c", Document::new().with("a", 1)).unwrap();
        let doc = store
            .find_one("c", &Filter::new().eq(ID_FIELD, id))
            .unwrap()
            .unwrap();
        assert_eq!(doc.id(), Some(id));
        assert_eq!(store.len("c"), 1);
    }

    #[test]
    fn insert_keeps_supplied_id() {
        let store = InMemoryStore::new();
        let id = RecordId::new();
        let assigned = store
            .insert("c", Document::new().with(ID_FIELD, id))
            .unwrap();
        assert_eq!(assigned, id);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = InMemoryStore::new();
        let id = RecordId::new();
        store.insert("c", Document::new().with(ID_FIELD, id)).unwrap();
        let err = store
            .insert("c", Document::new().with(ID_FIELD, id))
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.len("c"), 1);
    }

    #[test]
    fn non_id_value_in_id_field_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .insert("c", Document::new().with(ID_FIELD, "abc"))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidDocument(_)));
    }

    #[test]
    fn unique_compound_index_rejects_duplicates() {
        let store = InMemoryStore::new();
        store.create_index("c", &version_index()).unwrap();
        store.insert("c", row("m", 1)).unwrap();
        store.insert("c", row("m", 2)).unwrap();
        store.insert("c", row("other", 1)).unwrap();

        let err = store.insert("c", row("m", 2)).unwrap_err();
        assert_eq!(
            err,
            StorageError::DuplicateKey {
                collection: "c".into(),
                index: "index_unique_version".into(),
            }
        );
        assert_eq!(store.len("c"), 3);
    }

    #[test]
    fn creating_unique_index_over_duplicates_fails() {
        let store = InMemoryStore::new();
        store.insert("c", row("m", 1)).unwrap();
        store.insert("c", row("m", 1)).unwrap();
        assert!(store.create_index("c", &version_index()).unwrap_err().is_duplicate_key());
        assert_eq!(store.list_indexes("c").unwrap().len(), 1);
    }

    #[test]
    fn create_index_is_idempotent() {
        let store = InMemoryStore::new();
        store.create_index("c", &version_index()).unwrap();
        store.create_index("c", &version_index()).unwrap();
        assert_eq!(store.list_indexes("c").unwrap().len(), 2);

        let reshaped = IndexSpec::new("index_unique_version").key("model_id", SortOrder::Ascending);
        assert!(matches!(
            store.create_index("c", &reshaped),
            Err(StorageError::IndexConflict { .. })
        ));
    }

    #[test]
    fn partial_index_only_covers_matching_rows() {
        let store = InMemoryStore::new();
        let spec = IndexSpec::new("index_latest")
            .key("is_latest", SortOrder::Descending)
            .partial(Filter::new().eq("is_latest", true));
        store.create_index("c", &spec).unwrap();

        store.insert("c", row("a", 1)).unwrap();
        store.insert("c", row("b", 1)).unwrap();
        assert_eq!(store.index_entry_count("c", "index_latest"), Some(2));

        let changed = store
            .update_many(
                "c",
                &Filter::new().eq("model_id", "a"),
                &Update::set("is_latest", false),
            )
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(store.index_entry_count("c", "index_latest"), Some(1));

        let latest = store
            .find("c", &Filter::new().eq("is_latest", true), &FindOptions::new())
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].get_str("model_id"), Some("b"));
    }

    #[test]
    fn dotted_and_dollar_keys_are_rejected() {
        let store = InMemoryStore::new();
        let nested = Value::text_map([("a.b", Value::from(1))]);
        let err = store
            .insert("c", Document::new().with("data", nested))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey { .. }));

        let deep = Value::Array(vec![Value::text_map([("$set", Value::Null)])]);
        assert!(store.insert("c", Document::new().with("data", deep)).is_err());

        let non_text = Value::Map(vec![(Value::Integer(1), Value::Null)]);
        assert!(store.insert("c", Document::new().with("data", non_text)).is_ok());
    }

    #[test]
    fn find_sorts_skips_limits_and_projects() {
        let store = InMemoryStore::new();
        for v in 1..=5 {
            store.insert("c", row("m", v).with("extra", "x")).unwrap();
        }
        let options = FindOptions::new()
            .sort(Sort::descending("version"))
            .skip(1)
            .limit(2)
            .projection(["version"]);
        let docs = store.find("c", &Filter::new(), &options).unwrap();

        let versions: Vec<_> = docs.iter().filter_map(|d| d.get_i64("version")).collect();
        assert_eq!(versions, vec![4, 3]);
        assert!(docs.iter().all(|d| !d.contains_key("extra") && d.id().is_some()));
    }

    #[test]
    fn reads_return_independent_copies() {
        let store = InMemoryStore::new();
        store.insert("c", row("m", 1)).unwrap();
        let mut first = store.find_one("c", &Filter::new()).unwrap().unwrap();
        first.insert("version", 99);
        let second = store.find_one("c", &Filter::new()).unwrap().unwrap();
        assert_eq!(second.get_i64("version"), Some(1));
    }

    #[test]
    fn update_violating_unique_index_changes_nothing() {
        let store = InMemoryStore::new();
        store.create_index("c", &version_index()).unwrap();
        store.insert("c", row("m", 1)).unwrap();
        store.insert("c", row("m", 2)).unwrap();

        let err = store
            .update_many("c", &Filter::new(), &Update::set("version", 7))
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.count("c", &Filter::new().eq("version", 7)).unwrap(), 0);
    }

    #[test]
    fn update_rejects_id_and_dotted_fields() {
        let store = InMemoryStore::new();
        store.insert("c", row("m", 1)).unwrap();
        assert!(store
            .update_many("c", &Filter::new(), &Update::set(ID_FIELD, RecordId::new()))
            .is_err());
        assert!(store
            .update_many("c", &Filter::new(), &Update::set("a.b", 1))
            .is_err());
    }

    #[test]
    fn missing_collection_is_empty() {
        let store = InMemoryStore::new();
        assert_eq!(store.count("nope", &Filter::new()).unwrap(), 0);
        assert!(store.find_one("nope", &Filter::new()).unwrap().is_none());
        assert_eq!(
            store
                .update_many("nope", &Filter::new(), &Update::set("a", 1))
                .unwrap(),
            0
        );
        assert_eq!(store.list_indexes("nope").unwrap().len(), 1);
        assert!(store.collection_names().is_empty());
    }

    #[test]
    fn id_lookup_uses_index() {
        let store = InMemoryStore::new();
        let ids: Vec<_> = (0..10)
            .map(|v| store.insert("c", row("m", v)).unwrap())
            .collect();
        let doc = store
            .find_one("c", &Filter::new().eq(ID_FIELD, ids[7]))
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_i64("version"), Some(7));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn unique_index_admits_each_pair_once(
                pairs in prop::collection::vec(("[ab]", 0i64..4), 0..40)
            ) {
                let store = InMemoryStore::new();
                store.create_index("c", &version_index()).unwrap();

                let mut seen = BTreeSet::new();
                for (model_id, version) in &pairs {
                    let inserted = store.insert("c", row(model_id, *version));
                    prop_assert_eq!(inserted.is_ok(), seen.insert((model_id.clone(), *version)));
                }
                prop_assert_eq!(store.len("c"), seen.len());
                prop_assert_eq!(
                    store.index_entry_count("c", "index_unique_version"),
                    Some(seen.len())
                );
            }

            #[test]
            fn failed_update_changes_nothing(count in 1i64..10) {
                let store = InMemoryStore::new();
                store.create_index("c", &version_index()).unwrap();
                for v in 0..count {
                    store.insert("c", row("m", v)).unwrap();
                }
                let before = store.find("c", &Filter::new(), &FindOptions::new()).unwrap();

                // Collapsing every version onto one key must fail when count > 1.
                let result = store.update_many("c", &Filter::new(), &Update::set("version", 0));
                prop_assert_eq!(result.is_err(), count > 1);
                if count > 1 {
                    let after = store.find("c", &Filter::new(), &FindOptions::new()).unwrap();
                    prop_assert_eq!(after, before);
                }
            }
        }
    }
}
