//! Indexes every versioned collection needs.

use crate::error::CoreResult;
use crate::model::Model;
use crate::schema::fields;
use tracing::debug;
use verdoc_storage::{DocumentStore, Filter, IndexSpec, SortOrder};

/// Partial index over latest versions.
pub const LATEST_INDEX: &str = "index_latest";

/// Unique index over (model_id, version).
pub const UNIQUE_VERSION_INDEX: &str = "index_unique_version";

/// Index over `is_latest`, covering only rows where it is true.
pub fn latest_index() -> IndexSpec {
    IndexSpec::new(LATEST_INDEX)
        .key(fields::IS_LATEST, SortOrder::Descending)
        .partial(Filter::new().eq(fields::IS_LATEST, true))
}

/// Unique index that turns concurrent same-version saves into conflicts.
pub fn unique_version_index() -> IndexSpec {
    IndexSpec::new(UNIQUE_VERSION_INDEX)
        .key(fields::MODEL_ID, SortOrder::Ascending)
        .key(fields::VERSION, SortOrder::Ascending)
        .unique()
}

/// Every index for a model type, versioning indexes first.
pub fn model_indexes<T: Model>() -> Vec<IndexSpec> {
    let mut specs = vec![latest_index(), unique_version_index()];
    specs.extend(T::extra_indexes());
    specs
}

/// Creates the indexes of a model type. Safe to call repeatedly.
///
/// Abstract types (empty collection name) are skipped.
pub fn ensure_indexes<T: Model>(store: &dyn DocumentStore) -> CoreResult<()> {
    if T::COLLECTION_NAME.is_empty() {
        debug!(model = T::MODEL_NAME, "Skipping indexes for abstract model");
        return Ok(());
    }
    for spec in model_indexes::<T>() {
        store.create_index(T::COLLECTION_NAME, &spec)?;
        debug!(
            collection = T::COLLECTION_NAME,
            index = %spec.name,
            "Ensured index"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::Note;
    use verdoc_storage::{Document, InMemoryStore, StorageError};

    #[test]
    fn creates_versioning_indexes_idempotently() {
        let store = InMemoryStore::new();
        ensure_indexes::<Note>(&store).unwrap();
        ensure_indexes::<Note>(&store).unwrap();

        let names: Vec<String> = store
            .list_indexes(Note::COLLECTION_NAME)
            .unwrap()
            .into_iter()
            .map(|spec| spec.name)
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().any(|n| n == LATEST_INDEX));
        assert!(names.iter().any(|n| n == UNIQUE_VERSION_INDEX));
    }

    #[test]
    fn unique_version_index_rejects_duplicates() {
        let store = InMemoryStore::new();
        ensure_indexes::<Note>(&store).unwrap();
        let row = || Document::new().with(fields::MODEL_ID, "m").with(fields::VERSION, 1);

        store.insert(Note::COLLECTION_NAME, row()).unwrap();
        let err = store.insert(Note::COLLECTION_NAME, row()).unwrap_err();
        assert_eq!(
            err,
            StorageError::DuplicateKey {
                collection: Note::COLLECTION_NAME.into(),
                index: UNIQUE_VERSION_INDEX.into(),
            }
        );
    }

    #[test]
    fn latest_index_is_partial() {
        let spec = latest_index();
        assert!(!spec.unique);
        let partial = spec.partial_filter.unwrap();
        assert!(partial.matches(&Document::new().with(fields::IS_LATEST, true)));
        assert!(!partial.matches(&Document::new().with(fields::IS_LATEST, false)));
    }
}
