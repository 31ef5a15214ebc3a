//! Document store trait definition.

use crate::document::Document;
use crate::error::StorageResult;
use crate::id::RecordId;
use crate::index::IndexSpec;
use crate::query::{Filter, FindOptions, Update};

/// A document store holding named collections of documents.
///
/// This is the full contract the versioning layer needs from a store.
///
/// # Invariants
///
/// - `insert` is atomic for a single document and fails with
///   [`StorageError::DuplicateKey`](crate::StorageError::DuplicateKey) if
///   any unique index (including the implicit one on `_id`) would hold the
///   same key twice
/// - `update_many` is atomic with respect to every other operation on the
///   same collection
/// - Collections are created on first use
/// - Stores must be `Send + Sync` so one handle can serve a whole process
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - in-process reference store
pub trait DocumentStore: Send + Sync {
    /// Inserts a document, assigning `_id` if absent.
    ///
    /// Returns the record identifier of the stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A unique index would be violated
    /// - A text key contains `.` or starts with `$`
    fn insert(&self, collection: &str, document: Document) -> StorageResult<RecordId>;

    /// Finds matching documents.
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>>;

    /// Finds the first matching document in insertion order.
    fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        Ok(self
            .find(collection, filter, &FindOptions::new().limit(1))?
            .into_iter()
            .next())
    }

    /// Counts matching documents.
    fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64>;

    /// Applies `update` to every matching document.
    ///
    /// Returns the number of documents that changed.
    ///
    /// # Errors
    ///
    /// Returns an error (and changes nothing) if the update would violate
    /// a unique index.
    fn update_many(&self, collection: &str, filter: &Filter, update: &Update)
        -> StorageResult<u64>;

    /// Creates an index if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An index with the same name but different options exists
    /// - Existing documents violate a new unique index
    fn create_index(&self, collection: &str, spec: &IndexSpec) -> StorageResult<()>;

    /// Lists the indexes of a collection, including the implicit `_id` index.
    fn list_indexes(&self, collection: &str) -> StorageResult<Vec<IndexSpec>>;
}
