//! Lazily composed query over a store.

use crate::document::Document;
use crate::error::StorageResult;
use crate::query::{Filter, FindOptions, Sort};
use crate::store::DocumentStore;

/// A query that has not been executed yet.
///
/// Sorting, skipping, limiting, and projection are recorded on the
/// cursor; nothing reaches the store until [`Cursor::count`] or
/// [`Cursor::fetch`] is called.
///
/// # Example
///
/// ```rust
/// use verdoc_storage::{Cursor, Document, DocumentStore, Filter, InMemoryStore, Sort};
///
/// let store = InMemoryStore::new();
/// for n in 0..5 {
///     store.insert("items", Document::new().with("n", n)).unwrap();
/// }
///
/// let cursor = Cursor::new(&store, "items", Filter::new().gte("n", 1))
///     .sort(Sort::descending("n"))
///     .limit(2);
/// assert_eq!(cursor.count().unwrap(), 4);
/// let page = cursor.fetch().unwrap();
/// assert_eq!(page[0].get_i64("n"), Some(4));
/// ```
pub struct Cursor<'a> {
    store: &'a dyn DocumentStore,
    collection: String,
    filter: Filter,
    options: FindOptions,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor over the matching documents of a collection.
    pub fn new(
        store: &'a dyn DocumentStore,
        collection: impl Into<String>,
        filter: Filter,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            filter,
            options: FindOptions::new(),
        }
    }

    /// Sets the result order.
    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.options.sort = Some(sort);
        self
    }

    /// Skips the first `n` matches.
    #[must_use]
    pub fn skip(mut self, n: u64) -> Self {
        self.options.skip = n;
        self
    }

    /// Returns at most `n` documents.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.options.limit = Some(n);
        self
    }

    /// Restricts returned fields.
    #[must_use]
    pub fn projection(mut self, fields: Vec<String>) -> Self {
        self.options.projection = Some(fields);
        self
    }

    /// The collection queried.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The filter applied.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// The recorded options.
    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Counts all matches, ignoring skip and limit.
    pub fn count(&self) -> StorageResult<u64> {
        self.store.count(&self.collection, &self.filter)
    }

    /// Executes the query.
    pub fn fetch(&self) -> StorageResult<Vec<Document>> {
        self.store.find(&self.collection, &self.filter, &self.options)
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &self.collection)
            .field("filter", &self.filter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
