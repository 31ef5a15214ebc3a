//! Typed access to the versions of one model type.

use crate::config::{Config, LatestDemotion};
use crate::error::{CoreError, CoreResult};
use crate::model::Model;
use crate::pagination::{PaginatedResult, Pagination};
use crate::schema::{fields, version_value};
use crate::timeutils::current_unix_timestamp;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use verdoc_storage::{
    Cursor, Document, DocumentStore, Filter, FindOptions, RecordId, Sort, StorageError, Update,
    Value,
};

/// Handle on the collection of a model type.
///
/// Every save inserts a new row and then demotes older rows, so at most
/// one row per logical id carries the latest flag once writers settle.
///
/// # Example
///
/// ```rust,ignore
/// let notes = registry.collection::<Note>()?;
/// let mut note = Note::new("draft");
/// notes.save(&mut note)?;          // version 1
/// note.title = "final".into();
/// notes.save(&mut note)?;          // version 2, version 1 demoted
/// notes.delete(&mut note)?;        // version 3, deleted
/// ```
pub struct VersionedCollection<T: Model> {
    store: Arc<dyn DocumentStore>,
    config: Config,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Model> VersionedCollection<T> {
    /// Creates a handle over `store`.
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            store,
            config,
            _marker: PhantomData,
        }
    }

    /// Name of the underlying collection.
    pub fn collection_name(&self) -> &'static str {
        T::COLLECTION_NAME
    }

    /// Name of the model type.
    pub fn model_name(&self) -> &'static str {
        T::MODEL_NAME
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads the latest version of one logical id.
    pub fn find_latest_by_model_id(&self, model_id: &str) -> CoreResult<Option<T>> {
        let filter = latest_baseline().eq(fields::MODEL_ID, model_id);
        self.find_one(&filter)
    }

    /// Loads the latest versions of several logical ids.
    ///
    /// Unknown ids are skipped; the result is in collection order.
    pub fn find_latest_by_model_ids<S: AsRef<str>>(&self, model_ids: &[S]) -> CoreResult<Vec<T>> {
        if model_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = latest_baseline().is_in(
            fields::MODEL_ID,
            model_ids.iter().map(|id| Value::from(id.as_ref())),
        );
        self.find_many(&filter, &FindOptions::new())
    }

    /// Loads one specific version by record id given as text.
    ///
    /// Text that is not a well-formed record id finds nothing.
    pub fn find_by_id(&self, id: &str) -> CoreResult<Option<T>> {
        match RecordId::parse(id) {
            Some(id) => self.find_by_record_id(id),
            None => {
                debug!(collection = T::COLLECTION_NAME, id, "Malformed record id");
                Ok(None)
            }
        }
    }

    /// Loads one specific version by record id.
    pub fn find_by_record_id(&self, id: RecordId) -> CoreResult<Option<T>> {
        self.find_one(&Filter::new().eq(fields::ID, id))
    }

    /// Loads one version of a logical id, deleted or not.
    pub fn find_version(&self, model_id: &str, version: u64) -> CoreResult<Option<T>> {
        let filter = Filter::new()
            .eq(fields::MODEL_ID, model_id)
            .eq(fields::VERSION, version_value(version)?);
        self.find_one(&filter)
    }

    /// Lazy query over raw stored rows.
    pub fn list_raw(
        &self,
        filter: Filter,
        projection: Option<Vec<String>>,
        sort: Option<Sort>,
    ) -> Cursor<'_> {
        let mut cursor = Cursor::new(self.store.as_ref(), T::COLLECTION_NAME, filter);
        if let Some(fields) = projection {
            cursor = cursor.projection(fields);
        }
        if let Some(sort) = sort {
            cursor = cursor.sort(sort);
        }
        cursor
    }

    /// One page of models matching `filter`.
    ///
    /// A projection must keep the common fields and whatever
    /// [`Model::load_fields`] requires.
    pub fn list_paginated(
        &self,
        filter: Filter,
        pagination: &Pagination,
        projection: Option<Vec<String>>,
        sort: Option<Sort>,
    ) -> CoreResult<PaginatedResult<T>> {
        let cursor = self.list_raw(filter, projection, sort);
        PaginatedResult::fetch(cursor, pagination, &self.config)
    }

    /// Latest, non-deleted versions.
    ///
    /// The caller filter may narrow the listing but never override the
    /// latest or deleted conditions.
    pub fn list_latest(&self, pagination: &Pagination) -> CoreResult<PaginatedResult<T>> {
        let filter = pagination
            .filter
            .clone()
            .overlay(latest_baseline().eq(fields::TIME_DELETED, 0));
        let sort = pagination.sort_by.clone().unwrap_or_else(T::default_sort);
        self.list_paginated(filter, pagination, None, Some(sort))
    }

    /// Every version of one logical id, deleted ones included, newest first
    /// unless the caller sorts otherwise.
    pub fn list_versions(
        &self,
        model_id: &str,
        pagination: &Pagination,
    ) -> CoreResult<PaginatedResult<T>> {
        let filter = pagination
            .filter
            .clone()
            .overlay(Filter::new().eq(fields::MODEL_ID, model_id));
        let sort = pagination
            .sort_by
            .clone()
            .unwrap_or_else(|| Sort::descending(fields::VERSION));
        self.list_paginated(filter, pagination, None, Some(sort))
    }

    /// Counts latest, non-deleted versions matching `filter`.
    pub fn count_latest(&self, filter: Filter) -> CoreResult<u64> {
        let filter = filter.overlay(latest_baseline().eq(fields::TIME_DELETED, 0));
        Ok(self.store.count(T::COLLECTION_NAME, &filter)?)
    }

    /// Writes the model as a new version.
    ///
    /// On success the model reflects the stored version and the record id
    /// of the new row is returned.
    ///
    /// # Errors
    ///
    /// - [`CoreError::CannotUpdateDeleted`] if the model is deleted
    /// - [`CoreError::UniqueConstraintViolation`] if another writer created
    ///   the same version first; reload and retry
    pub fn save(&self, model: &mut T) -> CoreResult<RecordId> {
        model.check_constraints()?;
        let structure = model.make_db_document()?;
        self.insert_version(model, structure)
    }

    /// Writes a caller-built document as the model's next version.
    ///
    /// The version, logical id, latest flag, and creation time are stamped
    /// as in [`Self::save`]. Start from [`Model::make_db_document`] so the
    /// stored row can be loaded back.
    pub fn save_structure(&self, model: &mut T, structure: Document) -> CoreResult<RecordId> {
        model.check_constraints()?;
        self.insert_version(model, structure)
    }

    /// Writes a deleted version of the model.
    pub fn delete(&self, model: &mut T) -> CoreResult<RecordId> {
        model.check_constraints()?;
        let mut structure = model.make_db_document()?;
        structure.insert(fields::TIME_DELETED, current_unix_timestamp());
        self.insert_version(model, structure)
    }

    fn insert_version(&self, model: &mut T, mut structure: Document) -> CoreResult<RecordId> {
        let meta = model.meta();
        let version = meta.version + 1;
        structure.insert(fields::VERSION, version_value(version)?);
        if structure.get(fields::MODEL_ID).map_or(true, Value::is_null) {
            let model_id = meta
                .model_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            structure.insert(fields::MODEL_ID, model_id);
        }
        structure.insert(fields::IS_LATEST, true);
        structure.insert(fields::TIME_CREATED, current_unix_timestamp());

        let model_id = structure
            .get_str(fields::MODEL_ID)
            .ok_or_else(|| CoreError::invalid_document("model_id is not text"))?
            .to_string();

        let id = match self.store.insert(T::COLLECTION_NAME, structure.clone()) {
            Ok(id) => id,
            Err(StorageError::DuplicateKey { index, .. }) => {
                warn!(
                    collection = T::COLLECTION_NAME,
                    model_id = %model_id,
                    version,
                    index = %index,
                    "Version already exists"
                );
                return Err(CoreError::UniqueConstraintViolation {
                    collection: T::COLLECTION_NAME,
                    model_id,
                    version,
                    index,
                });
            }
            Err(err) => return Err(err.into()),
        };
        structure.insert(fields::ID, id);

        self.demote_others(&model_id, id, version)?;
        model.load_document(&structure)?;

        debug!(
            collection = T::COLLECTION_NAME,
            model_id = %model_id,
            version,
            id = %id,
            "Saved version"
        );
        Ok(id)
    }

    fn demote_others(&self, model_id: &str, own: RecordId, version: u64) -> CoreResult<()> {
        let demote = Update::set(fields::IS_LATEST, false);
        let others = latest_baseline()
            .eq(fields::MODEL_ID, model_id)
            .ne(fields::ID, own);

        match self.config.demotion {
            LatestDemotion::Unconditional => {
                self.store.update_many(T::COLLECTION_NAME, &others, &demote)?;
            }
            LatestDemotion::Conditional => {
                let version = version_value(version)?;
                let older = others.lt(fields::VERSION, version.clone());
                self.store.update_many(T::COLLECTION_NAME, &older, &demote)?;

                let newer = Filter::new()
                    .eq(fields::MODEL_ID, model_id)
                    .gt(fields::VERSION, version);
                if self.store.count(T::COLLECTION_NAME, &newer)? > 0 {
                    debug!(
                        collection = T::COLLECTION_NAME,
                        model_id, "Newer version exists, demoting own row"
                    );
                    self.store.update_many(
                        T::COLLECTION_NAME,
                        &Filter::new().eq(fields::ID, own),
                        &demote,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn find_one(&self, filter: &Filter) -> CoreResult<Option<T>> {
        self.store
            .find_one(T::COLLECTION_NAME, filter)?
            .map(|document| T::from_document(&document))
            .transpose()
    }

    fn find_many(&self, filter: &Filter, options: &FindOptions) -> CoreResult<Vec<T>> {
        self.store
            .find(T::COLLECTION_NAME, filter, options)?
            .iter()
            .map(T::from_document)
            .collect()
    }
}

fn latest_baseline() -> Filter {
    Filter::new().eq(fields::IS_LATEST, true)
}

impl<T: Model> Clone for VersionedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Model> fmt::Debug for VersionedCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedCollection")
            .field("collection", &T::COLLECTION_NAME)
            .field("model", &T::MODEL_NAME)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
