//! The trait implemented by every versioned entity type.

use crate::error::{CoreError, CoreResult};
use crate::reference::ModelRef;
use crate::schema::{fields, ApiDocument, VersionMeta};
use verdoc_storage::{Document, IndexSpec, Sort};

/// A versioned entity type.
///
/// Implementors own their specific fields and expose the common version
/// bookkeeping through [`Model::meta`]. Every save writes a new stored
/// version; nothing is updated in place except the latest flag.
///
/// # Example
///
/// ```rust
/// use verdoc_core::{CoreResult, Model, VersionMeta};
/// use verdoc_storage::Document;
///
/// #[derive(Debug, Default)]
/// struct Note {
///     meta: VersionMeta,
///     title: String,
/// }
///
/// impl Model for Note {
///     const COLLECTION_NAME: &'static str = "notes";
///     const MODEL_NAME: &'static str = "Note";
///
///     fn meta(&self) -> &VersionMeta {
///         &self.meta
///     }
///
///     fn meta_mut(&mut self) -> &mut VersionMeta {
///         &mut self.meta
///     }
///
///     fn db_fields(&self) -> CoreResult<Document> {
///         Ok(Document::new().with("title", self.title.as_str()))
///     }
///
///     fn api_fields(&self) -> serde_json::Value {
///         serde_json::json!({ "title": self.title })
///     }
///
///     fn load_fields(&mut self, document: &Document) -> CoreResult<()> {
///         self.title = document.get_str("title").unwrap_or_default().to_string();
///         Ok(())
///     }
/// }
///
/// let note = Note::default();
/// assert_eq!(note.make_db_document().unwrap().get_str("title"), Some(""));
/// ```
pub trait Model: Default + Send + Sync + 'static {
    /// Collection holding every version of this type.
    ///
    /// An empty name marks an abstract type that gets no indexes.
    const COLLECTION_NAME: &'static str;

    /// Type name reported in API documents.
    const MODEL_NAME: &'static str;

    /// Version bookkeeping of this instance.
    fn meta(&self) -> &VersionMeta;

    /// Mutable version bookkeeping.
    fn meta_mut(&mut self) -> &mut VersionMeta;

    /// Type-specific stored fields.
    ///
    /// Text keys must not contain `.`; escape user-supplied maps with
    /// [`crate::escape::dot_escape`].
    fn db_fields(&self) -> CoreResult<Document>;

    /// Type-specific API fields.
    fn api_fields(&self) -> serde_json::Value;

    /// Reads type-specific fields back from a stored version.
    fn load_fields(&mut self, document: &Document) -> CoreResult<()>;

    /// Sort order of [`crate::VersionedCollection::list_latest`] when the
    /// caller gives none.
    fn default_sort() -> Sort {
        Sort::ascending(fields::MODEL_ID)
    }

    /// Type-specific indexes created next to the versioning indexes.
    fn extra_indexes() -> Vec<IndexSpec> {
        Vec::new()
    }

    /// Verifies the instance may be saved or deleted.
    fn check_constraints(&self) -> CoreResult<()> {
        if self.is_deleted() {
            return Err(CoreError::cannot_update_deleted(self.model_id()));
        }
        Ok(())
    }

    /// Logical id, if the instance was ever saved.
    fn model_id(&self) -> Option<&str> {
        self.meta().model_id.as_deref()
    }

    /// Version number of the loaded row.
    fn version(&self) -> u64 {
        self.meta().version
    }

    /// Returns true if the loaded version marks the entity deleted.
    fn is_deleted(&self) -> bool {
        self.meta().is_deleted()
    }

    /// Reference to whoever produced this version.
    fn initiator<U: Model>(&self) -> ModelRef<U> {
        ModelRef::new(self.meta().initiator_id.clone())
    }

    /// Full document for a new version: common fields, then specific ones.
    fn make_db_document(&self) -> CoreResult<Document> {
        let mut document = self.meta().base_document();
        document.extend(self.db_fields()?);
        Ok(document)
    }

    /// Replaces this instance's state with a stored version.
    fn load_document(&mut self, document: &Document) -> CoreResult<()> {
        let meta = VersionMeta::from_document(document)?;
        self.load_fields(document)?;
        *self.meta_mut() = meta;
        Ok(())
    }

    /// Builds an instance from a stored version.
    fn from_document(document: &Document) -> CoreResult<Self> {
        let mut model = Self::default();
        model.load_document(document)?;
        Ok(model)
    }

    /// API representation of this instance.
    fn to_api_document(&self) -> ApiDocument {
        let meta = self.meta();
        ApiDocument {
            data: self.api_fields(),
            model: Self::MODEL_NAME.to_string(),
            id: meta.model_id.clone().unwrap_or_default(),
            version: meta.version,
            time_updated: meta.time_created,
            time_deleted: meta.time_deleted,
            initiator_id: meta.initiator_id.clone(),
        }
    }

    /// One-line description for logs.
    fn describe(&self) -> String {
        format!("{}({})", Self::MODEL_NAME, self.meta())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use verdoc_storage::{RecordId, Value};

    #[derive(Debug, Default, Clone, PartialEq)]
    pub(crate) struct Note {
        pub(crate) meta: VersionMeta,
        pub(crate) title: String,
    }

    impl Note {
        pub(crate) fn new(title: &str) -> Self {
            Self {
                title: title.to_string(),
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
            Ok(Document::new().with("title", self.title.as_str()))
        }

        fn api_fields(&self) -> serde_json::Value {
            serde_json::json!({ "title": self.title })
        }

        fn load_fields(&mut self, document: &Document) -> CoreResult<()> {
            self.title = document
                .get_str("title")
                .ok_or_else(|| CoreError::invalid_document("missing title"))?
                .to_string();
            Ok(())
        }
    }

    #[test]
    fn db_document_merges_common_and_specific_fields() {
        let doc = Note::new("hello").make_db_document().unwrap();
        assert_eq!(doc.get_str("title"), Some("hello"));
        assert_eq!(doc.get_i64(fields::VERSION), Some(0));
        assert_eq!(doc.get(fields::MODEL_ID), Some(&Value::Null));
    }

    #[test]
    fn load_document_replaces_state() {
        let doc = Document::new()
            .with(fields::ID, RecordId::new())
            .with(fields::MODEL_ID, "m")
            .with(fields::VERSION, 4)
            .with(fields::TIME_CREATED, 10)
            .with(fields::TIME_DELETED, 0)
            .with("title", "loaded");
        let note = Note::from_document(&doc).unwrap();
        assert_eq!(note.title, "loaded");
        assert_eq!(note.model_id(), Some("m"));
        assert_eq!(note.version(), 4);
    }

    #[test]
    fn failed_load_keeps_meta() {
        let mut note = Note::new("kept");
        let doc = Document::new().with("title", "x");
        assert!(note.load_document(&doc).is_err());
        assert_eq!(note.meta, VersionMeta::default());
        assert_eq!(note.title, "kept");
    }

    #[test]
    fn deleted_models_fail_constraints() {
        let mut note = Note::new("gone");
        assert!(note.check_constraints().is_ok());
        note.meta.time_deleted = 5;
        assert!(matches!(
            note.check_constraints(),
            Err(CoreError::CannotUpdateDeleted { .. })
        ));
    }

    #[test]
    fn api_document_exposes_version_fields() {
        let mut note = Note::new("t");
        note.meta.model_id = Some("m".into());
        note.meta.version = 2;
        note.meta.time_created = 99;
        let api = note.to_api_document();
        assert_eq!(api.model, "Note");
        assert_eq!(api.id, "m");
        assert_eq!(api.version, 2);
        assert_eq!(api.time_updated, 99);
        assert_eq!(api.data["title"], "t");
        assert!(note.describe().starts_with("Note("));
    }
}
