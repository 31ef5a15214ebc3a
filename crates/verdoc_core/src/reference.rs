//! Lazy references between models.

use crate::collection::VersionedCollection;
use crate::error::CoreResult;
use crate::model::Model;
use std::fmt;
use std::marker::PhantomData;

/// A logical id pointing at another model.
///
/// Resolution always reads the current latest version; nothing is cached.
pub struct ModelRef<U: Model> {
    model_id: Option<String>,
    _marker: PhantomData<fn() -> U>,
}

impl<U: Model> ModelRef<U> {
    /// Creates a reference, possibly unset.
    pub fn new(model_id: Option<String>) -> Self {
        Self {
            model_id,
            _marker: PhantomData,
        }
    }

    /// The referenced logical id.
    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    /// Returns true if the reference points somewhere.
    pub fn is_set(&self) -> bool {
        self.model_id.is_some()
    }

    /// Loads the latest version of the referenced model.
    ///
    /// An unset reference resolves to `None` without touching the store.
    pub fn resolve(&self, collection: &VersionedCollection<U>) -> CoreResult<Option<U>> {
        match &self.model_id {
            Some(model_id) => collection.find_latest_by_model_id(model_id),
            None => Ok(None),
        }
    }
}

impl<U: Model> Clone for ModelRef<U> {
    fn clone(&self) -> Self {
        Self::new(self.model_id.clone())
    }
}

impl<U: Model> PartialEq for ModelRef<U> {
    fn eq(&self, other: &Self) -> bool {
        self.model_id == other.model_id
    }
}

impl<U: Model> fmt::Debug for ModelRef<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef")
            .field(&U::MODEL_NAME)
            .field(&self.model_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::tests::Note;
    use std::sync::Arc;
    use verdoc_storage::InMemoryStore;

    #[test]
    fn resolves_latest_version() {
        let notes =
            VersionedCollection::<Note>::new(Arc::new(InMemoryStore::new()), Config::default());
        let mut note = Note::new("v1");
        notes.save(&mut note).unwrap();
        let reference = ModelRef::<Note>::new(note.meta.model_id.clone());

        note.title = "v2".into();
        notes.save(&mut note).unwrap();

        let resolved = reference.resolve(&notes).unwrap().unwrap();
        assert_eq!(resolved.title, "v2");
        assert_eq!(resolved.meta.version, 2);
    }

    #[test]
    fn unset_and_dangling_references() {
        let notes =
            VersionedCollection::<Note>::new(Arc::new(InMemoryStore::new()), Config::default());
        assert!(ModelRef::<Note>::new(None).resolve(&notes).unwrap().is_none());

        let dangling = ModelRef::<Note>::new(Some("missing".into()));
        assert!(dangling.is_set());
        assert!(dangling.resolve(&notes).unwrap().is_none());
    }

    #[test]
    fn initiator_reference() {
        let mut note = Note::new("t");
        note.meta.initiator_id = Some("user-7".into());
        let initiator: ModelRef<Note> = note.initiator();
        assert_eq!(initiator.model_id(), Some("user-7"));
        assert_eq!(initiator.clone(), initiator);
    }
}
