//! Configure-once registry of model types.

use crate::collection::VersionedCollection;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::ensure_indexes;
use crate::model::Model;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use verdoc_storage::DocumentStore;

/// A model type known to a registry.
#[derive(Clone)]
pub struct RegisteredModel {
    /// Model type name.
    pub model_name: &'static str,
    /// Collection name.
    pub collection_name: &'static str,
    type_id: TypeId,
    ensure: fn(&dyn DocumentStore) -> CoreResult<()>,
    indexed: bool,
}

impl RegisteredModel {
    /// Returns true once the model's indexes exist in the store.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }
}

impl fmt::Debug for RegisteredModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredModel")
            .field("model_name", &self.model_name)
            .field("collection_name", &self.collection_name)
            .field("indexed", &self.indexed)
            .finish_non_exhaustive()
    }
}

/// Binds model types to one store.
///
/// The store is set exactly once with [`ModelRegistry::configure`].
/// Model types are registered explicitly; collection handles are only
/// handed out for registered types whose indexes have been ensured, so
/// the unique version index is in place before any write.
///
/// # Example
///
/// ```rust,ignore
/// let registry = ModelRegistry::new(Config::default());
/// registry.configure(Arc::new(InMemoryStore::new()))?;
/// registry.register::<Note>();
/// registry.ensure_all_indexes()?;
/// let notes = registry.collection::<Note>()?;
/// ```
pub struct ModelRegistry {
    config: Config,
    store: OnceCell<Arc<dyn DocumentStore>>,
    models: RwLock<Vec<RegisteredModel>>,
}

impl ModelRegistry {
    /// Creates an unconfigured registry.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: OnceCell::new(),
            models: RwLock::new(Vec::new()),
        }
    }

    /// Binds the registry to a store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyConfigured`] on a second call.
    pub fn configure(&self, store: Arc<dyn DocumentStore>) -> CoreResult<()> {
        self.store
            .set(store)
            .map_err(|_| CoreError::AlreadyConfigured)?;
        info!("Model registry configured");
        Ok(())
    }

    /// Returns true once a store is bound.
    pub fn is_configured(&self) -> bool {
        self.store.get().is_some()
    }

    /// The bound store.
    pub fn store(&self) -> CoreResult<Arc<dyn DocumentStore>> {
        self.store.get().cloned().ok_or(CoreError::NotConfigured)
    }

    /// Configuration handed to collections.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a model type. Returns false if it was already registered.
    pub fn register<T: Model>(&self) -> bool {
        let mut models = self.models.write();
        if models.iter().any(|m| m.type_id == TypeId::of::<T>()) {
            return false;
        }
        models.push(RegisteredModel {
            model_name: T::MODEL_NAME,
            collection_name: T::COLLECTION_NAME,
            type_id: TypeId::of::<T>(),
            ensure: ensure_indexes::<T>,
            indexed: false,
        });
        true
    }

    /// Returns true if `T` is registered.
    pub fn is_registered<T: Model>(&self) -> bool {
        self.models
            .read()
            .iter()
            .any(|m| m.type_id == TypeId::of::<T>())
    }

    /// Registered model types, in registration order.
    pub fn registered(&self) -> Vec<RegisteredModel> {
        self.models.read().clone()
    }

    /// Creates the indexes of every registered model type.
    ///
    /// Types registered afterwards need another call before their
    /// collections are handed out. Returns the number of model types
    /// processed.
    pub fn ensure_all_indexes(&self) -> CoreResult<usize> {
        let store = self.store()?;
        let models = self.registered();
        for model in &models {
            (model.ensure)(store.as_ref())?;
        }

        let mut registered = self.models.write();
        for entry in registered.iter_mut() {
            if models.iter().any(|m| m.type_id == entry.type_id) {
                entry.indexed = true;
            }
        }
        info!(models = models.len(), "Ensured indexes");
        Ok(models.len())
    }

    /// Collection handle for a registered model type.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ModelNotRegistered`] if `T` was never registered
    /// - [`CoreError::NotConfigured`] if no store is bound
    /// - [`CoreError::IndexesNotEnsured`] if `T` was registered after the
    ///   last [`ModelRegistry::ensure_all_indexes`]
    pub fn collection<T: Model>(&self) -> CoreResult<VersionedCollection<T>> {
        let indexed = self
            .models
            .read()
            .iter()
            .find(|m| m.type_id == TypeId::of::<T>())
            .map(|m| m.indexed);
        let Some(indexed) = indexed else {
            return Err(CoreError::ModelNotRegistered {
                model: T::MODEL_NAME,
            });
        };
        let store = self.store()?;
        if !indexed {
            return Err(CoreError::IndexesNotEnsured {
                model: T::MODEL_NAME,
            });
        }
        Ok(VersionedCollection::new(store, self.config.clone()))
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("config", &self.config)
            .field("configured", &self.is_configured())
            .field("models", &*self.models.read())
            .finish()
    }
}
