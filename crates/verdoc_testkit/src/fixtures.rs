//! Test fixtures and registry helpers.
//!
//! Provides a ready-to-use registry over an in-memory store with the
//! sample models registered and indexed.

use crate::models::{Note, Profile};
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;
use verdoc_core::{Config, ModelRegistry, VersionedCollection};
use verdoc_storage::InMemoryStore;

static TRACING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A configured registry with the sample models.
pub struct TestRegistry {
    /// The registry.
    pub registry: ModelRegistry,
    /// The store behind it, for direct inspection.
    pub store: Arc<InMemoryStore>,
}

impl TestRegistry {
    /// Creates a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a registry with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        init_test_tracing();
        let store = Arc::new(InMemoryStore::new());
        let registry = ModelRegistry::new(config);
        registry
            .configure(store.clone())
            .expect("Failed to configure registry");
        registry.register::<Note>();
        registry.register::<Profile>();
        registry
            .ensure_all_indexes()
            .expect("Failed to create indexes");
        Self { registry, store }
    }

    /// Collection of notes.
    pub fn notes(&self) -> VersionedCollection<Note> {
        self.registry
            .collection::<Note>()
            .expect("Note is registered")
    }

    /// Collection of profiles.
    pub fn profiles(&self) -> VersionedCollection<Profile> {
        self.registry
            .collection::<Profile>()
            .expect("Profile is registered")
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestRegistry {
    type Target = ModelRegistry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

/// Runs a test with a fresh registry.
///
/// # Example
///
/// ```rust,ignore
/// use verdoc_testkit::with_registry;
///
/// #[test]
/// fn my_test() {
///     with_registry(|registry| {
///         assert!(registry.is_configured());
///     });
/// }
/// ```
pub fn with_registry<F, R>(f: F) -> R
where
    F: FnOnce(&TestRegistry) -> R,
{
    let registry = TestRegistry::new();
    f(&registry)
}
