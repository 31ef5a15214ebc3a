//! # verdoc core
//!
//! Append-only versioning for entities kept in a document store.
//!
//! Every save of an entity writes a new stored version. All versions of
//! one entity share a logical id (`model_id`), versions count up from 1,
//! and the newest version carries the `is_latest` flag. Deleting an
//! entity writes one more version with `time_deleted` set; nothing is
//! ever removed.
//!
//! This crate provides:
//! - The [`Model`] trait implemented by entity types
//! - [`VersionedCollection`] for saving, deleting, finding, and listing
//! - [`ModelRegistry`] binding model types to a store
//! - Index management, key escaping, and time helpers
//!
//! ## Concurrency
//!
//! Two writers saving the same version of an entity race on a unique
//! (model_id, version) index. The loser gets
//! [`CoreError::UniqueConstraintViolation`] and should reload the latest
//! version and retry. The layer never retries on its own.
//!
//! ## Example
//!
//! ```rust,ignore
//! let registry = ModelRegistry::new(Config::default());
//! registry.configure(Arc::new(InMemoryStore::new()))?;
//! registry.register::<Note>();
//! registry.ensure_all_indexes()?;
//!
//! let notes = registry.collection::<Note>()?;
//! let mut note = Note::new("hello");
//! notes.save(&mut note)?;
//! let latest = notes.find_latest_by_model_id(note.model_id().unwrap_or_default())?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod error;
pub mod escape;
pub mod index;
mod model;
mod pagination;
mod reference;
mod registry;
mod schema;
pub mod timeutils;

pub use collection::VersionedCollection;
pub use config::{Config, LatestDemotion};
pub use error::{CoreError, CoreResult};
pub use model::Model;
pub use pagination::{ApiPage, PaginatedResult, Pagination};
pub use reference::ModelRef;
pub use registry::{ModelRegistry, RegisteredModel};
pub use schema::{fields, ApiDocument, VersionMeta};
