//! # verdoc storage
//!
//! The document store contract the versioning layer is written against,
//! plus an in-process reference implementation.
//!
//! ## Design Principles
//!
//! - Stores hold named collections of [`Document`]s
//! - Single-document inserts are atomic and enforce unique indexes
//! - Multi-document updates are atomic per collection
//! - Stores know nothing about versions, models, or latest flags
//! - Must be `Send + Sync` so one handle can be shared process-wide
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For tests and embedded use
//!
//! ## Example
//!
//! ```rust
//! use verdoc_storage::{Document, DocumentStore, Filter, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.insert("notes", Document::new().with("title", "hello")).unwrap();
//! let count = store.count("notes", &Filter::new().eq("title", "hello")).unwrap();
//! assert_eq!(count, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cursor;
mod document;
mod error;
mod id;
mod index;
mod memory;
mod query;
mod store;
mod value;

pub use cursor::Cursor;
pub use document::{Document, ID_FIELD};
pub use error::{StorageError, StorageResult};
pub use id::RecordId;
pub use index::{IndexSpec, ID_INDEX};
pub use memory::InMemoryStore;
pub use query::{Condition, Filter, FindOptions, Sort, SortOrder, Update};
pub use store::DocumentStore;
pub use value::Value;
