//! # verdoc testkit
//!
//! Test utilities for verdoc.
//!
//! This crate provides:
//! - Sample model types
//! - Registry fixtures over an in-memory store
//! - Property-based test generators using proptest
//! - Cross-crate scenario checks
//! - Concurrent writer stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verdoc_testkit::prelude::*;
//!
//! #[test]
//! fn saves_a_note() {
//!     with_registry(|registry| {
//!         let notes = registry.notes();
//!         let mut note = Note::new("hello", "");
//!         notes.save(&mut note).unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod models;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::models::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use models::*;
pub use stress::*;
