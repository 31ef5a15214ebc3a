//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A write would create two records with the same key in a unique index.
    #[error("duplicate key in collection {collection}: index {index}")]
    DuplicateKey {
        /// Collection the write targeted.
        collection: String,
        /// Name of the violated unique index.
        index: String,
    },

    /// A mapping key is not allowed by the store.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// Why the key was rejected.
        reason: &'static str,
    },

    /// An index with the same name but different options already exists.
    #[error("index {name} already exists in collection {collection} with different options")]
    IndexConflict {
        /// Collection holding the index.
        collection: String,
        /// Name of the index.
        name: String,
    },

    /// The document is structurally unacceptable.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The query, sort, or update specification is malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// A string is not a valid record identifier.
    #[error("invalid record id: {0:?}")]
    InvalidRecordId(String),
}

impl StorageError {
    /// Returns true if this error is a unique-index violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument(message.into())
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }
}
