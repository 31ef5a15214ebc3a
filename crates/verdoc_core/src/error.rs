//! Error types for verdoc core.

use thiserror::Error;
use verdoc_storage::StorageError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in versioned model operations.
///
/// Absence is never an error: lookups return `None` or an empty page.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store error, propagated unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Attempted to save or delete a model whose latest version is deleted.
    #[error("cannot update deleted model {model_id}")]
    CannotUpdateDeleted {
        /// The logical id of the deleted model.
        model_id: String,
    },

    /// The store rejected a new version as a duplicate.
    ///
    /// Usually another writer created the same version first. Reload the
    /// model and retry.
    #[error("version {version} of model {model_id} conflicts in {collection} (index {index})")]
    UniqueConstraintViolation {
        /// Collection written to.
        collection: &'static str,
        /// The logical id of the model.
        model_id: String,
        /// The version that could not be created.
        version: u64,
        /// The unique index that rejected the write.
        index: String,
    },

    /// A stored document does not have the expected shape.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
    },

    /// The registry already has a store.
    #[error("model registry is already configured")]
    AlreadyConfigured,

    /// The registry has no store yet.
    #[error("model registry is not configured")]
    NotConfigured,

    /// The model type was never registered.
    #[error("model {model} is not registered")]
    ModelNotRegistered {
        /// Name of the model type.
        model: &'static str,
    },

    /// The model type is registered but its indexes were never ensured.
    #[error("indexes of model {model} have not been ensured")]
    IndexesNotEnsured {
        /// Name of the model type.
        model: &'static str,
    },
}

impl CoreError {
    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates a cannot-update-deleted error.
    pub fn cannot_update_deleted(model_id: Option<&str>) -> Self {
        Self::CannotUpdateDeleted {
            model_id: model_id.unwrap_or_default().to_string(),
        }
    }

    /// Returns true if reloading and retrying may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UniqueConstraintViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = CoreError::UniqueConstraintViolation {
            collection: "notes",
            model_id: "m".into(),
            version: 2,
            index: "index_unique_version".into(),
        };
        assert!(conflict.is_retryable());
        assert!(!CoreError::cannot_update_deleted(Some("m")).is_retryable());
        assert!(!CoreError::from(StorageError::invalid_query("x")).is_retryable());
    }

    #[test]
    fn messages_name_the_model() {
        let err = CoreError::cannot_update_deleted(Some("abc"));
        assert_eq!(err.to_string(), "cannot update deleted model abc");
    }
}
