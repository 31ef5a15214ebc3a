//! Fields shared by every stored version, and the API representation.

use crate::error::{CoreError, CoreResult};
use crate::timeutils::format_unix_timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use verdoc_storage::{Document, RecordId, Value};

/// Stored field names common to every versioned model.
pub mod fields {
    /// Per-version record id.
    pub const ID: &str = verdoc_storage::ID_FIELD;
    /// Logical id shared by all versions of an entity.
    pub const MODEL_ID: &str = "model_id";
    /// Version number, starting at 1.
    pub const VERSION: &str = "version";
    /// Unix seconds when the version was written.
    pub const TIME_CREATED: &str = "time_created";
    /// Unix seconds when the entity was deleted, or 0.
    pub const TIME_DELETED: &str = "time_deleted";
    /// Who produced the version.
    pub const INITIATOR_ID: &str = "initiator_id";
    /// Set on the newest version only.
    pub const IS_LATEST: &str = "is_latest";
}

/// Version bookkeeping carried by every model instance.
///
/// A fresh instance has no record id or logical id and version 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMeta {
    /// Record id of the loaded version.
    pub id: Option<RecordId>,
    /// Logical id, assigned on first save.
    pub model_id: Option<String>,
    /// Version number of the loaded row; 0 if never saved.
    pub version: u64,
    /// Unix seconds when the loaded version was written.
    pub time_created: i64,
    /// Unix seconds of deletion, or 0.
    pub time_deleted: i64,
    /// Logical id of whoever produced the version.
    pub initiator_id: Option<String>,
}

impl VersionMeta {
    /// Returns true if the loaded version marks the entity deleted.
    pub fn is_deleted(&self) -> bool {
        self.time_deleted != 0
    }

    /// Common fields of a new version, before the save stamps them.
    pub fn base_document(&self) -> Document {
        Document::new()
            .with(fields::ID, RecordId::new())
            .with(fields::MODEL_ID, Value::Null)
            .with(fields::VERSION, 0)
            .with(fields::TIME_CREATED, 0)
            .with(fields::TIME_DELETED, 0)
            .with(fields::INITIATOR_ID, self.initiator_id.clone())
            .with(fields::IS_LATEST, true)
    }

    /// Reads the common fields of a stored version.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDocument`] if a field is missing or has
    /// the wrong type. `initiator_id` may be null or absent.
    pub fn from_document(document: &Document) -> CoreResult<Self> {
        let id = document
            .id()
            .ok_or_else(|| CoreError::invalid_document("missing record id"))?;
        let model_id = document
            .get_str(fields::MODEL_ID)
            .ok_or_else(|| CoreError::invalid_document("missing model_id"))?;
        let version = required_i64(document, fields::VERSION)?;
        let version = u64::try_from(version)
            .map_err(|_| CoreError::invalid_document(format!("negative version {version}")))?;
        let initiator_id = match document.get(fields::INITIATOR_ID) {
            None | Some(Value::Null) => None,
            Some(Value::Text(text)) => Some(text.clone()),
            Some(_) => return Err(CoreError::invalid_document("initiator_id is not text")),
        };

        Ok(Self {
            id: Some(id),
            model_id: Some(model_id.to_string()),
            version,
            time_created: required_i64(document, fields::TIME_CREATED)?,
            time_deleted: required_i64(document, fields::TIME_DELETED)?,
            initiator_id,
        })
    }
}

fn required_i64(document: &Document, field: &str) -> CoreResult<i64> {
    document
        .get_i64(field)
        .ok_or_else(|| CoreError::invalid_document(format!("missing integer field {field}")))
}

/// Stores a version number as an integer value.
pub(crate) fn version_value(version: u64) -> CoreResult<Value> {
    i64::try_from(version)
        .map(Value::Integer)
        .map_err(|_| CoreError::invalid_document(format!("version {version} out of range")))
}

impl fmt::Display for VersionMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.map(|id| id.to_hex()).unwrap_or_default();
        write!(
            f,
            "_id={id:?} model_id={:?} version={} initiator_id={:?} time_created={:?}",
            self.model_id.as_deref().unwrap_or_default(),
            self.version,
            self.initiator_id.as_deref().unwrap_or_default(),
            format_unix_timestamp(self.time_created),
        )?;
        if self.is_deleted() {
            write!(f, " time_deleted={:?}", format_unix_timestamp(self.time_deleted))?;
        }
        Ok(())
    }
}

/// Outward-facing representation of a model.
///
/// Internal bookkeeping (record id, latest flag) is not exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    /// Model-specific fields.
    pub data: serde_json::Value,
    /// Model type name.
    pub model: String,
    /// Logical id.
    pub id: String,
    /// Version number.
    pub version: u64,
    /// Unix seconds when this version was written.
    pub time_updated: i64,
    /// Unix seconds of deletion, or 0.
    pub time_deleted: i64,
    /// Who produced this version.
    pub initiator_id: Option<String>,
}
