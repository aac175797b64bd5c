//! User document storage
//!
//! Each signed-in user owns one JSON document holding their preferred
//! episode source and the episodes they marked as watched. Stores only
//! support whole-document reads and merge writes.
mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during document store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to determine the data directory location
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,

    /// Failed to create or access the store directory
    #[error("Failed to create store directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a stored document
    #[error("Failed to read document {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a stored document
    #[error("Failed to write document {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize a stored document
    #[error("Failed to deserialize document {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize a document for storage
    #[error("Failed to serialize document: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Merge patches must be JSON objects
    #[error("Merge patch must be a JSON object, got: {0}")]
    InvalidPatch(String),
}

/// Identity of a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read and merge-write access to per-user documents.
///
/// Implementors only need to provide single-document consistency; no
/// multi-document transactions are expected.
pub trait DocumentStore {
    /// Reads the whole document of a user, `None` if the user has none yet.
    fn read(&self, user: &UserId) -> Result<Option<Value>, StoreError>;

    /// Merges `patch` into the user's document, creating it if missing.
    ///
    /// Nested objects are merged key by key. Any other value, including
    /// `null`, replaces what was stored under that key.
    fn merge(&self, user: &UserId, patch: Value) -> Result<(), StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn read(&self, user: &UserId) -> Result<Option<Value>, StoreError> {
        (**self).read(user)
    }

    fn merge(&self, user: &UserId, patch: Value) -> Result<(), StoreError> {
        (**self).merge(user, patch)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn read(&self, user: &UserId) -> Result<Option<Value>, StoreError> {
        (**self).read(user)
    }

    fn merge(&self, user: &UserId, patch: Value) -> Result<(), StoreError> {
        (**self).merge(user, patch)
    }
}

/// Applies a merge patch to a document in place
///
/// Both sides must be objects at the top level; nested objects are merged
/// recursively and every other value overwrites.
pub fn merge_document(target: &mut Value, patch: Value) -> Result<(), StoreError> {
    let Value::Object(patch_fields) = patch else {
        return Err(StoreError::InvalidPatch(patch.to_string()));
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }

    merge_fields(target, patch_fields);
    Ok(())
}

fn merge_fields(target: &mut Value, patch_fields: serde_json::Map<String, Value>) {
    let Value::Object(target_fields) = target else {
        return;
    };

    for (key, value) in patch_fields {
        match value {
            Value::Object(nested) => {
                let slot = target_fields
                    .entry(key)
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(serde_json::Map::new());
                }
                merge_fields(slot, nested);
            }
            other => {
                target_fields.insert(key, other);
            }
        }
    }
}
