//! File-backed document store
//!
//! This module keeps one JSON file per user in the system's standard data
//! directory. Writes go to a temporary file first and are renamed into place.

use super::{DocumentStore, StoreError, UserId, merge_document};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Document store persisting user documents as JSON files
///
/// A read-merge-write cycle is serialized within one process. Concurrent
/// writers in separate processes follow last-write-wins.
pub struct JsonFileStore {
    /// The directory where user documents are stored
    root: PathBuf,
    /// Serializes read-merge-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store in the platform data directory
    ///
    /// Documents end up in:
    /// - Linux: ~/.local/share/aniproject/users/
    /// - macOS: ~/Library/Application Support/org.aniproject.aniproject/users/
    /// - Windows: %APPDATA%\aniproject\aniproject\data\users\
    pub fn open_default() -> Result<Self, StoreError> {
        let proj_dirs = directories::ProjectDirs::from("org", "aniproject", "aniproject")
            .ok_or(StoreError::DataDirectoryNotFound)?;

        Self::open(&proj_dirs.data_dir().join("users"))
    }

    /// Opens or creates a store rooted at `root`
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|e| StoreError::DirectoryCreationFailed {
            path: root.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the directory holding the user documents
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, user: &UserId) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(user)))
    }

    fn load(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| StoreError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let document =
            serde_json::from_str(&content).map_err(|e| StoreError::DeserializationFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Some(document))
    }

    fn store(&self, path: &Path, document: &Value) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(document)?;

        let temp_path = path.with_extension(format!("{}.tmp", ulid::Ulid::new()));
        fs::write(&temp_path, content).map_err(|e| StoreError::WriteFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }
}

impl DocumentStore for JsonFileStore {
    fn read(&self, user: &UserId) -> Result<Option<Value>, StoreError> {
        self.load(&self.document_path(user))
    }

    fn merge(&self, user: &UserId, patch: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.document_path(user);
        let mut document = self.load(&path)?.unwrap_or(Value::Null);
        merge_document(&mut document, patch)?;
        self.store(&path, &document)
    }
}

/// File name of a user's document, without extension
///
/// Hex keeps every distinct id distinct, including ids that differ only in
/// case on case-insensitive file systems.
fn file_stem(user: &UserId) -> String {
    hex::encode(user.as_str())
}
