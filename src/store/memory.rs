//! In-memory document store

use super::{DocumentStore, StoreError, UserId, merge_document};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keeps user documents in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<UserId, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds one document.
    pub fn with_document(user: UserId, document: Value) -> Self {
        let store = Self::new();
        store.documents_mut().insert(user, document);
        store
    }

    fn documents_mut(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Value>> {
        // merges are applied whole, so a poisoned map is still consistent
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, user: &UserId) -> Result<Option<Value>, StoreError> {
        Ok(self.documents_mut().get(user).cloned())
    }

    fn merge(&self, user: &UserId, patch: Value) -> Result<(), StoreError> {
        if !patch.is_object() {
            return Err(StoreError::InvalidPatch(patch.to_string()));
        }

        let mut documents = self.documents_mut();
        let document = documents.entry(user.clone()).or_insert(Value::Null);
        merge_document(document, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_missing_user() {
        let store = MemoryStore::new();
        assert_eq!(store.read(&UserId::new("nobody")).unwrap(), None);
    }

    #[test]
    fn test_merge_creates_document() {
        let store = MemoryStore::new();
        let user = UserId::new("u1");

        store.merge(&user, json!({ "videoSource": "gogoanime" })).unwrap();
        store
            .merge(&user, json!({ "episodesWatched": { "5": [] } }))
            .unwrap();

        assert_eq!(
            store.read(&user).unwrap(),
            Some(json!({ "videoSource": "gogoanime", "episodesWatched": { "5": [] } }))
        );
    }
}
