//! In-process storage adapter.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{Namespace, Storage, StorageError};

/// Keeps documents in a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<Namespace, serde_json::Value>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the raw document under `namespace`.
    #[must_use]
    pub fn document(&self, namespace: Namespace) -> Option<serde_json::Value> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&namespace)
            .cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, namespace: Namespace) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.document(namespace))
    }

    async fn save(&self, namespace: Namespace, value: serde_json::Value) -> Result<(), StorageError> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace, value);
        Ok(())
    }

    async fn remove(&self, namespace: Namespace) -> Result<(), StorageError> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&namespace);
        Ok(())
    }
}
