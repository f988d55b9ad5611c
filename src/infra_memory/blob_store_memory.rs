use crate::domain_port::{BlobStore, StorageError};
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }

    /// The stored (sealed) value, as the backing store sees it.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.blobs.get(key).map(|v| v.value().clone())
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.blobs.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert_raw(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.remove(key);
        Ok(())
    }
}
