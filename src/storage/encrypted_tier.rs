use super::TokenCipher;
use crate::domain_port::{BlobStore, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Persistent fallback tier. Values are serialized to JSON, sealed, then
/// handed to the blob store.
pub struct EncryptedTier {
    store: Arc<dyn BlobStore>,
    cipher: TokenCipher,
}

impl EncryptedTier {
    pub fn new(store: Arc<dyn BlobStore>, cipher: TokenCipher) -> Self {
        Self { store, cipher }
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(value)?;
        let sealed = self.cipher.encrypt(&serialized)?;
        self.store.set(key, &sealed).await
    }

    /// Surfaces decryption and parse failures as typed errors.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(sealed) = self.store.get(key).await? else {
            return Ok(None);
        };
        let plaintext = self.cipher.decrypt(&sealed)?;
        Ok(Some(serde_json::from_str(&plaintext)?))
    }

    /// Any failure reads as "absent".
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("persistent tier read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key).await
    }

    pub async fn has(&self, key: &str) -> bool {
        matches!(self.store.get(key).await, Ok(Some(_)))
    }
}
