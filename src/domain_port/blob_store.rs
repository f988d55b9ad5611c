#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("store error: {0}")]
    Store(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A plain string key-value store underneath the encrypted persistent tier.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
