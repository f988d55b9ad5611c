use crate::domain_port::{BlobStore, StorageError};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub struct RedisBlobStore {
    conn: ConnectionManager,
    prefix: String,
    ttl_secs: Option<u64>,
}

impl RedisBlobStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisBlobStore {
            conn,
            prefix: prefix.into(),
            ttl_secs: None,
        }
    }

    /// Lets entries expire on their own, e.g. alongside the refresh token.
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StorageError> {
        let client = redis::Client::open(url).map_err(|e| StorageError::Store(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StorageError::Store(e.to_string()))?;
        Ok(Self::new(conn, prefix))
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait::async_trait]
impl BlobStore for RedisBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| StorageError::Store(e.to_string()))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = match self.ttl_secs {
            Some(ttl) => conn.set_ex(&key, value, ttl).await,
            None => conn.set(&key, value).await,
        }
        .map_err(|e| StorageError::Store(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| StorageError::Store(e.to_string()))?;
        Ok(())
    }
}
