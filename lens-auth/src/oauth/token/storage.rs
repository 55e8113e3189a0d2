//! Storage trait for persisting serialized tokens.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Error;

/// Durable string key-value store.
///
/// The token manager keys entries by OAuth client ID and stores the token's
/// JSON serialization as the value. Writes overwrite unconditionally.
///
/// Implementations should:
/// - Encrypt values at rest when the medium is not already secure (see `EncryptedStorage`)
/// - Treat `remove` of an absent key as success
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Returns
    ///
    /// `Some(value)` if found, `None` if not found.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write `value` under `key`, replacing any prior value.
    async fn set(&self, key: &str, value: String) -> Result<(), Error>;

    /// Delete the entry for `key`.
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// In-process storage. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Error> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Error> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        (**self).remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let storage = MemoryStorage::new();
        storage.set("client", "value".to_string()).await.unwrap();
        assert_eq!(storage.get("client").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let storage = MemoryStorage::new();
        storage.set("client", "first".to_string()).await.unwrap();
        storage.set("client", "second".to_string()).await.unwrap();
        assert_eq!(storage.get("client").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_ok() {
        let storage = MemoryStorage::new();
        assert!(storage.remove("missing").await.is_ok());
        assert_eq!(storage.get("missing").await.unwrap(), None);
    }
}
