use crate::core::Storage;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Volatile storage backed by a HashMap, used by tests and dry runs
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.inner.lock().await;
        let value = items.get(key).cloned();
        if value.is_some() {
            debug!("Storage HIT for key: {}", key);
        } else {
            debug!("Storage MISS for key: {}", key);
        }
        Ok(value)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.inner.lock().await;
        debug!("Storage PUT for key: {}", key);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.inner.lock().await;
        items.remove(key);
        debug!("Storage REMOVE for key: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_storage_get_set() {
        let storage = MemoryStorage::new();

        assert!(storage.get_item("todos").await.unwrap().is_none());

        storage.set_item("todos", "[]").await.unwrap();
        assert_eq!(storage.get_item("todos").await.unwrap().as_deref(), Some("[]"));

        // Writes replace the previous value
        storage.set_item("todos", "[1]").await.unwrap();
        assert_eq!(storage.get_item("todos").await.unwrap().as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn test_storage_remove() {
        let storage = MemoryStorage::new();
        storage.set_item("settings", "{}").await.unwrap();
        storage.remove_item("settings").await.unwrap();
        assert!(storage.get_item("settings").await.unwrap().is_none());

        // Removing a missing key is not an error
        storage.remove_item("settings").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set_item("k", "v").await.unwrap();
        assert_eq!(other.get_item("k").await.unwrap().as_deref(), Some("v"));
    }
}
