use crate::core::Storage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "local_storage";

/// Storage persisted in a fjall keyspace under the data directory.
pub struct DiskStorage {
    keyspace: Keyspace,
    items: PartitionHandle,
}

impl DiskStorage {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path.join("store"))
            .open()
            .with_context(|| format!("Failed to open data store at {}", path.display()))?;
        let items = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open storage partition")?;
        debug!("Opened data store at {}", path.display());
        Ok(Self { keyspace, items })
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to flush data store")
    }
}

#[async_trait]
impl Storage for DiskStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let Some(value) = self
            .items
            .get(key)
            .with_context(|| format!("Failed to read key: {key}"))?
        else {
            debug!("Storage MISS for key: {}", key);
            return Ok(None);
        };
        debug!("Storage HIT for key: {}", key);
        let value = String::from_utf8(value.to_vec())
            .with_context(|| format!("Stored value for {key} is not valid UTF-8"))?;
        Ok(Some(value))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .insert(key, value)
            .with_context(|| format!("Failed to write key: {key}"))?;
        debug!("Storage PUT for key: {}", key);
        self.persist()
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items
            .remove(key)
            .with_context(|| format!("Failed to remove key: {key}"))?;
        debug!("Storage REMOVE for key: {}", key);
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_storage_get_set() {
        let dir = tempdir().unwrap();
        let storage = DiskStorage::open(dir.path()).unwrap();

        assert!(storage.get_item("expenses").await.unwrap().is_none());

        storage.set_item("expenses", "[]").await.unwrap();
        assert_eq!(
            storage.get_item("expenses").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_disk_storage_remove() {
        let dir = tempdir().unwrap();
        let storage = DiskStorage::open(dir.path()).unwrap();

        storage.set_item("settings", r#"{"baseCurrency":"EUR"}"#).await.unwrap();
        storage.remove_item("settings").await.unwrap();
        assert!(storage.get_item("settings").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_storage_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = DiskStorage::open(dir.path()).unwrap();
            storage.set_item("calender_todos", "[\"€\"]").await.unwrap();
        }

        let storage = DiskStorage::open(dir.path()).unwrap();
        assert_eq!(
            storage.get_item("calender_todos").await.unwrap().as_deref(),
            Some("[\"€\"]")
        );
    }
}
