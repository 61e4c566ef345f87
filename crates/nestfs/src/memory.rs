//! In-memory storage adapter.
//!
//! Non-durable, suitable for tests and scratch trees. Clones share the
//! same underlying map, so reopening a filesystem over a clone of the
//! adapter behaves like a process restart against the same stored state.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::storage::StorageAdapter;

#[derive(Clone, Default)]
pub struct MemoryStorage(Arc<Mutex<BTreeMap<String, Vec<u8>>>>);

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.0.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.0.lock().await.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.0.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .0
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let storage = MemoryStorage::new();
        storage.put("node/1", b"record").await.unwrap();

        assert_eq!(storage.get("node/1").await.unwrap(), Some(b"record".to_vec()));
        assert_eq!(storage.get("node/2").await.unwrap(), None);

        storage.delete("node/1").await.unwrap();
        assert_eq!(storage.get("node/1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_keys_with_prefix() {
        let storage = MemoryStorage::new();
        storage.put("node/1", b"a").await.unwrap();
        storage.put("node/2", b"b").await.unwrap();
        storage.put("content/1", b"c").await.unwrap();

        let keys = storage.list_keys_with_prefix("node/").await.unwrap();
        assert_eq!(keys, vec!["node/1".to_string(), "node/2".to_string()]);
    }
}
