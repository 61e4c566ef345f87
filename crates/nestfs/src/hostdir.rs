//! Durable storage adapter backed by a host directory.
//!
//! Each key becomes one flat file under the root; `/` and `%` in keys are
//! percent-escaped so the mapping is reversible and never creates nested
//! host directories.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::storage::StorageAdapter;

pub struct HostDirStorage {
    root: PathBuf,
}

impl HostDirStorage {
    /// Open (creating if needed) a storage root on the host filesystem.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::storage(format!("create {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for_key(&self, key: &str) -> PathBuf {
        self.root.join(encode_key(key))
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '/' => out.push_str("%2F"),
            '%' => out.push_str("%25"),
            c => out.push(c),
        }
    }
    out
}

fn decode_key(name: &str) -> String {
    name.replace("%2F", "/").replace("%25", "%")
}

#[async_trait]
impl StorageAdapter for HostDirStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.file_for_key(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(format!("get {}: {}", key, e))),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        tokio::fs::write(self.file_for_key(key), value)
            .await
            .map_err(|e| Error::storage(format!("put {}: {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.file_for_key(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!("delete {}: {}", key, e))),
        }
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::storage(format!("list {}: {}", self.root.display(), e)))?;
        let mut keys = Vec::new();
        loop {
            let entry = dir
                .next_entry()
                .await
                .map_err(|e| Error::storage(format!("list {}: {}", self.root.display(), e)))?;
            let Some(entry) = entry else { break };
            let key = decode_key(&entry.file_name().to_string_lossy());
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
