//! Test support: an in-memory filesystem constructor and a storage
//! adapter with switchable failure injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::fs::Fs;
use crate::memory::MemoryStorage;
use crate::storage::StorageAdapter;

/// A freshly seeded filesystem over in-memory storage.
pub async fn new_fs() -> Fs {
    match Fs::open(Arc::new(MemoryStorage::new())).await {
        Ok(fs) => fs,
        Err(err) => panic!("opening a memory filesystem cannot fail: {}", err),
    }
}

/// Storage wrapper whose writes can be made to fail on demand.
///
/// Reads always pass through; `set_failing(true)` makes every `put` and
/// `delete` return a storage error until switched off again.
pub struct FlakyStorage {
    inner: MemoryStorage,
    failing: AtomicBool,
}

impl FlakyStorage {
    pub fn new(inner: MemoryStorage) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::storage(format!("injected {} failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageAdapter for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.check("put")?;
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check("delete")?;
        self.inner.delete(key).await
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_keys_with_prefix(prefix).await
    }
}
