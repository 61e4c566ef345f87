//! File payload storage, addressed by opaque reference.
//!
//! Content lives apart from tree metadata: node records are small and hot,
//! payloads are larger and cold. Copying duplicates payloads eagerly so
//! each node's content stays independently mutable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Opaque key into the content store.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ContentRef(u64);

impl ContentRef {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn to_hex_string(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex_string(hex: &str) -> std::result::Result<Self, String> {
        u64::from_str_radix(hex, 16)
            .map(ContentRef)
            .map_err(|e| format!("bad content ref '{}': {}", hex, e))
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

#[derive(Debug, Default)]
pub struct ContentStore {
    blobs: HashMap<ContentRef, Vec<u8>>,
    next: u64,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload under a freshly allocated reference.
    pub fn put(&mut self, bytes: Vec<u8>) -> ContentRef {
        let cref = ContentRef(self.next);
        self.next += 1;
        self.blobs.insert(cref.clone(), bytes);
        cref
    }

    pub fn get(&self, cref: &ContentRef) -> Result<&[u8]> {
        self.blobs
            .get(cref)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found(format!("content {}", cref)))
    }

    /// Replace the payload behind an existing reference, returning the old
    /// bytes so a failed persist can restore them.
    pub fn replace(&mut self, cref: &ContentRef, bytes: Vec<u8>) -> Result<Vec<u8>> {
        match self.blobs.get_mut(cref) {
            Some(slot) => Ok(std::mem::replace(slot, bytes)),
            None => Err(Error::not_found(format!("content {}", cref))),
        }
    }

    /// Remove a payload, returning it for rollback re-insertion.
    pub fn delete(&mut self, cref: &ContentRef) -> Option<Vec<u8>> {
        self.blobs.remove(cref)
    }

    /// Duplicate a payload under a new reference (copy semantics).
    pub fn duplicate(&mut self, cref: &ContentRef) -> Result<ContentRef> {
        let bytes = self.get(cref)?.to_vec();
        Ok(self.put(bytes))
    }

    /// Re-insert a payload under a known reference. Used when reloading
    /// from storage and when rolling back a failed delete.
    pub fn insert(&mut self, cref: ContentRef, bytes: Vec<u8>) {
        if cref.0 >= self.next {
            self.next = cref.0 + 1;
        }
        self.blobs.insert(cref, bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let mut store = ContentStore::new();
        let a = store.put(b"hello".to_vec());
        assert_eq!(store.get(&a).unwrap(), b"hello");

        store.delete(&a);
        assert_eq!(store.get(&a).unwrap_err().code(), "ENOENT");
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut store = ContentStore::new();
        let a = store.put(b"orig".to_vec());
        let b = store.duplicate(&a).unwrap();
        assert_ne!(a, b);

        store.replace(&b, b"changed".to_vec()).unwrap();
        assert_eq!(store.get(&a).unwrap(), b"orig");
        assert_eq!(store.get(&b).unwrap(), b"changed");
    }

    #[test]
    fn test_insert_bumps_allocator() {
        let mut store = ContentStore::new();
        store.insert(ContentRef::new(7), b"reloaded".to_vec());
        let fresh = store.put(b"new".to_vec());
        assert!(fresh.as_u64() > 7);
    }
}
