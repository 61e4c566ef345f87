//! The durable key-value boundary.
//!
//! The facade is the sole consumer: node records are serialized JSON under
//! `node/<hex id>`, file payloads are raw bytes under `content/<hex ref>`.
//! Any adapter error aborts the enclosing operation and the in-memory
//! mutation is rolled back.

use async_trait::async_trait;

use crate::content::ContentRef;
use crate::error::Result;
use crate::node::NodeId;

/// Asynchronous key-value storage for tree metadata and file payloads.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

pub(crate) mod keys {
    use super::*;

    pub const NODE_PREFIX: &str = "node/";
    pub const CONTENT_PREFIX: &str = "content/";

    pub fn node(id: NodeId) -> String {
        format!("{}{}", NODE_PREFIX, id.to_hex_string())
    }

    pub fn content(cref: &ContentRef) -> String {
        format!("{}{}", CONTENT_PREFIX, cref.to_hex_string())
    }
}
