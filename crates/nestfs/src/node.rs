use serde::{Deserialize, Serialize};

use crate::content::ContentRef;

pub const ROOT_ID: NodeId = NodeId(0);

/// Unique identifier for a node in the filesystem.
///
/// Allocation is owned by the node store; ids are never reused for the
/// lifetime of a tree, including across restarts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == ROOT_ID
    }

    /// Fixed-width hex form used in storage keys.
    pub fn to_hex_string(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex_string(hex: &str) -> std::result::Result<Self, String> {
        u64::from_str_radix(hex, 16)
            .map(NodeId)
            .map_err(|e| format!("bad node id '{}': {}", hex, e))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

/// What a node is. A content reference exists exactly for files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File {
        content: ContentRef,
        size: u64,
        mime_type: String,
    },
    Directory,
}

/// A single entry in the tree.
///
/// The parent/name chain is authoritative; `path` is a cache recomputed
/// whenever an ancestor is renamed or moved. Serialized as-is into the
/// storage adapter, one record per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub parent: Option<NodeId>,
    pub path: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Node {
    pub fn new_directory(id: NodeId, name: &str, parent: Option<NodeId>, path: &str, now: i64) -> Self {
        Self {
            id,
            kind: NodeKind::Directory,
            name: name.to_string(),
            parent,
            path: path.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_file(
        id: NodeId,
        name: &str,
        parent: NodeId,
        path: &str,
        content: ContentRef,
        size: u64,
        now: i64,
    ) -> Self {
        Self {
            id,
            kind: NodeKind::File {
                content,
                size,
                mime_type: mime_for_name(name).to_string(),
            },
            name: name.to_string(),
            parent: Some(parent),
            path: path.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn content_ref(&self) -> Option<&ContentRef> {
        match &self.kind {
            NodeKind::File { content, .. } => Some(content),
            NodeKind::Directory => None,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::File { size, .. } => *size,
            NodeKind::Directory => 0,
        }
    }
}

/// Metadata view returned by `stat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStat {
    pub path: String,
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub mime_type: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Node> for NodeStat {
    fn from(node: &Node) -> Self {
        Self {
            path: node.path.clone(),
            name: node.name.clone(),
            is_directory: node.is_directory(),
            size: node.size(),
            mime_type: match &node.kind {
                NodeKind::File { mime_type, .. } => Some(mime_type.clone()),
                NodeKind::Directory => None,
            },
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}

/// Lightweight listing entry returned by `readdir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
    pub updated_at: i64,
}

impl From<&Node> for DirEntry {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            path: node.path.clone(),
            is_directory: node.is_directory(),
            size: node.size(),
            updated_at: node.updated_at,
        }
    }
}

/// Guess a mime type from the file name extension.
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "md" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let id = NodeId::new(0xdeadbeef);
        assert_eq!(NodeId::from_hex_string(&id.to_hex_string()), Ok(id));
    }

    #[test]
    fn test_mime_for_name() {
        assert_eq!(mime_for_name("notes.txt"), "text/plain");
        assert_eq!(mime_for_name("INDEX.HTML"), "text/html");
        assert_eq!(mime_for_name("archive.bin"), "application/octet-stream");
        assert_eq!(mime_for_name("no_extension"), "application/octet-stream");
    }
}
