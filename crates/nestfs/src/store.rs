//! The node store: an arena of nodes keyed by id, with a separate
//! parent-to-children index.
//!
//! Keeping the association in an index (rather than child lists embedded
//! in nodes) means reparenting and subtree cloning are index updates, and
//! ownership cycles cannot form: a node is only ever attached through
//! `create_node`, never by direct parent-pointer mutation.
//!
//! The store is synchronous. All storage I/O belongs to the facade, which
//! applies mutations here first and persists afterwards.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::content::ContentStore;
use crate::error::{Error, Result};
use crate::node::{mime_for_name, Node, NodeId, NodeKind, ROOT_ID};
use crate::path;

#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: HashMap<NodeId, Node>,
    children: HashMap<NodeId, BTreeMap<String, NodeId>>,
    next_id: u64,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the root directory in an empty store.
    pub fn seed_root(&mut self, now: i64) -> &Node {
        debug_assert!(self.nodes.is_empty());
        let root = Node::new_directory(ROOT_ID, "", None, "/", now);
        self.next_id = self.next_id.max(1);
        self.nodes.insert(ROOT_ID, root);
        &self.nodes[&ROOT_ID]
    }

    pub fn contains_root(&self) -> bool {
        self.nodes.contains_key(&ROOT_ID)
    }

    pub fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Insert a node reloaded from storage, restoring the index and the
    /// id allocator. Also used to roll back a removal.
    pub fn insert_loaded(&mut self, node: Node) {
        if node.id.as_u64() >= self.next_id {
            self.next_id = node.id.as_u64() + 1;
        }
        if let Some(parent) = node.parent {
            self.children
                .entry(parent)
                .or_default()
                .insert(node.name.clone(), node.id);
        }
        self.nodes.insert(node.id, node);
    }

    pub fn child_of(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.children.get(&dir).and_then(|c| c.get(name)).copied()
    }

    /// Children of a directory in name order.
    pub fn children_of(&self, dir: NodeId) -> Vec<(String, NodeId)> {
        self.children
            .get(&dir)
            .map(|c| c.iter().map(|(n, id)| (n.clone(), *id)).collect())
            .unwrap_or_default()
    }

    pub fn child_count(&self, dir: NodeId) -> usize {
        self.children.get(&dir).map_or(0, BTreeMap::len)
    }

    /// Walk a normalized path from the root.
    ///
    /// A missing segment yields `ENOENT`; a non-terminal segment that is
    /// not a directory yields `ENOTDIR`.
    pub fn resolve(&self, normalized: &str) -> Result<&Node> {
        let mut current = self
            .nodes
            .get(&ROOT_ID)
            .ok_or_else(|| Error::storage("node store has no root"))?;

        for segment in path::segments(normalized) {
            if !current.is_directory() {
                return Err(Error::not_a_directory(current.path.clone()));
            }
            let child = self
                .child_of(current.id, segment)
                .ok_or_else(|| Error::not_found(normalized))?;
            current = self
                .nodes
                .get(&child)
                .ok_or_else(|| Error::not_found(normalized))?;
        }
        Ok(current)
    }

    /// Create a node under a directory. The only way a node enters the tree.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        now: i64,
    ) -> Result<NodeId> {
        let parent_node = self
            .nodes
            .get(&parent)
            .ok_or_else(|| Error::not_found(format!("node {}", parent)))?;
        if !parent_node.is_directory() {
            return Err(Error::not_a_directory(parent_node.path.clone()));
        }
        let node_path = path::join(&parent_node.path, name);
        if self.child_of(parent, name).is_some() {
            return Err(Error::already_exists(node_path));
        }

        let id = self.allocate_id();
        let node = match kind {
            NodeKind::Directory => Node::new_directory(id, name, Some(parent), &node_path, now),
            NodeKind::File { content, size, .. } => {
                Node::new_file(id, name, parent, &node_path, content, size, now)
            }
        };
        self.children
            .entry(parent)
            .or_default()
            .insert(name.to_string(), id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node. Directories must be empty; the root is permanent.
    pub fn remove(&mut self, id: NodeId) -> Result<Node> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))?;
        if id.is_root() {
            return Err(Error::invalid_path("the root directory cannot be removed"));
        }
        if node.is_directory() && self.child_count(id) > 0 {
            return Err(Error::not_empty(node.path.clone()));
        }

        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))?;
        if let Some(parent) = node.parent {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(&node.name);
            }
        }
        self.children.remove(&id);
        Ok(node)
    }

    /// All ids in a subtree, breadth-first, starting at `id` itself.
    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            out.push(current);
            if let Some(children) = self.children.get(&current) {
                queue.extend(children.values().copied());
            }
        }
        out
    }

    /// Reparent and/or rename a node, recomputing the cached path of the
    /// node and every descendant in one breadth-first pass.
    pub fn move_node(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        new_name: &str,
        now: i64,
    ) -> Result<()> {
        if id.is_root() {
            return Err(Error::invalid_path("the root directory cannot be renamed"));
        }
        let parent_node = self
            .nodes
            .get(&new_parent)
            .ok_or_else(|| Error::not_found(format!("node {}", new_parent)))?;
        if !parent_node.is_directory() {
            return Err(Error::not_a_directory(parent_node.path.clone()));
        }
        let dest_path = path::join(&parent_node.path, new_name);
        if self.child_of(new_parent, new_name).is_some() {
            return Err(Error::already_exists(dest_path));
        }
        // A directory cannot be moved under its own subtree.
        if self.subtree_ids(id).contains(&new_parent) {
            return Err(Error::invalid_path(format!(
                "cannot move {} into its own subtree",
                dest_path
            )));
        }

        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))?;
        let old_parent = node.parent;
        let old_name = std::mem::replace(&mut node.name, new_name.to_string());
        node.parent = Some(new_parent);
        node.path = dest_path;
        node.updated_at = now;

        if let Some(parent) = old_parent {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(&old_name);
            }
        }
        self.children
            .entry(new_parent)
            .or_default()
            .insert(new_name.to_string(), id);

        self.recompute_paths_below(id);
        Ok(())
    }

    fn recompute_paths_below(&mut self, id: NodeId) {
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let Some(parent_path) = self.nodes.get(&current).map(|n| n.path.clone()) else {
                continue;
            };
            for (name, child) in self.children_of(current) {
                if let Some(node) = self.nodes.get_mut(&child) {
                    node.path = path::join(&parent_path, &name);
                }
                queue.push_back(child);
            }
        }
    }

    /// Deep-copy a subtree under a new parent and name.
    ///
    /// Fresh ids are generated top-down and file payloads are duplicated
    /// eagerly, so mutating the copy never affects the original. Returns
    /// the new ids in breadth-first order, copy root first.
    pub fn clone_subtree(
        &mut self,
        src: NodeId,
        dest_parent: NodeId,
        dest_name: &str,
        now: i64,
        content: &mut ContentStore,
    ) -> Result<Vec<NodeId>> {
        if !self.nodes.contains_key(&src) {
            return Err(Error::not_found(format!("node {}", src)));
        }
        let mut new_ids = Vec::new();
        // (source id, destination parent, name under that parent)
        let mut queue = VecDeque::from([(src, dest_parent, dest_name.to_string())]);
        while let Some((src_id, parent, name)) = queue.pop_front() {
            let Some(src_node) = self.nodes.get(&src_id) else {
                continue;
            };
            let cloned = match &src_node.kind {
                NodeKind::Directory => Ok(NodeKind::Directory),
                NodeKind::File {
                    content: cref,
                    size,
                    ..
                } => content.duplicate(cref).map(|dup| NodeKind::File {
                    content: dup,
                    size: *size,
                    mime_type: mime_for_name(&name).to_string(),
                }),
            };
            let created = cloned.and_then(|kind| self.create_node(parent, &name, kind, now));
            match created {
                Ok(new_id) => {
                    new_ids.push(new_id);
                    for (child_name, child_id) in self.children_of(src_id) {
                        queue.push_back((child_id, new_id, child_name));
                    }
                }
                Err(err) => {
                    // Undo the partial clone before surfacing the error.
                    for id in new_ids.iter().rev() {
                        if let Ok(node) = self.remove(*id) {
                            if let Some(cref) = node.content_ref() {
                                content.delete(cref);
                            }
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(new_ids)
    }

    /// Tear out a subtree without the empty-directory check, children
    /// first. Used to roll back a failed copy persist.
    pub fn remove_subtree_forced(&mut self, id: NodeId) -> Vec<Node> {
        let mut ids = self.subtree_ids(id);
        ids.reverse();
        let mut removed = Vec::new();
        for node_id in ids {
            if let Ok(node) = self.remove(node_id) {
                removed.push(node);
            }
        }
        removed
    }
}
