//! The filesystem facade.
//!
//! Composes the node store, content store, and change notifier over an
//! async storage adapter. Every operation follows the same discipline:
//! validate and mutate the in-memory tree synchronously under the state
//! lock, persist the affected records, then announce the change. If the
//! persist step fails the in-memory mutation is rolled back, so callers
//! never observe state that will not survive a restart.
//!
//! The state lock is never held across an await.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::content::{ContentRef, ContentStore};
use crate::error::{Error, Result};
use crate::node::{DirEntry, Node, NodeId, NodeKind, NodeStat, ROOT_ID};
use crate::notify::{ChangeEvent, ChangeKind, Notifier, WatchCallback, WatchHandle};
use crate::path;
use crate::storage::{keys, StorageAdapter};
use crate::store::NodeStore;

/// Directory skeleton materialized on first boot, parents first.
const SEED_PATHS: &[&str] = &[
    "/System",
    "/Applications",
    "/Users",
    "/Users/default",
    "/Users/default/Desktop",
    "/Users/default/Documents",
];

#[derive(Default)]
struct State {
    store: NodeStore,
    content: ContentStore,
}

/// The public operation surface of the virtual filesystem.
///
/// Cheap to clone; clones share one tree.
#[derive(Clone)]
pub struct Fs {
    state: Arc<Mutex<State>>,
    storage: Arc<dyn StorageAdapter>,
    notifier: Notifier,
}

impl Fs {
    /// Open a filesystem over a storage adapter, loading persisted state
    /// or seeding the initial skeleton when none exists.
    pub async fn open(storage: Arc<dyn StorageAdapter>) -> Result<Fs> {
        let fs = Fs {
            state: Arc::new(Mutex::new(State::default())),
            storage,
            notifier: Notifier::new(),
        };
        let node_keys = fs.storage.list_keys_with_prefix(keys::NODE_PREFIX).await?;
        if node_keys.is_empty() {
            fs.seed().await?;
        } else {
            fs.load(node_keys).await?;
        }
        Ok(fs)
    }

    async fn seed(&self) -> Result<()> {
        let now = now_micros();
        let records = {
            let mut state = self.state.lock().await;
            state.store.seed_root(now);
            for seed_path in SEED_PATHS {
                let (parent, name) = split_parent(seed_path)?;
                let parent_id = state.store.resolve(parent)?.id;
                state
                    .store
                    .create_node(parent_id, name, NodeKind::Directory, now)?;
            }
            self.node_records(&state, state.store.subtree_ids(ROOT_ID))?
        };
        // Nothing is observable yet, so a failure here just aborts open().
        for (key, bytes) in records {
            self.storage.put(&key, &bytes).await?;
        }
        diagnostics::log_info!("seeded initial directory tree");
        Ok(())
    }

    async fn load(&self, node_keys: Vec<String>) -> Result<()> {
        let mut nodes = Vec::with_capacity(node_keys.len());
        for key in &node_keys {
            match self.storage.get(key).await? {
                Some(bytes) => nodes.push(decode_node(&bytes)?),
                None => diagnostics::log_warn!("node key vanished during load: {key}", key: key.as_str()),
            }
        }

        let content_keys = self
            .storage
            .list_keys_with_prefix(keys::CONTENT_PREFIX)
            .await?;
        let mut blobs = Vec::with_capacity(content_keys.len());
        for key in &content_keys {
            let hex = &key[keys::CONTENT_PREFIX.len()..];
            let cref = ContentRef::from_hex_string(hex).map_err(Error::storage)?;
            match self.storage.get(key).await? {
                Some(bytes) => blobs.push((cref, bytes)),
                None => diagnostics::log_warn!("content key vanished during load: {key}", key: key.as_str()),
            }
        }

        let node_count = nodes.len();
        let mut state = self.state.lock().await;
        for node in nodes {
            state.store.insert_loaded(node);
        }
        for (cref, bytes) in blobs {
            state.content.insert(cref, bytes);
        }
        if !state.store.contains_root() {
            return Err(Error::storage("persisted tree has no root record"));
        }
        diagnostics::log_info!("loaded {count} nodes from storage", count: node_count);
        Ok(())
    }

    /// Create a directory, auto-creating missing parents.
    pub async fn mkdir(&self, raw: &str) -> Result<NodeStat> {
        let target = path::normalize(raw)?;
        if target == "/" {
            return Err(Error::already_exists("/"));
        }
        let now = now_micros();

        let (created, records, stat) = {
            let mut state = self.state.lock().await;
            let created = ensure_dirs(&mut state.store, &target, now, false)?;
            let records = self.node_records(&state, created.clone())?;
            let stat = NodeStat::from(state.store.resolve(&target)?);
            (created, records, stat)
        };

        if let Err(err) = self.persist_records(&records).await {
            self.rollback_created(&created, &[]).await;
            return Err(err);
        }

        diagnostics::log_debug!("mkdir {path}", path: target.as_str());
        self.notifier
            .notify(&ChangeEvent::new(ChangeKind::Create, target));
        Ok(stat)
    }

    /// List a directory in name order.
    ///
    /// An index entry whose node record is missing is skipped rather than
    /// failing the whole listing.
    pub async fn readdir(&self, raw: &str) -> Result<Vec<DirEntry>> {
        let target = path::normalize(raw)?;
        let state = self.state.lock().await;
        let dir = state.store.resolve(&target)?;
        if !dir.is_directory() {
            return Err(Error::not_a_directory(target));
        }

        let mut entries = Vec::new();
        for (name, child) in state.store.children_of(dir.id) {
            match state.store.get(child) {
                Some(node) => entries.push(DirEntry::from(node)),
                None => {
                    diagnostics::log_warn!(
                        "skipping dangling entry {name} under {path}",
                        name: name.as_str(),
                        path: target.as_str()
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Remove an empty directory.
    pub async fn rmdir(&self, raw: &str) -> Result<()> {
        let target = path::normalize(raw)?;
        let removed = {
            let mut state = self.state.lock().await;
            let node = state.store.resolve(&target)?;
            if !node.is_directory() {
                return Err(Error::not_a_directory(target));
            }
            let id = node.id;
            state.store.remove(id)?
        };

        if let Err(err) = self.storage.delete(&keys::node(removed.id)).await {
            diagnostics::log_error!("rmdir persist failed, rolling back: {err}", err: err);
            self.state.lock().await.store.insert_loaded(removed);
            return Err(err);
        }

        diagnostics::log_debug!("rmdir {path}", path: target.as_str());
        self.notifier
            .notify(&ChangeEvent::new(ChangeKind::Delete, target));
        Ok(())
    }

    /// Read a file's payload.
    pub async fn read_file(&self, raw: &str) -> Result<Vec<u8>> {
        let target = path::normalize(raw)?;
        let state = self.state.lock().await;
        let node = state.store.resolve(&target)?;
        let cref = node
            .content_ref()
            .ok_or_else(|| Error::is_a_directory(&*target))?;
        Ok(state.content.get(cref)?.to_vec())
    }

    /// Read a file's payload as UTF-8 text.
    pub async fn read_text_file(&self, raw: &str) -> Result<String> {
        let bytes = self.read_file(raw).await?;
        String::from_utf8(bytes)
            .map_err(|_| Error::invalid_path(format!("{}: not valid UTF-8", raw)))
    }

    /// Write a file, creating it (and missing parents) or overwriting it.
    pub async fn write_file(&self, raw: &str, data: &[u8]) -> Result<NodeStat> {
        let target = path::normalize(raw)?;
        if target == "/" {
            return Err(Error::is_a_directory("/"));
        }
        let (parent_path, name) = split_parent(&target)?;
        let parent_path = parent_path.to_string();
        let name = name.to_string();
        let now = now_micros();

        enum Plan {
            Create {
                id: NodeId,
                cref: ContentRef,
                created_dirs: Vec<NodeId>,
            },
            Update {
                id: NodeId,
                cref: ContentRef,
                old_bytes: Vec<u8>,
                old_kind: NodeKind,
                old_updated: i64,
            },
        }

        let (plan, records, stat) = {
            let mut state = self.state.lock().await;
            let state = &mut *state;
            let created_dirs = ensure_dirs(&mut state.store, &parent_path, now, true)?;
            let parent_id = state.store.resolve(&parent_path)?.id;

            let plan = match state.store.child_of(parent_id, &name) {
                Some(existing) => {
                    let node = state
                        .store
                        .get_mut(existing)
                        .ok_or_else(|| Error::storage(format!("dangling entry {}", target)))?;
                    if !node.is_file() {
                        return Err(Error::is_a_directory(target));
                    }
                    let old_kind = node.kind.clone();
                    let cref = match &old_kind {
                        NodeKind::File { content, .. } => content.clone(),
                        NodeKind::Directory => unreachable!(),
                    };
                    let old_updated = node.updated_at;
                    node.kind = NodeKind::File {
                        content: cref.clone(),
                        size: data.len() as u64,
                        mime_type: crate::node::mime_for_name(&name).to_string(),
                    };
                    node.updated_at = now.max(node.created_at);
                    let old_bytes = state.content.replace(&cref, data.to_vec())?;
                    Plan::Update {
                        id: existing,
                        cref,
                        old_bytes,
                        old_kind,
                        old_updated,
                    }
                }
                None => {
                    let cref = state.content.put(data.to_vec());
                    let kind = NodeKind::File {
                        content: cref.clone(),
                        size: data.len() as u64,
                        mime_type: crate::node::mime_for_name(&name).to_string(),
                    };
                    let id = state.store.create_node(parent_id, &name, kind, now)?;
                    Plan::Create {
                        id,
                        cref,
                        created_dirs,
                    }
                }
            };

            let ids = match &plan {
                Plan::Create {
                    id, created_dirs, ..
                } => {
                    let mut ids = created_dirs.clone();
                    ids.push(*id);
                    ids
                }
                Plan::Update { id, .. } => vec![*id],
            };
            let records = self.node_records(&*state, ids)?;
            let stat = NodeStat::from(state.store.resolve(&target)?);
            (plan, records, stat)
        };

        let cref = match &plan {
            Plan::Create { cref, .. } | Plan::Update { cref, .. } => cref.clone(),
        };
        let persist = async {
            self.storage.put(&keys::content(&cref), data).await?;
            self.persist_records(&records).await
        };
        if let Err(err) = persist.await {
            diagnostics::log_error!("write_file persist failed, rolling back: {err}", err: err);
            let mut state = self.state.lock().await;
            match plan {
                Plan::Create {
                    id, cref, created_dirs,
                } => {
                    let _ = state.store.remove(id);
                    state.content.delete(&cref);
                    for dir in created_dirs.iter().rev() {
                        let _ = state.store.remove(*dir);
                    }
                }
                Plan::Update {
                    id,
                    cref,
                    old_bytes,
                    old_kind,
                    old_updated,
                } => {
                    let _ = state.content.replace(&cref, old_bytes);
                    if let Some(node) = state.store.get_mut(id) {
                        node.kind = old_kind;
                        node.updated_at = old_updated;
                    }
                }
            }
            return Err(err);
        }

        let kind = match plan {
            Plan::Create { .. } => ChangeKind::Create,
            Plan::Update { .. } => ChangeKind::Update,
        };
        diagnostics::log_debug!("write_file {path} ({len} bytes)", path: target.as_str(), len: data.len());
        self.notifier.notify(&ChangeEvent::new(kind, target));
        Ok(stat)
    }

    /// Write UTF-8 text to a file.
    pub async fn write_text_file(&self, raw: &str, text: &str) -> Result<NodeStat> {
        self.write_file(raw, text.as_bytes()).await
    }

    /// Delete a file.
    pub async fn delete_file(&self, raw: &str) -> Result<()> {
        let target = path::normalize(raw)?;
        let (removed, content_bytes) = {
            let mut state = self.state.lock().await;
            let state = &mut *state;
            let node = state.store.resolve(&target)?;
            if !node.is_file() {
                return Err(Error::is_a_directory(target));
            }
            let id = node.id;
            let removed = state.store.remove(id)?;
            let bytes = removed
                .content_ref()
                .and_then(|cref| state.content.delete(cref));
            (removed, bytes)
        };

        let delete = async {
            self.storage.delete(&keys::node(removed.id)).await?;
            if let Some(cref) = removed.content_ref() {
                self.storage.delete(&keys::content(cref)).await?;
            }
            Ok::<(), Error>(())
        };
        if let Err(err) = delete.await {
            diagnostics::log_error!("delete_file persist failed, rolling back: {err}", err: err);
            let mut state = self.state.lock().await;
            if let (Some(cref), Some(bytes)) = (removed.content_ref().cloned(), content_bytes) {
                state.content.insert(cref, bytes);
            }
            state.store.insert_loaded(removed);
            return Err(err);
        }

        diagnostics::log_debug!("delete_file {path}", path: target.as_str());
        self.notifier
            .notify(&ChangeEvent::new(ChangeKind::Delete, target));
        Ok(())
    }

    /// Metadata for a path.
    pub async fn stat(&self, raw: &str) -> Result<NodeStat> {
        let target = path::normalize(raw)?;
        let state = self.state.lock().await;
        Ok(NodeStat::from(state.store.resolve(&target)?))
    }

    /// Whether a path resolves. Never errors; malformed paths are `false`.
    pub async fn exists(&self, raw: &str) -> bool {
        let Ok(target) = path::normalize(raw) else {
            return false;
        };
        self.state.lock().await.store.resolve(&target).is_ok()
    }

    /// Move or rename a node. The destination parent must already exist.
    pub async fn rename(&self, old_raw: &str, new_raw: &str) -> Result<NodeStat> {
        let old_path = path::normalize(old_raw)?;
        let new_path = path::normalize(new_raw)?;
        if old_path == "/" {
            return Err(Error::invalid_path("the root directory cannot be renamed"));
        }
        if new_path == "/" || new_path == old_path {
            return Err(Error::already_exists(new_path));
        }
        let now = now_micros();

        let (moved_id, old_parent, old_name, old_updated, records, stat) = {
            let mut state = self.state.lock().await;
            let node = state.store.resolve(&old_path)?;
            let (moved_id, old_parent, old_name, old_updated) =
                (node.id, node.parent, node.name.clone(), node.updated_at);

            let (new_parent_path, new_name) = split_parent(&new_path)?;
            let parent = state.store.resolve(new_parent_path)?;
            if !parent.is_directory() {
                return Err(Error::not_a_directory(new_parent_path));
            }
            let parent_id = parent.id;
            state.store.move_node(moved_id, parent_id, new_name, now)?;

            let records = self.node_records(&state, state.store.subtree_ids(moved_id))?;
            let stat = NodeStat::from(state.store.resolve(&new_path)?);
            (moved_id, old_parent, old_name, old_updated, records, stat)
        };

        if let Err(err) = self.persist_records(&records).await {
            diagnostics::log_error!("rename persist failed, rolling back: {err}", err: err);
            let mut state = self.state.lock().await;
            let parent = old_parent.unwrap_or(ROOT_ID);
            // Passing the old timestamp restores updated_at along with the move.
            if state
                .store
                .move_node(moved_id, parent, &old_name, old_updated)
                .is_err()
            {
                diagnostics::log_error!("rename rollback failed for {path}", path: old_path.as_str());
            }
            return Err(err);
        }

        diagnostics::log_debug!("rename {old} -> {new}", old: old_path.as_str(), new: new_path.as_str());
        self.notifier
            .notify(&ChangeEvent::rename(old_path, new_path));
        Ok(stat)
    }

    /// Deep value-copy of a file or directory subtree.
    pub async fn copy(&self, src_raw: &str, dest_raw: &str) -> Result<NodeStat> {
        let src_path = path::normalize(src_raw)?;
        let dest_path = path::normalize(dest_raw)?;
        if dest_path == "/" || dest_path == src_path {
            return Err(Error::already_exists(dest_path));
        }
        if path::is_prefix_of(&src_path, &dest_path) {
            return Err(Error::invalid_path(format!(
                "cannot copy {} into its own subtree",
                src_path
            )));
        }
        let now = now_micros();

        let (new_ids, records, blobs, stat) = {
            let mut state = self.state.lock().await;
            let state = &mut *state;
            let src_id = state.store.resolve(&src_path)?.id;

            let (dest_parent_path, dest_name) = split_parent(&dest_path)?;
            let parent = state.store.resolve(dest_parent_path)?;
            if !parent.is_directory() {
                return Err(Error::not_a_directory(dest_parent_path));
            }
            let parent_id = parent.id;
            if state.store.child_of(parent_id, dest_name).is_some() {
                return Err(Error::already_exists(dest_path));
            }

            let new_ids =
                state
                    .store
                    .clone_subtree(src_id, parent_id, dest_name, now, &mut state.content)?;
            let records = self.node_records(&*state, new_ids.clone())?;
            let mut blobs = Vec::new();
            for id in &new_ids {
                if let Some(cref) = state.store.get(*id).and_then(|n| n.content_ref()) {
                    blobs.push((cref.clone(), state.content.get(cref)?.to_vec()));
                }
            }
            let stat = NodeStat::from(state.store.resolve(&dest_path)?);
            (new_ids, records, blobs, stat)
        };

        let persist = async {
            for (cref, bytes) in &blobs {
                self.storage.put(&keys::content(cref), bytes).await?;
            }
            self.persist_records(&records).await
        };
        if let Err(err) = persist.await {
            self.rollback_created(&new_ids, &blobs).await;
            return Err(err);
        }

        diagnostics::log_debug!("copy {src} -> {dest}", src: src_path.as_str(), dest: dest_path.as_str());
        self.notifier
            .notify(&ChangeEvent::new(ChangeKind::Create, dest_path));
        Ok(stat)
    }

    /// Subscribe to mutations under a prefix.
    pub fn watch(&self, prefix: &str, callback: WatchCallback) -> Result<WatchHandle> {
        let normalized = path::normalize(prefix)?;
        Ok(self.notifier.subscribe(&normalized, callback))
    }

    // Serialize the given nodes into (key, record) pairs for persistence.
    fn node_records(&self, state: &State, ids: Vec<NodeId>) -> Result<Vec<(String, Vec<u8>)>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let node = state
                .store
                .get(id)
                .ok_or_else(|| Error::storage(format!("missing node {} during persist", id)))?;
            records.push((keys::node(id), encode_node(node)?));
        }
        Ok(records)
    }

    async fn persist_records(&self, records: &[(String, Vec<u8>)]) -> Result<()> {
        for (key, bytes) in records {
            self.storage.put(key, bytes).await?;
        }
        Ok(())
    }

    // Undo an in-memory creation (mkdir or copy) after a failed persist,
    // then best-effort remove whatever partial records reached storage.
    async fn rollback_created(&self, ids: &[NodeId], blobs: &[(ContentRef, Vec<u8>)]) {
        {
            let mut state = self.state.lock().await;
            for id in ids.iter().rev() {
                let _ = state.store.remove(*id);
            }
            for (cref, _) in blobs {
                state.content.delete(cref);
            }
        }
        for id in ids {
            if self.storage.delete(&keys::node(*id)).await.is_err() {
                diagnostics::log_warn!("orphan node record left in storage: {id}", id: id.to_hex_string());
            }
        }
        for (cref, _) in blobs {
            if self.storage.delete(&keys::content(cref)).await.is_err() {
                diagnostics::log_warn!("orphan content left in storage: {cref}", cref: cref.to_hex_string());
            }
        }
    }
}


fn split_parent(normalized: &str) -> Result<(&str, &str)> {
    match (path::parent_of(normalized), path::basename(normalized)) {
        (Some(parent), Some(name)) => Ok((parent, name)),
        _ => Err(Error::invalid_path(normalized)),
    }
}

/// Walk `normalized` from the root, creating missing directories.
///
/// With `exist_ok` the terminal directory may already exist; without it an
/// existing terminal entry of either kind is `EEXIST`. Returns the ids of
/// the directories created, parents first.
fn ensure_dirs(
    store: &mut NodeStore,
    normalized: &str,
    now: i64,
    exist_ok: bool,
) -> Result<Vec<NodeId>> {
    let segments = path::segments(normalized);
    let mut created = Vec::new();
    let mut current = ROOT_ID;
    let count = segments.len();
    for (index, segment) in segments.into_iter().enumerate() {
        let terminal = index + 1 == count;
        match store.child_of(current, segment) {
            Some(child) => {
                let node = store
                    .get(child)
                    .ok_or_else(|| Error::storage(format!("dangling entry {}", normalized)))?;
                if terminal && !exist_ok {
                    return Err(Error::already_exists(normalized));
                }
                if !node.is_directory() {
                    return Err(Error::not_a_directory(node.path.clone()));
                }
                current = child;
            }
            None => {
                let id = store.create_node(current, segment, NodeKind::Directory, now)?;
                created.push(id);
                current = id;
            }
        }
    }
    Ok(created)
}

fn encode_node(node: &Node) -> Result<Vec<u8>> {
    serde_json::to_vec(node).map_err(|e| Error::storage(format!("encode node: {}", e)))
}

fn decode_node(bytes: &[u8]) -> Result<Node> {
    serde_json::from_slice(bytes).map_err(|e| Error::storage(format!("decode node: {}", e)))
}

fn now_micros() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or_default()
}
