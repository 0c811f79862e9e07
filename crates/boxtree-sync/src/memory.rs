//! In-memory remote store
//!
//! A deterministic [`IRemoteStore`] that keeps the whole hierarchy in a map
//! and records every call it receives. It behaves like Box where it matters to
//! the synchronizer: names are unique per folder (case-insensitive), non-empty
//! folders refuse non-recursive deletion, and the root cannot be renamed or
//! deleted.
//!
//! Seeding helpers (`add_folder`, `add_file`, `remove`, `rename_item`) change
//! the store without being recorded, which is how tests simulate changes made
//! by other clients.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::trace;

use boxtree_core::domain::{NodeKind, RemoteId};
use boxtree_core::ports::{IRemoteStore, RemoteEntry, RemoteError, RemoteResult};

/// Name of the root folder, as Box reports it
pub const ROOT_NAME: &str = "All Files";

/// Operation selector for injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetNode,
    ListChildren,
    CreateChild,
    Rename,
    Delete,
    Upload,
    GetDownloadLink,
}

/// A call received by the store, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetNode(RemoteId),
    ListChildren {
        id: RemoteId,
        offset: u64,
        limit: u32,
    },
    CreateChild {
        parent: RemoteId,
        name: String,
    },
    Rename {
        id: RemoteId,
        new_name: String,
    },
    Delete {
        id: RemoteId,
        recursive: bool,
    },
    Upload {
        parent: RemoteId,
        name: String,
    },
    GetDownloadLink(RemoteId),
}

#[derive(Debug)]
struct StoredItem {
    entry: RemoteEntry,
    children: Vec<RemoteId>,
}

#[derive(Debug)]
struct StoreState {
    items: HashMap<RemoteId, StoredItem>,
    next_id: u64,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, VecDeque<RemoteError>>,
}

impl StoreState {
    fn allocate_id(&mut self) -> RemoteResult<RemoteId> {
        self.next_id += 1;
        RemoteId::new(self.next_id.to_string()).map_err(|e| RemoteError::Unavailable(e.to_string()))
    }

    fn take_failure(&mut self, op: StoreOp) -> RemoteResult<()> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn folder(&self, id: &RemoteId) -> RemoteResult<&StoredItem> {
        match self.items.get(id) {
            Some(item) if item.entry.kind.is_folder() => Ok(item),
            Some(_) => Err(RemoteError::Unavailable(format!("{id} is not a folder"))),
            None => Err(RemoteError::NotFound),
        }
    }

    fn sibling_named(&self, parent: &RemoteId, name: &str) -> Option<RemoteId> {
        let folder = self.items.get(parent)?;
        folder
            .children
            .iter()
            .find(|child| {
                self.items
                    .get(*child)
                    .is_some_and(|c| c.entry.name.eq_ignore_ascii_case(name))
            })
            .cloned()
    }

    fn insert(&mut self, parent: &RemoteId, name: &str, kind: NodeKind) -> RemoteResult<RemoteEntry> {
        self.folder(parent)?;
        if let Some(existing) = self.sibling_named(parent, name) {
            return Err(RemoteError::Conflict {
                conflicting_id: Some(existing),
            });
        }
        let id = self.allocate_id()?;
        let entry = RemoteEntry::new(id.clone(), name, kind);
        self.items.insert(
            id.clone(),
            StoredItem {
                entry: entry.clone(),
                children: Vec::new(),
            },
        );
        if let Some(folder) = self.items.get_mut(parent) {
            folder.children.push(id);
        }
        Ok(entry)
    }

    fn remove_subtree(&mut self, id: &RemoteId) {
        if let Some(item) = self.items.remove(id) {
            for child in item.children {
                self.remove_subtree(&child);
            }
        }
        for item in self.items.values_mut() {
            item.children.retain(|c| c != id);
        }
    }

    fn set_name(&mut self, id: &RemoteId, new_name: &str) -> RemoteResult<()> {
        let parent = self
            .items
            .iter()
            .find(|(_, item)| item.children.contains(id))
            .map(|(pid, _)| pid.clone());
        if let Some(parent) = parent {
            if let Some(existing) = self.sibling_named(&parent, new_name) {
                if &existing != id {
                    return Err(RemoteError::Conflict {
                        conflicting_id: Some(existing),
                    });
                }
            }
        }
        let item = self.items.get_mut(id).ok_or(RemoteError::NotFound)?;
        item.entry.name = new_name.to_string();
        Ok(())
    }
}

/// Deterministic, call-recording [`IRemoteStore`]
pub struct InMemoryRemoteStore {
    state: Mutex<StoreState>,
}

impl InMemoryRemoteStore {
    /// Creates a store holding only the root folder
    pub fn new() -> Self {
        let root = RemoteId::root();
        let mut items = HashMap::new();
        items.insert(
            root.clone(),
            StoredItem {
                entry: RemoteEntry::new(root, ROOT_NAME, NodeKind::Folder),
                children: Vec::new(),
            },
        );
        Self {
            state: Mutex::new(StoreState {
                items,
                next_id: 1000,
                calls: Vec::new(),
                failures: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- seeding (not recorded) ---

    /// Adds a folder under `parent`
    pub fn add_folder(&self, parent: &RemoteId, name: &str) -> RemoteResult<RemoteId> {
        self.lock()
            .insert(parent, name, NodeKind::Folder)
            .map(|e| e.id)
    }

    /// Adds a file under `parent`
    pub fn add_file(&self, parent: &RemoteId, name: &str) -> RemoteResult<RemoteId> {
        self.lock().insert(parent, name, NodeKind::File).map(|e| e.id)
    }

    /// Adds a web link under `parent`
    pub fn add_web_link(&self, parent: &RemoteId, name: &str) -> RemoteResult<RemoteId> {
        self.lock()
            .insert(parent, name, NodeKind::WebLink)
            .map(|e| e.id)
    }

    /// Removes an item and everything below it
    pub fn remove(&self, id: &RemoteId) {
        self.lock().remove_subtree(id);
    }

    /// Renames an item
    pub fn rename_item(&self, id: &RemoteId, new_name: &str) -> RemoteResult<()> {
        self.lock().set_name(id, new_name)
    }

    /// Queues a one-shot failure for the next call of `op`
    pub fn fail_next(&self, op: StoreOp, err: RemoteError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    // --- inspection ---

    /// Every call received so far
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Forgets recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of listing passes started for `id` (calls with offset 0)
    pub fn listing_passes(&self, id: &RemoteId) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, StoreCall::ListChildren { id: i, offset: 0, .. } if i == id))
            .count()
    }

    /// Entries currently stored directly under `id`
    pub fn children_of(&self, id: &RemoteId) -> Vec<RemoteEntry> {
        let state = self.lock();
        state
            .items
            .get(id)
            .map(|folder| {
                folder
                    .children
                    .iter()
                    .filter_map(|c| state.items.get(c).map(|i| i.entry.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns true if the store holds `id`
    pub fn exists(&self, id: &RemoteId) -> bool {
        self.lock().items.contains_key(id)
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IRemoteStore for InMemoryRemoteStore {
    async fn get_node(&self, id: &RemoteId) -> RemoteResult<RemoteEntry> {
        let mut state = self.lock();
        state.calls.push(StoreCall::GetNode(id.clone()));
        state.take_failure(StoreOp::GetNode)?;
        state
            .items
            .get(id)
            .map(|i| i.entry.clone())
            .ok_or(RemoteError::NotFound)
    }

    async fn list_children(
        &self,
        id: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> RemoteResult<Vec<RemoteEntry>> {
        let mut state = self.lock();
        state.calls.push(StoreCall::ListChildren {
            id: id.clone(),
            offset,
            limit,
        });
        state.take_failure(StoreOp::ListChildren)?;
        let folder = state.folder(id)?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let page: Vec<RemoteEntry> = folder
            .children
            .iter()
            .skip(start)
            .take(limit as usize)
            .filter_map(|c| state.items.get(c).map(|i| i.entry.clone()))
            .collect();
        trace!(id = %id, offset, limit, returned = page.len(), "list_children");
        Ok(page)
    }

    async fn create_child(&self, parent: &RemoteId, name: &str) -> RemoteResult<RemoteEntry> {
        let mut state = self.lock();
        state.calls.push(StoreCall::CreateChild {
            parent: parent.clone(),
            name: name.to_string(),
        });
        state.take_failure(StoreOp::CreateChild)?;
        state.insert(parent, name, NodeKind::Folder)
    }

    async fn rename(&self, id: &RemoteId, _kind: NodeKind, new_name: &str) -> RemoteResult<()> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Rename {
            id: id.clone(),
            new_name: new_name.to_string(),
        });
        state.take_failure(StoreOp::Rename)?;
        if id.is_root() {
            return Err(RemoteError::AccessDenied("root folder".to_string()));
        }
        state.set_name(id, new_name)
    }

    async fn delete(&self, id: &RemoteId, _kind: NodeKind, recursive: bool) -> RemoteResult<()> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Delete {
            id: id.clone(),
            recursive,
        });
        state.take_failure(StoreOp::Delete)?;
        if id.is_root() {
            return Err(RemoteError::AccessDenied("root folder".to_string()));
        }
        let item = state.items.get(id).ok_or(RemoteError::NotFound)?;
        if !recursive && !item.children.is_empty() {
            return Err(RemoteError::FolderNotEmpty);
        }
        state.remove_subtree(id);
        Ok(())
    }

    /// Stores an entry named after the path's file name; the local file is not read.
    async fn upload(&self, parent: &RemoteId, local_path: &Path) -> RemoteResult<RemoteEntry> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                RemoteError::Unavailable(format!("no file name in {}", local_path.display()))
            })?;
        let mut state = self.lock();
        state.calls.push(StoreCall::Upload {
            parent: parent.clone(),
            name: name.clone(),
        });
        state.take_failure(StoreOp::Upload)?;
        state.insert(parent, &name, NodeKind::File)
    }

    async fn get_download_link(&self, id: &RemoteId) -> RemoteResult<String> {
        let mut state = self.lock();
        state.calls.push(StoreCall::GetDownloadLink(id.clone()));
        state.take_failure(StoreOp::GetDownloadLink)?;
        match state.items.get(id) {
            Some(item) if item.entry.kind.is_file() => {
                Ok(format!("https://memory.invalid/shared/static/{id}"))
            }
            Some(_) => Err(RemoteError::Unavailable(format!("{id} is not a file"))),
            None => Err(RemoteError::NotFound),
        }
    }
}
