//! Shared test helpers

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use boxtree_core::config::SyncConfig;
use boxtree_core::domain::{ErrorKind, NodeKind, RemoteId, TreeNode};
use boxtree_core::ports::{
    IRemoteStore, ITreeObserver, RemoteEntry, RemoteError, RemoteResult,
};
use boxtree_sync::{InMemoryRemoteStore, TreeSynchronizer};

/// Observer that records every callback
#[derive(Default)]
pub struct RecordingObserver {
    pub refreshed: Mutex<Vec<RemoteId>>,
    pub errors: Mutex<Vec<(RemoteId, ErrorKind)>>,
}

impl ITreeObserver for RecordingObserver {
    fn on_refreshed(&self, node: &TreeNode) {
        self.refreshed.lock().unwrap().push(node.id().clone());
    }

    fn on_error(&self, node: &RemoteId, kind: ErrorKind) {
        self.errors.lock().unwrap().push((node.clone(), kind));
    }
}

pub fn sync_config(page_limit: u32) -> SyncConfig {
    SyncConfig {
        page_limit,
        max_depth: None,
        ..SyncConfig::default()
    }
}

/// Creates a store, an observer and a synchronizer wired to both
pub fn setup(
    page_limit: u32,
) -> (
    Arc<InMemoryRemoteStore>,
    Arc<RecordingObserver>,
    TreeSynchronizer,
) {
    let store = Arc::new(InMemoryRemoteStore::new());
    let observer = Arc::new(RecordingObserver::default());
    let sync =
        TreeSynchronizer::new(store.clone(), sync_config(page_limit)).with_observer(observer.clone());
    (store, observer, sync)
}

/// Seeds a mixed hierarchy and returns the id of the `Docs` folder
///
/// ```text
/// All Files
/// ├── Docs/        (7 files, 1 subfolder)
/// │   └── Archive/ (2 files)
/// ├── Empty/
/// └── readme.md
/// ```
pub fn seed_tree(store: &InMemoryRemoteStore) -> RemoteId {
    let root = RemoteId::root();
    let docs = store.add_folder(&root, "Docs").unwrap();
    for i in 0..7 {
        store.add_file(&docs, &format!("doc-{i}.txt")).unwrap();
    }
    let archive = store.add_folder(&docs, "Archive").unwrap();
    store.add_file(&archive, "2019.zip").unwrap();
    store.add_file(&archive, "2020.zip").unwrap();
    store.add_folder(&root, "Empty").unwrap();
    store.add_file(&root, "readme.md").unwrap();
    docs
}

/// `(id, name, kind)` of a node's direct children
pub fn child_set(node: &TreeNode) -> BTreeSet<(String, String, NodeKind)> {
    node.children()
        .iter()
        .map(|c| (c.id().to_string(), c.name().to_string(), c.kind()))
        .collect()
}

/// `(id, name, kind)` of the store's entries under `id`
pub fn store_child_set(store: &InMemoryRemoteStore, id: &RemoteId) -> BTreeSet<(String, String, NodeKind)> {
    store
        .children_of(id)
        .into_iter()
        .map(|e| (e.id.to_string(), e.name, e.kind))
        .collect()
}

pub fn id(s: &str) -> RemoteId {
    RemoteId::new(s.to_string()).unwrap()
}

/// Store whose root listing is a fixed list of pages, keyed by offset
///
/// Used to feed listings that overlap between pages. Offsets without a
/// scripted page get the fallback page, or an empty one.
pub struct ScriptedListing {
    pages: Vec<(u64, Vec<RemoteEntry>)>,
    fallback: Vec<RemoteEntry>,
}

impl ScriptedListing {
    pub fn new(pages: Vec<(u64, Vec<RemoteEntry>)>) -> Self {
        Self {
            pages,
            fallback: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, page: Vec<RemoteEntry>) -> Self {
        self.fallback = page;
        self
    }
}

#[async_trait]
impl IRemoteStore for ScriptedListing {
    async fn get_node(&self, id: &RemoteId) -> RemoteResult<RemoteEntry> {
        Ok(RemoteEntry::new(id.clone(), "All Files", NodeKind::Folder))
    }

    async fn list_children(
        &self,
        id: &RemoteId,
        offset: u64,
        _limit: u32,
    ) -> RemoteResult<Vec<RemoteEntry>> {
        if !id.is_root() {
            return Ok(Vec::new());
        }
        Ok(self
            .pages
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|(_, page)| page.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }

    async fn create_child(&self, _parent: &RemoteId, _name: &str) -> RemoteResult<RemoteEntry> {
        Err(RemoteError::Unavailable("read-only".into()))
    }

    async fn rename(&self, _id: &RemoteId, _kind: NodeKind, _new_name: &str) -> RemoteResult<()> {
        Err(RemoteError::Unavailable("read-only".into()))
    }

    async fn delete(&self, _id: &RemoteId, _kind: NodeKind, _recursive: bool) -> RemoteResult<()> {
        Err(RemoteError::Unavailable("read-only".into()))
    }

    async fn upload(&self, _parent: &RemoteId, _local_path: &Path) -> RemoteResult<RemoteEntry> {
        Err(RemoteError::Unavailable("read-only".into()))
    }

    async fn get_download_link(&self, _id: &RemoteId) -> RemoteResult<String> {
        Err(RemoteError::Unavailable("read-only".into()))
    }
}
