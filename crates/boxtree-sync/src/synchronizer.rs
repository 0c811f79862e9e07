//! Tree synchronizer
//!
//! The [`TreeSynchronizer`] owns the local [`TreeNode`] tree and is the only
//! component that calls the remote store. Every operation follows the same
//! shape:
//!
//! 1. Validate the target against the local tree (no remote call on failure)
//! 2. Perform the remote call(s), awaited sequentially
//! 3. Apply the confirmed change locally, or leave the tree untouched
//! 4. Notify the observer once
//!
//! Rebuilding a folder never mutates the tree while listing: the replacement
//! child list is built off-tree and swapped in with
//! [`TreeNode::replace_children`].

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use boxtree_core::config::SyncConfig;
use boxtree_core::domain::{NodeKind, NodeState, RemoteId, SyncError, TreeNode};
use boxtree_core::ports::{
    IRemoteStore, ITreeObserver, IntentOutcome, RemoteEntry, RemoteError, TreeIntent,
    UploadOutcome,
};

/// Name shown for the root folder until the store reports its real name
const DEFAULT_ROOT_NAME: &str = "All Files";

/// Longest name Box accepts for files and folders
const MAX_NAME_LEN: usize = 255;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Keeps a local tree consistent with the remote store
pub struct TreeSynchronizer {
    store: Arc<dyn IRemoteStore>,
    config: SyncConfig,
    observer: Option<Arc<dyn ITreeObserver>>,
    root: TreeNode,
}

impl TreeSynchronizer {
    /// Creates a synchronizer with an unloaded root folder
    pub fn new(store: Arc<dyn IRemoteStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            observer: None,
            root: TreeNode::root(DEFAULT_ROOT_NAME),
        }
    }

    /// Registers the observer told about every operation's result
    pub fn with_observer(mut self, observer: Arc<dyn ITreeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Looks up a node in the local tree
    pub fn node(&self, id: &RemoteId) -> Option<&TreeNode> {
        self.root.find(id)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Fetches the root folder and builds its subtree
    pub async fn load_root(&mut self) -> Result<(), SyncError> {
        let root_id = RemoteId::root();
        let result = self.apply_load_root(&root_id).await;
        self.report(&root_id, Some(&root_id), &result);
        result
    }

    async fn apply_load_root(&mut self, root_id: &RemoteId) -> Result<(), SyncError> {
        let entry = self
            .store
            .get_node(root_id)
            .await
            .map_err(|e| SyncError::from_remote(e, root_id))?;
        let children = self.fetch_children(root_id, self.config.max_depth).await?;

        self.root.set_name(entry.name);
        self.root.replace_children(children)?;
        info!(
            name = %self.root.name(),
            nodes = self.root.descendant_count(),
            "Loaded remote tree"
        );
        Ok(())
    }

    /// Builds the subtree of a folder from the remote listing
    ///
    /// Descends into subfolders up to `sync.max_depth` levels; deeper
    /// folders are left `Unloaded`.
    pub async fn build_subtree(&mut self, id: &RemoteId) -> Result<(), SyncError> {
        let result = self.rebuild(id).await;
        self.report(id, Some(id), &result);
        result
    }

    /// Loads an `Unloaded` folder; does nothing for folders already built
    pub async fn expand(&mut self, id: &RemoteId) -> Result<(), SyncError> {
        let result = self.apply_expand(id).await;
        self.report(id, Some(id), &result);
        result
    }

    async fn apply_expand(&mut self, id: &RemoteId) -> Result<(), SyncError> {
        let node = self.folder(id)?;
        if node.state() != NodeState::Unloaded {
            debug!(id = %id, state = %node.state(), "Folder already loaded");
            return Ok(());
        }
        self.rebuild(id).await
    }

    /// Replaces a folder's children with a fresh remote listing
    pub async fn refresh(&mut self, id: &RemoteId) -> Result<(), SyncError> {
        let result = self.rebuild(id).await;
        self.report(id, Some(id), &result);
        result
    }

    /// Lists `id` and swaps the result in as its new child list
    async fn rebuild(&mut self, id: &RemoteId) -> Result<(), SyncError> {
        self.folder(id)?;
        let children = self.fetch_children(id, self.config.max_depth).await?;

        let node = self
            .root
            .find_mut(id)
            .ok_or_else(|| SyncError::UnknownNode(id.clone()))?;
        let previous = node.replace_children(children)?;
        debug!(
            id = %id,
            children = node.children().len(),
            replaced = previous.len(),
            "Rebuilt folder"
        );
        Ok(())
    }

    /// Builds a detached child list for folder `id`
    ///
    /// `depth` counts the folder levels still to build: `Some(1)` lists `id`
    /// only, `None` has no limit.
    fn fetch_children<'a>(
        &'a self,
        id: &'a RemoteId,
        depth: Option<u32>,
    ) -> BoxFuture<'a, Result<Vec<TreeNode>, SyncError>> {
        Box::pin(async move {
            let entries = self.list_all(id).await?;
            let mut children = Vec::with_capacity(entries.len());

            for entry in entries {
                let mut node = TreeNode::new(entry.kind, entry.id, entry.name, Some(id.clone()));
                match entry.kind {
                    NodeKind::File | NodeKind::WebLink => node.mark_loaded(),
                    NodeKind::Folder => {
                        if depth.map_or(true, |d| d > 1) {
                            let child_id = node.id().clone();
                            let grandchildren = self
                                .fetch_children(&child_id, depth.map(|d| d - 1))
                                .await?;
                            node.replace_children(grandchildren)?;
                        }
                    }
                }
                children.push(node);
            }

            Ok(children)
        })
    }

    /// Pages through a folder listing until a short page arrives
    ///
    /// Entries are keyed by id; an id seen on an earlier page is dropped.
    /// A listing that is still returning full pages after `sync.max_pages`
    /// fails with `RemoteUnavailable` rather than ending early.
    async fn list_all(&self, id: &RemoteId) -> Result<Vec<RemoteEntry>, SyncError> {
        let limit = self.config.page_limit.max(1);
        let max_pages = self.config.max_pages.max(1);
        let mut offset: u64 = 0;
        let mut seen: HashSet<RemoteId> = HashSet::new();
        let mut entries = Vec::new();

        for _ in 0..max_pages {
            let page = self
                .store
                .list_children(id, offset, limit)
                .await
                .map_err(|e| SyncError::from_remote(e, id))?;
            let page_len = page.len();

            for entry in page {
                if seen.insert(entry.id.clone()) {
                    entries.push(entry);
                } else {
                    debug!(folder = %id, id = %entry.id, "Dropping duplicate listing entry");
                }
            }

            if page_len < limit as usize {
                return Ok(entries);
            }
            offset += u64::from(limit);
        }

        warn!(folder = %id, max_pages, "Listing never returned a short page");
        Err(SyncError::RemoteUnavailable(format!(
            "listing of folder {id} did not end after {max_pages} pages"
        )))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Renames a node
    ///
    /// The local name changes only after the store confirms it; the node is
    /// then marked `Stale` and no listing is fetched.
    pub async fn rename(&mut self, id: &RemoteId, new_name: &str) -> Result<(), SyncError> {
        let result = self.apply_rename(id, new_name).await;
        self.report(id, Some(id), &result);
        result
    }

    async fn apply_rename(&mut self, id: &RemoteId, new_name: &str) -> Result<(), SyncError> {
        if id.is_root() {
            return Err(SyncError::ProtectedNode);
        }
        let kind = self.lookup(id)?.kind();
        validate_name(new_name)?;

        self.store
            .rename(id, kind, new_name)
            .await
            .map_err(|e| SyncError::from_remote(e, id))?;

        let node = self
            .root
            .find_mut(id)
            .ok_or_else(|| SyncError::UnknownNode(id.clone()))?;
        let old_name = node.name().to_string();
        node.set_name(new_name);
        node.invalidate();
        info!(id = %id, from = %old_name, to = %new_name, "Renamed");
        Ok(())
    }

    /// Deletes a node
    ///
    /// Folders are deleted recursively exactly when they have children. For
    /// a folder that was never listed, one single-entry listing decides.
    pub async fn delete_node(&mut self, id: &RemoteId) -> Result<(), SyncError> {
        let parent = self.node(id).and_then(|n| n.parent().cloned());
        let result = self.apply_delete(id).await;
        self.report(id, parent.as_ref(), &result);
        result
    }

    async fn apply_delete(&mut self, id: &RemoteId) -> Result<(), SyncError> {
        if id.is_root() {
            return Err(SyncError::ProtectedNode);
        }
        let node = self.lookup(id)?;
        let kind = node.kind();
        let recursive = match kind {
            NodeKind::File | NodeKind::WebLink => false,
            NodeKind::Folder if node.state() == NodeState::Unloaded => {
                let first_page = self
                    .store
                    .list_children(id, 0, 1)
                    .await
                    .map_err(|e| SyncError::from_remote(e, id))?;
                !first_page.is_empty()
            }
            NodeKind::Folder => !node.children().is_empty(),
        };

        self.store
            .delete(id, kind, recursive)
            .await
            .map_err(|e| SyncError::from_remote(e, id))?;

        if let Some(parent) = self.root.find_parent_mut(id) {
            parent.remove_child(id);
        }
        info!(id = %id, kind = %kind, recursive, "Deleted");
        Ok(())
    }

    /// Creates a folder under `parent` and returns its id
    ///
    /// Once the store has created the folder its id is returned even if the
    /// follow-up listing fails; that failure is reported to the observer and
    /// `parent` stays `Stale`.
    pub async fn create_folder(
        &mut self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteId, SyncError> {
        match self.apply_create_folder(parent, name).await {
            Ok((id, refreshed)) => {
                self.report(parent, Some(parent), &refreshed);
                Ok(id)
            }
            Err(e) => {
                let result = Err(e);
                self.report(parent, Some(parent), &result);
                result
            }
        }
    }

    async fn apply_create_folder(
        &mut self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<(RemoteId, Result<(), SyncError>), SyncError> {
        self.folder(parent)?;
        validate_name(name)?;

        let entry = match self.store.create_child(parent, name).await {
            Ok(entry) => entry,
            Err(RemoteError::Conflict { conflicting_id }) => {
                warn!(parent = %parent, name, existing = ?conflicting_id, "Folder name in use");
                return Err(SyncError::NameConflict { conflicting_id });
            }
            Err(e) => return Err(SyncError::from_remote(e, parent)),
        };
        info!(parent = %parent, id = %entry.id, name, "Created folder");

        let refreshed = self.refresh_after_mutation(parent).await;
        Ok((entry.id, refreshed))
    }

    /// Uploads local files into `parent`, one at a time in input order
    ///
    /// A failure affects only its own file. The folder is refreshed once
    /// after every file has been attempted; if that listing fails the
    /// outcomes are still returned, the failure goes to the observer and
    /// `parent` stays `Stale`.
    pub async fn upload_files(
        &mut self,
        parent: &RemoteId,
        paths: &[PathBuf],
    ) -> Result<Vec<UploadOutcome>, SyncError> {
        match self.apply_upload(parent, paths).await {
            Ok((outcomes, refreshed)) => {
                self.report(parent, Some(parent), &refreshed);
                Ok(outcomes)
            }
            Err(e) => {
                let result = Err(e);
                self.report(parent, Some(parent), &result);
                result
            }
        }
    }

    async fn apply_upload(
        &mut self,
        parent: &RemoteId,
        paths: &[PathBuf],
    ) -> Result<(Vec<UploadOutcome>, Result<(), SyncError>), SyncError> {
        self.folder(parent)?;

        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let outcome = self.upload_one(parent, path).await;
            outcomes.push(outcome);
        }

        let uploaded = outcomes.iter().filter(|o| o.is_uploaded()).count();
        info!(
            parent = %parent,
            attempted = paths.len(),
            uploaded,
            "Upload batch finished"
        );

        let refreshed = self.refresh_after_mutation(parent).await;
        Ok((outcomes, refreshed))
    }

    /// Marks `parent` stale and relists it after a confirmed remote change
    async fn refresh_after_mutation(&mut self, parent: &RemoteId) -> Result<(), SyncError> {
        self.invalidate(parent);
        self.rebuild(parent).await
    }

    async fn upload_one(&self, parent: &RemoteId, path: &Path) -> UploadOutcome {
        match self.store.upload(parent, path).await {
            Ok(entry) => {
                debug!(path = %path.display(), id = %entry.id, "Uploaded");
                UploadOutcome::Uploaded { id: entry.id }
            }
            Err(RemoteError::Conflict { conflicting_id }) => {
                warn!(path = %path.display(), existing = ?conflicting_id, "File name in use");
                UploadOutcome::Conflict {
                    existing: conflicting_id,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(path = %path.display(), error = %message, "Upload failed");
                UploadOutcome::Failed {
                    kind: SyncError::from_remote(e, parent).kind(),
                    message,
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns a direct download URL for a file
    pub async fn get_download_link(&self, id: &RemoteId) -> Result<String, SyncError> {
        let result = self.apply_download_link(id).await;
        self.report(id, None, &result);
        result
    }

    async fn apply_download_link(&self, id: &RemoteId) -> Result<String, SyncError> {
        let node = self.lookup(id)?;
        if !node.kind().is_file() {
            return Err(SyncError::InvalidOperation(format!(
                "{} is a {}; download links exist only for files",
                node.name(),
                node.kind()
            )));
        }
        self.store
            .get_download_link(id)
            .await
            .map_err(|e| SyncError::from_remote(e, id))
    }

    /// Routes a presentation intent to the matching operation
    pub async fn dispatch(&mut self, intent: TreeIntent) -> Result<IntentOutcome, SyncError> {
        debug!(?intent, "Dispatching intent");
        match intent {
            TreeIntent::Rename { target, new_name } => {
                self.rename(&target, &new_name).await?;
                Ok(IntentOutcome::Renamed)
            }
            TreeIntent::Delete { target } => {
                self.delete_node(&target).await?;
                Ok(IntentOutcome::Deleted)
            }
            TreeIntent::CreateFolder { parent, name } => {
                let id = self.create_folder(&parent, &name).await?;
                Ok(IntentOutcome::FolderCreated(id))
            }
            TreeIntent::Upload { parent, paths } => {
                let outcomes = self.upload_files(&parent, &paths).await?;
                Ok(IntentOutcome::Uploaded(outcomes))
            }
            TreeIntent::GetDownloadLink { target } => {
                let url = self.get_download_link(&target).await?;
                Ok(IntentOutcome::DownloadLink(url))
            }
            TreeIntent::Refresh { target } => {
                self.refresh(&target).await?;
                Ok(IntentOutcome::Refreshed)
            }
            TreeIntent::Expand { target } => {
                self.expand(&target).await?;
                Ok(IntentOutcome::Expanded)
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn lookup(&self, id: &RemoteId) -> Result<&TreeNode, SyncError> {
        self.root
            .find(id)
            .ok_or_else(|| SyncError::UnknownNode(id.clone()))
    }

    fn folder(&self, id: &RemoteId) -> Result<&TreeNode, SyncError> {
        let node = self.lookup(id)?;
        if !node.is_folder() {
            return Err(SyncError::InvalidOperation(format!(
                "{} is a file, not a folder",
                node.name()
            )));
        }
        Ok(node)
    }

    fn invalidate(&mut self, id: &RemoteId) {
        if let Some(node) = self.root.find_mut(id) {
            node.invalidate();
        }
    }

    /// Sends the single observer callback for a finished operation
    ///
    /// `changed` is the node whose subtree the operation modified; `None`
    /// for read-only operations.
    fn report<T>(
        &self,
        target: &RemoteId,
        changed: Option<&RemoteId>,
        result: &Result<T, SyncError>,
    ) {
        match result {
            Ok(_) => {
                let Some(observer) = &self.observer else {
                    return;
                };
                if let Some(node) = changed.and_then(|id| self.root.find(id)) {
                    observer.on_refreshed(node);
                }
            }
            Err(e) => {
                warn!(target = %target, error = %e, "Tree operation failed");
                if let Some(observer) = &self.observer {
                    observer.on_error(target, e.kind());
                }
            }
        }
    }
}

/// Rejects names Box would refuse
fn validate_name(name: &str) -> Result<(), SyncError> {
    let reason = if name.trim().is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is reserved"
    } else if name.contains('/') || name.contains('\\') {
        "name contains a path separator"
    } else if name.chars().count() > MAX_NAME_LEN {
        "name is longer than 255 characters"
    } else {
        return Ok(());
    };
    Err(SyncError::InvalidOperation(format!("{reason}: {name:?}")))
}
