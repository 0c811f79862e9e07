//! Local tree mirroring the remote folder hierarchy
//!
//! A [`TreeNode`] is a snapshot of one remote entry. The parent owns its
//! child list; a child only records its parent's id, so navigation upwards
//! goes through the root (see [`TreeNode::find_parent_mut`]).
//!
//! Nothing in this module talks to the remote store. All remote effects live
//! in the synchronizer, which uses these methods to apply confirmed changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::SyncError;
use super::newtypes::RemoteId;

// ============================================================================
// NodeKind / NodeState
// ============================================================================

/// Kind of a remote entry; fixed when the node is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
    /// A bookmark to an external URL; a leaf with no content to download
    #[serde(rename = "web_link")]
    WebLink,
}

impl NodeKind {
    /// Returns true for folders
    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }

    /// Returns true for files
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }

    /// Returns true for web links
    pub fn is_web_link(&self) -> bool {
        matches!(self, NodeKind::WebLink)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => write!(f, "file"),
            NodeKind::Folder => write!(f, "folder"),
            NodeKind::WebLink => write!(f, "web link"),
        }
    }
}

/// Synchronization state of a node
///
/// ```text
/// Unloaded --build--> Loaded --confirmed mutation--> Stale --refresh--> Loaded
///     any state --removed from parent--> Detached
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Children have never been fetched
    Unloaded,
    /// Children reflect the remote store as of the last build
    Loaded,
    /// A confirmed mutation touched this node or an ancestor since the last build
    Stale,
    /// Removed from the tree
    Detached,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Unloaded => "unloaded",
            NodeState::Loaded => "loaded",
            NodeState::Stale => "stale",
            NodeState::Detached => "detached",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// TreeNode
// ============================================================================

/// Local snapshot of one remote file or folder and its attachment point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    id: RemoteId,
    name: String,
    kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<RemoteId>,
    state: NodeState,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    children: Vec<TreeNode>,
}

impl TreeNode {
    /// Creates a node that is not yet attached to any tree
    pub fn new(
        kind: NodeKind,
        id: RemoteId,
        name: impl Into<String>,
        parent: Option<RemoteId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            parent,
            state: NodeState::Unloaded,
            children: Vec::new(),
        }
    }

    /// Creates the root folder node
    pub fn root(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Folder, RemoteId::root(), name, None)
    }

    // --- accessors ---

    pub fn id(&self) -> &RemoteId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&RemoteId> {
        self.parent.as_ref()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    // --- structure ---

    /// Attaches `child` under this folder
    ///
    /// # Errors
    /// `InvalidOperation` if this node is a file or a child with the same id
    /// is already attached.
    pub fn append_child(&mut self, mut child: TreeNode) -> Result<(), SyncError> {
        if !self.is_folder() {
            return Err(SyncError::InvalidOperation(format!(
                "cannot add children to file {}",
                self.id
            )));
        }
        if self.children.iter().any(|c| c.id == child.id) {
            return Err(SyncError::InvalidOperation(format!(
                "node {} is already a child of {}",
                child.id, self.id
            )));
        }
        child.parent = Some(self.id.clone());
        self.children.push(child);
        Ok(())
    }

    /// Removes every child and returns them marked `Detached`
    pub fn detach_children(&mut self) -> Vec<TreeNode> {
        let mut detached = std::mem::take(&mut self.children);
        for node in &mut detached {
            node.mark_detached();
        }
        detached
    }

    /// Replaces the child list in one step and marks this node `Loaded`
    ///
    /// Returns the previous children, marked `Detached`.
    ///
    /// # Errors
    /// `InvalidOperation` if this node is a file.
    pub fn replace_children(
        &mut self,
        mut children: Vec<TreeNode>,
    ) -> Result<Vec<TreeNode>, SyncError> {
        if !self.is_folder() {
            return Err(SyncError::InvalidOperation(format!(
                "cannot add children to file {}",
                self.id
            )));
        }
        for child in &mut children {
            child.parent = Some(self.id.clone());
        }
        let mut previous = std::mem::replace(&mut self.children, children);
        for node in &mut previous {
            node.mark_detached();
        }
        self.state = NodeState::Loaded;
        Ok(previous)
    }

    /// Detaches the direct child with the given id
    pub fn remove_child(&mut self, id: &RemoteId) -> Option<TreeNode> {
        let pos = self.children.iter().position(|c| &c.id == id)?;
        let mut node = self.children.remove(pos);
        node.mark_detached();
        Some(node)
    }

    // --- state ---

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn mark_loaded(&mut self) {
        self.state = NodeState::Loaded;
    }

    /// Marks this node and every loaded descendant `Stale`
    pub fn invalidate(&mut self) {
        if self.state == NodeState::Loaded {
            self.state = NodeState::Stale;
        }
        for child in &mut self.children {
            child.invalidate();
        }
    }

    fn mark_detached(&mut self) {
        self.state = NodeState::Detached;
        self.parent = None;
        for child in &mut self.children {
            child.mark_detached();
        }
    }

    // --- navigation ---

    /// Finds a node by id in this subtree
    pub fn find(&self, id: &RemoteId) -> Option<&TreeNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Finds a node by id in this subtree, mutably
    pub fn find_mut(&mut self, id: &RemoteId) -> Option<&mut TreeNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Finds the node whose child list holds `id`
    pub fn find_parent_mut(&mut self, id: &RemoteId) -> Option<&mut TreeNode> {
        if self.children.iter().any(|c| &c.id == id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_parent_mut(id))
    }

    /// Returns true if `id` is this node or one of its descendants
    pub fn contains(&self, id: &RemoteId) -> bool {
        self.find(id).is_some()
    }

    /// Finds a direct child by display name
    pub fn child_by_name(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Ids of the direct children, in listing order
    pub fn child_ids(&self) -> Vec<&RemoteId> {
        self.children.iter().map(|c| &c.id).collect()
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}
