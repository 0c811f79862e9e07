//! Presentation port (driving/primary side)
//!
//! The presentation layer renders [`TreeNode`]s, turns user actions into
//! [`TreeIntent`]s, and is told about the result of each one through an
//! [`ITreeObserver`].
//!
//! ## Design Notes
//!
//! - Observer callbacks are synchronous: a front end typically only needs to
//!   schedule a redraw.
//! - A failed intent ends in exactly one `on_error` with the target and error
//!   kind. An intent that changed the tree ends in exactly one `on_refreshed`
//!   with the node whose subtree changed; read-only intents stay silent.
//! - When a create or upload succeeds remotely but the folder cannot be
//!   relisted, the intent still returns its outcome. The listing failure is
//!   the `on_error`, and the folder is left `Stale`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ErrorKind;
use crate::domain::newtypes::RemoteId;
use crate::domain::tree_node::TreeNode;

/// Port trait for the presentation layer
pub trait ITreeObserver: Send + Sync {
    /// Called once an operation has changed the tree under `node`
    fn on_refreshed(&self, node: &TreeNode);

    /// Called when an operation on `node` failed
    ///
    /// The tree is unchanged, except that a folder whose relisting failed
    /// after a confirmed remote change is left `Stale`.
    fn on_error(&self, node: &RemoteId, kind: ErrorKind);
}

/// A user action bound to a target node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeIntent {
    Rename { target: RemoteId, new_name: String },
    Delete { target: RemoteId },
    CreateFolder { parent: RemoteId, name: String },
    Upload { parent: RemoteId, paths: Vec<PathBuf> },
    GetDownloadLink { target: RemoteId },
    Refresh { target: RemoteId },
    Expand { target: RemoteId },
}

impl TreeIntent {
    /// The node the intent is bound to
    pub fn target(&self) -> &RemoteId {
        match self {
            TreeIntent::Rename { target, .. }
            | TreeIntent::Delete { target }
            | TreeIntent::GetDownloadLink { target }
            | TreeIntent::Refresh { target }
            | TreeIntent::Expand { target } => target,
            TreeIntent::CreateFolder { parent, .. } | TreeIntent::Upload { parent, .. } => parent,
        }
    }
}

/// Successful result of a dispatched [`TreeIntent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    Renamed,
    Deleted,
    FolderCreated(RemoteId),
    Uploaded(Vec<UploadOutcome>),
    DownloadLink(String),
    Refreshed,
    Expanded,
}

/// Result of uploading one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The file was stored under the given id
    Uploaded { id: RemoteId },
    /// A file with the same name already exists in the folder
    Conflict { existing: Option<RemoteId> },
    /// The upload failed for another reason
    Failed { kind: ErrorKind, message: String },
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, UploadOutcome::Conflict { .. })
    }
}
