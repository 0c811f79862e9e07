//! Domain error types
//!
//! [`DomainError`] covers validation of domain values. [`SyncError`] is the
//! taxonomy every tree operation reports, and [`ErrorKind`] is its fieldless
//! form handed to tree observers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::newtypes::RemoteId;
use crate::ports::remote_store::RemoteError;

/// Errors that can occur when validating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors reported by tree operations
///
/// An operation that returns one of these has left the local tree exactly as
/// it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The operation targets the root folder, which cannot be renamed or deleted
    #[error("The root folder cannot be modified")]
    ProtectedNode,

    /// The operation is not valid for the node's kind
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The remote store reports the name is already in use
    #[error("Name already in use{}", conflict_suffix(.conflicting_id))]
    NameConflict {
        /// Identity of the existing item holding the name, when the store reports it
        conflicting_id: Option<RemoteId>,
    },

    /// Folder deletion was declined because the folder still has children
    #[error("Folder is not empty")]
    NotEmpty,

    /// The remote item no longer exists (deleted or trashed)
    #[error("Remote item not found: {0}")]
    NotFound(RemoteId),

    /// The target id is not part of the local tree
    #[error("Node {0} is not in the tree")]
    UnknownNode(RemoteId),

    /// Any other remote failure, transport errors included
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),
}

fn conflict_suffix(id: &Option<RemoteId>) -> String {
    match id {
        Some(id) => format!(" (conflicts with {id})"),
        None => String::new(),
    }
}

impl SyncError {
    /// Maps a remote store failure for the operation targeting `target`
    pub fn from_remote(err: RemoteError, target: &RemoteId) -> Self {
        match err {
            RemoteError::Conflict { conflicting_id } => SyncError::NameConflict { conflicting_id },
            RemoteError::FolderNotEmpty => SyncError::NotEmpty,
            RemoteError::NotFound | RemoteError::Trashed => SyncError::NotFound(target.clone()),
            RemoteError::AccessDenied(msg) => {
                SyncError::RemoteUnavailable(format!("access denied: {msg}"))
            }
            RemoteError::Unavailable(msg) => SyncError::RemoteUnavailable(msg),
        }
    }

    /// The observer-facing kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ProtectedNode => ErrorKind::ProtectedNode,
            SyncError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            SyncError::NameConflict { .. } => ErrorKind::NameConflict,
            SyncError::NotEmpty => ErrorKind::NotEmpty,
            SyncError::NotFound(_) | SyncError::UnknownNode(_) => ErrorKind::NotFound,
            SyncError::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
        }
    }
}

/// Fieldless classification of a [`SyncError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProtectedNode,
    InvalidOperation,
    NameConflict,
    NotEmpty,
    NotFound,
    RemoteUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ProtectedNode => "protected_node",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::NameConflict => "name_conflict",
            ErrorKind::NotEmpty => "not_empty",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RemoteUnavailable => "remote_unavailable",
        };
        write!(f, "{}", s)
    }
}
