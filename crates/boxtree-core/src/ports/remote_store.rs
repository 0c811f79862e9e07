//! Remote store port (driven/secondary port)
//!
//! This module defines the interface to the remote hierarchical store. The
//! production implementation talks to the Box Content API; tests use an
//! in-memory store.
//!
//! ## Design Notes
//!
//! - Unlike most ports, failures are typed ([`RemoteError`]) because the
//!   synchronizer must distinguish conflicts and precondition failures from
//!   unclassified errors.
//! - Operations that the provider routes differently for files and folders
//!   (rename, delete) take the item's [`NodeKind`].
//! - Retry and rate-limit handling belong to the implementation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::RemoteId;
use crate::domain::tree_node::NodeKind;

/// One entry returned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Provider-specific item identifier
    pub id: RemoteId,
    /// Item name (file or folder name)
    pub name: String,
    /// Whether the item is a file or a folder
    pub kind: NodeKind,
}

impl RemoteEntry {
    pub fn new(id: RemoteId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

/// Classified failure of a remote store call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// An item with that name already exists in the target folder (`item_name_in_use`)
    #[error("item name in use")]
    Conflict {
        /// First conflicting item, when the store reports it
        conflicting_id: Option<RemoteId>,
    },

    /// Folder deletion without the recursive flag on a non-empty folder (`folder_not_empty`)
    #[error("folder not empty")]
    FolderNotEmpty,

    /// The item is already in the trash (`trashed`)
    #[error("item is trashed")]
    Trashed,

    /// The item does not exist (`not_found`)
    #[error("item not found")]
    NotFound,

    /// The caller may not perform the operation (`access_denied*`)
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Any other failure, transport errors included
    #[error("remote failure: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Classifies a provider error code
    ///
    /// Codes follow the Box API naming (`item_name_in_use`, `folder_not_empty`,
    /// `trashed`, `not_found`, `access_denied_*`); anything else becomes
    /// [`RemoteError::Unavailable`] carrying the code and message.
    pub fn from_code(code: &str, message: &str, conflicting_id: Option<RemoteId>) -> Self {
        match code {
            "item_name_in_use" => RemoteError::Conflict { conflicting_id },
            "folder_not_empty" => RemoteError::FolderNotEmpty,
            "trashed" => RemoteError::Trashed,
            "not_found" => RemoteError::NotFound,
            c if c.starts_with("access_denied") => RemoteError::AccessDenied(message.to_string()),
            c => RemoteError::Unavailable(format!("{c}: {message}")),
        }
    }
}

/// Result alias for remote store calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Port trait for the remote hierarchical store
///
/// Identifiers are opaque; the root folder is [`RemoteId::root`]. Listing is
/// paginated by offset and limit: a page shorter than `limit` marks the end of
/// the listing.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Retrieves a single item
    async fn get_node(&self, id: &RemoteId) -> RemoteResult<RemoteEntry>;

    /// Lists one page of a folder's children
    ///
    /// # Arguments
    /// * `id` - Folder to list
    /// * `offset` - Index of the first entry to return
    /// * `limit` - Maximum number of entries in the page
    async fn list_children(
        &self,
        id: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> RemoteResult<Vec<RemoteEntry>>;

    /// Creates a folder named `name` under `parent`
    async fn create_child(&self, parent: &RemoteId, name: &str) -> RemoteResult<RemoteEntry>;

    /// Renames an item
    async fn rename(&self, id: &RemoteId, kind: NodeKind, new_name: &str) -> RemoteResult<()>;

    /// Deletes an item; `recursive` only applies to folders
    async fn delete(&self, id: &RemoteId, kind: NodeKind, recursive: bool) -> RemoteResult<()>;

    /// Uploads a local file into `parent`, keeping its file name
    async fn upload(&self, parent: &RemoteId, local_path: &Path) -> RemoteResult<RemoteEntry>;

    /// Returns a direct download URL for a file
    async fn get_download_link(&self, id: &RemoteId) -> RemoteResult<String>;
}
