//! BoxRemoteStore - IRemoteStore implementation for the Box API
//!
//! Wraps the [`BoxClient`] and maps each port call onto the matching Box
//! endpoint.
//!
//! ## Design Notes
//!
//! - Uses `tokio::sync::Mutex` because port methods take `&self` while
//!   replacing the access token needs `&mut BoxClient`.
//! - `get_node` asks the folder endpoint first and falls back to the file
//!   endpoint on 404, since Box ids do not say which kind they are.
//! - Errors are classified by [`From<BoxApiError> for RemoteError`](crate::BoxApiError).

use std::path::Path;

use tokio::sync::Mutex;
use tracing::debug;

use boxtree_core::domain::{NodeKind, RemoteId};
use boxtree_core::ports::{IRemoteStore, RemoteEntry, RemoteResult};

use crate::client::BoxClient;
use crate::upload;

/// [`IRemoteStore`] backed by the Box Content API
pub struct BoxRemoteStore {
    client: Mutex<BoxClient>,
}

impl BoxRemoteStore {
    pub fn new(client: BoxClient) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    /// Replaces the access token used for subsequent calls
    pub async fn set_access_token(&self, token: impl Into<String>) {
        self.client.lock().await.set_access_token(token);
    }
}

#[async_trait::async_trait]
impl IRemoteStore for BoxRemoteStore {
    async fn get_node(&self, id: &RemoteId) -> RemoteResult<RemoteEntry> {
        let client = self.client.lock().await;
        let item = match client.get_folder(id).await {
            Ok(item) => item,
            Err(e) if e.is_not_found() && !id.is_root() => {
                debug!(id = %id, "Not a folder, trying file endpoint");
                client.get_file(id).await?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(item.into_entry()?)
    }

    async fn list_children(
        &self,
        id: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> RemoteResult<Vec<RemoteEntry>> {
        let client = self.client.lock().await;
        let page = client.list_folder_items(id, offset, limit).await?;
        let entries = page
            .entries
            .into_iter()
            .map(|item| item.into_entry())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn create_child(&self, parent: &RemoteId, name: &str) -> RemoteResult<RemoteEntry> {
        let client = self.client.lock().await;
        let item = client.create_folder(parent, name).await?;
        Ok(item.into_entry()?)
    }

    async fn rename(&self, id: &RemoteId, kind: NodeKind, new_name: &str) -> RemoteResult<()> {
        let client = self.client.lock().await;
        client.rename_item(id, kind, new_name).await?;
        Ok(())
    }

    async fn delete(&self, id: &RemoteId, kind: NodeKind, recursive: bool) -> RemoteResult<()> {
        let client = self.client.lock().await;
        match kind {
            NodeKind::Folder => client.delete_folder(id, recursive).await?,
            NodeKind::File => client.delete_file(id).await?,
            NodeKind::WebLink => client.delete_web_link(id).await?,
        }
        Ok(())
    }

    async fn upload(&self, parent: &RemoteId, local_path: &Path) -> RemoteResult<RemoteEntry> {
        let client = self.client.lock().await;
        let item = upload::upload_file(&client, parent, local_path).await?;
        Ok(item.into_entry()?)
    }

    async fn get_download_link(&self, id: &RemoteId) -> RemoteResult<String> {
        let client = self.client.lock().await;
        Ok(client.create_shared_link(id).await?)
    }
}
