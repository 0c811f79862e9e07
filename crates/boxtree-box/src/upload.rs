//! Upload operations for the Box API
//!
//! - [`preflight`] - Asks Box whether an upload would be accepted
//! - [`upload_file`] - Preflight followed by a single multipart upload
//!
//! The preflight catches name conflicts before any bytes are sent; its 409
//! body carries the conflicting file just like the upload itself would.
//!
//! ## Box API References
//!
//! - [Preflight check](https://developer.box.com/reference/options-files-content/)
//! - [Upload file](https://developer.box.com/reference/post-files-content/)

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use boxtree_core::domain::RemoteId;

use crate::client::{BoxClient, BoxItem, ItemCollection, ITEM_FIELDS};
use crate::BoxApiError;

/// Largest file Box recommends sending in one request (50 MiB)
pub const SINGLE_UPLOAD_LIMIT: u64 = 50 * 1024 * 1024;

/// Checks that `name` can be uploaded into `parent` (`OPTIONS /files/content`)
///
/// # Errors
/// [`BoxApiError::Api`] with code `item_name_in_use` when the name is taken.
pub async fn preflight(
    client: &BoxClient,
    parent: &RemoteId,
    name: &str,
    size: u64,
) -> Result<(), BoxApiError> {
    let body = json!({
        "name": name,
        "parent": { "id": parent.as_str() },
        "size": size,
    });
    client
        .send("preflight", || {
            client.request(Method::OPTIONS, "/files/content").json(&body)
        })
        .await?;
    debug!(parent = %parent, name, size, "Preflight accepted");
    Ok(())
}

/// Uploads a local file into `parent`, keeping its file name
///
/// Reads the whole file, runs the preflight check, then sends a multipart
/// request with an `attributes` part and the file content.
pub async fn upload_file(
    client: &BoxClient,
    parent: &RemoteId,
    local_path: &Path,
) -> Result<BoxItem, BoxApiError> {
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            BoxApiError::InvalidResponse(format!("no file name in {}", local_path.display()))
        })?;

    let data = tokio::fs::read(local_path).await?;
    let size = data.len() as u64;
    if size > SINGLE_UPLOAD_LIMIT {
        warn!(
            path = %local_path.display(),
            size,
            "File exceeds the recommended single-request upload size"
        );
    }

    preflight(client, parent, &name, size).await?;

    let attributes = json!({ "name": name, "parent": { "id": parent.as_str() } }).to_string();
    let response = client
        .send("/files/content", || {
            let form = Form::new()
                .text("attributes", attributes.clone())
                .part("file", Part::bytes(data.clone()).file_name(name.clone()));
            client
                .upload_request(Method::POST, "/files/content")
                .query(&[("fields", ITEM_FIELDS)])
                .multipart(form)
        })
        .await?;

    let uploaded: ItemCollection = BoxClient::read_json(response).await?;
    let item = uploaded.entries.into_iter().next().ok_or_else(|| {
        BoxApiError::InvalidResponse("upload response has no entries".to_string())
    })?;

    info!(name = %item.name, id = %item.id, size, "Uploaded file");
    Ok(item)
}
