//! Box Content API client
//!
//! Provides a typed HTTP client for the Box Content API. Handles the bearer
//! header, endpoint construction, error bodies and 429 retries.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use boxtree_box::client::BoxClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = BoxClient::new("access-token-here");
//! let user = client.get_current_user().await?;
//! println!("Logged in as {}", user.login.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use boxtree_core::domain::{NodeKind, RemoteId};
use boxtree_core::ports::RemoteEntry;

use crate::rate_limit::RetryPolicy;
use crate::BoxApiError;

/// Base URL for the Box Content API
pub const BOX_API_URL: &str = "https://api.box.com/2.0";

/// Base URL for Box uploads
pub const BOX_UPLOAD_URL: &str = "https://upload.box.com/api/2.0";

/// Fields requested for every item; keeps responses small
pub(crate) const ITEM_FIELDS: &str = "id,type,name";

// ============================================================================
// Box API response types
// ============================================================================

/// A file, folder or web link as returned by the API (mini representation)
#[derive(Debug, Clone, Deserialize)]
pub struct BoxItem {
    /// `file`, `folder` or `web_link`
    #[serde(rename = "type")]
    pub item_type: String,
    pub id: String,
    pub name: String,
}

impl BoxItem {
    /// Converts into a port-level [`RemoteEntry`]
    pub fn into_entry(self) -> Result<RemoteEntry, BoxApiError> {
        let kind = match self.item_type.as_str() {
            "folder" => NodeKind::Folder,
            "web_link" => NodeKind::WebLink,
            _ => NodeKind::File,
        };
        let id = RemoteId::new(self.id)
            .map_err(|e| BoxApiError::InvalidResponse(e.to_string()))?;
        Ok(RemoteEntry::new(id, self.name, kind))
    }
}

/// One page of `GET /folders/{id}/items`, or an upload result
#[derive(Debug, Deserialize)]
pub struct ItemCollection {
    pub total_count: Option<u64>,
    #[serde(default)]
    pub entries: Vec<BoxItem>,
}

/// Response from `GET /users/me`
#[derive(Debug, Clone, Deserialize)]
pub struct BoxUser {
    pub id: String,
    pub name: Option<String>,
    pub login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SharedLinkResponse {
    shared_link: Option<SharedLink>,
}

#[derive(Debug, Deserialize)]
struct SharedLink {
    url: String,
    download_url: Option<String>,
}

// ============================================================================
// BoxClient
// ============================================================================

/// HTTP client for Box API calls
///
/// Wraps `reqwest::Client` with the bearer token and the API and upload base
/// URLs.
pub struct BoxClient {
    client: Client,
    base_url: String,
    upload_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl BoxClient {
    /// Creates a client for the public Box endpoints
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: BOX_API_URL.to_string(),
            upload_url: BOX_UPLOAD_URL.to_string(),
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a client with a custom base URL, also used for uploads
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            upload_url: base_url.clone(),
            base_url,
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the upload base URL
    pub fn with_upload_url(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self
    }

    /// Sets the 429 retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Updates the access token (e.g., after re-authenticating)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated BoxClient access token");
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Creates an authenticated request against the API base URL
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL (e.g., "/users/me")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Creates an authenticated request against the upload base URL
    pub fn upload_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.upload_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request, retrying on 429 and turning error statuses into
    /// [`BoxApiError::Api`]
    ///
    /// `build` is called once per attempt, so bodies that cannot be cloned
    /// (multipart) are rebuilt each time.
    pub async fn send<F>(&self, label: &str, build: F) -> Result<Response, BoxApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_retries = self.retry.max_retries;

        for attempt in 0..=max_retries {
            let response = build().send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= max_retries {
                    warn!(label, attempts = attempt + 1, "429 retry limit exhausted");
                    return Err(BoxApiError::RateLimited {
                        attempts: attempt + 1,
                    });
                }
                let retry_after = self.retry.delay_for(response.headers());
                info!(
                    label,
                    attempt,
                    retry_after_ms = retry_after.as_millis(),
                    "Received 429, backing off"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let err = BoxApiError::from_response_body(status, &body);
                debug!(label, %status, error = %err, "Request failed");
                return Err(err);
            }

            if attempt > 0 {
                info!(label, attempt, "Request succeeded after retry");
            }
            return Ok(response);
        }

        Err(BoxApiError::RateLimited {
            attempts: max_retries + 1,
        })
    }

    /// Sends a body-less request to the API base URL with retry handling
    pub async fn execute_with_retry(
        &self,
        method: Method,
        path: &str,
    ) -> Result<Response, BoxApiError> {
        self.send(path, || self.request(method.clone(), path)).await
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, BoxApiError> {
        response
            .json()
            .await
            .map_err(|e| BoxApiError::InvalidResponse(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Endpoints
    // ------------------------------------------------------------------

    /// Retrieves the user the token acts as (`GET /users/me`)
    pub async fn get_current_user(&self) -> Result<BoxUser, BoxApiError> {
        debug!("Fetching current user from /users/me");
        let response = self
            .send("/users/me", || {
                self.request(Method::GET, "/users/me")
                    .query(&[("fields", "id,name,login")])
            })
            .await?;
        Self::read_json(response).await
    }

    /// Retrieves a folder (`GET /folders/{id}`)
    pub async fn get_folder(&self, id: &RemoteId) -> Result<BoxItem, BoxApiError> {
        let path = format!("/folders/{}", id);
        let response = self
            .send(&path, || {
                self.request(Method::GET, &path)
                    .query(&[("fields", ITEM_FIELDS)])
            })
            .await?;
        Self::read_json(response).await
    }

    /// Retrieves a file (`GET /files/{id}`)
    pub async fn get_file(&self, id: &RemoteId) -> Result<BoxItem, BoxApiError> {
        let path = format!("/files/{}", id);
        let response = self
            .send(&path, || {
                self.request(Method::GET, &path)
                    .query(&[("fields", ITEM_FIELDS)])
            })
            .await?;
        Self::read_json(response).await
    }

    /// Lists one page of a folder's items (`GET /folders/{id}/items`)
    pub async fn list_folder_items(
        &self,
        id: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> Result<ItemCollection, BoxApiError> {
        let path = format!("/folders/{}/items", id);
        let offset = offset.to_string();
        let limit = limit.to_string();
        let response = self
            .send(&path, || {
                self.request(Method::GET, &path).query(&[
                    ("fields", ITEM_FIELDS),
                    ("offset", offset.as_str()),
                    ("limit", limit.as_str()),
                ])
            })
            .await?;
        let page: ItemCollection = Self::read_json(response).await?;
        debug!(
            folder = %id,
            offset = %offset,
            returned = page.entries.len(),
            total = ?page.total_count,
            "Listed folder page"
        );
        Ok(page)
    }

    /// Creates a folder (`POST /folders`)
    pub async fn create_folder(&self, parent: &RemoteId, name: &str) -> Result<BoxItem, BoxApiError> {
        let body = json!({ "name": name, "parent": { "id": parent.as_str() } });
        let response = self
            .send("/folders", || {
                self.request(Method::POST, "/folders")
                    .query(&[("fields", ITEM_FIELDS)])
                    .json(&body)
            })
            .await?;
        Self::read_json(response).await
    }

    /// Renames a file or folder (`PUT /files/{id}` or `PUT /folders/{id}`)
    pub async fn rename_item(
        &self,
        id: &RemoteId,
        kind: NodeKind,
        new_name: &str,
    ) -> Result<BoxItem, BoxApiError> {
        let path = item_path(id, kind);
        let body = json!({ "name": new_name });
        let response = self
            .send(&path, || {
                self.request(Method::PUT, &path)
                    .query(&[("fields", ITEM_FIELDS)])
                    .json(&body)
            })
            .await?;
        Self::read_json(response).await
    }

    /// Deletes a folder (`DELETE /folders/{id}?recursive=`)
    pub async fn delete_folder(&self, id: &RemoteId, recursive: bool) -> Result<(), BoxApiError> {
        let path = format!("/folders/{}", id);
        let recursive = if recursive { "true" } else { "false" };
        self.send(&path, || {
            self.request(Method::DELETE, &path)
                .query(&[("recursive", recursive)])
        })
        .await?;
        Ok(())
    }

    /// Deletes a file (`DELETE /files/{id}`)
    pub async fn delete_file(&self, id: &RemoteId) -> Result<(), BoxApiError> {
        self.execute_with_retry(Method::DELETE, &format!("/files/{}", id))
            .await?;
        Ok(())
    }

    /// Deletes a web link
    pub async fn delete_web_link(&self, id: &RemoteId) -> Result<(), BoxApiError> {
        self.execute_with_retry(Method::DELETE, &format!("/web_links/{}", id))
            .await?;
        Ok(())
    }

    /// Creates or reuses an open shared link and returns its download URL
    ///
    /// Falls back to the shared link page when the account does not expose
    /// direct downloads.
    pub async fn create_shared_link(&self, id: &RemoteId) -> Result<String, BoxApiError> {
        let path = format!("/files/{}", id);
        let body = json!({ "shared_link": { "access": "open", "unshared_at": null } });
        let response = self
            .send(&path, || {
                self.request(Method::PUT, &path)
                    .query(&[("fields", "shared_link")])
                    .json(&body)
            })
            .await?;
        let parsed: SharedLinkResponse = Self::read_json(response).await?;
        let link = parsed.shared_link.ok_or_else(|| {
            BoxApiError::InvalidResponse(format!("no shared_link in response for {id}"))
        })?;
        Ok(link.download_url.unwrap_or(link.url))
    }
}

fn item_path(id: &RemoteId, kind: NodeKind) -> String {
    match kind {
        NodeKind::File => format!("/files/{}", id),
        NodeKind::Folder => format!("/folders/{}", id),
        NodeKind::WebLink => format!("/web_links/{}", id),
    }
}
