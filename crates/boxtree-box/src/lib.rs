//! BoxTree Box - Box Content API adapter
//!
//! Provides async client for:
//! - Server authentication with a signed JWT assertion, or client credentials for apps without a key pair
//! - Folder listing, folder creation, rename and delete
//! - Uploads with name-conflict preflight
//! - Shared download links
//!
//! ## Modules
//!
//! - [`auth`] - App credentials file and token acquisition
//! - [`client`] - Box API HTTP client
//! - [`provider`] - [`IRemoteStore`](boxtree_core::ports::IRemoteStore) implementation
//! - [`rate_limit`] - `Retry-After` handling for 429 responses
//! - [`upload`] - Preflight check and multipart upload

pub mod auth;
pub mod client;
pub mod provider;
pub mod rate_limit;
pub mod upload;

use boxtree_core::domain::RemoteId;
use boxtree_core::ports::RemoteError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub use auth::{AppAuthConfig, ClientCredentialsAuthenticator};
pub use client::BoxClient;
pub use provider::BoxRemoteStore;

/// Errors that can occur when communicating with the Box API
#[derive(Debug, Error)]
pub enum BoxApiError {
    /// The API answered with an error status and (usually) an error body
    #[error("Box API error {status} ({code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Box error code, e.g. `item_name_in_use`
        code: String,
        /// Human-readable message from the API
        message: String,
        /// Id of the conflicting item for `item_name_in_use`
        conflicting_id: Option<RemoteId>,
    },

    /// Rate limit still in effect after all retries
    #[error("Too many requests: retry limit exhausted after {attempts} attempts")]
    RateLimited {
        /// Number of requests sent
        attempts: u32,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A local file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoxApiError {
    /// Builds an [`BoxApiError::Api`] from an error status and response body
    ///
    /// Box error bodies look like
    /// `{"type":"error","status":409,"code":"item_name_in_use","message":"...",
    /// "context_info":{"conflicts":...}}` where `conflicts` is an object for
    /// folders and an array for files. Bodies that do not parse fall back to
    /// a code derived from the status.
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let (code, message, conflicts) = match parsed {
            Some(b) => (
                b.code.unwrap_or_else(|| fallback_code(status)),
                b.message.unwrap_or_default(),
                b.context_info.and_then(|c| c.conflicts),
            ),
            None => (fallback_code(status), body.trim().to_string(), None),
        };

        BoxApiError::Api {
            status: status.as_u16(),
            code,
            message,
            conflicting_id: conflicts.as_ref().and_then(first_conflict_id),
        }
    }

    /// Returns true for a 404 answer
    pub fn is_not_found(&self) -> bool {
        matches!(self, BoxApiError::Api { status: 404, .. })
    }
}

impl From<BoxApiError> for RemoteError {
    fn from(err: BoxApiError) -> Self {
        match err {
            BoxApiError::Api {
                code,
                message,
                conflicting_id,
                ..
            } => RemoteError::from_code(&code, &message, conflicting_id),
            other => RemoteError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    context_info: Option<ContextInfo>,
}

#[derive(Debug, Deserialize)]
struct ContextInfo {
    conflicts: Option<serde_json::Value>,
}

fn fallback_code(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => "not_found".to_string(),
        StatusCode::FORBIDDEN => "access_denied".to_string(),
        s => format!("http_{}", s.as_u16()),
    }
}

fn first_conflict_id(conflicts: &serde_json::Value) -> Option<RemoteId> {
    let item = match conflicts {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    let id = item.get("id")?.as_str()?;
    RemoteId::new(id.to_string()).ok()
}
