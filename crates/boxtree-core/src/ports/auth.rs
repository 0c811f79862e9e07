//! Authentication port (driven/secondary port)
//!
//! Turns the stored app credentials into an access token. The tree model never
//! sees credentials; it only works with a remote store built from the token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access token issued by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Port trait for obtaining an access token
#[async_trait::async_trait]
pub trait IAuthenticator: Send + Sync {
    /// Authenticates with the provider
    async fn authenticate(&self) -> anyhow::Result<Tokens>;
}
