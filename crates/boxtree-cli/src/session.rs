//! Connecting to Box
//!
//! Shared by every command that talks to the API: load the app credentials,
//! obtain a token, build the client from the `api` config section and look
//! up the user the token acts as.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use boxtree_box::auth::{authenticator_for, AppAuthConfig};
use boxtree_box::client::{BoxClient, BoxUser};
use boxtree_box::provider::BoxRemoteStore;
use boxtree_box::rate_limit::RetryPolicy;
use boxtree_core::config::Config;

/// An authenticated connection
pub struct Session {
    pub store: Arc<BoxRemoteStore>,
    pub user: BoxUser,
}

/// Builds an API client from the configuration and a token
pub fn build_client(config: &Config, access_token: &str) -> BoxClient {
    BoxClient::with_base_url(access_token, &config.api.base_url)
        .with_upload_url(&config.api.upload_url)
        .with_retry_policy(RetryPolicy::new(config.api.max_retries))
}

/// Authenticates with the configured credentials and identifies the user
pub async fn connect(config: &Config) -> Result<Session> {
    let credentials_path = &config.auth.credentials_file;
    let credentials = AppAuthConfig::load(credentials_path)?;

    let authenticator = authenticator_for(credentials, &config.api.token_url)?;
    let tokens = authenticator
        .authenticate()
        .await
        .context("Authentication with Box failed")?;

    let client = build_client(config, &tokens.access_token);
    let user = client
        .get_current_user()
        .await
        .context("Failed to fetch the current user")?;
    info!(
        login = user.login.as_deref().unwrap_or("unknown"),
        id = %user.id,
        "Connected to Box"
    );

    Ok(Session {
        store: Arc::new(BoxRemoteStore::new(client)),
        user,
    })
}
