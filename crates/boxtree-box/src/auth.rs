//! Server authentication for Box
//!
//! Box server apps are described by a JSON file downloaded from the developer
//! console. Apps with a key pair (`boxAppSettings.appAuth`) sign a short-lived
//! JWT assertion with their private key and trade it for an enterprise access
//! token. Apps without one use the client-credentials grant instead.
//!
//! ## Components
//!
//! - [`AppAuthConfig`] - Parsed app credentials file
//! - [`JwtAuthenticator`] - [`IAuthenticator`] for the JWT bearer grant
//! - [`ClientCredentialsAuthenticator`] - [`IAuthenticator`] for apps without a key pair
//! - [`authenticator_for`] - Picks one of the two from the credentials

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use boxtree_core::ports::{IAuthenticator, Tokens};

/// Default Box token endpoint
pub const TOKEN_URL: &str = "https://api.box.com/oauth2/token";

/// Grant type for trading a signed assertion for a token
pub const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime; Box rejects assertions valid for more than 60 seconds
const ASSERTION_LIFETIME_SECS: i64 = 30;

// ============================================================================
// AppAuthConfig
// ============================================================================

/// Box app credentials, as found in the developer console's JSON file
#[derive(Clone, Deserialize)]
pub struct AppAuthConfig {
    #[serde(rename = "boxAppSettings")]
    pub app_settings: BoxAppSettings,
    #[serde(rename = "enterpriseID")]
    pub enterprise_id: String,
}

/// The `boxAppSettings` object
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxAppSettings {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
    /// Key pair of JWT apps
    #[serde(default)]
    pub app_auth: Option<AppAuth>,
}

/// The `appAuth` object of JWT apps
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAuth {
    #[serde(rename = "publicKeyID")]
    pub public_key_id: String,
    /// PKCS#8 PEM, encrypted with `passphrase` unless the passphrase is empty
    pub private_key: String,
    #[serde(default)]
    pub passphrase: String,
}

impl std::fmt::Debug for AppAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppAuthConfig")
            .field("client_id", &self.app_settings.client_id)
            .field("client_secret", &"<redacted>")
            .field("enterprise_id", &self.enterprise_id)
            .field("has_key_pair", &self.app_settings.app_auth.is_some())
            .finish()
    }
}

impl AppAuthConfig {
    /// Loads the credentials file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid credentials file {}", path.display()))
    }

    /// Parses credentials from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AppAuthConfig =
            serde_json::from_str(json).context("Failed to parse Box app settings")?;
        if config.app_settings.client_id.is_empty() {
            anyhow::bail!("boxAppSettings.clientID is empty");
        }
        if config.app_settings.client_secret.is_empty() {
            anyhow::bail!("boxAppSettings.clientSecret is empty");
        }
        if config.enterprise_id.is_empty() {
            anyhow::bail!("enterpriseID is empty");
        }
        if let Some(app_auth) = &config.app_settings.app_auth {
            if app_auth.public_key_id.is_empty() {
                anyhow::bail!("boxAppSettings.appAuth.publicKeyID is empty");
            }
            if app_auth.private_key.is_empty() {
                anyhow::bail!("boxAppSettings.appAuth.privateKey is empty");
            }
        }
        Ok(config)
    }
}

// ============================================================================
// Token exchange
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Posts a grant form to the token endpoint
async fn request_token(
    client: &Client,
    token_url: &str,
    form: &[(&str, &str)],
    enterprise_id: &str,
) -> Result<Tokens> {
    let response = client
        .post(token_url)
        .form(form)
        .send()
        .await
        .context("Failed to reach the Box token endpoint")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token request failed with {}: {}", status, body.trim());
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    info!(
        enterprise = %enterprise_id,
        expires_in = token.expires_in,
        "Authenticated with Box"
    );
    Ok(Tokens {
        access_token: token.access_token,
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
    })
}

/// Returns the authenticator matching the credentials file
///
/// JWT when the file carries a key pair, client credentials otherwise.
pub fn authenticator_for(
    credentials: AppAuthConfig,
    token_url: &str,
) -> Result<Box<dyn IAuthenticator>> {
    if credentials.app_settings.app_auth.is_some() {
        Ok(Box::new(
            JwtAuthenticator::new(credentials)?.with_token_url(token_url),
        ))
    } else {
        debug!("No key pair in credentials, using client credentials");
        Ok(Box::new(
            ClientCredentialsAuthenticator::new(credentials).with_token_url(token_url),
        ))
    }
}

// ============================================================================
// JwtAuthenticator
// ============================================================================

/// Claims of the assertion sent to the token endpoint
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    box_sub_type: &'a str,
    aud: &'a str,
    jti: String,
    exp: i64,
}

/// Obtains enterprise access tokens with a signed JWT assertion
pub struct JwtAuthenticator {
    client: Client,
    credentials: AppAuthConfig,
    key_id: String,
    key: EncodingKey,
    token_url: String,
}

impl JwtAuthenticator {
    /// Decrypts the app's private key
    ///
    /// Fails when the credentials have no `appAuth` section or the
    /// passphrase does not open the key.
    pub fn new(credentials: AppAuthConfig) -> Result<Self> {
        let app_auth = credentials
            .app_settings
            .app_auth
            .as_ref()
            .context("Credentials file has no boxAppSettings.appAuth key pair")?;
        let key = decode_private_key(&app_auth.private_key, &app_auth.passphrase)?;
        let key_id = app_auth.public_key_id.clone();

        Ok(Self {
            client: Client::new(),
            credentials,
            key_id,
            key,
            token_url: TOKEN_URL.to_string(),
        })
    }

    /// Overrides the token endpoint (useful for testing)
    ///
    /// The endpoint is also the assertion's audience.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Signs a fresh RS512 assertion for the enterprise service account
    pub fn assertion(&self) -> Result<String> {
        let mut header = Header::new(Algorithm::RS512);
        header.kid = Some(self.key_id.clone());

        let claims = AssertionClaims {
            iss: &self.credentials.app_settings.client_id,
            sub: &self.credentials.enterprise_id,
            box_sub_type: "enterprise",
            aud: &self.token_url,
            jti: Uuid::new_v4().to_string(),
            exp: (Utc::now() + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };

        jsonwebtoken::encode(&header, &claims, &self.key).context("Failed to sign JWT assertion")
    }
}

/// Opens a PKCS#8 PEM key and converts it to the PKCS#1 form the signer takes
fn decode_private_key(pem: &str, passphrase: &str) -> Result<EncodingKey> {
    let key = if passphrase.is_empty() {
        RsaPrivateKey::from_pkcs8_pem(pem)
    } else {
        RsaPrivateKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
    }
    .map_err(|e| anyhow!("Failed to decrypt the app private key: {e}"))?;

    let der = key
        .to_pkcs1_der()
        .map_err(|e| anyhow!("Failed to encode the app private key: {e}"))?;
    Ok(EncodingKey::from_rsa_der(der.as_bytes()))
}

#[async_trait::async_trait]
impl IAuthenticator for JwtAuthenticator {
    async fn authenticate(&self) -> Result<Tokens> {
        let settings = &self.credentials.app_settings;
        debug!(
            client_id = %settings.client_id,
            key_id = %self.key_id,
            "Requesting enterprise token with JWT assertion"
        );

        let assertion = self.assertion()?;
        let form = [
            ("grant_type", JWT_GRANT_TYPE),
            ("assertion", assertion.as_str()),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.as_str()),
        ];
        request_token(
            &self.client,
            &self.token_url,
            &form,
            &self.credentials.enterprise_id,
        )
        .await
    }
}

// ============================================================================
// ClientCredentialsAuthenticator
// ============================================================================

/// Obtains enterprise access tokens with the client-credentials grant
pub struct ClientCredentialsAuthenticator {
    client: Client,
    credentials: AppAuthConfig,
    token_url: String,
}

impl ClientCredentialsAuthenticator {
    pub fn new(credentials: AppAuthConfig) -> Self {
        Self {
            client: Client::new(),
            credentials,
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint (useful for testing)
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait::async_trait]
impl IAuthenticator for ClientCredentialsAuthenticator {
    async fn authenticate(&self) -> Result<Tokens> {
        let settings = &self.credentials.app_settings;
        debug!(client_id = %settings.client_id, "Requesting enterprise token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.as_str()),
            ("box_subject_type", "enterprise"),
            ("box_subject_id", self.credentials.enterprise_id.as_str()),
        ];
        request_token(
            &self.client,
            &self.token_url,
            &form,
            &self.credentials.enterprise_id,
        )
        .await
    }
}
