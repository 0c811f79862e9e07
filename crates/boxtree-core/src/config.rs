//! Configuration module for boxtree.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for boxtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Box app JSON file holding client id/secret and enterprise id.
    pub credentials_file: PathBuf,
}

/// Box API endpoints and request policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Box Content API.
    pub base_url: String,
    /// Base URL of the Box upload API.
    pub upload_url: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// Maximum retries for a rate-limited (429) request.
    pub max_retries: u32,
}

/// Tree synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Entries requested per folder listing page (Box allows up to 1000).
    pub page_limit: u32,
    /// How many folder levels a build descends; `None` loads the whole subtree.
    pub max_depth: Option<u32>,
    /// Listing pages fetched per folder before the listing is abandoned.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/boxtree/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("boxtree")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Box's own default page size for folder listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Largest page size the Box API accepts.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Pages per folder listing before it is treated as a store fault.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: config_dir().join("appauth.json"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.box.com/2.0".to_string(),
            upload_url: "https://upload.box.com/api/2.0".to_string(),
            token_url: "https://api.box.com/oauth2/token".to_string(),
            max_retries: 5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            max_depth: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.page_limit"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- auth ---
        if self.auth.credentials_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "auth.credentials_file".into(),
                message: "must not be empty".into(),
            });
        }

        // --- api ---
        for (field, value) in [
            ("api.base_url", &self.api.base_url),
            ("api.upload_url", &self.api.upload_url),
            ("api.token_url", &self.api.token_url),
        ] {
            if !is_http_url(value) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("must be an http(s) URL, got '{value}'"),
                });
            }
        }
        if self.api.max_retries > 10 {
            errors.push(ValidationError {
                field: "api.max_retries".into(),
                message: "must be in range 0..=10".into(),
            });
        }

        // --- sync ---
        if self.sync.page_limit == 0 || self.sync.page_limit > MAX_PAGE_LIMIT {
            errors.push(ValidationError {
                field: "sync.page_limit".into(),
                message: format!("must be in range 1..={MAX_PAGE_LIMIT}"),
            });
        }
        if self.sync.max_depth == Some(0) {
            errors.push(ValidationError {
                field: "sync.max_depth".into(),
                message: "must be greater than 0 when set".into(),
            });
        }
        if self.sync.max_pages == 0 {
            errors.push(ValidationError {
                field: "sync.max_pages".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use boxtree_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .credentials_file(PathBuf::from("/home/user/keys/appauth.json"))
///     .sync_page_limit(500)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- auth ---

    pub fn credentials_file(mut self, path: PathBuf) -> Self {
        self.config.auth.credentials_file = path;
        self
    }

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_upload_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.upload_url = url.into();
        self
    }

    pub fn api_token_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.token_url = url.into();
        self
    }

    pub fn api_max_retries(mut self, n: u32) -> Self {
        self.config.api.max_retries = n;
        self
    }

    // --- sync ---

    pub fn sync_page_limit(mut self, limit: u32) -> Self {
        self.config.sync.page_limit = limit;
        self
    }

    pub fn sync_max_depth(mut self, depth: Option<u32>) -> Self {
        self.config.sync.max_depth = depth;
        self
    }

    pub fn sync_max_pages(mut self, pages: u32) -> Self {
        self.config.sync.max_pages = pages;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
