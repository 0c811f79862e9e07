//! Config command - View and manage boxtree configuration
//!
//! Provides the `boxtree config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Prints the configuration file location

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use boxtree_core::config::Config;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

const SUPPORTED_KEYS: &[&str] = &[
    "auth.credentials_file     - Box app JSON (client id/secret, key pair, enterprise id)",
    "api.base_url              - Box Content API base URL",
    "api.upload_url            - Box upload API base URL",
    "api.token_url             - OAuth2 token endpoint",
    "api.max_retries           - Retries for rate-limited requests (0-10)",
    "sync.page_limit           - Entries per listing page (1-1000)",
    "sync.max_depth            - Folder levels to load, or 'none' for all",
    "sync.max_pages            - Listing pages per folder before giving up",
    "logging.level             - trace|debug|info|warn|error",
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.page_limit")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(format, config_path),
            ConfigCommand::Set { key, value } => {
                self.execute_set(key, value, format, config_path)
            }
            ConfigCommand::Validate => self.execute_validate(format, config_path),
            ConfigCommand::Path => {
                let formatter = get_formatter(format);
                formatter.result(
                    &[config_path.display().to_string()],
                    &serde_json::json!({
                        "config_path": config_path.display().to_string(),
                        "exists": config_path.exists(),
                    }),
                );
                Ok(())
            }
        }
    }

    fn execute_show(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);
        let config = Config::load_or_default(config_path);

        info!(config_path = %config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(
        &self,
        key: &str,
        value: &str,
        format: OutputFormat,
        config_path: &Path,
    ) -> Result<()> {
        let formatter = get_formatter(format);
        let mut config = Config::load_or_default(config_path);

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {:#}", key, e));
                print_supported_keys(formatter.as_ref());
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": messages,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    messages.join("; ")
                ));
            }
            return Ok(());
        }

        save_config(&config, config_path)?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        // load() rather than load_or_default(): parse errors must surface
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(_) if !config_path.exists() => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": ["Configuration file not found. Using defaults."],
                    }));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info(
                        "Using default configuration. Run 'boxtree config set <key> <value>' to create one.",
                    );
                }
                return Ok(());
            }
            Err(e) => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [format!("Failed to parse configuration: {}", e)],
                    }));
                } else {
                    formatter.error(&format!("Failed to parse configuration: {}", e));
                    formatter.info(&format!("File: {}", config_path.display()));
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
            if !config.auth.credentials_file.exists() {
                formatter.warn(&format!(
                    "Credentials file {} does not exist yet",
                    config.auth.credentials_file.display()
                ));
            }
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

fn print_supported_keys(formatter: &dyn OutputFormatter) {
    formatter.info("");
    formatter.info("Supported keys:");
    for key in SUPPORTED_KEYS {
        formatter.info(&format!("  {key}"));
    }
}

/// Writes `config` as YAML, creating the parent directory if needed
fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")?;
    Ok(())
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// `sync.max_depth` accepts `none` (or an empty value) to load whole trees.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- auth ---
        "auth.credentials_file" => {
            config.auth.credentials_file = PathBuf::from(value);
        }

        // --- api ---
        "api.base_url" => config.api.base_url = value.to_string(),
        "api.upload_url" => config.api.upload_url = value.to_string(),
        "api.token_url" => config.api.token_url = value.to_string(),
        "api.max_retries" => {
            config.api.max_retries = value
                .parse::<u32>()
                .context("Expected a non-negative integer for api.max_retries")?;
        }

        // --- sync ---
        "sync.page_limit" => {
            config.sync.page_limit = value
                .parse::<u32>()
                .context("Expected a positive integer for sync.page_limit")?;
        }
        "sync.max_pages" => {
            config.sync.max_pages = value
                .parse::<u32>()
                .context("Expected a positive integer for sync.max_pages")?;
        }
        "sync.max_depth" => {
            config.sync.max_depth = if value.is_empty() || value == "none" {
                None
            } else {
                Some(
                    value
                        .parse::<u32>()
                        .context("Expected a positive integer or 'none' for sync.max_depth")?,
                )
            };
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
