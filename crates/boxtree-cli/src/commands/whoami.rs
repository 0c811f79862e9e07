//! Whoami command - Show the Box account the credentials act as

use std::path::Path;

use anyhow::Result;
use clap::Args;

use boxtree_core::config::Config;

use crate::output::{get_formatter, OutputFormat};
use crate::session;

#[derive(Debug, Args)]
pub struct WhoamiCommand;

impl WhoamiCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let config = Config::load_or_default(config_path);
        let session = session::connect(&config).await?;
        let user = &session.user;

        let formatter = get_formatter(format);
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "id": user.id,
                "name": user.name,
                "login": user.login,
            }));
        } else {
            formatter.success(&format!(
                "Authenticated as {}",
                user.name.as_deref().unwrap_or("unknown")
            ));
            formatter.info(&format!("Id:    {}", user.id));
            formatter.info(&format!(
                "Login: {}",
                user.login.as_deref().unwrap_or("-")
            ));
        }
        Ok(())
    }
}
