//! Tree command - Print the remote folder tree

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use boxtree_core::config::Config;
use boxtree_sync::TreeSynchronizer;

use crate::observer::ConsoleObserver;
use crate::output::{get_formatter, OutputFormat};
use crate::render::render_tree;
use crate::session;

#[derive(Debug, Args)]
pub struct TreeCommand {
    /// Folder levels to load (default: sync.max_depth from config, else all)
    #[arg(long, short)]
    depth: Option<u32>,
}

impl TreeCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let config = Config::load_or_default(config_path);
        let mut sync_config = config.sync.clone();
        if self.depth.is_some() {
            sync_config.max_depth = self.depth;
        }

        let session = session::connect(&config).await?;
        let observer = Arc::new(ConsoleObserver::new(format));
        let mut sync =
            TreeSynchronizer::new(session.store, sync_config).with_observer(observer.clone());
        sync.load_root()
            .await
            .context("Failed to load the folder tree")?;
        debug!(updates = observer.refreshes(), "Tree loaded");

        let formatter = get_formatter(format);
        formatter.result(
            &render_tree(sync.root(), None),
            &serde_json::to_value(sync.root())?,
        );
        formatter.info(&format!(
            "{} items loaded",
            sync.root().descendant_count()
        ));
        Ok(())
    }
}
