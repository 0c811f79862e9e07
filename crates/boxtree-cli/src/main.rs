//! boxtree CLI - Browse and edit a Box account as a folder tree
//!
//! Provides commands for:
//! - Checking which account the app credentials act as
//! - Printing the remote folder tree
//! - An interactive shell for listing, creating, renaming, deleting and
//!   uploading
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use boxtree_core::config::Config;

mod commands;
mod observer;
mod output;
mod render;
mod session;

use commands::{
    config::ConfigCommand, shell::ShellCommand, tree::TreeCommand, whoami::WhoamiCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "boxtree", version, about = "Browse and edit a Box account as a folder tree")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the Box account the credentials act as
    Whoami(WhoamiCommand),
    /// Print the remote folder tree
    Tree(TreeCommand),
    /// Interactive shell over the remote tree
    Shell(ShellCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter from the flags, falling back to the configured level
fn log_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let configured_level = Config::load_or_default(&config_path).logging.level;

    // RUST_LOG wins over flags and config
    let filter = log_filter(cli.verbose, cli.quiet, &configured_level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Whoami(cmd) => cmd.execute(format, &config_path).await,
        Commands::Tree(cmd) => cmd.execute(format, &config_path).await,
        Commands::Shell(cmd) => cmd.execute(format, &config_path).await,
        Commands::Config(cmd) => cmd.execute(format, &config_path).await,
    }
}
