//! Shell command - Interactive browser for the remote folder tree
//!
//! Provides the `boxtree shell` CLI command which:
//! 1. Connects to Box and loads the root folder
//! 2. Reads commands from stdin (`ls`, `cd`, `mkdir`, `upload`, ...)
//! 3. Turns each command into a tree intent for the synchronizer
//!
//! Folders below the configured depth are loaded the first time they are
//! listed or entered.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use boxtree_core::config::Config;
use boxtree_core::domain::{NodeState, RemoteId, SyncError, TreeNode};
use boxtree_core::ports::{IntentOutcome, TreeIntent, UploadOutcome};
use boxtree_sync::TreeSynchronizer;

use crate::observer::ConsoleObserver;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::render::{listing_json, render_listing, render_tree};
use crate::session;

/// Folder levels loaded at startup when neither the flag nor the config set one
const DEFAULT_SHELL_DEPTH: u32 = 1;

const HELP: &[&str] = &[
    "ls                      list the current folder",
    "cd <path>               change folder (.. for parent, / for root)",
    "pwd                     print the current folder",
    "tree [depth]            draw the loaded tree below the current folder",
    "mkdir <name>            create a folder",
    "rename <name> <new>     rename a file or folder",
    "rm <name>               delete a file or folder",
    "upload [-l] <path>...   upload local files into the current folder",
    "                        (-l prints a download link for each file)",
    "link <name>             print a download link for a file",
    "refresh                 reload the current folder",
    "help                    show this help",
    "exit                    leave the shell",
];

#[derive(Debug, Args)]
pub struct ShellCommand {
    /// Folder levels to load at startup (deeper folders load on demand)
    #[arg(long)]
    depth: Option<u32>,
}

impl ShellCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let config = Config::load_or_default(config_path);
        let mut sync_config = config.sync.clone();
        sync_config.max_depth = self
            .depth
            .or(config.sync.max_depth)
            .or(Some(DEFAULT_SHELL_DEPTH));

        let session = session::connect(&config).await?;
        let formatter = get_formatter(format);
        formatter.success(&format!(
            "Connected as {}",
            session.user.login.as_deref().unwrap_or(&session.user.id)
        ));

        let observer = Arc::new(ConsoleObserver::new(format));
        let mut sync = TreeSynchronizer::new(session.store, sync_config).with_observer(observer);
        sync.load_root()
            .await
            .context("Failed to load the root folder")?;

        Shell::new(sync, formatter, format).run().await
    }
}

/// One parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellInput {
    Ls,
    Cd(String),
    Pwd,
    Tree(Option<usize>),
    Mkdir(String),
    Rename { from: String, to: String },
    Rm(String),
    Upload { paths: Vec<PathBuf>, links: bool },
    Link(String),
    Refresh,
    Help,
    Exit,
}

/// Splits a command line into words; single or double quotes group words
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Parses a command line; `Ok(None)` for blank lines
fn parse_line(line: &str) -> Result<Option<ShellInput>, String> {
    let words = split_args(line)?;
    let Some((command, args)) = words.split_first() else {
        return Ok(None);
    };

    let one = |usage: &str| -> Result<String, String> {
        match args {
            [arg] => Ok(arg.clone()),
            _ => Err(format!("usage: {usage}")),
        }
    };

    let input = match command.as_str() {
        "ls" => ShellInput::Ls,
        "cd" => match args {
            [] => ShellInput::Cd("/".to_string()),
            _ => ShellInput::Cd(one("cd <path>")?),
        },
        "pwd" => ShellInput::Pwd,
        "tree" => match args {
            [] => ShellInput::Tree(None),
            [depth] => ShellInput::Tree(Some(
                depth
                    .parse()
                    .map_err(|_| format!("invalid depth: {depth}"))?,
            )),
            _ => return Err("usage: tree [depth]".to_string()),
        },
        "mkdir" => ShellInput::Mkdir(one("mkdir <name>")?),
        "rename" | "mv" => match args {
            [from, to] => ShellInput::Rename {
                from: from.clone(),
                to: to.clone(),
            },
            _ => return Err("usage: rename <name> <new-name>".to_string()),
        },
        "rm" => ShellInput::Rm(one("rm <name>")?),
        "upload" | "put" => {
            let (links, paths) = match args {
                [flag, rest @ ..] if flag == "-l" || flag == "--link" => (true, rest),
                _ => (false, args),
            };
            if paths.is_empty() {
                return Err("usage: upload [-l] <path>...".to_string());
            }
            ShellInput::Upload {
                paths: paths.iter().map(PathBuf::from).collect(),
                links,
            }
        }
        "link" => ShellInput::Link(one("link <name>")?),
        "refresh" => ShellInput::Refresh,
        "help" | "?" => ShellInput::Help,
        "exit" | "quit" => ShellInput::Exit,
        other => return Err(format!("unknown command: {other} (try 'help')")),
    };
    Ok(Some(input))
}

/// Interactive session state: the synchronizer and the current folder
struct Shell {
    sync: TreeSynchronizer,
    /// Ids from the root down to the current folder
    cwd: Vec<RemoteId>,
    formatter: Box<dyn OutputFormatter>,
    format: OutputFormat,
}

impl Shell {
    fn new(sync: TreeSynchronizer, formatter: Box<dyn OutputFormatter>, format: OutputFormat) -> Self {
        Self {
            sync,
            cwd: vec![RemoteId::root()],
            formatter,
            format,
        }
    }

    async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            if !self.format.is_json() {
                print!("boxtree:{}> ", self.path());
                std::io::stdout().flush().context("Failed to write prompt")?;
            }
            let Some(line) = lines.next_line().await.context("Failed to read input")? else {
                break;
            };

            let input = match parse_line(&line) {
                Ok(Some(input)) => input,
                Ok(None) => continue,
                Err(msg) => {
                    self.formatter.error(&msg);
                    continue;
                }
            };

            match self.exec(input).await {
                Ok(true) => {}
                Ok(false) => break,
                // the observer has already reported the error kind
                Err(e) => match e.downcast_ref::<SyncError>() {
                    Some(sync_err) => self.formatter.info(&sync_err.to_string()),
                    None => self.formatter.error(&format!("{e:#}")),
                },
            }
        }
        Ok(())
    }

    /// Runs one command; returns false when the shell should exit
    async fn exec(&mut self, input: ShellInput) -> Result<bool> {
        debug!(?input, "Shell command");
        match input {
            ShellInput::Ls => {
                let cwd = self.ensure_loaded().await?;
                let folder = self.folder(&cwd)?;
                self.formatter
                    .result(&render_listing(folder), &listing_json(folder));
            }
            ShellInput::Cd(path) => self.change_dir(&path).await?,
            ShellInput::Pwd => {
                let path = self.path();
                self.formatter
                    .result(&[path.clone()], &serde_json::json!({ "path": path }));
            }
            ShellInput::Tree(depth) => {
                let cwd = self.cwd_id();
                let folder = self.folder(&cwd)?;
                self.formatter
                    .result(&render_tree(folder, depth), &serde_json::to_value(folder)?);
            }
            ShellInput::Mkdir(name) => {
                let parent = self.cwd_id();
                let outcome = self
                    .sync
                    .dispatch(TreeIntent::CreateFolder {
                        parent,
                        name: name.clone(),
                    })
                    .await?;
                if let IntentOutcome::FolderCreated(id) = outcome {
                    self.formatter.success(&format!("Created folder {name} ({id})"));
                }
            }
            ShellInput::Rename { from, to } => {
                let target = self.child_id(&from).await?;
                self.sync
                    .dispatch(TreeIntent::Rename {
                        target,
                        new_name: to.clone(),
                    })
                    .await?;
                self.formatter.success(&format!("Renamed {from} to {to}"));
            }
            ShellInput::Rm(name) => {
                let target = self.child_id(&name).await?;
                self.sync.dispatch(TreeIntent::Delete { target }).await?;
                self.formatter.success(&format!("Deleted {name}"));
            }
            ShellInput::Upload { paths, links } => {
                let parent = self.cwd_id();
                let outcome = self
                    .sync
                    .dispatch(TreeIntent::Upload {
                        parent,
                        paths: paths.clone(),
                    })
                    .await?;
                if let IntentOutcome::Uploaded(outcomes) = outcome {
                    let urls = if links {
                        self.links_for(&outcomes).await
                    } else {
                        vec![None; outcomes.len()]
                    };
                    self.report_uploads(&paths, &outcomes, &urls);
                }
            }
            ShellInput::Link(name) => {
                let target = self.child_id(&name).await?;
                let outcome = self
                    .sync
                    .dispatch(TreeIntent::GetDownloadLink { target })
                    .await?;
                if let IntentOutcome::DownloadLink(url) = outcome {
                    self.formatter.result(
                        &[url.clone()],
                        &serde_json::json!({ "name": name, "url": url }),
                    );
                }
            }
            ShellInput::Refresh => {
                let target = self.cwd_id();
                self.sync.dispatch(TreeIntent::Refresh { target }).await?;
                self.formatter.success(&format!("Refreshed {}", self.path()));
            }
            ShellInput::Help => {
                let lines: Vec<String> = HELP.iter().map(|l| l.to_string()).collect();
                self.formatter
                    .result(&lines, &serde_json::json!({ "commands": HELP }));
            }
            ShellInput::Exit => return Ok(false),
        }
        Ok(true)
    }

    /// Download links for uploaded files and for the files they collided with
    ///
    /// A link that cannot be made is logged and left out; the observer has
    /// already reported its error kind.
    async fn links_for(&self, outcomes: &[UploadOutcome]) -> Vec<Option<String>> {
        let mut urls = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let target = match outcome {
                UploadOutcome::Uploaded { id } => Some(id),
                UploadOutcome::Conflict { existing } => existing.as_ref(),
                UploadOutcome::Failed { .. } => None,
            };
            let url = match target {
                Some(id) => match self.sync.get_download_link(id).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!(id = %id, error = %e, "No download link for upload");
                        None
                    }
                },
                None => None,
            };
            urls.push(url);
        }
        urls
    }

    fn report_uploads(
        &self,
        paths: &[PathBuf],
        outcomes: &[UploadOutcome],
        urls: &[Option<String>],
    ) {
        if self.format.is_json() {
            let entries: Vec<serde_json::Value> = paths
                .iter()
                .zip(outcomes)
                .zip(urls)
                .map(|((path, outcome), url)| {
                    let mut entry = serde_json::json!({
                        "path": path.display().to_string(),
                        "outcome": outcome,
                    });
                    if let Some(url) = url {
                        entry["url"] = serde_json::json!(url);
                    }
                    entry
                })
                .collect();
            self.formatter
                .print_json(&serde_json::json!({ "uploads": entries }));
            return;
        }
        for ((path, outcome), url) in paths.iter().zip(outcomes).zip(urls) {
            match outcome {
                UploadOutcome::Uploaded { id } => self
                    .formatter
                    .success(&format!("Uploaded {} ({id})", path.display())),
                UploadOutcome::Conflict { existing } => {
                    let existing = existing
                        .as_ref()
                        .map(|id| format!(" by {id}"))
                        .unwrap_or_default();
                    self.formatter.warn(&format!(
                        "{}: name already in use{existing}",
                        path.display()
                    ))
                }
                UploadOutcome::Failed { message, .. } => self
                    .formatter
                    .error(&format!("{}: {message}", path.display())),
            }
            if let Some(url) = url {
                self.formatter.info(url);
            }
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Current folder id, dropping path segments a refresh removed
    fn cwd_id(&mut self) -> RemoteId {
        while self.cwd.len() > 1 {
            let last = &self.cwd[self.cwd.len() - 1];
            if self.sync.node(last).is_some() {
                break;
            }
            warn!(id = %last, "Current folder is no longer in the tree");
            self.cwd.pop();
        }
        self.cwd[self.cwd.len() - 1].clone()
    }

    fn folder(&self, id: &RemoteId) -> Result<&TreeNode> {
        self.sync
            .node(id)
            .ok_or_else(|| anyhow!("folder {id} is not in the tree"))
    }

    /// Loads the current folder if it was never listed
    async fn ensure_loaded(&mut self) -> Result<RemoteId> {
        let cwd = self.cwd_id();
        if self.folder(&cwd)?.state() == NodeState::Unloaded {
            self.sync
                .dispatch(TreeIntent::Expand { target: cwd.clone() })
                .await?;
        }
        Ok(cwd)
    }

    /// Finds a child of the current folder by name
    async fn child_id(&mut self, name: &str) -> Result<RemoteId> {
        let cwd = self.ensure_loaded().await?;
        let folder = self.folder(&cwd)?;
        folder
            .child_by_name(name)
            .map(|c| c.id().clone())
            .ok_or_else(|| anyhow!("no such file or folder: {name}"))
    }

    async fn change_dir(&mut self, path: &str) -> Result<()> {
        let mut stack = self.cwd.clone();
        if path.starts_with('/') {
            stack.truncate(1);
        }

        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." {
                if stack.len() > 1 {
                    stack.pop();
                }
                continue;
            }
            let parent = stack[stack.len() - 1].clone();
            if self.folder(&parent)?.state() == NodeState::Unloaded {
                self.sync
                    .dispatch(TreeIntent::Expand {
                        target: parent.clone(),
                    })
                    .await?;
            }
            let child = self
                .folder(&parent)?
                .child_by_name(segment)
                .ok_or_else(|| anyhow!("no such folder: {segment}"))?;
            if !child.is_folder() {
                bail!("not a folder: {segment}");
            }
            stack.push(child.id().clone());
        }

        self.cwd = stack;
        self.ensure_loaded().await?;
        Ok(())
    }

    /// Slash-separated names from the root to the current folder
    fn path(&self) -> String {
        let names: Vec<&str> = self.cwd[1..]
            .iter()
            .filter_map(|id| self.sync.node(id).map(|n| n.name()))
            .collect();
        format!("/{}", names.join("/"))
    }
}
