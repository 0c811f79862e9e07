//! Terminal tree observer

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use boxtree_core::domain::{ErrorKind, RemoteId, TreeNode};
use boxtree_core::ports::ITreeObserver;

use crate::output::{get_formatter, OutputFormat};

/// Reports failed operations on the terminal and counts tree updates
pub struct ConsoleObserver {
    format: OutputFormat,
    refreshes: AtomicUsize,
}

impl ConsoleObserver {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Number of `on_refreshed` callbacks received
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }
}

impl ITreeObserver for ConsoleObserver {
    fn on_refreshed(&self, node: &TreeNode) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        debug!(
            id = %node.id(),
            name = %node.name(),
            children = node.children().len(),
            "Tree updated"
        );
    }

    fn on_error(&self, node: &RemoteId, kind: ErrorKind) {
        let formatter = get_formatter(self.format);
        if self.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "event": "error",
                "node": node.as_str(),
                "kind": kind,
            }));
        } else {
            formatter.error(&format!("{} (node {})", describe(kind), node));
        }
    }
}

fn describe(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ProtectedNode => "the root folder cannot be changed",
        ErrorKind::InvalidOperation => "operation not valid here",
        ErrorKind::NameConflict => "name already in use",
        ErrorKind::NotEmpty => "folder is not empty",
        ErrorKind::NotFound => "item no longer exists",
        ErrorKind::RemoteUnavailable => "Box request failed",
    }
}
