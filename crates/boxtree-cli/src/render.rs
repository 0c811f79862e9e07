//! Text rendering of tree nodes

use boxtree_core::domain::{NodeKind, NodeState, TreeNode};
use serde_json::{json, Value};

/// Display name with a trailing `/` for folders and `@` for web links
pub fn display_name(node: &TreeNode) -> String {
    match node.kind() {
        NodeKind::Folder => format!("{}/", node.name()),
        NodeKind::File => node.name().to_string(),
        NodeKind::WebLink => format!("{}@", node.name()),
    }
}

/// One line per child of `folder`, in listing order
pub fn render_listing(folder: &TreeNode) -> Vec<String> {
    folder
        .children()
        .iter()
        .map(|child| {
            let marker = match child.state() {
                NodeState::Unloaded if child.is_folder() => "  (not loaded)",
                NodeState::Stale => "  (stale)",
                _ => "",
            };
            format!("{}{}", display_name(child), marker)
        })
        .collect()
}

/// Box-drawing rendering of `root` and its loaded descendants
///
/// `max_depth` limits how many levels below `root` are drawn.
pub fn render_tree(root: &TreeNode, max_depth: Option<usize>) -> Vec<String> {
    let mut lines = vec![display_name(root)];
    render_children(root, "", 1, max_depth, &mut lines);
    lines
}

fn render_children(
    node: &TreeNode,
    prefix: &str,
    depth: usize,
    max_depth: Option<usize>,
    lines: &mut Vec<String>,
) {
    if max_depth.is_some_and(|max| depth > max) {
        return;
    }
    let count = node.children().len();
    for (i, child) in node.children().iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "\u{2514}\u{2500}\u{2500} " } else { "\u{251c}\u{2500}\u{2500} " };
        let suffix = if child.is_folder() && child.state() == NodeState::Unloaded {
            " \u{2026}"
        } else {
            ""
        };
        lines.push(format!("{prefix}{branch}{}{suffix}", display_name(child)));

        let next_prefix = if last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}\u{2502}   ")
        };
        render_children(child, &next_prefix, depth + 1, max_depth, lines);
    }
}

/// JSON form of a folder's direct children
pub fn listing_json(folder: &TreeNode) -> Value {
    let entries: Vec<Value> = folder
        .children()
        .iter()
        .map(|c| {
            json!({
                "id": c.id().as_str(),
                "name": c.name(),
                "kind": c.kind(),
                "state": c.state(),
            })
        })
        .collect();
    json!({
        "id": folder.id().as_str(),
        "name": folder.name(),
        "entries": entries,
    })
}
