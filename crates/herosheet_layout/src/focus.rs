//! Focus trap
//!
//! The focusable list is recomputed on every Tab since content mutates
//! while the overlay is open.

use crate::tree::{DocumentTree, NodeId};

/// Visible, enabled focusable descendants of `root` in document order
pub fn focusable_elements(tree: &DocumentTree, root: NodeId) -> Vec<NodeId> {
    tree.find_all(root, |t, n| {
        is_focusable(t, n) && !t.has_attr(n, "disabled") && t.is_rendered(n)
    })
}

fn is_focusable(tree: &DocumentTree, node: NodeId) -> bool {
    let Some(tag) = tree.tag(node) else {
        return false;
    };
    let by_tag = match tag {
        "a" => tree.has_attr(node, "href"),
        "button" | "textarea" | "select" => true,
        "input" => tree.attr(node, "type") != Some("hidden"),
        _ => false,
    };
    by_tag || tree.attr(node, "tabindex").is_some_and(|v| v.trim() != "-1")
}

/// Wrap Tab focus inside `root`
///
/// Returns the newly focused node when the trap moved focus, meaning the
/// host must suppress the native Tab. `None` lets native focus traversal
/// proceed.
pub fn cycle_focus(tree: &mut DocumentTree, root: NodeId, backwards: bool) -> Option<NodeId> {
    let list = focusable_elements(tree, root);
    let (&first, &last) = (list.first()?, list.last()?);

    let current = tree.focused().filter(|&f| tree.contains(root, f));
    let target = match current {
        None if backwards => last,
        None => first,
        Some(f) if backwards && f == first => last,
        Some(f) if !backwards && f == last => first,
        Some(_) => return None,
    };
    tree.focus(target);
    Some(target)
}
