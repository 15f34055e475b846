//! Trigger surface
//!
//! Decides which clicks on the host page open the overlay and which item
//! they refer to.

use std::fmt;

use herosheet_core::{Modifiers, MouseButton};
use herosheet_layout::{DocumentTree, NodeId};

use crate::config::TriggerConfig;

/// Numeric id of a content item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A click on the host page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickInfo {
    pub target: NodeId,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    /// Another handler already claimed the click
    pub default_prevented: bool,
}

impl ClickInfo {
    /// Plain primary click on `target`
    pub fn primary(target: NodeId) -> Self {
        Self {
            target,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
            default_prevented: false,
        }
    }

    /// Only unclaimed, unmodified primary clicks may open the overlay
    pub fn may_activate(&self) -> bool {
        !self.default_prevented && self.button.is_primary() && !self.modifiers.any()
    }
}

/// Recognizes trigger elements on the host page
pub trait TriggerSurface {
    fn is_trigger(&self, tree: &DocumentTree, element: NodeId) -> bool;

    fn id_from_trigger(&self, tree: &DocumentTree, element: NodeId) -> Option<ItemId>;

    /// Trigger anchor enclosing a click target
    fn trigger_for(&self, tree: &DocumentTree, target: NodeId) -> Option<NodeId> {
        tree.closest(target, |t, n| t.is_tag(n, "a"))
            .filter(|&anchor| self.is_trigger(tree, anchor))
    }

    /// Whether the page can hold triggers at all
    fn page_has_triggers(&self, _tree: &DocumentTree) -> bool {
        true
    }
}

/// Anchors inside a portfolio grid item, `id="post-123"` style
#[derive(Clone, Debug)]
pub struct PortfolioTriggers {
    container_classes: Vec<String>,
    item_class: String,
    id_prefix: String,
}

impl PortfolioTriggers {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            container_classes: config.container_classes.clone(),
            item_class: config.item_class.clone(),
            id_prefix: config.id_prefix.clone(),
        }
    }

    fn item_of(&self, tree: &DocumentTree, element: NodeId) -> Option<NodeId> {
        tree.closest(element, |t, n| t.has_class(n, &self.item_class))
    }

    fn in_grid_class(&self, tree: &DocumentTree, node: NodeId) -> bool {
        self.container_classes.iter().any(|c| tree.has_class(node, c))
    }
}

impl Default for PortfolioTriggers {
    fn default() -> Self {
        Self::new(&TriggerConfig::default())
    }
}

impl TriggerSurface for PortfolioTriggers {
    fn is_trigger(&self, tree: &DocumentTree, element: NodeId) -> bool {
        tree.is_tag(element, "a")
            && tree
                .closest(element, |t, n| self.in_grid_class(t, n))
                .is_some()
            && self.item_of(tree, element).is_some()
    }

    fn id_from_trigger(&self, tree: &DocumentTree, element: NodeId) -> Option<ItemId> {
        let item = self.item_of(tree, element)?;
        let digits = tree.attr(item, "id")?.strip_prefix(self.id_prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(ItemId)
    }

    fn page_has_triggers(&self, tree: &DocumentTree) -> bool {
        tree.find_first(tree.document_element(), |t, n| self.in_grid_class(t, n))
            .is_some()
    }
}
