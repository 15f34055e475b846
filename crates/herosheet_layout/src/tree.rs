//! Document tree management
//!
//! An arena of element and text nodes with DOM-like structural operations.
//! Node ids are generational slotmap keys: once a node is freed its id never
//! resolves again, even if the slot is reused, so positional records that
//! outlive their nodes degrade to "missing" instead of aliasing new nodes.
//!
//! Structural mutations on missing nodes are silent no-ops, matching how the
//! layout tree treats stale ids.

use indexmap::IndexMap;
use slotmap::{new_key_type, Key, SlotMap};
use smallvec::SmallVec;
use std::fmt::Write as _;

use herosheet_core::Rect;

new_key_type! {
    pub struct NodeId;
}

impl NodeId {
    /// Convert to a raw u64 representation
    ///
    /// This is useful for handing node ids to a host across an FFI boundary.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 representation produced by `to_raw()`
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// Element or text payload of a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a lowercase tag name
    Element(String),
    /// Character data
    Text(String),
}

/// Scroll state of a scrollable region, in host pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    /// Current scroll offset from the top edge
    pub offset: f32,
    /// Total height of the scrolled content
    pub content_extent: f32,
    /// Height of the visible viewport
    pub viewport_extent: f32,
}

impl ScrollMetrics {
    pub fn new(content_extent: f32, viewport_extent: f32) -> Self {
        Self {
            offset: 0.0,
            content_extent,
            viewport_extent,
        }
    }

    /// Largest reachable offset
    pub fn max_offset(&self) -> f32 {
        (self.content_extent - self.viewport_extent).max(0.0)
    }

    /// Clamp an offset into the reachable range
    pub fn clamp(&self, offset: f32) -> f32 {
        offset.clamp(0.0, self.max_offset())
    }
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    attrs: IndexMap<String, String>,
    classes: SmallVec<[String; 4]>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    bounds: Rect,
    scroll: ScrollMetrics,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            classes: SmallVec::new(),
            parent: None,
            children: Vec::new(),
            bounds: Rect::ZERO,
            scroll: ScrollMetrics::default(),
        }
    }
}

/// In-memory document: `html > (head, body)` plus any detached fragments
pub struct DocumentTree {
    nodes: SlotMap<NodeId, Node>,
    document: NodeId,
    head: NodeId,
    body: NodeId,
    focused: Option<NodeId>,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let document = nodes.insert(Node::new(NodeKind::Element("html".into())));
        let head = nodes.insert(Node::new(NodeKind::Element("head".into())));
        let body = nodes.insert(Node::new(NodeKind::Element("body".into())));
        let mut tree = Self {
            nodes,
            document,
            head,
            body,
            focused: None,
        };
        tree.append_child(document, head);
        tree.append_child(document, body);
        tree
    }

    /// The root `html` element
    pub fn document_element(&self) -> NodeId {
        self.document
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes
            .insert(Node::new(NodeKind::Element(tag.to_ascii_lowercase())))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Text(text.into())))
    }

    /// Create a detached element with classes and attributes in one call
    pub fn create_element_with(
        &mut self,
        tag: &str,
        classes: &[&str],
        attrs: &[(&str, &str)],
    ) -> NodeId {
        let id = self.create_element(tag);
        for class in classes {
            self.add_class(id, class);
        }
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        id
    }

    // =========================================================================
    // Node payload
    // =========================================================================

    /// Check if a node id still resolves
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    /// Tag name of an element (None for text nodes and missing ids)
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element(tag)) => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Check if a node is an element with the given tag
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(id)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.nodes
            .get(id)
            .map(|n| n.attrs.contains_key(name))
            .unwrap_or(false)
    }

    /// Set an attribute. `class` is routed to the class list.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if name == "class" {
            if let Some(node) = self.nodes.get_mut(id) {
                node.classes = value.split_whitespace().map(str::to_string).collect();
            }
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attrs.shift_remove(name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes
            .get(id)
            .map(|n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.classes.retain(|c| c != class);
        }
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.classes.as_slice())
            .unwrap_or(&[])
    }

    /// Toggle the `hidden` attribute
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if hidden {
            self.set_attr(id, "hidden", "");
        } else {
            self.remove_attr(id, "hidden");
        }
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.has_attr(id, "hidden")
    }

    /// Check whether a node would be laid out: attached, and neither it nor
    /// any ancestor is `hidden` or styled `display:none`
    pub fn is_rendered(&self, id: NodeId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        self.ancestors_inclusive(id)
            .into_iter()
            .all(|n| !self.is_hidden(n) && !self.has_display_none(n))
    }

    fn has_display_none(&self, id: NodeId) -> bool {
        self.attr(id, "style")
            .map(|style| {
                let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
                compact.to_ascii_lowercase().contains("display:none")
            })
            .unwrap_or(false)
    }

    /// Concatenated text of a node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(_) => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Replace all children with a single text node (empty text clears)
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node);
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Check whether `node` is `ancestor` or one of its descendants
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Check whether a node still exists and is connected to the document
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains_node(id) && self.contains(self.document, id)
    }

    fn ancestors_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }
        chain
    }

    /// Remove a node from its parent, keeping it (and its subtree) alive
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, moving it if needed
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `reference`
    ///
    /// Appends when `reference` is `None` or is not a child of `parent`.
    /// Inserting a node into its own subtree is refused.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if !self.contains_node(parent) || !self.contains_node(child) || parent == child {
            return;
        }
        if self.contains(child, parent) {
            tracing::warn!("refusing to insert a node into its own subtree");
            return;
        }
        if matches!(self.kind(parent), Some(NodeKind::Text(_))) {
            return;
        }

        self.detach(child);

        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return;
        };
        let index = reference
            .filter(|&r| r != child)
            .and_then(|r| parent_node.children.iter().position(|&c| c == r));
        match index {
            Some(i) => parent_node.children.insert(i, child),
            None => parent_node.children.push(child),
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Put `new` where `old` is and detach `old`
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        let Some(parent) = self.parent(old) else {
            return;
        };
        self.insert_before(parent, new, Some(old));
        self.detach(old);
    }

    /// Replace children of a node with new children
    /// Returns the IDs of the old children that were detached (not freed)
    pub fn replace_children(&mut self, parent: NodeId, new_children: &[NodeId]) -> Vec<NodeId> {
        if !self.contains_node(parent) {
            return Vec::new();
        }
        let old_children: Vec<NodeId> = self.children(parent).to_vec();
        for &child in &old_children {
            self.detach(child);
        }
        for &child in new_children {
            self.append_child(parent, child);
        }
        old_children
            .into_iter()
            .filter(|c| !new_children.contains(c))
            .collect()
    }

    /// Remove and free all children of a node (but keep the node itself)
    pub fn clear_children(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = self.children(parent).to_vec();
        for child in children {
            self.remove_subtree(child);
        }
    }

    /// Remove a node and all its descendants from the arena
    pub fn remove_subtree(&mut self, id: NodeId) {
        if id == self.document {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            if let Some(node) = self.nodes.remove(node_id) {
                stack.extend(node.children);
            }
            if self.focused == Some(node_id) {
                self.focused = None;
            }
        }
    }

    /// Descendants of `root` in document order (excluding `root`)
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// First descendant of `root` (document order) matching the predicate
    pub fn find_first(&self, root: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(root).into_iter().find(|&id| pred(self, id))
    }

    /// All descendants of `root` (document order) matching the predicate
    pub fn find_all(&self, root: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| pred(self, id))
            .collect()
    }

    /// Nearest inclusive ancestor matching the predicate
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.contains_node(node) && pred(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// First descendant of `root` whose `id` attribute equals `element_id`
    pub fn element_by_id(&self, root: NodeId, element_id: &str) -> Option<NodeId> {
        self.find_first(root, |t, n| t.attr(n, "id") == Some(element_id))
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|&id| self.contains_node(id))
    }

    /// Move focus to a node (missing ids clear focus)
    pub fn focus(&mut self, id: NodeId) {
        self.focused = self.contains_node(id).then_some(id);
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    // =========================================================================
    // Layout state (written by the host after each layout pass)
    // =========================================================================

    pub fn bounds(&self, id: NodeId) -> Rect {
        self.nodes.get(id).map(|n| n.bounds).unwrap_or_default()
    }

    pub fn set_bounds(&mut self, id: NodeId, bounds: Rect) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.bounds = bounds;
        }
    }

    pub fn scroll(&self, id: NodeId) -> ScrollMetrics {
        self.nodes.get(id).map(|n| n.scroll).unwrap_or_default()
    }

    /// Replace scroll extents; the current offset is re-clamped
    pub fn set_scroll_extents(&mut self, id: NodeId, content_extent: f32, viewport_extent: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.scroll.content_extent = content_extent;
            node.scroll.viewport_extent = viewport_extent;
            node.scroll.offset = node.scroll.clamp(node.scroll.offset);
        }
    }

    pub fn scroll_top(&self, id: NodeId) -> f32 {
        self.scroll(id).offset
    }

    pub fn set_scroll_top(&mut self, id: NodeId, offset: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.scroll.offset = node.scroll.clamp(offset);
        }
    }

    /// Scroll by a delta and return the distance actually moved
    pub fn scroll_by(&mut self, id: NodeId, delta: f32) -> f32 {
        let Some(node) = self.nodes.get_mut(id) else {
            return 0.0;
        };
        let before = node.scroll.offset;
        node.scroll.offset = node.scroll.clamp(before + delta);
        node.scroll.offset - before
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Get the number of live nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indented outline of a subtree, one node per line
    pub fn outline(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(root, 0, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let indent = "  ".repeat(depth);
        match &node.kind {
            NodeKind::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    let _ = writeln!(out, "{indent}\"{text}\"");
                }
            }
            NodeKind::Element(tag) => {
                let _ = write!(out, "{indent}<{tag}");
                if !node.classes.is_empty() {
                    let _ = write!(out, " class=\"{}\"", node.classes.join(" "));
                }
                for (name, value) in &node.attrs {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{value}\"");
                    }
                }
                let _ = writeln!(out, ">");
                for &child in &node.children {
                    self.write_outline(child, depth + 1, out);
                }
            }
        }
    }
}
