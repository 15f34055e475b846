//! Media staging
//!
//! Moves a playing player into the hero slot and later puts it back exactly
//! where it came from. The origin is remembered as a parent plus next
//! sibling pair keyed by generational node ids, so a sibling that was freed
//! and its slot reused can never be mistaken for the original.

use rustc_hash::FxHashSet;

use crate::enhance::{self, STAGE_WRAP_CLASS};
use crate::handoff::PendingScroll;
use crate::tree::{DocumentTree, NodeId};

/// Attribute on the overlay root flagging video-staged mode
pub const VIDEO_STAGE_ATTR: &str = "data-video-stage";

/// Hero region nodes the staging manager drives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeroSlot {
    pub overlay_root: NodeId,
    /// `figure` holding the static image and the stage
    pub hero: NodeId,
    pub image: NodeId,
    pub caption: NodeId,
    /// Container that holds the staged node
    pub stage: NodeId,
}

/// Where a staged node came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageRecord {
    pub node: NodeId,
    pub parent: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

/// Promotes players into the hero slot and restores them
#[derive(Debug)]
pub struct MediaStage {
    slot: HeroSlot,
    record: Option<StageRecord>,
    /// Native videos whose first play still triggers staging
    armed: FxHashSet<NodeId>,
    pending_scroll: Option<PendingScroll>,
}

impl MediaStage {
    pub fn new(slot: HeroSlot) -> Self {
        Self {
            slot,
            record: None,
            armed: FxHashSet::default(),
            pending_scroll: None,
        }
    }

    pub fn slot(&self) -> HeroSlot {
        self.slot
    }

    /// Active record, present only while a node is staged
    pub fn record(&self) -> Option<&StageRecord> {
        self.record.as_ref()
    }

    pub fn is_video_staged(&self, tree: &DocumentTree) -> bool {
        tree.attr(self.slot.overlay_root, VIDEO_STAGE_ATTR) == Some("true")
    }

    /// Scroll request queued by the last promote, if not yet taken
    pub fn take_pending_scroll(&mut self) -> Option<PendingScroll> {
        self.pending_scroll.take()
    }

    /// Ensure `node` sits in a staging container and return the container
    ///
    /// A node that is itself a container, or already wrapped by one, is
    /// returned as is.
    pub fn wrap(&self, tree: &mut DocumentTree, node: NodeId) -> NodeId {
        if tree.has_class(node, STAGE_WRAP_CLASS) {
            return node;
        }
        if let Some(parent) = tree.parent(node) {
            if tree.has_class(parent, STAGE_WRAP_CLASS) {
                return parent;
            }
        }
        let wrap = tree.create_element_with("div", &[STAGE_WRAP_CLASS], &[]);
        tree.replace_with(node, wrap);
        tree.append_child(wrap, node);
        wrap
    }

    /// Move `container` into the hero slot
    ///
    /// A different container already staged is restored first. Promoting
    /// the staged container again keeps its original record.
    pub fn promote(&mut self, tree: &mut DocumentTree, container: NodeId) -> bool {
        if !tree.contains_node(container) {
            return false;
        }

        if self.record.is_some_and(|r| r.node != container) {
            self.restore(tree);
        }

        if self.record.is_none() {
            let parent = tree.parent(container).filter(|&p| p != self.slot.stage);
            self.record = Some(StageRecord {
                node: container,
                parent,
                next_sibling: parent.and_then(|_| tree.next_sibling(container)),
            });
        }

        tree.set_hidden(self.slot.image, true);
        tree.set_hidden(self.slot.caption, true);
        tree.set_hidden(self.slot.hero, false);
        tree.set_hidden(self.slot.stage, false);

        for orphan in tree.replace_children(self.slot.stage, &[container]) {
            tree.remove_subtree(orphan);
        }

        tree.set_attr(self.slot.overlay_root, VIDEO_STAGE_ATTR, "true");
        self.pending_scroll = Some(PendingScroll::ToElement {
            target: self.slot.hero,
            smooth: true,
        });
        tracing::debug!("media promoted to hero");
        true
    }

    /// Put the staged node back at its origin and leave video-staged mode
    ///
    /// Returns `true` when a node was returned to its origin. With a
    /// detached origin the node stays in the stage, hidden with it.
    pub fn restore(&mut self, tree: &mut DocumentTree) -> bool {
        if self.record.is_none() && !self.is_video_staged(tree) {
            return false;
        }

        let mut restored = false;
        if let Some(record) = self.record.take() {
            let origin = record.parent.filter(|&p| tree.is_attached(p));
            match origin {
                Some(parent) if tree.contains_node(record.node) => {
                    let before = record
                        .next_sibling
                        .filter(|&s| tree.parent(s) == Some(parent) && tree.is_attached(s));
                    tree.insert_before(parent, record.node, before);
                    restored = true;
                }
                _ => tracing::debug!("staged media origin is gone, leaving it in place"),
            }
        }

        if restored {
            tree.clear_children(self.slot.stage);
        }
        tree.set_hidden(self.slot.stage, true);

        let has_image = tree
            .attr(self.slot.image, "src")
            .is_some_and(|src| !src.is_empty());
        tree.set_hidden(self.slot.image, false);
        let caption_empty = tree.text_content(self.slot.caption).trim().is_empty();
        tree.set_hidden(self.slot.caption, caption_empty);
        tree.set_hidden(self.slot.hero, !has_image);

        tree.set_attr(self.slot.overlay_root, VIDEO_STAGE_ATTR, "false");
        self.pending_scroll = None;
        restored
    }

    /// Arm native videos so their first play promotes them
    pub fn arm(&mut self, videos: impl IntoIterator<Item = NodeId>) {
        self.armed.extend(videos);
    }

    /// Drop armed ids that no longer resolve
    pub fn prune(&mut self, tree: &DocumentTree) {
        self.armed.retain(|&id| tree.contains_node(id));
    }

    pub fn is_armed(&self, video: NodeId) -> bool {
        self.armed.contains(&video)
    }

    /// Handle a native play event; returns `true` if it promoted the video
    ///
    /// Fires at most once per armed element.
    pub fn on_media_play(&mut self, tree: &mut DocumentTree, video: NodeId) -> bool {
        if tree.contains(self.slot.stage, video) {
            return false;
        }
        if !self.armed.remove(&video) {
            return false;
        }
        tree.set_attr(video, "playsinline", "");
        let unit = enhance::staging_unit(tree, video);
        let container = self.wrap(tree, unit);
        self.promote(tree, container)
    }
}
