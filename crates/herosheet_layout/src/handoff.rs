//! Scroll handoff between the outer article and the inner content pane
//!
//! Before the content pane reaches its pin line, every wheel or touch delta
//! over it is redirected to the article so the pane rides up over the hero.
//! Once pinned the pane scrolls natively, except that scrolling up from its
//! own top hands the delta back to the article so the hero can re-emerge.
//!
//! Geometry is re-read on every event. Bounds are the host's laid-out
//! positions with the article at offset zero; the visible content top is
//! derived by subtracting the article's current offset.

use herosheet_core::Rect;

use crate::tree::{DocumentTree, NodeId};

/// Distance below the card top at which the content pane pins
pub const DEFAULT_PIN_OFFSET: f32 = 30.0;
/// Sub-pixel slop for the pin comparison
pub const DEFAULT_PIN_EPSILON: f32 = 0.5;
/// Share of the card height the pane may overlap the hero
pub const DEFAULT_PULL_CAP_RATIO: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandoffConfig {
    pub pin_offset: f32,
    pub epsilon: f32,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            pin_offset: DEFAULT_PIN_OFFSET,
            epsilon: DEFAULT_PIN_EPSILON,
        }
    }
}

/// The three regions the handoff reads and writes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandoffRegions {
    /// Fixed card whose top anchors the pin line
    pub card: NodeId,
    /// Outer scroller
    pub article: NodeId,
    /// Inner scroller
    pub content: NodeId,
}

/// Outcome of routing one scroll delta
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Handoff {
    /// Delta went to the outer scroller; `applied` is the distance it
    /// actually moved after clamping
    Redirected { delta: f32, applied: f32 },
    /// Host should let the content pane scroll natively
    Native,
}

impl Handoff {
    /// Redirected deltas must suppress native scrolling
    pub fn prevents_default(&self) -> bool {
        matches!(self, Handoff::Redirected { .. })
    }
}

/// Scroll request queued for the host to perform
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PendingScroll {
    /// Bring an element into view at the top of its scroller
    ToElement { target: NodeId, smooth: bool },
}

/// Routes wheel and touch deltas between the two scrollers
#[derive(Debug)]
pub struct ScrollHandoff {
    config: HandoffConfig,
    regions: HandoffRegions,
    touch_start_y: Option<f32>,
}

impl ScrollHandoff {
    pub fn new(regions: HandoffRegions, config: HandoffConfig) -> Self {
        Self {
            config,
            regions,
            touch_start_y: None,
        }
    }

    pub fn regions(&self) -> HandoffRegions {
        self.regions
    }

    /// Y of the pin line in viewport coordinates
    pub fn pin_top(&self, tree: &DocumentTree) -> f32 {
        tree.bounds(self.regions.card).top() + self.config.pin_offset
    }

    /// Current visible top of the content pane
    pub fn content_top(&self, tree: &DocumentTree) -> f32 {
        tree.bounds(self.regions.content).top() - tree.scroll_top(self.regions.article)
    }

    pub fn is_pinned(&self, tree: &DocumentTree) -> bool {
        self.content_top(tree) <= self.pin_top(tree) + self.config.epsilon
    }

    pub fn on_wheel(&mut self, tree: &mut DocumentTree, delta_y: f32) -> Handoff {
        self.route(tree, delta_y)
    }

    pub fn on_touch_start(&mut self, client_y: f32) {
        self.touch_start_y = Some(client_y);
    }

    /// Route a touch move; positive deltas mean the finger moved up
    ///
    /// The delta is measured from the touch-start point, not from the
    /// previous move.
    pub fn on_touch_move(&mut self, tree: &mut DocumentTree, client_y: f32) -> Handoff {
        let Some(start) = self.touch_start_y else {
            return Handoff::Native;
        };
        self.route(tree, start - client_y)
    }

    pub fn on_touch_end(&mut self) {
        self.touch_start_y = None;
    }

    fn route(&mut self, tree: &mut DocumentTree, dy: f32) -> Handoff {
        if !self.is_pinned(tree) {
            return self.redirect(tree, dy);
        }
        let at_top = tree.scroll_top(self.regions.content) <= 0.0;
        if at_top && dy < 0.0 {
            return self.redirect(tree, dy);
        }
        tracing::trace!(dy, "handoff: native");
        Handoff::Native
    }

    fn redirect(&mut self, tree: &mut DocumentTree, dy: f32) -> Handoff {
        let applied = tree.scroll_by(self.regions.article, dy);
        tracing::trace!(dy, applied, "handoff: redirected to article");
        Handoff::Redirected { delta: dy, applied }
    }
}

/// Pull-up state derived from the outer offset
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PullState {
    /// Distance the pane currently overlaps the hero
    pub overlap: f32,
    /// Pane scrolls on its own once the overlap reaches the cap
    pub internal_scroll: bool,
}

/// Overlap cap measurement for the riding content pane
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PullUp {
    ratio: f32,
    cap_px: f32,
}

impl Default for PullUp {
    fn default() -> Self {
        Self::new(DEFAULT_PULL_CAP_RATIO)
    }
}

impl PullUp {
    pub fn new(ratio: f32) -> Self {
        Self { ratio, cap_px: 0.0 }
    }

    pub fn cap_px(&self) -> f32 {
        self.cap_px
    }

    /// Re-measure the cap from the card's laid-out height
    pub fn measure(&mut self, tree: &DocumentTree, card: NodeId) -> f32 {
        self.cap_px = cap_for(tree.bounds(card), self.ratio);
        self.cap_px
    }

    pub fn state_at(&self, scroll_top: f32) -> PullState {
        let overlap = scroll_top.min(self.cap_px).max(0.0);
        PullState {
            overlap,
            internal_scroll: overlap >= self.cap_px,
        }
    }

    /// Publish the pull state for `scroll_top` onto the content pane
    pub fn apply(&self, tree: &mut DocumentTree, content: NodeId, scroll_top: f32) -> PullState {
        let state = self.state_at(scroll_top);
        tree.set_attr(content, "data-pull", &format!("{}px", state.overlap));
        tree.set_attr(
            content,
            "data-scroll-mode",
            if state.internal_scroll { "internal" } else { "ride" },
        );
        state
    }
}

fn cap_for(card: Rect, ratio: f32) -> f32 {
    (card.height * ratio).floor().max(0.0)
}
