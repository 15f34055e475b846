//! Overlay controller
//!
//! Owns the document tree and the single overlay session. Hosts drive it
//! with three kinds of calls:
//!
//! - **Lifecycle**: [`OverlayController::open`] and [`OverlayController::close`]
//! - **Frames**: [`OverlayController::tick`] once per paint
//! - **Input**: [`OverlayController::handle_event`] for wheel, touch, keys,
//!   clicks, history pops and media playback
//!
//! # Example
//!
//! ```rust
//! use herosheet_layout::prelude::*;
//!
//! let mut overlay = OverlayController::new(
//!     DocumentTree::new(),
//!     "https://example.com/work/",
//!     "Work",
//!     OverlayConfig::default(),
//! );
//! overlay.open(OverlayContent {
//!     title: "Project".into(),
//!     body_markup: "<p>Hello</p>".into(),
//!     ..Default::default()
//! });
//! overlay.tick(std::time::Duration::from_millis(16));
//! assert_eq!(overlay.state(), OverlayState::Open);
//!
//! overlay.close(CloseOptions::default());
//! overlay.tick(std::time::Duration::from_millis(200));
//! assert_eq!(overlay.state(), OverlayState::Closed);
//! ```

use std::time::Duration;

use herosheet_core::fsm::{self, StateTransitions};
use herosheet_core::KeyCode;

use crate::chrome::{OverlayChrome, OPEN_ATTR};
use crate::enhance::{self, ContentEnhancer, EmbedEnhancer};
use crate::focus;
use crate::handoff::{
    Handoff, HandoffConfig, PendingScroll, PullUp, ScrollHandoff, DEFAULT_PIN_EPSILON,
    DEFAULT_PIN_OFFSET, DEFAULT_PULL_CAP_RATIO,
};
use crate::host::{
    HistoryEntry, HistoryPort, HistoryTag, NavigationNotifier, NoopHistory, NoopNavigation,
};
use crate::input::{OverlayEvent, Propagation};
use crate::markup;
use crate::media;
use crate::staging::MediaStage;
use crate::tree::{DocumentTree, NodeId};

/// Delay between starting a close and hiding the overlay
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(180);

// =============================================================================
// Lifecycle FSM
// =============================================================================

/// Event codes for the overlay lifecycle machine
pub mod overlay_events {
    /// Closed/Closing -> Opening
    pub const OPEN: u32 = 20001;
    /// Opening/Open -> Closing
    pub const CLOSE: u32 = 20002;
    /// First paint after open (Opening -> Open)
    pub const FRAME: u32 = 20003;
    /// Close transition elapsed (Closing -> Closed)
    pub const CLOSE_TIMER: u32 = 20004;
}

/// State machine for the overlay lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OverlayState {
    /// Overlay is hidden
    #[default]
    Closed,
    /// Revealed, waiting for the first paint to set the open flag
    Opening,
    /// Fully open and interactive
    Open,
    /// Reverse transition running
    Closing,
}

impl OverlayState {
    /// Check if the overlay node is revealed
    pub fn is_visible(&self) -> bool {
        !matches!(self, OverlayState::Closed)
    }

    /// Check if the overlay accepts input
    pub fn is_interactive(&self) -> bool {
        matches!(self, OverlayState::Opening | OverlayState::Open)
    }
}

impl StateTransitions for OverlayState {
    fn on_event(&self, event: u32) -> Option<Self> {
        use overlay_events::*;
        use OverlayState::*;

        match (self, event) {
            (Closed, OPEN) => Some(Opening),
            (Opening, FRAME) => Some(Open),
            (Open, CLOSE) | (Opening, CLOSE) => Some(Closing),
            (Closing, CLOSE_TIMER) => Some(Closed),
            // Reopen before the close transition finished
            (Closing, OPEN) => Some(Opening),
            _ => None,
        }
    }
}

// =============================================================================
// Configuration and inputs
// =============================================================================

/// Engine tunables
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    pub pin_offset: f32,
    pub pin_epsilon: f32,
    pub close_delay: Duration,
    pub pull_cap_ratio: f32,
    /// Sheet layout class on the root
    pub use_sheet: bool,
    /// Header hidden; the meta line is never written
    pub hide_header: bool,
    pub close_in_hero: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            pin_offset: DEFAULT_PIN_OFFSET,
            pin_epsilon: DEFAULT_PIN_EPSILON,
            close_delay: DEFAULT_CLOSE_DELAY,
            pull_cap_ratio: DEFAULT_PULL_CAP_RATIO,
            use_sheet: true,
            hide_header: true,
            close_in_hero: true,
        }
    }
}

impl OverlayConfig {
    pub fn handoff(&self) -> HandoffConfig {
        HandoffConfig {
            pin_offset: self.pin_offset,
            epsilon: self.pin_epsilon,
        }
    }
}

/// Static hero image shown above the content
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeroMedia {
    pub image_url: String,
    /// Caption markup; tags are stripped before display
    pub caption: Option<String>,
}

/// Everything `open` displays, already sanitized
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayContent {
    pub title: String,
    pub body_markup: String,
    pub hero: Option<HeroMedia>,
    /// Taxonomy names for the header meta line
    pub meta_names: Vec<String>,
    /// Item URL pushed to history and reported to navigation
    pub navigation_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CloseOptions {
    /// Close was caused by a browser back/forward; no history push
    pub history_pop: bool,
}

impl CloseOptions {
    pub fn history_pop() -> Self {
        Self { history_pop: true }
    }
}

/// Per open/close cycle state
#[derive(Clone, Debug, PartialEq)]
pub struct OverlaySession {
    pub is_open: bool,
    pub is_pinned: bool,
    pub cap_px: f32,
    pub focus_return_target: Option<NodeId>,
    pub history_entry_pushed: bool,
}

// =============================================================================
// Controller
// =============================================================================

/// Single-instance overlay engine
pub struct OverlayController {
    tree: DocumentTree,
    chrome: OverlayChrome,
    config: OverlayConfig,
    state: OverlayState,
    session: Option<OverlaySession>,
    stage: MediaStage,
    /// Wired on first open, kept for the controller's lifetime
    handoff: Option<ScrollHandoff>,
    handoff_wirings: usize,
    pull: PullUp,
    measure_pending: bool,
    close_elapsed: Duration,
    page_url: String,
    page_title: String,
    navigation: Box<dyn NavigationNotifier>,
    history: Box<dyn HistoryPort>,
    enhancer: Box<dyn ContentEnhancer>,
}

impl std::fmt::Debug for OverlayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayController")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("page_url", &self.page_url)
            .finish_non_exhaustive()
    }
}

impl OverlayController {
    /// Build the overlay chrome into `tree`
    ///
    /// `page_url` and `page_title` describe the host page; every close
    /// returns there.
    pub fn new(
        mut tree: DocumentTree,
        page_url: impl Into<String>,
        page_title: impl Into<String>,
        config: OverlayConfig,
    ) -> Self {
        let chrome = OverlayChrome::build(&mut tree, &config);
        let stage = MediaStage::new(chrome.hero_slot());
        let pull = PullUp::new(config.pull_cap_ratio);
        Self {
            tree,
            chrome,
            config,
            state: OverlayState::Closed,
            session: None,
            stage,
            handoff: None,
            handoff_wirings: 0,
            pull,
            measure_pending: false,
            close_elapsed: Duration::ZERO,
            page_url: page_url.into(),
            page_title: page_title.into(),
            navigation: Box::new(NoopNavigation),
            history: Box::new(NoopHistory),
            enhancer: Box::new(EmbedEnhancer),
        }
    }

    pub fn with_navigation(mut self, navigation: impl NavigationNotifier + 'static) -> Self {
        self.navigation = Box::new(navigation);
        self
    }

    pub fn with_history(mut self, history: impl HistoryPort + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn with_enhancer(mut self, enhancer: impl ContentEnhancer + 'static) -> Self {
        self.enhancer = Box::new(enhancer);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Mutable tree access for hosts writing layout results
    pub fn tree_mut(&mut self) -> &mut DocumentTree {
        &mut self.tree
    }

    pub fn chrome(&self) -> &OverlayChrome {
        &self.chrome
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn session(&self) -> Option<&OverlaySession> {
        self.session.as_ref()
    }

    pub fn stage(&self) -> &MediaStage {
        &self.stage
    }

    pub fn is_video_staged(&self) -> bool {
        self.stage.is_video_staged(&self.tree)
    }

    /// How many times scroll handoff was wired (0 or 1)
    pub fn handoff_wirings(&self) -> usize {
        self.handoff_wirings
    }

    /// Smooth scroll queued for the host, if any
    pub fn take_pending_scroll(&mut self) -> Option<PendingScroll> {
        self.stage.take_pending_scroll()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Show `content` in the overlay
    ///
    /// While open, content is replaced in place and the session kept.
    pub fn open(&mut self, content: OverlayContent) {
        let in_place = self.state.is_interactive();
        if in_place {
            self.stage.restore(&mut self.tree);
        } else {
            fsm::apply(&mut self.state, overlay_events::OPEN);
        }

        self.chrome.set_title(&mut self.tree, &content.title);
        if !self.config.hide_header {
            self.chrome.set_meta(&mut self.tree, &content.meta_names);
        }
        let hero = content.hero.as_ref();
        self.chrome.set_hero(
            &mut self.tree,
            hero.map(|h| h.image_url.as_str()),
            hero.and_then(|h| h.caption.as_deref()),
        );

        self.chrome.set_content(&mut self.tree, &content.body_markup);
        self.stage.prune(&self.tree);
        self.tree.set_scroll_top(self.chrome.content, 0.0);
        self.tree.set_scroll_top(self.chrome.article, 0.0);

        let videos = self
            .enhancer
            .normalize_embeds(&mut self.tree, self.chrome.content);
        self.stage.arm(videos);

        if self.handoff.is_none() {
            self.handoff = Some(ScrollHandoff::new(
                self.chrome.handoff_regions(),
                self.config.handoff(),
            ));
            self.handoff_wirings += 1;
        }

        self.chrome.lock_page(&mut self.tree, true);
        self.chrome.set_visible(&mut self.tree, true);
        self.tree
            .set_attr(self.chrome.root, "aria-hidden", "false");
        self.close_elapsed = Duration::ZERO;
        self.measure_pending = true;

        let focus_return_target = match (&self.session, in_place) {
            (Some(session), true) => session.focus_return_target,
            _ => self.tree.focused(),
        };
        self.tree.focus(self.chrome.close_button);

        let mut session = OverlaySession {
            is_open: true,
            is_pinned: false,
            cap_px: self.pull.cap_px(),
            focus_return_target,
            history_entry_pushed: false,
        };

        if let Some(url) = content.navigation_url.as_deref() {
            let title = markup::strip_tags(&content.title);
            session.history_entry_pushed = self.push_history(HistoryTag::OverlayOpen, &title, url);
            self.notify(url, &title);
        }
        self.session = Some(session);

        tracing::debug!(state = ?self.state, in_place, "overlay opened");
    }

    /// Start closing the overlay
    ///
    /// Returns `false` without side effects when already closed or closing.
    pub fn close(&mut self, options: CloseOptions) -> bool {
        if !fsm::apply(&mut self.state, overlay_events::CLOSE) {
            return false;
        }

        self.tree.remove_attr(self.chrome.root, OPEN_ATTR);
        self.stage.restore(&mut self.tree);
        self.tree.set_attr(self.chrome.root, "aria-hidden", "true");
        self.close_elapsed = Duration::ZERO;
        self.measure_pending = false;

        if !options.history_pop {
            let (title, url) = (self.page_title.clone(), self.page_url.clone());
            self.push_history(HistoryTag::OverlayClosed, &title, &url);
        }
        let (url, title) = (self.page_url.clone(), self.page_title.clone());
        self.notify(&url, &title);

        let target = self.session.as_mut().and_then(|s| {
            s.is_open = false;
            s.focus_return_target
        });
        match target.filter(|&t| self.tree.contains_node(t)) {
            Some(t) => self.tree.focus(t),
            None => self.tree.blur(),
        }

        tracing::debug!(history_pop = options.history_pop, "overlay closing");
        if self.config.close_delay.is_zero() {
            self.finish_close();
        }
        true
    }

    /// Close and hide immediately, skipping the transition delay
    pub fn force_close(&mut self) {
        self.close(CloseOptions::default());
        if self.state == OverlayState::Closing {
            self.finish_close();
        }
    }

    /// Advance one paint frame
    pub fn tick(&mut self, dt: Duration) {
        match self.state {
            OverlayState::Opening => {
                self.tree.set_attr(self.chrome.root, OPEN_ATTR, "true");
                self.measure();
                fsm::apply(&mut self.state, overlay_events::FRAME);
            }
            OverlayState::Open => {
                if self.measure_pending {
                    self.measure();
                }
            }
            OverlayState::Closing => {
                self.close_elapsed += dt;
                if self.close_elapsed >= self.config.close_delay {
                    self.finish_close();
                }
            }
            OverlayState::Closed => {}
        }
    }

    fn finish_close(&mut self) {
        self.chrome.set_visible(&mut self.tree, false);
        self.chrome.lock_page(&mut self.tree, false);
        self.session = None;
        fsm::apply(&mut self.state, overlay_events::CLOSE_TIMER);
        tracing::debug!("overlay closed");
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Route a host event, returning what to do with the native default
    pub fn handle_event(&mut self, event: OverlayEvent) -> Propagation {
        if !self.state.is_interactive() {
            return Propagation::Continue;
        }

        match event {
            OverlayEvent::KeyDown { key, modifiers } => match key {
                KeyCode::Escape => {
                    self.close(CloseOptions::default());
                    Propagation::Continue
                }
                KeyCode::Tab => {
                    match focus::cycle_focus(&mut self.tree, self.chrome.root, modifiers.shift) {
                        Some(_) => Propagation::PreventDefault,
                        None => Propagation::Continue,
                    }
                }
                _ => Propagation::Continue,
            },
            OverlayEvent::Click { target } => self.on_click(target),
            OverlayEvent::PopState => {
                self.close(CloseOptions::history_pop());
                Propagation::Continue
            }
            OverlayEvent::Wheel { target, delta_y } => {
                if !self.in_content(target) {
                    return Propagation::Continue;
                }
                match self.handoff.as_mut() {
                    Some(handoff) => {
                        let outcome = handoff.on_wheel(&mut self.tree, delta_y);
                        self.after_handoff(outcome)
                    }
                    None => Propagation::Continue,
                }
            }
            OverlayEvent::TouchStart { target, client_y } => {
                if self.in_content(target) {
                    if let Some(handoff) = self.handoff.as_mut() {
                        handoff.on_touch_start(client_y);
                    }
                }
                Propagation::Continue
            }
            OverlayEvent::TouchMove { target, client_y } => {
                if !self.in_content(target) {
                    return Propagation::Continue;
                }
                match self.handoff.as_mut() {
                    Some(handoff) => {
                        let outcome = handoff.on_touch_move(&mut self.tree, client_y);
                        self.after_handoff(outcome)
                    }
                    None => Propagation::Continue,
                }
            }
            OverlayEvent::TouchEnd => {
                if let Some(handoff) = self.handoff.as_mut() {
                    handoff.on_touch_end();
                }
                Propagation::Continue
            }
            OverlayEvent::MediaPlay { target } => {
                if self.in_content(target) {
                    self.stage.on_media_play(&mut self.tree, target);
                }
                Propagation::Continue
            }
            OverlayEvent::Resize => {
                self.measure();
                Propagation::Continue
            }
            OverlayEvent::ImageLoaded { target } => {
                if self.tree.contains(self.chrome.content, target) {
                    self.measure();
                }
                Propagation::Continue
            }
        }
    }

    fn in_content(&self, target: NodeId) -> bool {
        self.tree.contains(self.chrome.content, target)
    }

    fn on_click(&mut self, target: NodeId) -> Propagation {
        if self.chrome.is_close_target(&self.tree, target) {
            self.close(CloseOptions::default());
            return Propagation::Continue;
        }
        if !self.in_content(target) {
            return Propagation::Continue;
        }

        if let Some(play) = self.enhancer.activate_module(&mut self.tree, target) {
            if let Some(player) = play.player {
                let unit = enhance::staging_unit(&self.tree, player);
                let container = self.stage.wrap(&mut self.tree, unit);
                self.stage.promote(&mut self.tree, container);
            }
            return Propagation::PreventDefault;
        }

        let Some(anchor) = self
            .tree
            .closest(target, |t, n| t.is_tag(n, "a") && t.has_attr(n, "href"))
        else {
            return Propagation::Continue;
        };
        let href = self.tree.attr(anchor, "href").unwrap_or_default();
        let Some(source) = media::classify(href) else {
            return Propagation::Continue;
        };

        if let Some(container) = self
            .enhancer
            .player_for_link(&mut self.tree, anchor, &source)
        {
            self.stage.promote(&mut self.tree, container);
        }
        Propagation::PreventDefault
    }

    /// Outer offset moved: refresh the pull state and pin flag
    fn after_handoff(&mut self, outcome: Handoff) -> Propagation {
        if !outcome.prevents_default() {
            return Propagation::Continue;
        }
        let scroll_top = self.tree.scroll_top(self.chrome.article);
        self.pull.apply(&mut self.tree, self.chrome.content, scroll_top);
        self.refresh_pin();
        Propagation::PreventDefault
    }

    fn measure(&mut self) {
        let cap = self.pull.measure(&self.tree, self.chrome.card);
        let scroll_top = self.tree.scroll_top(self.chrome.article);
        self.pull.apply(&mut self.tree, self.chrome.content, scroll_top);
        self.measure_pending = false;
        if let Some(session) = self.session.as_mut() {
            session.cap_px = cap;
        }
        self.refresh_pin();
    }

    fn refresh_pin(&mut self) {
        let pinned = self
            .handoff
            .as_ref()
            .is_some_and(|h| h.is_pinned(&self.tree));
        if let Some(session) = self.session.as_mut() {
            session.is_pinned = pinned;
        }
    }

    fn push_history(&self, tag: HistoryTag, title: &str, url: &str) -> bool {
        let entry = HistoryEntry {
            tag,
            title: title.to_string(),
            url: url.to_string(),
        };
        match self.history.push(entry) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "history push failed");
                false
            }
        }
    }

    fn notify(&self, url: &str, title: &str) {
        if let Err(err) = self.navigation.notify(url, title) {
            tracing::debug!(%err, "navigation notify failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::STAGE_WRAP_CLASS;
    use crate::error::{HostError, HostResult};
    use crate::staging::VIDEO_STAGE_ATTR;
    use herosheet_core::{Modifiers, Rect};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const PAGE: &str = "https://example.com/work/";
    const ITEM: &str = "https://example.com/project/alpha/";
    const FRAME: Duration = Duration::from_millis(16);

    #[derive(Clone, Default)]
    struct Recorder {
        notified: Rc<RefCell<Vec<(String, String)>>>,
        pushed: Rc<RefCell<Vec<HistoryEntry>>>,
        fail: bool,
    }

    impl NavigationNotifier for Recorder {
        fn notify(&self, url: &str, title: &str) -> HostResult<()> {
            self.notified
                .borrow_mut()
                .push((url.to_string(), title.to_string()));
            if self.fail {
                return Err(HostError::Navigation("analytics offline".into()));
            }
            Ok(())
        }
    }

    impl HistoryPort for Recorder {
        fn push(&self, entry: HistoryEntry) -> HostResult<()> {
            self.pushed.borrow_mut().push(entry);
            if self.fail {
                return Err(HostError::History("blocked".into()));
            }
            Ok(())
        }
    }

    fn controller(recorder: &Recorder) -> OverlayController {
        let mut tree = DocumentTree::new();
        let trigger = tree.create_element_with("a", &[], &[("href", ITEM), ("id", "trigger")]);
        let body = tree.body();
        tree.append_child(body, trigger);
        tree.focus(trigger);
        OverlayController::new(tree, PAGE, "Work", OverlayConfig::default())
            .with_navigation(recorder.clone())
            .with_history(recorder.clone())
    }

    fn trigger(ctrl: &OverlayController) -> NodeId {
        let body = ctrl.tree().body();
        ctrl.tree().element_by_id(body, "trigger").unwrap()
    }

    /// Card at y=100 (600 tall), content laid out at y=400
    fn lay_out(ctrl: &mut OverlayController) {
        let chrome = *ctrl.chrome();
        let tree = ctrl.tree_mut();
        tree.set_bounds(chrome.card, Rect::new(0.0, 100.0, 800.0, 600.0));
        tree.set_bounds(chrome.content, Rect::new(0.0, 400.0, 800.0, 570.0));
        tree.set_scroll_extents(chrome.article, 1600.0, 600.0);
        tree.set_scroll_extents(chrome.content, 2000.0, 570.0);
    }

    fn item(body: &str) -> OverlayContent {
        OverlayContent {
            title: "Alpha &amp; Co".into(),
            body_markup: body.into(),
            hero: Some(HeroMedia {
                image_url: "https://example.com/hero.jpg".into(),
                caption: Some("<em>Studio</em>".into()),
            }),
            meta_names: vec!["Web".into(), "Brand".into()],
            navigation_url: Some(ITEM.into()),
        }
    }

    fn opened(recorder: &Recorder, body: &str) -> OverlayController {
        let mut ctrl = controller(recorder);
        ctrl.open(item(body));
        lay_out(&mut ctrl);
        ctrl.tick(FRAME);
        ctrl
    }

    #[test]
    fn test_state_machine() {
        use overlay_events::*;
        let mut state = OverlayState::Closed;
        assert!(!fsm::apply(&mut state, CLOSE));
        assert!(fsm::apply(&mut state, OPEN));
        assert_eq!(state, OverlayState::Opening);
        assert!(!fsm::apply(&mut state, CLOSE_TIMER));
        assert!(fsm::apply(&mut state, FRAME));
        assert_eq!(state, OverlayState::Open);
        assert!(!fsm::apply(&mut state, OPEN));
        assert!(fsm::apply(&mut state, CLOSE));
        assert!(!fsm::apply(&mut state, CLOSE));
        assert!(fsm::apply(&mut state, OPEN));
        assert_eq!(state, OverlayState::Opening);
        fsm::apply(&mut state, CLOSE);
        assert!(fsm::apply(&mut state, CLOSE_TIMER));
        assert_eq!(state, OverlayState::Closed);
    }

    #[test]
    fn test_open_with_hero() {
        let recorder = Recorder::default();
        let mut ctrl = controller(&recorder);
        ctrl.open(item("<p>Body</p>"));
        let chrome = *ctrl.chrome();

        assert_eq!(ctrl.state(), OverlayState::Opening);
        assert!(chrome.is_visible(ctrl.tree()));
        assert!(chrome.is_page_locked(ctrl.tree()));
        assert_eq!(ctrl.tree().attr(chrome.root, "aria-hidden"), Some("false"));
        assert_eq!(ctrl.tree().attr(chrome.root, OPEN_ATTR), None);
        assert!(!ctrl.tree().is_hidden(chrome.hero));
        assert_eq!(ctrl.tree().text_content(chrome.hero_caption), "Studio");
        assert_eq!(ctrl.tree().scroll_top(chrome.content), 0.0);
        assert_eq!(ctrl.tree().focused(), Some(chrome.close_button));
        assert_eq!(ctrl.tree().text_content(chrome.title), "Alpha & Co");
        assert_eq!(ctrl.tree().text_content(chrome.content), "Body");
        // Header hidden by default: meta untouched
        assert!(ctrl.tree().is_hidden(chrome.meta));

        let pushed = recorder.pushed.borrow();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].tag, HistoryTag::OverlayOpen);
        assert_eq!(pushed[0].url, ITEM);
        assert_eq!(
            *recorder.notified.borrow(),
            vec![(ITEM.to_string(), "Alpha & Co".to_string())]
        );

        let session = ctrl.session().unwrap();
        assert!(session.is_open);
        assert!(session.history_entry_pushed);
        assert_eq!(session.focus_return_target, Some(trigger(&ctrl)));
    }

    #[test]
    fn test_first_frame_sets_open_flag_and_measures() {
        let recorder = Recorder::default();
        let ctrl = opened(&recorder, "<p>Body</p>");
        let chrome = *ctrl.chrome();
        assert_eq!(ctrl.state(), OverlayState::Open);
        assert_eq!(ctrl.tree().attr(chrome.root, OPEN_ATTR), Some("true"));
        assert_eq!(ctrl.session().unwrap().cap_px, 540.0);
        assert_eq!(
            ctrl.tree().attr(chrome.content, "data-scroll-mode"),
            Some("ride")
        );
    }

    #[test]
    fn test_meta_shown_with_header() {
        let recorder = Recorder::default();
        let config = OverlayConfig {
            hide_header: false,
            ..Default::default()
        };
        let mut ctrl = OverlayController::new(DocumentTree::new(), PAGE, "Work", config)
            .with_navigation(recorder.clone());
        ctrl.open(item("<p>x</p>"));
        let meta = ctrl.chrome().meta;
        assert!(!ctrl.tree().is_hidden(meta));
        assert_eq!(ctrl.tree().text_content(meta), "Web • Brand");
    }

    #[test]
    fn test_open_without_hero_or_url() {
        let recorder = Recorder::default();
        let mut ctrl = controller(&recorder);
        ctrl.open(OverlayContent {
            title: "Bare".into(),
            body_markup: "<p>x</p>".into(),
            ..Default::default()
        });
        assert!(ctrl.tree().is_hidden(ctrl.chrome().hero));
        assert!(recorder.pushed.borrow().is_empty());
        assert!(recorder.notified.borrow().is_empty());
        assert!(!ctrl.session().unwrap().history_entry_pushed);
    }

    #[test]
    fn test_close_lifecycle() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        let chrome = *ctrl.chrome();

        assert!(ctrl.close(CloseOptions::default()));
        assert_eq!(ctrl.state(), OverlayState::Closing);
        assert_eq!(ctrl.tree().attr(chrome.root, OPEN_ATTR), None);
        assert_eq!(ctrl.tree().attr(chrome.root, "aria-hidden"), Some("true"));
        assert_eq!(ctrl.tree().focused(), Some(trigger(&ctrl)));
        // Still visible during the transition
        assert!(chrome.is_visible(ctrl.tree()));
        assert!(chrome.is_page_locked(ctrl.tree()));

        ctrl.tick(Duration::from_millis(100));
        assert_eq!(ctrl.state(), OverlayState::Closing);
        ctrl.tick(Duration::from_millis(80));
        assert_eq!(ctrl.state(), OverlayState::Closed);
        assert!(!chrome.is_visible(ctrl.tree()));
        assert!(!chrome.is_page_locked(ctrl.tree()));
        assert!(ctrl.session().is_none());

        let pushed = recorder.pushed.borrow();
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[1].tag, HistoryTag::OverlayClosed);
        assert_eq!(pushed[1].url, PAGE);
        let notified = recorder.notified.borrow();
        assert_eq!(notified.len(), 2);
        assert_eq!(notified[1], (PAGE.to_string(), "Work".to_string()));
    }

    #[test]
    fn test_double_close_is_noop() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        assert!(ctrl.close(CloseOptions::default()));
        assert!(!ctrl.close(CloseOptions::default()));
        ctrl.tick(Duration::from_millis(200));
        assert!(!ctrl.close(CloseOptions::default()));

        assert_eq!(recorder.pushed.borrow().len(), 2);
        assert_eq!(recorder.notified.borrow().len(), 2);
    }

    #[test]
    fn test_history_pop_skips_push() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        ctrl.handle_event(OverlayEvent::PopState);

        assert_eq!(ctrl.state(), OverlayState::Closing);
        assert_eq!(recorder.pushed.borrow().len(), 1);
        let notified = recorder.notified.borrow();
        assert_eq!(notified.len(), 2);
        assert_eq!(notified[1].0, PAGE);
    }

    #[test]
    fn test_pop_state_while_closed_ignored() {
        let recorder = Recorder::default();
        let mut ctrl = controller(&recorder);
        ctrl.handle_event(OverlayEvent::PopState);
        assert_eq!(ctrl.state(), OverlayState::Closed);
        assert!(recorder.notified.borrow().is_empty());
    }

    #[test]
    fn test_collaborator_failures_swallowed() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        assert_eq!(ctrl.state(), OverlayState::Open);
        assert!(!ctrl.session().unwrap().history_entry_pushed);
        assert!(ctrl.close(CloseOptions::default()));
        assert_eq!(recorder.notified.borrow().len(), 2);
    }

    #[test]
    fn test_force_close_hides_immediately() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        ctrl.force_close();
        assert_eq!(ctrl.state(), OverlayState::Closed);
        assert!(!ctrl.chrome().is_visible(ctrl.tree()));
        ctrl.force_close();
        assert_eq!(recorder.notified.borrow().len(), 2);
    }

    #[test]
    fn test_zero_close_delay() {
        let config = OverlayConfig {
            close_delay: Duration::ZERO,
            ..Default::default()
        };
        let mut ctrl = OverlayController::new(DocumentTree::new(), PAGE, "Work", config);
        ctrl.open(item("<p>x</p>"));
        ctrl.close(CloseOptions::default());
        assert_eq!(ctrl.state(), OverlayState::Closed);
    }

    #[test]
    fn test_reopen_while_open_keeps_session() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>One</p>");
        let first_target = ctrl.session().unwrap().focus_return_target;

        ctrl.open(item("<p>Two</p>"));
        assert_eq!(ctrl.state(), OverlayState::Open);
        assert_eq!(ctrl.tree().text_content(ctrl.chrome().content), "Two");
        assert_eq!(ctrl.session().unwrap().focus_return_target, first_target);
        assert_eq!(ctrl.handoff_wirings(), 1);

        ctrl.close(CloseOptions::default());
        assert_eq!(ctrl.tree().focused(), Some(trigger(&ctrl)));
    }

    #[test]
    fn test_reopen_while_closing() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>One</p>");
        ctrl.close(CloseOptions::default());
        ctrl.tick(Duration::from_millis(50));

        ctrl.open(item("<p>Two</p>"));
        assert_eq!(ctrl.state(), OverlayState::Opening);
        ctrl.tick(Duration::from_millis(500));
        assert_eq!(ctrl.state(), OverlayState::Open);
        assert!(ctrl.chrome().is_visible(ctrl.tree()));
    }

    #[test]
    fn test_handoff_wired_once() {
        let recorder = Recorder::default();
        let mut ctrl = controller(&recorder);
        for _ in 0..3 {
            ctrl.open(item("<p>x</p>"));
            ctrl.tick(FRAME);
            ctrl.force_close();
        }
        assert_eq!(ctrl.handoff_wirings(), 1);
    }

    #[test]
    fn test_scroll_before_pin_moves_outer() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        let chrome = *ctrl.chrome();
        let target = ctrl.tree().children(chrome.content)[0];

        let propagation = ctrl.handle_event(OverlayEvent::Wheel {
            target,
            delta_y: 50.0,
        });
        assert!(propagation.is_prevented());
        assert_eq!(ctrl.tree().scroll_top(chrome.article), 50.0);
        assert_eq!(ctrl.tree().scroll_top(chrome.content), 0.0);
        assert_eq!(ctrl.tree().attr(chrome.content, "data-pull"), Some("50px"));
    }

    #[test]
    fn test_pinned_scroll_up_at_top_hands_back() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        let chrome = *ctrl.chrome();
        ctrl.tree_mut().set_scroll_top(chrome.article, 300.0);

        let propagation = ctrl.handle_event(OverlayEvent::Wheel {
            target: chrome.content,
            delta_y: -20.0,
        });
        assert!(propagation.is_prevented());
        assert_eq!(ctrl.tree().scroll_top(chrome.article), 280.0);
        assert_eq!(ctrl.tree().scroll_top(chrome.content), 0.0);
        assert!(ctrl.session().unwrap().is_pinned);

        // Scrolling down while pinned stays native
        let propagation = ctrl.handle_event(OverlayEvent::Wheel {
            target: chrome.content,
            delta_y: 20.0,
        });
        assert_eq!(propagation, Propagation::Continue);
    }

    #[test]
    fn test_touch_outside_content_ignored() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        let chrome = *ctrl.chrome();
        ctrl.handle_event(OverlayEvent::TouchStart {
            target: chrome.hero,
            client_y: 500.0,
        });
        let propagation = ctrl.handle_event(OverlayEvent::TouchMove {
            target: chrome.hero,
            client_y: 400.0,
        });
        assert_eq!(propagation, Propagation::Continue);
        assert_eq!(ctrl.tree().scroll_top(chrome.article), 0.0);

        ctrl.handle_event(OverlayEvent::TouchStart {
            target: chrome.content,
            client_y: 500.0,
        });
        let propagation = ctrl.handle_event(OverlayEvent::TouchMove {
            target: chrome.content,
            client_y: 460.0,
        });
        assert!(propagation.is_prevented());
        assert_eq!(ctrl.tree().scroll_top(chrome.article), 40.0);

        // A move after the gesture ended has no start point
        ctrl.handle_event(OverlayEvent::TouchEnd);
        let propagation = ctrl.handle_event(OverlayEvent::TouchMove {
            target: chrome.content,
            client_y: 300.0,
        });
        assert_eq!(propagation, Propagation::Continue);
        assert_eq!(ctrl.tree().scroll_top(chrome.article), 40.0);
    }

    #[test]
    fn test_escape_and_close_targets() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>Body</p>");
        ctrl.handle_event(OverlayEvent::KeyDown {
            key: KeyCode::Escape,
            modifiers: Modifiers::NONE,
        });
        assert_eq!(ctrl.state(), OverlayState::Closing);

        let mut ctrl = opened(&recorder, "<p>Body</p>");
        let backdrop = ctrl.chrome().backdrop;
        ctrl.handle_event(OverlayEvent::Click { target: backdrop });
        assert_eq!(ctrl.state(), OverlayState::Closing);

        let mut ctrl = opened(&recorder, "<p>Body</p>");
        let content = ctrl.chrome().content;
        ctrl.handle_event(OverlayEvent::Click { target: content });
        assert_eq!(ctrl.state(), OverlayState::Open);
    }

    #[test]
    fn test_tab_trap() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, r#"<p><a href="/more" id="last">more</a></p>"#);
        let chrome = *ctrl.chrome();
        let last = ctrl.tree().element_by_id(chrome.content, "last").unwrap();

        // Close button is first and focused
        let shift_tab = OverlayEvent::KeyDown {
            key: KeyCode::Tab,
            modifiers: Modifiers::shift(),
        };
        assert!(ctrl.handle_event(shift_tab).is_prevented());
        assert_eq!(ctrl.tree().focused(), Some(last));

        let tab = OverlayEvent::KeyDown {
            key: KeyCode::Tab,
            modifiers: Modifiers::NONE,
        };
        assert!(ctrl.handle_event(tab).is_prevented());
        assert_eq!(ctrl.tree().focused(), Some(chrome.close_button));
    }

    #[test]
    fn test_video_play_stages_and_close_restores() {
        let recorder = Recorder::default();
        let mut ctrl = opened(
            &recorder,
            r#"<p>one</p><video src="/clip.mp4" id="v"></video><p>two</p>"#,
        );
        let chrome = *ctrl.chrome();
        let video = ctrl.tree().element_by_id(chrome.content, "v").unwrap();

        ctrl.handle_event(OverlayEvent::MediaPlay { target: video });
        assert!(ctrl.is_video_staged());
        assert!(ctrl.tree().is_hidden(chrome.hero_image));
        assert!(ctrl.tree().contains(chrome.hero_stage, video));
        assert_eq!(ctrl.tree().children(chrome.hero_stage).len(), 1);
        assert_eq!(
            ctrl.take_pending_scroll(),
            Some(PendingScroll::ToElement {
                target: chrome.hero,
                smooth: true
            })
        );

        ctrl.close(CloseOptions::default());
        assert!(!ctrl.is_video_staged());
        assert_eq!(ctrl.tree().attr(chrome.root, VIDEO_STAGE_ATTR), Some("false"));
        let children = ctrl.tree().children(chrome.content).to_vec();
        assert_eq!(children.len(), 3);
        assert!(ctrl.tree().has_class(children[1], STAGE_WRAP_CLASS));
        assert_eq!(ctrl.tree().parent(video), Some(children[1]));
        assert!(ctrl.tree().children(chrome.hero_stage).is_empty());
        assert!(!ctrl.tree().is_hidden(chrome.hero_image));
    }

    #[test]
    fn test_in_place_open_unstages_and_rearms() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, r#"<video id="v"></video>"#);
        let content = ctrl.chrome().content;
        let video = ctrl.tree().element_by_id(content, "v").unwrap();
        ctrl.handle_event(OverlayEvent::MediaPlay { target: video });
        assert!(ctrl.is_video_staged());

        ctrl.open(item(r#"<video id="v"></video>"#));
        assert!(!ctrl.is_video_staged());
        assert!(!ctrl.tree().contains_node(video));
        assert!(!ctrl.stage().is_armed(video));

        let fresh = ctrl.tree().element_by_id(content, "v").unwrap();
        ctrl.handle_event(OverlayEvent::MediaPlay { target: fresh });
        assert!(ctrl.is_video_staged());
    }

    #[test]
    fn test_media_link_intercepted() {
        let recorder = Recorder::default();
        let mut ctrl = opened(
            &recorder,
            r#"<p>See <a href="https://vimeo.com/42"><span id="s">the film</span></a></p>"#,
        );
        let chrome = *ctrl.chrome();
        let span = ctrl.tree().element_by_id(chrome.content, "s").unwrap();

        let propagation = ctrl.handle_event(OverlayEvent::Click { target: span });
        assert!(propagation.is_prevented());
        assert!(ctrl.is_video_staged());
        let staged = ctrl.tree().children(chrome.hero_stage)[0];
        let iframe = ctrl.tree().children(staged)[0];
        assert_eq!(
            ctrl.tree().attr(iframe, "src"),
            Some("https://player.vimeo.com/video/42?autoplay=1&pip=1")
        );

        // Restored into the paragraph where the link was
        ctrl.close(CloseOptions::default());
        let p = ctrl.tree().children(chrome.content)[0];
        assert_eq!(ctrl.tree().parent(staged), Some(p));
    }

    #[test]
    fn test_video_module_play_stages_player() {
        let recorder = Recorder::default();
        let mut ctrl = opened(
            &recorder,
            r##"<div class="et_pb_video"><div class="et_pb_video_box"><video data-src="/reel.mp4"></video></div><div class="et_pb_video_overlay" id="poster"><a href="#" class="et_pb_video_play" id="play">Play</a></div></div>"##,
        );
        let chrome = *ctrl.chrome();
        let play = ctrl.tree().element_by_id(chrome.content, "play").unwrap();
        let poster = ctrl.tree().element_by_id(chrome.content, "poster").unwrap();

        let propagation = ctrl.handle_event(OverlayEvent::Click { target: play });
        assert!(propagation.is_prevented());
        assert!(ctrl.is_video_staged());
        assert!(ctrl.tree().is_hidden(poster));

        let staged = ctrl.tree().children(chrome.hero_stage)[0];
        let video = ctrl.tree().children(staged)[0];
        assert!(ctrl.tree().is_tag(video, "video"));
        assert_eq!(ctrl.tree().attr(video, "src"), Some("/reel.mp4"));
        assert!(ctrl.tree().has_attr(video, "muted"));
    }

    #[test]
    fn test_plain_link_not_intercepted() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, r#"<a href="https://example.com/about" id="a">about</a>"#);
        let content = ctrl.chrome().content;
        let anchor = ctrl.tree().element_by_id(content, "a").unwrap();
        let propagation = ctrl.handle_event(OverlayEvent::Click { target: anchor });
        assert_eq!(propagation, Propagation::Continue);
        assert!(!ctrl.is_video_staged());
    }

    #[test]
    fn test_resize_remeasures() {
        let recorder = Recorder::default();
        let mut ctrl = opened(&recorder, "<p>x</p>");
        let card = ctrl.chrome().card;
        ctrl.tree_mut()
            .set_bounds(card, Rect::new(0.0, 50.0, 400.0, 300.0));
        ctrl.handle_event(OverlayEvent::Resize);
        assert_eq!(ctrl.session().unwrap().cap_px, 270.0);
    }

    proptest! {
        #[test]
        fn prop_every_cycle_notifies_twice(pops in proptest::collection::vec(any::<bool>(), 1..6)) {
            let recorder = Recorder::default();
            let mut ctrl = controller(&recorder);
            for &pop in &pops {
                ctrl.open(item("<p>x</p>"));
                ctrl.tick(FRAME);
                if pop {
                    ctrl.handle_event(OverlayEvent::PopState);
                } else {
                    ctrl.close(CloseOptions::default());
                }
                ctrl.tick(Duration::from_millis(200));
            }
            let notified = recorder.notified.borrow();
            prop_assert_eq!(notified.len(), pops.len() * 2);
            for pair in notified.chunks(2) {
                prop_assert_eq!(pair[0].0.as_str(), ITEM);
                prop_assert_eq!(pair[1].0.as_str(), PAGE);
            }
            let closes = recorder.pushed.borrow().iter().filter(|e| e.tag == HistoryTag::OverlayClosed).count();
            prop_assert_eq!(closes, pops.iter().filter(|&&p| !p).count());
        }
    }
}
