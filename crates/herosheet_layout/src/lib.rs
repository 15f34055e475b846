//! herosheet Overlay Engine
//!
//! Headless modal overlay over an in-memory document tree: a content pane
//! rides up over a hero region, pins, then scrolls on its own, while
//! playing media can be staged into the hero and restored afterwards.
//!
//! # Example
//!
//! ```rust
//! use herosheet_layout::prelude::*;
//! use herosheet_core::Rect;
//! use std::time::Duration;
//!
//! let mut overlay = OverlayController::new(
//!     DocumentTree::new(),
//!     "https://example.com/",
//!     "Home",
//!     OverlayConfig::default(),
//! );
//! overlay.open(OverlayContent {
//!     title: "Project".into(),
//!     body_markup: "<p>Body</p>".into(),
//!     ..Default::default()
//! });
//!
//! // Host writes layout back, then paints
//! let chrome = *overlay.chrome();
//! let tree = overlay.tree_mut();
//! tree.set_bounds(chrome.card, Rect::new(0.0, 100.0, 800.0, 600.0));
//! tree.set_bounds(chrome.content, Rect::new(0.0, 400.0, 800.0, 600.0));
//! tree.set_scroll_extents(chrome.article, 1600.0, 600.0);
//! overlay.tick(Duration::from_millis(16));
//!
//! // Before the pin line, wheel input moves the outer article
//! let outcome = overlay.handle_event(OverlayEvent::Wheel {
//!     target: chrome.content,
//!     delta_y: 50.0,
//! });
//! assert!(outcome.is_prevented());
//! assert_eq!(overlay.tree().scroll_top(chrome.article), 50.0);
//! ```

pub mod chrome;
pub mod enhance;
pub mod error;
pub mod focus;
pub mod handoff;
pub mod host;
pub mod input;
pub mod markup;
pub mod media;
pub mod overlay;
pub mod staging;
pub mod tree;

// Core types
pub use error::{HostError, HostResult};
pub use overlay::{
    CloseOptions, HeroMedia, OverlayConfig, OverlayContent, OverlayController, OverlaySession,
    OverlayState,
};
pub use tree::{DocumentTree, NodeId};

pub mod prelude {
    // Document tree
    pub use crate::tree::{DocumentTree, NodeId, NodeKind, ScrollMetrics};
    // Overlay lifecycle
    pub use crate::overlay::{
        overlay_events, CloseOptions, HeroMedia, OverlayConfig, OverlayContent,
        OverlayController, OverlaySession, OverlayState,
    };
    pub use crate::chrome::OverlayChrome;
    // Input routing
    pub use crate::input::{OverlayEvent, Propagation};
    // Host collaborators
    pub use crate::host::{
        HistoryEntry, HistoryPort, HistoryTag, NavigationNotifier, NoopHistory, NoopNavigation,
    };
    // Media
    pub use crate::enhance::{ContentEnhancer, EmbedEnhancer, ModulePlay};
    pub use crate::handoff::{Handoff, PendingScroll};
    pub use crate::media::{classify, MediaProvider, MediaSource};
    pub use crate::staging::{HeroSlot, StageRecord};

    pub use herosheet_core::{KeyCode, Modifiers};
}
