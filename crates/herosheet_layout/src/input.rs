//! Input events delivered by the host while the overlay is mounted

use herosheet_core::{KeyCode, Modifiers};

use crate::tree::NodeId;

/// An input or lifecycle event routed to the overlay controller
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlayEvent {
    /// Wheel over `target`; positive `delta_y` scrolls down
    Wheel { target: NodeId, delta_y: f32 },
    TouchStart { target: NodeId, client_y: f32 },
    TouchMove { target: NodeId, client_y: f32 },
    TouchEnd,
    KeyDown { key: KeyCode, modifiers: Modifiers },
    Click { target: NodeId },
    /// Browser back/forward navigation
    PopState,
    /// A media element started playing
    MediaPlay { target: NodeId },
    /// Viewport size changed
    Resize,
    /// An image inside the card finished loading
    ImageLoaded { target: NodeId },
}

/// What the host should do with the native default action
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Propagation {
    #[default]
    Continue,
    PreventDefault,
}

impl Propagation {
    pub fn is_prevented(&self) -> bool {
        matches!(self, Propagation::PreventDefault)
    }
}
