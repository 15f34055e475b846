//! herosheet Core
//!
//! Foundational primitives shared by the overlay engine and its hosts:
//!
//! - **State Machines**: the `StateTransitions` trait used by every lifecycle FSM
//! - **Geometry**: layout rectangles reported by the host
//! - **Input vocabulary**: keys, modifiers and pointer buttons
//!
//! # Example
//!
//! ```rust
//! use herosheet_core::fsm::{apply, StateTransitions};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Door {
//!     Shut,
//!     Ajar,
//! }
//!
//! impl StateTransitions for Door {
//!     fn on_event(&self, event: u32) -> Option<Self> {
//!         match (self, event) {
//!             (Door::Shut, 1) => Some(Door::Ajar),
//!             (Door::Ajar, 2) => Some(Door::Shut),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let mut door = Door::Shut;
//! assert!(apply(&mut door, 1));
//! assert!(!apply(&mut door, 1));
//! assert_eq!(door, Door::Ajar);
//! ```

pub mod events;
pub mod fsm;
pub mod geometry;

pub use events::{KeyCode, Modifiers, MouseButton};
pub use fsm::StateTransitions;
pub use geometry::Rect;
