//! Event-driven finite state machines
//!
//! Lifecycle state lives in plain `Copy` enums. Events are `u32` codes so
//! that independent machines can share one dispatch path without a common
//! event enum. A machine that has no transition for an event returns `None`,
//! which callers treat as a defined no-op.

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state types that can handle event transitions
///
/// Implement this trait on your state enum to define how events cause
/// state transitions.
///
/// # Example
///
/// ```ignore
/// impl StateTransitions for OverlayState {
///     fn on_event(&self, event: u32) -> Option<Self> {
///         match (self, event) {
///             (OverlayState::Closed, OPEN) => Some(OverlayState::Opening),
///             (OverlayState::Opening, FRAME) => Some(OverlayState::Open),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait StateTransitions: Clone + Copy + PartialEq + Eq + Hash + Debug + 'static {
    /// Handle an event and return the new state, or None if no transition
    fn on_event(&self, event: u32) -> Option<Self>;
}

/// Feed `event` to `state`, replacing it when a transition exists.
///
/// Returns `true` if the state changed.
pub fn apply<S: StateTransitions>(state: &mut S, event: u32) -> bool {
    match state.on_event(event) {
        Some(next) => {
            tracing::trace!(from = ?*state, to = ?next, event, "state transition");
            *state = next;
            true
        }
        None => false,
    }
}
