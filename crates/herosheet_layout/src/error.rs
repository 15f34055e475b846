//! Error types for host collaborators

use thiserror::Error;

/// Failures reported by the navigation and history collaborators
///
/// The overlay controller never propagates these out of `open`/`close`;
/// they are logged and dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Navigation/analytics notification failed
    #[error("navigation notify failed: {0}")]
    Navigation(String),

    /// History entry could not be pushed
    #[error("history push failed: {0}")]
    History(String),
}

/// Result type for host collaborator calls
pub type HostResult<T> = std::result::Result<T, HostError>;
