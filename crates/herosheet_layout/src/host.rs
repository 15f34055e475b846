//! Host collaborator ports
//!
//! The controller talks to the surrounding page through these traits. Both
//! default to no-ops so an engine can run fully headless.

use crate::error::HostResult;

/// Navigation/analytics hook, called once on open and once on close
pub trait NavigationNotifier {
    fn notify(&self, url: &str, title: &str) -> HostResult<()>;
}

/// Navigation hook that does nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigation;

impl NavigationNotifier for NoopNavigation {
    fn notify(&self, _url: &str, _title: &str) -> HostResult<()> {
        Ok(())
    }
}

/// Tag carried by history entries pushed by the overlay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HistoryTag {
    OverlayOpen,
    OverlayClosed,
}

impl HistoryTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryTag::OverlayOpen => "overlay-open",
            HistoryTag::OverlayClosed => "overlay-closed",
        }
    }
}

/// One pushed history entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub tag: HistoryTag,
    pub title: String,
    pub url: String,
}

/// Session history of the host page
pub trait HistoryPort {
    fn push(&self, entry: HistoryEntry) -> HostResult<()>;
}

/// History port that drops every entry
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHistory;

impl HistoryPort for NoopHistory {
    fn push(&self, _entry: HistoryEntry) -> HostResult<()> {
        Ok(())
    }
}
