//! Tab identity and the per-tab revisit snapshot consumed by the estimator.
//!
//! The host owns the real tab model. This crate only sees an opaque
//! [`TabHandle`] plus a read-only [`StateBundle`] snapshot per query.

use std::time::Instant;

use serde::{Deserialize, Serialize};

// =============================================================================
// Tab handle
// =============================================================================

/// Opaque identity of a tab in the host's tab model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabHandle(pub u64);

impl TabHandle {
    /// Raw host-assigned id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl From<u64> for TabHandle {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TabHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab:{}", self.0)
    }
}

// =============================================================================
// Tab state
// =============================================================================

/// Visibility state of a tab as tracked by the revisit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabState {
    /// Currently shown in its window.
    Foreground,
    /// Hidden behind another tab.
    Background,
    /// Closed by the user; no longer a discard candidate.
    Closed,
}

impl std::fmt::Display for TabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground => write!(f, "foreground"),
            Self::Background => write!(f, "background"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// State bundle
// =============================================================================

/// Read-only snapshot of a tab's revisit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateBundle {
    /// Times the tab came back to the foreground after being hidden.
    pub num_revisits: i64,
    /// When the tab last left the foreground. Only set while backgrounded.
    pub last_active_time: Option<Instant>,
    pub state: TabState,
}

impl StateBundle {
    /// `last_active_time`, but only when the tab is actually in the background.
    #[must_use]
    pub fn background_since(&self) -> Option<Instant> {
        match self.state {
            TabState::Background => self.last_active_time,
            TabState::Foreground | TabState::Closed => None,
        }
    }
}
