//! In-memory revisit history for tabs.
//!
//! Records how often each tab has been brought back to the foreground and
//! when it last left it. This is the history the estimator reads through
//! [`TabRevisitStateSource`]; it also answers the sampler's
//! [`ActiveTabQuery`].
//!
//! # Transitions
//!
//! | Event                         | Effect                                             |
//! |-------------------------------|----------------------------------------------------|
//! | added, active                 | Foreground                                         |
//! | added, inactive               | Background, `last_active_time = now`               |
//! | activated from Background     | Foreground, `num_revisits += 1`, time cleared      |
//! | deactivated from Foreground   | Background, `last_active_time = now`               |
//! | closed                        | record removed                                     |
//!
//! Events for unknown tabs are ignored, as are repeated activations or
//! deactivations of a tab already in the target state.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::revisit_estimator::TabRevisitStateSource;
use crate::sampler::ActiveTabQuery;
use crate::tab::{StateBundle, TabHandle, TabState};

/// Aggregate counters for the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerMetrics {
    /// Tabs currently tracked.
    pub tracked_tabs: u64,
    /// Tabs currently in the foreground.
    pub foreground_tabs: u64,
    /// Background → Foreground transitions since creation.
    pub total_revisits: u64,
    /// Tabs removed via `on_tab_closed`.
    pub total_closed: u64,
}

/// Thread-safe revisit history keyed by tab.
#[derive(Debug, Default)]
pub struct TabRevisitTracker {
    tabs: RwLock<HashMap<TabHandle, StateBundle>>,
    total_revisits: AtomicU64,
    total_closed: AtomicU64,
}

impl TabRevisitTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a tab.
    pub fn on_tab_added(&self, tab: TabHandle, is_active: bool) {
        self.on_tab_added_at(tab, is_active, Instant::now());
    }

    /// Start tracking a tab with an explicit timestamp (for testing).
    pub fn on_tab_added_at(&self, tab: TabHandle, is_active: bool, now: Instant) {
        let bundle = if is_active {
            StateBundle {
                num_revisits: 0,
                last_active_time: None,
                state: TabState::Foreground,
            }
        } else {
            StateBundle {
                num_revisits: 0,
                last_active_time: Some(now),
                state: TabState::Background,
            }
        };
        let mut tabs = self.tabs.write().expect("tab lock poisoned");
        tabs.entry(tab).or_insert(bundle);
    }

    /// The tab became the visible tab of its window.
    pub fn on_tab_activated(&self, tab: TabHandle) {
        let mut tabs = self.tabs.write().expect("tab lock poisoned");
        let Some(bundle) = tabs.get_mut(&tab) else {
            return;
        };
        if bundle.state == TabState::Background {
            bundle.num_revisits = bundle.num_revisits.saturating_add(1);
            bundle.last_active_time = None;
            bundle.state = TabState::Foreground;
            self.total_revisits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                tab_id = tab.id(),
                num_revisits = bundle.num_revisits,
                "Tab revisited"
            );
        }
    }

    /// The tab was hidden behind another tab.
    pub fn on_tab_deactivated(&self, tab: TabHandle) {
        self.on_tab_deactivated_at(tab, Instant::now());
    }

    /// Deactivate with an explicit timestamp (for testing).
    pub fn on_tab_deactivated_at(&self, tab: TabHandle, now: Instant) {
        let mut tabs = self.tabs.write().expect("tab lock poisoned");
        let Some(bundle) = tabs.get_mut(&tab) else {
            return;
        };
        if bundle.state == TabState::Foreground {
            bundle.last_active_time = Some(now);
            bundle.state = TabState::Background;
        }
    }

    /// Forget a closed tab.
    pub fn on_tab_closed(&self, tab: TabHandle) {
        let mut tabs = self.tabs.write().expect("tab lock poisoned");
        if tabs.remove(&tab).is_some() {
            self.total_closed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current snapshot for a tab.
    #[must_use]
    pub fn state_bundle(&self, tab: TabHandle) -> Option<StateBundle> {
        self.tabs.read().expect("tab lock poisoned").get(&tab).copied()
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tabs.read().expect("tab lock poisoned").len()
    }

    #[must_use]
    pub fn metrics(&self) -> TrackerMetrics {
        let tabs = self.tabs.read().expect("tab lock poisoned");
        let foreground_tabs = tabs
            .values()
            .filter(|b| b.state == TabState::Foreground)
            .count();
        TrackerMetrics {
            tracked_tabs: tabs.len() as u64,
            foreground_tabs: foreground_tabs as u64,
            total_revisits: self.total_revisits.load(Ordering::Relaxed),
            total_closed: self.total_closed.load(Ordering::Relaxed),
        }
    }
}

impl TabRevisitStateSource for TabRevisitTracker {
    fn state_bundle(&self, tab: TabHandle) -> Option<StateBundle> {
        Self::state_bundle(self, tab)
    }
}

impl ActiveTabQuery for TabRevisitTracker {
    fn is_active_tab(&self, tab: TabHandle) -> bool {
        self.state_bundle(tab)
            .is_some_and(|b| b.state == TabState::Foreground)
    }
}

// =============================================================================
// Tests
// =============================================================================
