//! Periodic sampling of tracked tabs.
//!
//! [`ProbabilisticMemorySaverSampler`] keeps the set of tabs the host has
//! told it about and, once per interval, asks its attached [`DiscardTarget`]
//! to consider every tracked tab that is not the active tab of its window.
//!
//! ```text
//!  host tab events ──► SamplerTabObserver ──► tracked set
//!                                                 │
//!  timer tick (every interval) ──► snapshot ──────┘
//!        │
//!        ├─ active tab?  skip
//!        └─ otherwise    DiscardTarget::try_discard(tab)
//! ```
//!
//! The timer runs as a tokio task spawned on [`Sampler::attach`] and is
//! aborted when the sampler is dropped. Outside a tokio runtime no timer is
//! started and the host calls [`run_sampling_pass`](ProbabilisticMemorySaverSampler::run_sampling_pass)
//! itself.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::ConfigError;
use crate::evaluator::DiscardTarget;
use crate::tab::TabHandle;

// =============================================================================
// Traits
// =============================================================================

/// Drives discard decisions for an attached [`DiscardTarget`].
pub trait Sampler: Send + Sync {
    /// Receive the back-reference used to request decisions.
    fn attach(&mut self, target: Weak<dyn DiscardTarget>);

    /// Sample every eligible tab once, immediately.
    fn run_sampling_pass(&self) -> SamplingPass;
}

/// Whether a tab is the visible tab of its window.
pub trait ActiveTabQuery: Send + Sync {
    fn is_active_tab(&self, tab: TabHandle) -> bool;
}

/// Tab lifecycle hooks the host wires into its tab model.
pub trait TabLifecycleObserver {
    fn on_tab_added(&self, tab: TabHandle);
    fn on_before_tab_removed(&self, tab: TabHandle);
}

// =============================================================================
// Results and metrics
// =============================================================================

/// Outcome of a single sampling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingPass {
    /// Tabs handed to the discard target.
    pub sampled: usize,
    /// Tabs skipped because they were active.
    pub skipped_active: usize,
    /// Sampled tabs that were discarded.
    pub discarded: usize,
}

/// Cumulative sampler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerStats {
    pub passes: u64,
    pub tabs_sampled: u64,
    pub active_skipped: u64,
    pub tabs_discarded: u64,
    /// Tabs currently tracked.
    pub tracked_tabs: u64,
}

// =============================================================================
// Shared state
// =============================================================================

struct SamplerState {
    tracked: RwLock<BTreeSet<TabHandle>>,
    active_tabs: Arc<dyn ActiveTabQuery>,
    target: RwLock<Option<Weak<dyn DiscardTarget>>>,
    passes: AtomicU64,
    tabs_sampled: AtomicU64,
    active_skipped: AtomicU64,
    tabs_discarded: AtomicU64,
}

impl SamplerState {
    fn add(&self, tab: TabHandle) {
        let inserted = self
            .tracked
            .write()
            .expect("sampler lock poisoned")
            .insert(tab);
        assert!(inserted, "{tab} is already tracked by the sampler");
    }

    fn remove(&self, tab: TabHandle) {
        let removed = self
            .tracked
            .write()
            .expect("sampler lock poisoned")
            .remove(&tab);
        assert!(removed, "{tab} is not tracked by the sampler");
    }

    fn upgrade_target(&self) -> Option<Arc<dyn DiscardTarget>> {
        self.target
            .read()
            .expect("sampler lock poisoned")
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn is_target_gone(&self) -> bool {
        self.target
            .read()
            .expect("sampler lock poisoned")
            .as_ref()
            .is_some_and(|t| t.strong_count() == 0)
    }

    fn run_pass(&self) -> SamplingPass {
        let Some(target) = self.upgrade_target() else {
            return SamplingPass::default();
        };

        // The discard callback may remove tabs, so work from a copy and
        // recheck membership before each tab.
        let tabs: Vec<TabHandle> = self
            .tracked
            .read()
            .expect("sampler lock poisoned")
            .iter()
            .copied()
            .collect();

        let mut pass = SamplingPass::default();
        for tab in tabs {
            // Removed by an earlier discard in this pass.
            if !self.is_tracked(tab) {
                continue;
            }
            if self.active_tabs.is_active_tab(tab) {
                pass.skipped_active += 1;
                continue;
            }
            pass.sampled += 1;
            if target.try_discard(tab) {
                pass.discarded += 1;
            }
        }

        self.passes.fetch_add(1, Ordering::Relaxed);
        self.tabs_sampled
            .fetch_add(pass.sampled as u64, Ordering::Relaxed);
        self.active_skipped
            .fetch_add(pass.skipped_active as u64, Ordering::Relaxed);
        self.tabs_discarded
            .fetch_add(pass.discarded as u64, Ordering::Relaxed);

        tracing::debug!(
            sampled = pass.sampled,
            skipped_active = pass.skipped_active,
            discarded = pass.discarded,
            "Sampling pass complete"
        );
        pass
    }

    fn is_tracked(&self, tab: TabHandle) -> bool {
        self.tracked
            .read()
            .expect("sampler lock poisoned")
            .contains(&tab)
    }

    fn tracked_count(&self) -> usize {
        self.tracked.read().expect("sampler lock poisoned").len()
    }
}

// =============================================================================
// Sampler
// =============================================================================

/// Samples every tracked, non-active tab once per interval.
pub struct ProbabilisticMemorySaverSampler {
    interval: Duration,
    state: Arc<SamplerState>,
    timer_enabled: bool,
    timer: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ProbabilisticMemorySaverSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbabilisticMemorySaverSampler")
            .field("interval", &self.interval)
            .field("tracked_tabs", &self.state.tracked_count())
            .field("timer_running", &self.is_timer_running())
            .finish()
    }
}

impl ProbabilisticMemorySaverSampler {
    pub fn new(
        interval: Duration,
        active_tabs: Arc<dyn ActiveTabQuery>,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroSamplingInterval);
        }
        Ok(Self {
            interval,
            state: Arc::new(SamplerState {
                tracked: RwLock::new(BTreeSet::new()),
                active_tabs,
                target: RwLock::new(None),
                passes: AtomicU64::new(0),
                tabs_sampled: AtomicU64::new(0),
                active_skipped: AtomicU64::new(0),
                tabs_discarded: AtomicU64::new(0),
            }),
            timer_enabled: true,
            timer: None,
        })
    }

    /// Never start the repeating timer; passes run only on request.
    #[must_use]
    pub fn without_timer(mut self) -> Self {
        self.timer_enabled = false;
        self
    }

    /// Start tracking a tab.
    ///
    /// # Panics
    ///
    /// If the tab is already tracked.
    pub fn on_tab_added(&self, tab: TabHandle) {
        self.state.add(tab);
    }

    /// Stop tracking a tab that is about to be removed.
    ///
    /// # Panics
    ///
    /// If the tab is not tracked.
    pub fn on_before_tab_removed(&self, tab: TabHandle) {
        self.state.remove(tab);
    }

    /// A cloneable handle delivering lifecycle events to this sampler.
    #[must_use]
    pub fn tab_observer(&self) -> SamplerTabObserver {
        SamplerTabObserver {
            state: Arc::clone(&self.state),
        }
    }

    /// Tracked tabs in handle order.
    #[must_use]
    pub fn tracked_tabs(&self) -> Vec<TabHandle> {
        self.state
            .tracked
            .read()
            .expect("sampler lock poisoned")
            .iter()
            .copied()
            .collect()
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    #[must_use]
    pub fn stats(&self) -> SamplerStats {
        self.tab_observer().stats()
    }

    fn spawn_timer(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No tokio runtime; sampling passes are driven by the host");
            return;
        };

        let state = Arc::clone(&self.state);
        let period = self.interval;
        self.timer = Some(handle.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if state.is_target_gone() {
                    tracing::debug!("Discard target dropped, stopping sampler timer");
                    break;
                }
                state.run_pass();
            }
        }));

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Proactive discard sampler started"
        );
    }
}

impl Sampler for ProbabilisticMemorySaverSampler {
    fn attach(&mut self, target: Weak<dyn DiscardTarget>) {
        *self.state.target.write().expect("sampler lock poisoned") = Some(target);

        if let Some(previous) = self.timer.take() {
            previous.abort();
        }
        if self.timer_enabled {
            self.spawn_timer();
        }
    }

    fn run_sampling_pass(&self) -> SamplingPass {
        self.state.run_pass()
    }
}

impl Drop for ProbabilisticMemorySaverSampler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

// =============================================================================
// Lifecycle observer handle
// =============================================================================

/// Delivers host tab events to a sampler after it has been handed to the
/// evaluator.
#[derive(Clone)]
pub struct SamplerTabObserver {
    state: Arc<SamplerState>,
}

impl std::fmt::Debug for SamplerTabObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerTabObserver")
            .field("tracked_tabs", &self.state.tracked_count())
            .finish()
    }
}

impl SamplerTabObserver {
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.state.tracked_count()
    }

    #[must_use]
    pub fn stats(&self) -> SamplerStats {
        SamplerStats {
            passes: self.state.passes.load(Ordering::Relaxed),
            tabs_sampled: self.state.tabs_sampled.load(Ordering::Relaxed),
            active_skipped: self.state.active_skipped.load(Ordering::Relaxed),
            tabs_discarded: self.state.tabs_discarded.load(Ordering::Relaxed),
            tracked_tabs: self.state.tracked_count() as u64,
        }
    }
}

impl TabLifecycleObserver for SamplerTabObserver {
    fn on_tab_added(&self, tab: TabHandle) {
        self.state.add(tab);
    }

    fn on_before_tab_removed(&self, tab: TabHandle) {
        self.state.remove(tab);
    }
}
