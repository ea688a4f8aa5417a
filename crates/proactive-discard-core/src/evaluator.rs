//! Threshold decision: discard a tab when its revisit probability is within
//! the false-positive budget.
//!
//! The evaluator owns its sampler. During construction the sampler receives a
//! weak back-reference ([`DiscardTarget`]) through which its timer asks for
//! decisions; once the evaluator is dropped that reference no longer
//! upgrades and sampling stops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::config::false_positive_fraction;
use crate::error::ConfigError;
use crate::revisit_estimator::RevisitProbabilityEstimator;
use crate::sampler::{Sampler, SamplingPass};
use crate::tab::TabHandle;

/// Host callback that unloads a tab. Fire-and-forget.
pub type DiscardFunction = Arc<dyn Fn(TabHandle) + Send + Sync>;

/// Anything that can be asked to consider a tab for discarding.
pub trait DiscardTarget: Send + Sync {
    /// Returns true if the tab was discarded.
    fn try_discard(&self, tab: TabHandle) -> bool;
}

/// Decision counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardStats {
    /// Total `try_discard` calls.
    pub evaluations: u64,
    /// Calls that invoked the discard callback.
    pub discards: u64,
    /// Calls that left the tab alone.
    pub kept: u64,
}

// =============================================================================
// Decision core
// =============================================================================

struct DecisionCore {
    estimator: Box<dyn RevisitProbabilityEstimator>,
    discard: DiscardFunction,
    false_positive_target: f32,
    evaluations: AtomicU64,
    discards: AtomicU64,
}

impl DiscardTarget for DecisionCore {
    fn try_discard(&self, tab: TabHandle) -> bool {
        let probability = self.estimator.compute_revisit_probability(tab);
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let discard = probability <= self.false_positive_target;
        tracing::debug!(
            tab_id = tab.id(),
            probability,
            threshold = self.false_positive_target,
            discard,
            "Evaluated tab for proactive discard"
        );

        if discard {
            self.discards.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                tab_id = tab.id(),
                probability,
                threshold = self.false_positive_target,
                "Proactively discarding tab"
            );
            (self.discard)(tab);
        }
        discard
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Compares revisit estimates against a false-positive target and invokes
/// the discard callback for tabs at or below it.
pub struct ProactiveDiscardEvaluator {
    // Declared first so the sampler's timer is torn down before the core.
    sampler: Box<dyn Sampler>,
    core: Arc<DecisionCore>,
}

impl std::fmt::Debug for ProactiveDiscardEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProactiveDiscardEvaluator")
            .field("false_positive_target", &self.core.false_positive_target)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ProactiveDiscardEvaluator {
    /// Build an evaluator and attach `sampler` to it.
    ///
    /// `false_positive_target` is a fraction and must lie in `(0, 1]`.
    pub fn new(
        estimator: Box<dyn RevisitProbabilityEstimator>,
        mut sampler: Box<dyn Sampler>,
        discard: DiscardFunction,
        false_positive_target: f32,
    ) -> Result<Self, ConfigError> {
        let in_range = false_positive_target > 0.0 && false_positive_target <= 1.0;
        if !in_range {
            return Err(ConfigError::InvalidFalsePositiveTarget(false_positive_target));
        }

        let core = Arc::new(DecisionCore {
            estimator,
            discard,
            false_positive_target,
            evaluations: AtomicU64::new(0),
            discards: AtomicU64::new(0),
        });
        let weak = Arc::downgrade(&core);
        let target: Weak<dyn DiscardTarget> = weak;
        sampler.attach(target);

        Ok(Self { sampler, core })
    }

    /// Build from a percent in `(0, 100]`.
    pub fn from_percent(
        estimator: Box<dyn RevisitProbabilityEstimator>,
        sampler: Box<dyn Sampler>,
        discard: DiscardFunction,
        false_positive_target_percent: i32,
    ) -> Result<Self, ConfigError> {
        let target = false_positive_fraction(false_positive_target_percent)?;
        Self::new(estimator, sampler, discard, target)
    }

    /// Estimate `tab` and discard it if the estimate is within the target.
    pub fn try_discard(&self, tab: TabHandle) -> bool {
        self.core.try_discard(tab)
    }

    /// Run one sampling pass now instead of waiting for the timer.
    pub fn run_sampling_pass(&self) -> SamplingPass {
        self.sampler.run_sampling_pass()
    }

    #[must_use]
    pub fn false_positive_target(&self) -> f32 {
        self.core.false_positive_target
    }

    #[must_use]
    pub fn stats(&self) -> DiscardStats {
        let evaluations = self.core.evaluations.load(Ordering::Relaxed);
        let discards = self.core.discards.load(Ordering::Relaxed);
        DiscardStats {
            evaluations,
            discards,
            kept: evaluations.saturating_sub(discards),
        }
    }
}

impl DiscardTarget for ProactiveDiscardEvaluator {
    fn try_discard(&self, tab: TabHandle) -> bool {
        self.core.try_discard(tab)
    }
}
