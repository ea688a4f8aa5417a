//! Revisit probability estimation.
//!
//! [`RevisitCountRevisitEstimator`] answers "how likely is this background tab
//! to be brought back to the foreground within the next 24 hours?" from two
//! tables keyed by the tab's revisit-count bucket:
//!
//! - a time-to-revisit CDF, conditioned on the number of prior revisits
//! - the unconditional probability of ever being revisited
//!
//! ```text
//! P = (CDF(24h) - CDF(elapsed_in_background)) * P(revisit | bucket)
//! ```
//!
//! Missing data never lowers the estimate: an unknown tab, a bucket absent
//! from either table, or a tab that is not in the background all yield `1.0`,
//! which keeps the tab out of reach of the discard threshold.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::distribution_tables::RevisitTables;
use crate::probability_distribution::ProbabilityDistribution;
use crate::tab::{StateBundle, TabHandle};

/// Number of revisit-count buckets. Counts at or above the last bucket share it.
pub const MAX_NUM_REVISIT: i64 = 20;

/// Window over which a revisit is predicted.
pub const REVISIT_HORIZON: Duration = Duration::from_secs(24 * 60 * 60);

/// Estimate returned whenever the inputs are incomplete.
const FAIL_OPEN_PROBABILITY: f32 = 1.0;

// =============================================================================
// Collaborator traits
// =============================================================================

/// Computes the probability that a tab is revisited within [`REVISIT_HORIZON`].
///
/// Implementations are shared with the sampling timer, hence `Send + Sync`.
pub trait RevisitProbabilityEstimator: Send + Sync {
    fn compute_revisit_probability(&self, tab: TabHandle) -> f32;
}

/// Supplies the revisit history of a tab.
///
/// Provided by the host; [`TabRevisitTracker`](crate::tab_revisit_tracker::TabRevisitTracker)
/// is an in-memory implementation.
pub trait TabRevisitStateSource: Send + Sync {
    /// Snapshot for `tab`, or `None` if the tab is unknown.
    fn state_bundle(&self, tab: TabHandle) -> Option<StateBundle>;
}

// =============================================================================
// Revisit-count estimator
// =============================================================================

/// Estimator keyed on how many times a tab has been revisited before.
pub struct RevisitCountRevisitEstimator {
    time_to_revisit_probabilities: HashMap<i64, ProbabilityDistribution>,
    revisit_probabilities: HashMap<i64, f32>,
    source: Arc<dyn TabRevisitStateSource>,
}

impl std::fmt::Debug for RevisitCountRevisitEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisitCountRevisitEstimator")
            .field(
                "time_to_revisit_buckets",
                &self.time_to_revisit_probabilities.len(),
            )
            .field("revisit_buckets", &self.revisit_probabilities.len())
            .finish()
    }
}

impl RevisitCountRevisitEstimator {
    pub fn new(
        time_to_revisit_probabilities: HashMap<i64, ProbabilityDistribution>,
        revisit_probabilities: HashMap<i64, f32>,
        source: Arc<dyn TabRevisitStateSource>,
    ) -> Self {
        Self {
            time_to_revisit_probabilities,
            revisit_probabilities,
            source,
        }
    }

    /// Build from validated tables.
    pub fn from_tables(tables: RevisitTables, source: Arc<dyn TabRevisitStateSource>) -> Self {
        let (time_to_revisit, revisit) = tables.into_maps();
        Self::new(time_to_revisit, revisit, source)
    }

    /// Compute with an explicit timestamp (for testing).
    #[must_use]
    pub fn compute_revisit_probability_at(&self, tab: TabHandle, now: Instant) -> f32 {
        let Some(bundle) = self.source.state_bundle(tab) else {
            tracing::trace!(tab_id = tab.id(), "No revisit state for tab");
            return FAIL_OPEN_PROBABILITY;
        };

        let bucket = revisit_bucket(bundle.num_revisits);

        let Some(distribution) = self.time_to_revisit_probabilities.get(&bucket) else {
            return FAIL_OPEN_PROBABILITY;
        };
        let Some(&revisit_probability) = self.revisit_probabilities.get(&bucket) else {
            return FAIL_OPEN_PROBABILITY;
        };
        let Some(background_since) = bundle.background_since() else {
            return FAIL_OPEN_PROBABILITY;
        };

        let elapsed_secs = now.saturating_duration_since(background_since).as_secs();

        let within_horizon = distribution.get_probability(REVISIT_HORIZON.as_secs());
        let before_now = distribution.get_probability(elapsed_secs);
        // Left unclamped: past the horizon a CDF that keeps rising goes negative.
        let in_remaining_window = within_horizon - before_now;

        if in_remaining_window < 0.0 {
            tracing::debug!(
                tab_id = tab.id(),
                revisit_bucket = bucket,
                elapsed_secs,
                "Remaining-window revisit probability is negative"
            );
        }

        in_remaining_window * revisit_probability
    }

    #[must_use]
    pub fn time_to_revisit_probabilities(&self) -> &HashMap<i64, ProbabilityDistribution> {
        &self.time_to_revisit_probabilities
    }

    #[must_use]
    pub fn revisit_probabilities(&self) -> &HashMap<i64, f32> {
        &self.revisit_probabilities
    }
}

impl RevisitProbabilityEstimator for RevisitCountRevisitEstimator {
    fn compute_revisit_probability(&self, tab: TabHandle) -> f32 {
        self.compute_revisit_probability_at(tab, Instant::now())
    }
}

/// Bucket for a revisit count, capped at `MAX_NUM_REVISIT - 1`.
#[must_use]
pub fn revisit_bucket(num_revisits: i64) -> i64 {
    num_revisits.min(MAX_NUM_REVISIT - 1)
}

// =============================================================================
// Tests
// =============================================================================
