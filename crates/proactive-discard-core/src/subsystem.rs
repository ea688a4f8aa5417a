//! Context object owning one evaluator/sampler pair.
//!
//! [`ProactiveDiscarding::from_config`] builds the tables, estimator, sampler
//! and evaluator from a [`DiscardConfig`] and hands back the pieces the host
//! needs: a lifecycle observer to feed tab events into, and on-demand
//! `try_discard`. The evaluator itself stays private so every decision goes
//! through the `enabled` gate.

use std::sync::Arc;

use crate::config::DiscardConfig;
use crate::distribution_tables::RevisitTables;
use crate::error::Result;
use crate::evaluator::{DiscardFunction, DiscardStats, ProactiveDiscardEvaluator};
use crate::revisit_estimator::RevisitCountRevisitEstimator;
use crate::sampler::{ProbabilisticMemorySaverSampler, SamplerTabObserver, SamplingPass};
use crate::tab::TabHandle;
use crate::tab_revisit_tracker::TabRevisitTracker;

/// Proactive tab discarding, wired and ready to receive tab events.
#[derive(Debug)]
pub struct ProactiveDiscarding {
    enabled: bool,
    evaluator: ProactiveDiscardEvaluator,
    observer: SamplerTabObserver,
    tracker: Arc<TabRevisitTracker>,
}

impl ProactiveDiscarding {
    /// Validate `config` and build the subsystem.
    ///
    /// When the config is disabled everything is still built and validated,
    /// but the sampling timer never starts and `try_discard` always declines.
    pub fn from_config(
        config: &DiscardConfig,
        tracker: Arc<TabRevisitTracker>,
        discard: DiscardFunction,
    ) -> Result<Self> {
        config.validate()?;

        let tables = RevisitTables::from_config(&config.tables)?;
        if tables.is_empty() {
            tracing::warn!("No revisit tables configured; no tab will be discarded");
        }

        let estimator = RevisitCountRevisitEstimator::from_tables(tables, tracker.clone());
        let mut sampler = ProbabilisticMemorySaverSampler::new(
            config.sampling_interval(),
            tracker.clone(),
        )?;
        if !config.enabled {
            sampler = sampler.without_timer();
        }
        let observer = sampler.tab_observer();

        let evaluator = ProactiveDiscardEvaluator::from_percent(
            Box::new(estimator),
            Box::new(sampler),
            discard,
            config.false_positive_target_percent,
        )?;

        tracing::info!(
            enabled = config.enabled,
            false_positive_target_percent = config.false_positive_target_percent,
            sampling_interval_secs = config.sampling_interval_secs,
            "Proactive discarding configured"
        );

        Ok(Self {
            enabled: config.enabled,
            evaluator,
            observer,
            tracker,
        })
    }

    /// Evaluate a tab on demand. Always false when disabled.
    pub fn try_discard(&self, tab: TabHandle) -> bool {
        if !self.enabled {
            return false;
        }
        self.evaluator.try_discard(tab)
    }

    /// Run one sampling pass now. A no-op when disabled.
    pub fn run_sampling_pass(&self) -> SamplingPass {
        if !self.enabled {
            return SamplingPass::default();
        }
        self.evaluator.run_sampling_pass()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// False-positive target as a fraction.
    #[must_use]
    pub fn false_positive_target(&self) -> f32 {
        self.evaluator.false_positive_target()
    }

    /// Handle to register with the host's tab-lifecycle notifications.
    #[must_use]
    pub fn tab_observer(&self) -> SamplerTabObserver {
        self.observer.clone()
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<TabRevisitTracker> {
        &self.tracker
    }

    #[must_use]
    pub fn stats(&self) -> DiscardStats {
        self.evaluator.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RevisitProbabilityRow, TimeToRevisitTable};
    use crate::error::{ConfigError, Error};
    use crate::probability_distribution::DistributionEntry;
    use crate::sampler::TabLifecycleObserver;
    use std::sync::Mutex;

    fn populated_config() -> DiscardConfig {
        let mut config = DiscardConfig {
            false_positive_target_percent: 30,
            ..DiscardConfig::default()
        };
        config.tables.time_to_revisit.push(TimeToRevisitTable {
            revisit_count: 0,
            cdf: vec![
                DistributionEntry::new(1, 0.1),
                DistributionEntry::new(10, 0.3),
                DistributionEntry::new(86_400, 1.0),
            ],
        });
        config.tables.revisit_probability.push(RevisitProbabilityRow {
            revisit_count: 0,
            probability: 0.3,
        });
        config
    }

    fn recording_discard() -> (DiscardFunction, Arc<Mutex<Vec<TabHandle>>>) {
        let discarded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&discarded);
        let discard: DiscardFunction = Arc::new(move |tab: TabHandle| sink.lock().unwrap().push(tab));
        (discard, discarded)
    }

    #[test]
    fn background_tab_is_discarded_on_demand() {
        let tracker = Arc::new(TabRevisitTracker::new());
        let (discard, discarded) = recording_discard();
        let subsystem =
            ProactiveDiscarding::from_config(&populated_config(), tracker.clone(), discard)
                .unwrap();

        // 0.3 * (1.0 - p(elapsed)) is at most 0.3, within a 30% target.
        tracker.on_tab_added(TabHandle(1), false);
        assert!(subsystem.try_discard(TabHandle(1)));
        assert_eq!(*discarded.lock().unwrap(), vec![TabHandle(1)]);
        assert_eq!(subsystem.stats().discards, 1);
    }

    #[test]
    fn sampling_pass_skips_active_tabs() {
        let tracker = Arc::new(TabRevisitTracker::new());
        let (discard, discarded) = recording_discard();
        let subsystem =
            ProactiveDiscarding::from_config(&populated_config(), tracker.clone(), discard)
                .unwrap();
        let observer = subsystem.tab_observer();

        tracker.on_tab_added(TabHandle(1), true);
        observer.on_tab_added(TabHandle(1));
        tracker.on_tab_added(TabHandle(2), false);
        observer.on_tab_added(TabHandle(2));

        let pass = subsystem.run_sampling_pass();
        assert_eq!(pass.skipped_active, 1);
        assert_eq!(pass.discarded, 1);
        assert_eq!(*discarded.lock().unwrap(), vec![TabHandle(2)]);
    }

    #[test]
    fn empty_tables_never_discard() {
        let tracker = Arc::new(TabRevisitTracker::new());
        let (discard, discarded) = recording_discard();
        let subsystem =
            ProactiveDiscarding::from_config(&DiscardConfig::default(), tracker.clone(), discard)
                .unwrap();
        tracker.on_tab_added(TabHandle(1), false);
        assert!(!subsystem.try_discard(TabHandle(1)));
        assert!(discarded.lock().unwrap().is_empty());
    }

    #[test]
    fn disabled_subsystem_declines() {
        let tracker = Arc::new(TabRevisitTracker::new());
        let (discard, discarded) = recording_discard();
        let config = DiscardConfig {
            enabled: false,
            ..populated_config()
        };
        let subsystem = ProactiveDiscarding::from_config(&config, tracker.clone(), discard).unwrap();
        tracker.on_tab_added(TabHandle(1), false);
        subsystem.tab_observer().on_tab_added(TabHandle(1));

        assert!(!subsystem.is_enabled());
        assert!(!subsystem.try_discard(TabHandle(1)));
        assert_eq!(subsystem.run_sampling_pass(), SamplingPass::default());
        assert!(discarded.lock().unwrap().is_empty());
        assert_eq!(subsystem.stats().evaluations, 0);
        assert!((subsystem.false_positive_target() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn disabled_config_is_still_validated() {
        let config = DiscardConfig {
            enabled: false,
            false_positive_target_percent: 0,
            ..DiscardConfig::default()
        };
        let (discard, _) = recording_discard();
        let err = ProactiveDiscarding::from_config(&config, Arc::new(TabRevisitTracker::new()), discard)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidFalsePositivePercent(0))
        ));
    }

    #[test]
    fn malformed_table_refuses_to_start() {
        let mut config = populated_config();
        config.tables.time_to_revisit[0].cdf.pop();
        let (discard, _) = recording_discard();
        let err = ProactiveDiscarding::from_config(&config, Arc::new(TabRevisitTracker::new()), discard)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidTimeToRevisit { revisit_count: 0, .. })
        ));
        assert!(err.remediation().is_some());
    }
}
