//! proactive-discard-core: probability-driven proactive tab discarding
//!
//! Decides which background tabs a host can unload to reclaim memory. A tab
//! is discarded when the estimated chance of the user coming back to it
//! within the next 24 hours is at or below a configured false-positive
//! target.
//!
//! # Architecture
//!
//! ```text
//! timer tick → Sampler → (skip active tabs) → Evaluator.try_discard(tab)
//!                                                   ↓
//!                          RevisitCountRevisitEstimator (revisit history + CDF tables)
//!                                                   ↓
//!                              probability <= target → DiscardFunction(tab)
//! ```
//!
//! # Modules
//!
//! - `tab`: Tab handles and revisit snapshots
//! - `probability_distribution`: Step-function CDF lookup
//! - `revisit_estimator`: Revisit probability estimation
//! - `tab_revisit_tracker`: In-memory revisit history
//! - `distribution_tables`: Config tables to estimator maps
//! - `evaluator`: Threshold decision and discard callback
//! - `sampler`: Tracked-tab set and periodic sampling timer
//! - `subsystem`: Config-driven wiring of the whole pipeline
//! - `config`: TOML configuration
//! - `error`: Error types with remediation hints
//! - `logging`: Optional tracing subscriber setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod distribution_tables;
pub mod error;
pub mod evaluator;
pub mod logging;
pub mod probability_distribution;
pub mod revisit_estimator;
pub mod sampler;
pub mod subsystem;
pub mod tab;
pub mod tab_revisit_tracker;

pub use config::DiscardConfig;
pub use error::{ConfigError, Error, Result};
pub use evaluator::{DiscardFunction, DiscardTarget, ProactiveDiscardEvaluator};
pub use probability_distribution::{DistributionEntry, ProbabilityDistribution};
pub use revisit_estimator::{
    MAX_NUM_REVISIT, REVISIT_HORIZON, RevisitCountRevisitEstimator, RevisitProbabilityEstimator,
    TabRevisitStateSource,
};
pub use sampler::{ActiveTabQuery, ProbabilisticMemorySaverSampler, Sampler, TabLifecycleObserver};
pub use subsystem::ProactiveDiscarding;
pub use tab::{StateBundle, TabHandle, TabState};
pub use tab_revisit_tracker::TabRevisitTracker;
