//! Empirical step-function distributions over an unsigned integer domain.
//!
//! A [`ProbabilityDistribution`] maps a bucket boundary (typically seconds
//! elapsed) to a probability. Lookups use floor semantics: a value between
//! two boundaries takes the probability of the highest boundary at or below
//! it, and a value below the first boundary has probability `0.0`.
//!
//! ```text
//! bucket:       1     2          5                    10
//! probability: 0.1   0.2        0.3                  1.0
//!
//! get_probability(0)  = 0.0   (below first bucket)
//! get_probability(3)  = 0.2   (floor to bucket 2)
//! get_probability(11) = 1.0   (past last bucket)
//! ```
//!
//! There is no interpolation between buckets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Entries
// =============================================================================

/// One `(bucket, probability)` step of a distribution.
///
/// Serialized as a two-element array so tables read naturally in config:
/// `cdf = [[1, 0.1], [10, 0.3], [86400, 1.0]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u64, f32)", into = "(u64, f32)")]
pub struct DistributionEntry {
    pub bucket: u64,
    pub probability: f32,
}

impl DistributionEntry {
    #[must_use]
    pub const fn new(bucket: u64, probability: f32) -> Self {
        Self {
            bucket,
            probability,
        }
    }
}

impl From<(u64, f32)> for DistributionEntry {
    fn from((bucket, probability): (u64, f32)) -> Self {
        Self::new(bucket, probability)
    }
}

impl From<DistributionEntry> for (u64, f32) {
    fn from(entry: DistributionEntry) -> Self {
        (entry.bucket, entry.probability)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Malformed distribution data, rejected at construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("distribution has no entries")]
    Empty,

    #[error("bucket {bucket} at index {index} is below preceding bucket {previous}")]
    BucketOutOfOrder {
        index: usize,
        previous: u64,
        bucket: u64,
    },

    #[error("probability {probability} at index {index} is outside [0, 1]")]
    ProbabilityOutOfRange { index: usize, probability: f32 },

    #[error("CDF probability {probability} at index {index} is below preceding {previous}")]
    ProbabilityDecreasing {
        index: usize,
        previous: f32,
        probability: f32,
    },

    #[error("CDF must end at probability 1.0, last entry is {last}")]
    NotTerminated { last: f32 },
}

// =============================================================================
// Distribution
// =============================================================================

/// Immutable step function from bucket boundary to probability.
///
/// Entries are non-empty and sorted ascending by bucket; every probability
/// lies in `[0, 1]`. Distributions built with
/// [`from_cdf_data`](Self::from_cdf_data) are additionally monotone in
/// probability and end at exactly `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution {
    entries: Vec<DistributionEntry>,
}

impl ProbabilityDistribution {
    /// Build from cumulative distribution data.
    ///
    /// The caller supplies entries already sorted by bucket; they are
    /// validated, never reordered.
    #[allow(clippy::float_cmp)]
    pub fn from_cdf_data(
        entries: impl Into<Vec<DistributionEntry>>,
    ) -> Result<Self, DistributionError> {
        let entries = entries.into();
        validate_ordered(&entries)?;

        for (index, pair) in entries.windows(2).enumerate() {
            if pair[1].probability < pair[0].probability {
                return Err(DistributionError::ProbabilityDecreasing {
                    index: index + 1,
                    previous: pair[0].probability,
                    probability: pair[1].probability,
                });
            }
        }

        // validate_ordered guarantees non-empty.
        let last = entries[entries.len() - 1].probability;
        if last != 1.0 {
            return Err(DistributionError::NotTerminated { last });
        }

        Ok(Self { entries })
    }

    /// Build from ordered bucket values that are not a CDF.
    ///
    /// Only bucket ordering and the probability range are checked.
    pub fn from_ordered_data(
        entries: impl Into<Vec<DistributionEntry>>,
    ) -> Result<Self, DistributionError> {
        let entries = entries.into();
        validate_ordered(&entries)?;
        Ok(Self { entries })
    }

    /// Probability at `value`, using floor semantics over the buckets.
    #[must_use]
    pub fn get_probability(&self, value: u64) -> f32 {
        let idx = self.entries.partition_point(|e| e.bucket < value);

        if let Some(entry) = self.entries.get(idx) {
            if entry.bucket == value {
                return entry.probability;
            }
        }

        if idx == 0 {
            return 0.0;
        }

        self.entries[idx - 1].probability
    }

    /// All entries in bucket order.
    #[must_use]
    pub fn entries(&self) -> &[DistributionEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest bucket boundary.
    #[must_use]
    pub fn first_bucket(&self) -> u64 {
        self.entries[0].bucket
    }

    /// Probability of the last entry (`1.0` for a CDF).
    #[must_use]
    pub fn last_probability(&self) -> f32 {
        self.entries[self.entries.len() - 1].probability
    }
}

fn validate_ordered(entries: &[DistributionEntry]) -> Result<(), DistributionError> {
    if entries.is_empty() {
        return Err(DistributionError::Empty);
    }

    for (index, entry) in entries.iter().enumerate() {
        // NaN fails the range check too.
        if !(0.0..=1.0).contains(&entry.probability) {
            return Err(DistributionError::ProbabilityOutOfRange {
                index,
                probability: entry.probability,
            });
        }
    }

    for (index, pair) in entries.windows(2).enumerate() {
        if pair[1].bucket < pair[0].bucket {
            return Err(DistributionError::BucketOutOfOrder {
                index: index + 1,
                previous: pair[0].bucket,
                bucket: pair[1].bucket,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
