//! Builds the estimator's lookup tables from configuration.
//!
//! Config carries raw rows; [`RevisitTables::from_config`] validates them and
//! produces the two maps the estimator consumes:
//!
//! - `revisit_count -> ProbabilityDistribution` (time-to-revisit CDF)
//! - `revisit_count -> f32` (probability of any revisit)
//!
//! An optional `revisit_probability_curve` fills the buckets in
//! `0..MAX_NUM_REVISIT` at or past its first point that have no explicit
//! `revisit_probability` row.

use std::collections::HashMap;

use crate::config::TablesConfig;
use crate::error::ConfigError;
use crate::probability_distribution::ProbabilityDistribution;
use crate::revisit_estimator::MAX_NUM_REVISIT;

/// Validated probability tables keyed by revisit-count bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevisitTables {
    time_to_revisit: HashMap<i64, ProbabilityDistribution>,
    revisit_probabilities: HashMap<i64, f32>,
}

impl RevisitTables {
    /// Tables with no data. Every estimate built on them is `1.0`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_config(tables: &TablesConfig) -> Result<Self, ConfigError> {
        let mut time_to_revisit = HashMap::with_capacity(tables.time_to_revisit.len());
        for row in &tables.time_to_revisit {
            check_revisit_count(row.revisit_count)?;
            if time_to_revisit.contains_key(&row.revisit_count) {
                return Err(ConfigError::DuplicateRevisitCount(
                    row.revisit_count,
                    "time_to_revisit",
                ));
            }
            let cdf = ProbabilityDistribution::from_cdf_data(row.cdf.clone()).map_err(|source| {
                ConfigError::InvalidTimeToRevisit {
                    revisit_count: row.revisit_count,
                    source,
                }
            })?;
            time_to_revisit.insert(row.revisit_count, cdf);
        }

        let mut revisit_probabilities = HashMap::with_capacity(MAX_NUM_REVISIT as usize);
        for row in &tables.revisit_probability {
            check_revisit_count(row.revisit_count)?;
            if !(0.0..=1.0).contains(&row.probability) {
                return Err(ConfigError::InvalidRevisitProbability {
                    revisit_count: row.revisit_count,
                    probability: row.probability,
                });
            }
            if revisit_probabilities
                .insert(row.revisit_count, row.probability)
                .is_some()
            {
                return Err(ConfigError::DuplicateRevisitCount(
                    row.revisit_count,
                    "revisit_probability",
                ));
            }
        }

        if let Some(curve) = &tables.revisit_probability_curve {
            let curve = ProbabilityDistribution::from_ordered_data(curve.clone())
                .map_err(ConfigError::InvalidRevisitCurve)?;
            for bucket in 0..MAX_NUM_REVISIT {
                // Buckets below the first curve point have no estimate and stay absent.
                if (bucket as u64) < curve.first_bucket() {
                    continue;
                }
                revisit_probabilities
                    .entry(bucket)
                    .or_insert_with(|| curve.get_probability(bucket as u64));
            }
        }

        tracing::debug!(
            time_to_revisit_buckets = time_to_revisit.len(),
            revisit_buckets = revisit_probabilities.len(),
            "Built revisit tables"
        );

        Ok(Self {
            time_to_revisit,
            revisit_probabilities,
        })
    }

    #[must_use]
    pub fn time_to_revisit(&self) -> &HashMap<i64, ProbabilityDistribution> {
        &self.time_to_revisit
    }

    #[must_use]
    pub fn revisit_probabilities(&self) -> &HashMap<i64, f32> {
        &self.revisit_probabilities
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time_to_revisit.is_empty() && self.revisit_probabilities.is_empty()
    }

    /// Consume into the estimator's two maps.
    #[must_use]
    pub fn into_maps(
        self,
    ) -> (HashMap<i64, ProbabilityDistribution>, HashMap<i64, f32>) {
        (self.time_to_revisit, self.revisit_probabilities)
    }
}

fn check_revisit_count(revisit_count: i64) -> Result<(), ConfigError> {
    if (0..MAX_NUM_REVISIT).contains(&revisit_count) {
        Ok(())
    } else {
        Err(ConfigError::RevisitCountOutOfRange {
            revisit_count,
            max: MAX_NUM_REVISIT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RevisitProbabilityRow, TimeToRevisitTable};
    use crate::probability_distribution::{DistributionEntry, DistributionError};

    fn rows(data: &[(u64, f32)]) -> Vec<DistributionEntry> {
        data.iter().copied().map(DistributionEntry::from).collect()
    }

    fn ttr(revisit_count: i64, data: &[(u64, f32)]) -> TimeToRevisitTable {
        TimeToRevisitTable {
            revisit_count,
            cdf: rows(data),
        }
    }

    fn prob(revisit_count: i64, probability: f32) -> RevisitProbabilityRow {
        RevisitProbabilityRow {
            revisit_count,
            probability,
        }
    }

    #[test]
    fn empty_config_builds_empty_tables() {
        let tables = RevisitTables::from_config(&TablesConfig::default()).unwrap();
        assert!(tables.is_empty());
        assert_eq!(tables, RevisitTables::empty());
    }

    #[test]
    fn builds_both_maps() {
        let config = TablesConfig {
            time_to_revisit: vec![ttr(0, &[(1, 0.1), (86_400, 1.0)]), ttr(3, &[(5, 1.0)])],
            revisit_probability: vec![prob(0, 0.3), prob(3, 0.9)],
            revisit_probability_curve: None,
        };
        let tables = RevisitTables::from_config(&config).unwrap();
        assert_eq!(tables.time_to_revisit().len(), 2);
        assert_eq!(tables.time_to_revisit()[&0].get_probability(1), 0.1);
        assert_eq!(tables.revisit_probabilities()[&3], 0.9);

        let (ttr_map, revisit_map) = tables.into_maps();
        assert!(ttr_map.contains_key(&3));
        assert_eq!(revisit_map.len(), 2);
    }

    #[test]
    fn rejects_duplicate_time_to_revisit() {
        let config = TablesConfig {
            time_to_revisit: vec![ttr(1, &[(1, 1.0)]), ttr(1, &[(2, 1.0)])],
            ..TablesConfig::default()
        };
        let err = RevisitTables::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateRevisitCount(1, "time_to_revisit")
        ));
    }

    #[test]
    fn rejects_duplicate_revisit_probability() {
        let config = TablesConfig {
            revisit_probability: vec![prob(2, 0.1), prob(2, 0.2)],
            ..TablesConfig::default()
        };
        let err = RevisitTables::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateRevisitCount(2, "revisit_probability")
        ));
    }

    #[test]
    fn rejects_out_of_range_counts() {
        let config = TablesConfig {
            revisit_probability: vec![prob(-1, 0.5)],
            ..TablesConfig::default()
        };
        assert!(matches!(
            RevisitTables::from_config(&config).unwrap_err(),
            ConfigError::RevisitCountOutOfRange {
                revisit_count: -1,
                ..
            }
        ));

        let config = TablesConfig {
            time_to_revisit: vec![ttr(MAX_NUM_REVISIT, &[(1, 1.0)])],
            ..TablesConfig::default()
        };
        assert!(matches!(
            RevisitTables::from_config(&config).unwrap_err(),
            ConfigError::RevisitCountOutOfRange { .. }
        ));
    }

    #[test]
    fn rejects_invalid_probability() {
        let config = TablesConfig {
            revisit_probability: vec![prob(0, 1.2)],
            ..TablesConfig::default()
        };
        assert!(matches!(
            RevisitTables::from_config(&config).unwrap_err(),
            ConfigError::InvalidRevisitProbability { revisit_count: 0, .. }
        ));

        let config = TablesConfig {
            revisit_probability: vec![prob(0, f32::NAN)],
            ..TablesConfig::default()
        };
        assert!(RevisitTables::from_config(&config).is_err());
    }

    #[test]
    fn invalid_cdf_carries_revisit_count() {
        let config = TablesConfig {
            time_to_revisit: vec![ttr(4, &[(1, 0.1), (2, 0.5)])],
            ..TablesConfig::default()
        };
        let err = RevisitTables::from_config(&config).unwrap_err();
        match err {
            ConfigError::InvalidTimeToRevisit {
                revisit_count,
                source,
            } => {
                assert_eq!(revisit_count, 4);
                assert_eq!(source, DistributionError::NotTerminated { last: 0.5 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn curve_fills_unlisted_buckets() {
        let config = TablesConfig {
            revisit_probability: vec![prob(1, 0.05)],
            revisit_probability_curve: Some(rows(&[(0, 0.3), (2, 0.6), (10, 0.9)])),
            ..TablesConfig::default()
        };
        let tables = RevisitTables::from_config(&config).unwrap();
        let p = tables.revisit_probabilities();
        assert_eq!(p.len(), MAX_NUM_REVISIT as usize);
        assert_eq!(p[&0], 0.3);
        // Explicit row wins over the curve.
        assert_eq!(p[&1], 0.05);
        assert_eq!(p[&5], 0.6);
        assert_eq!(p[&(MAX_NUM_REVISIT - 1)], 0.9);
    }

    #[test]
    fn curve_starting_late_leaves_low_buckets_absent() {
        let config = TablesConfig {
            revisit_probability_curve: Some(rows(&[(3, 0.5)])),
            ..TablesConfig::default()
        };
        let tables = RevisitTables::from_config(&config).unwrap();
        let p = tables.revisit_probabilities();
        assert!(!p.contains_key(&2));
        assert_eq!(p[&3], 0.5);
    }

    #[test]
    fn rejects_unordered_curve() {
        let config = TablesConfig {
            revisit_probability_curve: Some(rows(&[(5, 0.5), (1, 0.2)])),
            ..TablesConfig::default()
        };
        assert!(matches!(
            RevisitTables::from_config(&config).unwrap_err(),
            ConfigError::InvalidRevisitCurve(DistributionError::BucketOutOfOrder { .. })
        ));
    }
}
