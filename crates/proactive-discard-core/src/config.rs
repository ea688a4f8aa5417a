//! Configuration for proactive tab discarding.
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! (inert) configuration: without probability tables every tab looks likely
//! to be revisited and nothing is ever discarded.
//!
//! ```toml
//! enabled = true
//! false_positive_target_percent = 5
//! sampling_interval_secs = 600
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [[tables.time_to_revisit]]
//! revisit_count = 0
//! cdf = [[1, 0.1], [10, 0.3], [86400, 1.0]]
//!
//! [[tables.revisit_probability]]
//! revisit_count = 0
//! probability = 0.3
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LogConfig;
use crate::probability_distribution::DistributionEntry;

// =============================================================================
// Log format
// =============================================================================

/// Output format for the optional log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output for interactive use
    #[default]
    Pretty,
    /// JSON lines for machine parsing
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected pretty or json")),
        }
    }
}

// =============================================================================
// Probability tables
// =============================================================================

/// Time-to-revisit CDF for tabs with a given number of prior revisits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeToRevisitTable {
    pub revisit_count: i64,
    /// `[seconds_in_background, cumulative_probability]` rows.
    pub cdf: Vec<DistributionEntry>,
}

/// Probability that a tab with a given number of prior revisits is ever
/// revisited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisitProbabilityRow {
    pub revisit_count: i64,
    pub probability: f32,
}

/// Raw probability tables as they appear in config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    pub time_to_revisit: Vec<TimeToRevisitTable>,
    pub revisit_probability: Vec<RevisitProbabilityRow>,
    /// Ordered `[revisit_count, probability]` rows, used for every bucket
    /// not listed in `revisit_probability`.
    pub revisit_probability_curve: Option<Vec<DistributionEntry>>,
}

impl TablesConfig {
    /// True when no table data is present at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time_to_revisit.is_empty()
            && self.revisit_probability.is_empty()
            && self.revisit_probability_curve.is_none()
    }
}

// =============================================================================
// Discard config
// =============================================================================

/// Top-level discard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscardConfig {
    /// Master switch. When false the sampler never starts and nothing is
    /// discarded, but the config is still validated.
    pub enabled: bool,
    /// Accepted chance, in percent, of discarding a tab that would have been
    /// revisited within the horizon.
    pub false_positive_target_percent: i32,
    /// Seconds between sampling passes.
    pub sampling_interval_secs: u64,
    pub logging: LogConfig,
    pub tables: TablesConfig,
}

impl Default for DiscardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            false_positive_target_percent: 5,
            sampling_interval_secs: 600,
            logging: LogConfig::default(),
            tables: TablesConfig::default(),
        }
    }
}

impl DiscardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            enabled = config.enabled,
            false_positive_target_percent = config.false_positive_target_percent,
            sampling_interval_secs = config.sampling_interval_secs,
            "Loaded discard config"
        );
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Range-check scalar settings. Table contents are checked when the
    /// tables are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        false_positive_fraction(self.false_positive_target_percent)?;
        if self.sampling_interval_secs == 0 {
            return Err(ConfigError::ZeroSamplingInterval);
        }
        Ok(())
    }

    /// The false-positive target as a fraction in (0, 1].
    pub fn false_positive_target(&self) -> Result<f32, ConfigError> {
        false_positive_fraction(self.false_positive_target_percent)
    }

    #[must_use]
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval_secs)
    }
}

/// Convert a percent in (0, 100] to a fraction.
pub fn false_positive_fraction(percent: i32) -> Result<f32, ConfigError> {
    if !(1..=100).contains(&percent) {
        return Err(ConfigError::InvalidFalsePositivePercent(percent));
    }
    Ok(percent as f32 / 100.0)
}
