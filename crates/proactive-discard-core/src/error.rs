//! Error types for proactive-discard-core

use std::fmt::Write;
use std::path::PathBuf;

use thiserror::Error;

use crate::probability_distribution::DistributionError;

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            alternatives: Vec::new(),
        }
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for proactive-discard-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Logging setup errors
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LogError),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Config(err) => Some(err.remediation()),
            Self::Logging(_) => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("false positive target {0} is outside (0, 1]")]
    InvalidFalsePositiveTarget(f32),

    #[error("false positive target percent {0} is outside (0, 100]")]
    InvalidFalsePositivePercent(i32),

    #[error("sampling interval must be greater than zero")]
    ZeroSamplingInterval,

    #[error("revisit count {revisit_count} is outside [0, {max})")]
    RevisitCountOutOfRange { revisit_count: i64, max: i64 },

    #[error("revisit count {0} appears more than once in the {1} table")]
    DuplicateRevisitCount(i64, &'static str),

    #[error("revisit probability {probability} for revisit count {revisit_count} is outside [0, 1]")]
    InvalidRevisitProbability { revisit_count: i64, probability: f32 },

    #[error("invalid time-to-revisit CDF for revisit count {revisit_count}: {source}")]
    InvalidTimeToRevisit {
        revisit_count: i64,
        #[source]
        source: DistributionError,
    },

    #[error("invalid revisit probability curve: {0}")]
    InvalidRevisitCurve(#[source] DistributionError),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => Remediation::new(format!(
                "Create the discard config at {} or point the host at an existing file.",
                path.display()
            ))
            .alternative("Run with the built-in defaults; the feature stays inert without tables."),
            Self::ReadFailed { .. } => {
                Remediation::new("Check file permissions on the discard config and retry.")
            }
            Self::ParseError(_) => Remediation::new("Fix the TOML syntax in the discard config.")
                .alternative("CDF rows are written as [bucket_seconds, probability] pairs."),
            Self::SerializeFailed(_) => {
                Remediation::new("Report this as a bug; a valid config should always serialize.")
            }
            Self::InvalidFalsePositiveTarget(_) | Self::InvalidFalsePositivePercent(_) => {
                Remediation::new("Set false_positive_target_percent to a value in (0, 100].")
                    .alternative("A zero target would never discard; disable the feature instead.")
            }
            Self::ZeroSamplingInterval => {
                Remediation::new("Set sampling_interval_secs to a positive number of seconds.")
            }
            Self::RevisitCountOutOfRange { max, .. } => Remediation::new(format!(
                "Use revisit_count values in 0..{max}; larger counts share the last bucket."
            )),
            Self::DuplicateRevisitCount(count, table) => Remediation::new(format!(
                "Keep a single {table} row for revisit_count = {count}."
            )),
            Self::InvalidRevisitProbability { .. } => {
                Remediation::new("Revisit probabilities must lie in [0, 1].")
            }
            Self::InvalidTimeToRevisit { .. } => Remediation::new(
                "Each time_to_revisit cdf must be sorted by bucket, non-decreasing, and end at 1.0.",
            ),
            Self::InvalidRevisitCurve(_) => Remediation::new(
                "revisit_probability_curve rows must be sorted by revisit count with probabilities in [0, 1].",
            ),
        }
    }
}
