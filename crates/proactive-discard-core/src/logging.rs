//! Optional subscriber setup for hosts without their own.
//!
//! Library code only emits `tracing` events. [`init_logging`] installs a
//! global subscriber writing to stderr (and optionally a file) in the
//! configured [`LogFormat`]. `RUST_LOG` takes precedence over the configured
//! level.
//!
//! Event fields used across the crate:
//! - `tab_id`: host tab identifier
//! - `probability`: estimated revisit probability
//! - `threshold`: false-positive target the probability is compared against
//! - `revisit_bucket`: clamped revisit-count bucket
//! - `elapsed_secs`: whole seconds the tab has spent in the background

pub use crate::config::LogFormat;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `[logging]` section of the discard config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level (`trace`, `debug`, `info`, `warn`, `error`, `off`).
    pub level: String,
    pub format: LogFormat,
    /// Also append events to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to open log file: {0}")]
    FileCreate(#[from] io::Error),
}

/// Parse a configured level name.
pub fn parse_level(level: &str) -> Result<LevelFilter, LogError> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| LogError::InvalidLevel(level.to_string()))
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_writer(io::stderr)
            .with_current_span(true)
            .flatten_event(true)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, file: std::fs::File) -> BoxedLayer {
    let writer = Arc::new(file);
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_writer(writer)
            .flatten_event(true)
            .boxed(),
    }
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

fn layers(config: &LogConfig) -> Result<Vec<BoxedLayer>, LogError> {
    let mut layers = vec![stderr_layer(config.format)];
    if let Some(path) = &config.file {
        layers.push(file_layer(config.format, open_log_file(path)?));
    }
    Ok(layers)
}

/// Install the global subscriber described by `config`.
///
/// Fails with [`LogError::AlreadyInitialized`] if any global subscriber is
/// already set, including one installed by the host.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let level = parse_level(&config.level)?;
    tracing_subscriber::registry()
        .with(layers(config)?)
        .with(env_filter(level))
        .try_init()
        .map_err(|_| LogError::AlreadyInitialized)?;

    tracing::info!(
        log_level = %level,
        log_format = %config.format,
        log_file = ?config.file,
        "Logging initialized"
    );
    Ok(())
}
