//! Configuration management for the osgauges reporter
//!
//! This module defines the main `Config` struct and its sub-structs. Settings
//! are layered with `figment`: built-in defaults, then an optional TOML file,
//! then `OSGAUGES_*` environment variables, then command-line arguments.

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Gauge caching.
    pub cache: CacheConfig,
    /// Periodic snapshot output.
    pub report: ReportConfig,
    /// Bridging readings into the `metrics` facade.
    pub metrics: MetricsConfig,
}

/// Configuration for cached gauges.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Minimum time between two live reads of a changing value, in milliseconds.
    pub window_ms: u64,
}

/// The format for stdout output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    PlainText,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::PlainText => write!(f, "Plain Text"),
        }
    }
}

/// Configuration for the snapshot reporter.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReportConfig {
    /// Seconds between two snapshots.
    pub interval_seconds: u64,
    /// The format to use for stdout output.
    pub format: OutputFormat,
    /// Print a single snapshot and exit.
    pub once: bool,
}

/// Configuration for the `metrics` bridge.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Mirror numeric readings into `metrics` gauges on every snapshot.
    pub publish: bool,
    /// Install a recorder that periodically logs all recorded metrics.
    pub log_metrics: bool,
    /// The interval in seconds for logging recorded metrics.
    pub log_aggregation_seconds: u64,
}

impl Config {
    /// Loads the configuration, layering defaults, the TOML file named by
    /// `cli.config`, the environment and finally `cli` itself.
    ///
    /// Nested keys are addressed in the environment with `__`, e.g.
    /// `OSGAUGES_CACHE__WINDOW_MS=500`.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("configuration file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed("OSGAUGES_").split("__"))
            .merge(cli)
            .extract()?;
        Ok(config)
    }

    pub fn cache_window(&self) -> Duration {
        Duration::from_millis(self.cache.window_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report.interval_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cache: CacheConfig { window_ms: 1000 },
            report: ReportConfig {
                interval_seconds: 10,
                format: OutputFormat::PlainText,
                once: false,
            },
            metrics: MetricsConfig {
                publish: true,
                log_metrics: false,
                log_aggregation_seconds: 60,
            },
        }
    }
}
