//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the reporter using the
//! `clap` crate. `Cli` doubles as a `figment` provider so that explicitly
//! passed arguments override the TOML file and the environment.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Periodically report operating system and hardware gauges.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache window for changing values, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub cache_window_ms: Option<u64>,

    /// Seconds between two snapshots.
    #[arg(short, long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Print snapshots as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print one snapshot and exit.
    #[arg(long)]
    pub once: bool,

    /// Periodically log every recorded metric.
    #[arg(long)]
    pub log_metrics: bool,

    /// Logging level (e.g. "debug", "info,osgauges=trace").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Inserts `value` at a dotted `path`, creating intermediate dictionaries.
fn insert_nested(dict: &mut Dict, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            dict.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = dict
                .entry(head.to_string())
                .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
            if let Value::Dict(_, inner) = entry {
                insert_nested(inner, rest, value);
            }
        }
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            insert_nested(&mut dict, "log_level", Value::from(level.clone()));
        }

        if let Some(window) = self.cache_window_ms {
            insert_nested(&mut dict, "cache.window_ms", Value::from(window));
        }

        if let Some(interval) = self.interval {
            insert_nested(&mut dict, "report.interval_seconds", Value::from(interval));
        }

        // Flags only override when present; an absent flag must not reset a
        // value set in the file or environment.
        if self.json {
            insert_nested(&mut dict, "report.format", Value::from("Json"));
        }

        if self.once {
            insert_nested(&mut dict, "report.once", Value::from(true));
        }

        if self.log_metrics {
            insert_nested(&mut dict, "metrics.log_metrics", Value::from(true));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
