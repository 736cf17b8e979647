//! Assembly of gauges into flat, dot-namespaced maps.
//!
//! Groups of gauges are built with short keys (`bits`, `mem.total`) and merged
//! into their parent under a namespace prefix, so the final keys
//! (`os.bits`, `hw.mem.total`) are produced structurally rather than spelled
//! out by every entry. Building a map never reads from the provider.

use crate::clock::Clock;
use crate::coerce::Reading;
use crate::gauge::{CachedGauge, Gauge, GaugeMap, LazyGauge};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two entries were registered under the same key.
    #[error("duplicate gauge key '{0}'")]
    DuplicateKey(String),
}

/// Joins metric name parts with `.`, skipping empty parts.
///
/// ```
/// assert_eq!(osgauges::registry::name("os", "net.hostname"), "os.net.hostname");
/// assert_eq!(osgauges::registry::name("", "self.pid"), "self.pid");
/// ```
pub fn name(prefix: &str, suffix: &str) -> String {
    match (prefix.is_empty(), suffix.is_empty()) {
        (true, _) => suffix.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}.{}", prefix, suffix),
    }
}

/// Builds a `GaugeMap`, choosing the cell type per entry.
///
/// Keys must be unique: registering a key twice fails with
/// `RegistryError::DuplicateKey` instead of silently replacing the first entry.
pub struct GaugeMapBuilder {
    clock: Arc<dyn Clock>,
    window: Duration,
    gauges: GaugeMap,
}

impl GaugeMapBuilder {
    /// Creates an empty builder. Cached entries use `clock` and `window`.
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            clock,
            window,
            gauges: GaugeMap::new(),
        }
    }

    /// Registers a value that cannot change for the lifetime of the process.
    pub fn lazy<V, F>(&mut self, key: &str, read: F) -> Result<&mut Self, RegistryError>
    where
        V: Display,
        F: Fn() -> Reading<V> + Send + Sync + 'static,
    {
        self.insert(key.to_string(), Arc::new(LazyGauge::new(read)))
    }

    /// Registers a value that is re-read at most once per window.
    pub fn cached<V, F>(&mut self, key: &str, read: F) -> Result<&mut Self, RegistryError>
    where
        V: Display,
        F: Fn() -> Reading<V> + Send + Sync + 'static,
    {
        let gauge = CachedGauge::new(Arc::clone(&self.clock), self.window, read);
        self.insert(key.to_string(), Arc::new(gauge))
    }

    /// Adds every entry of `group` under `prefix`.
    pub fn merge(&mut self, prefix: &str, group: GaugeMap) -> Result<&mut Self, RegistryError> {
        for (key, gauge) in group {
            self.insert(name(prefix, &key), gauge)?;
        }
        Ok(self)
    }

    pub fn build(self) -> GaugeMap {
        self.gauges
    }

    fn insert(&mut self, key: String, gauge: Arc<dyn Gauge>) -> Result<&mut Self, RegistryError> {
        if self.gauges.contains_key(&key) {
            return Err(RegistryError::DuplicateKey(key));
        }
        self.gauges.insert(key, gauge);
        Ok(self)
    }
}
