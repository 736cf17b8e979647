//! A metrics recorder that periodically logs all captured metrics.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

type Units = Arc<Mutex<HashMap<String, Unit>>>;

/// A metrics recorder that periodically logs every counter and gauge with
/// `tracing::info!`. Histograms are accepted but never logged.
pub struct LoggingRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
    units: Units,
}

impl LoggingRecorder {
    /// Creates a new `LoggingRecorder` and starts a background task that logs
    /// the recorded metrics every `aggregation_interval` until shutdown.
    pub fn new(
        aggregation_interval: Duration,
        mut shutdown_rx: watch::Receiver<()>,
    ) -> (Self, JoinHandle<()>) {
        let registry = Arc::new(Registry::new(AtomicStorage));
        let units: Units = Arc::default();
        let recorder = Self {
            registry: registry.clone(),
            units: units.clone(),
        };

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(aggregation_interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Metrics logging task received shutdown signal.");
                        break;
                    }
                    _ = ticker.tick() => {
                        tracing::debug!("--- Metrics Snapshot ---");
                        for line in metric_lines(&registry, &units) {
                            tracing::info!("{}", line);
                        }
                    }
                }
            }
        });

        (recorder, handle)
    }

    fn remember_unit(&self, key: KeyName, unit: Option<Unit>) {
        if let Some(unit) = unit {
            let mut units = self.units.lock().unwrap_or_else(PoisonError::into_inner);
            units.insert(key.as_str().to_string(), unit);
        }
    }
}

/// One line per counter and gauge, sorted by metric name.
fn metric_lines(registry: &Registry<Key, AtomicStorage>, units: &Units) -> Vec<String> {
    let units = units.lock().unwrap_or_else(PoisonError::into_inner);
    let suffix = |key: &Key| match units.get(key.name()) {
        Some(unit) => format!(" {}", unit.as_str()),
        None => String::new(),
    };

    let mut lines = Vec::new();
    for (key, counter) in registry.get_counter_handles() {
        let value = counter.load(Ordering::Relaxed);
        let line = format!("[Counter] {}: {}{}", key.name(), value, suffix(&key));
        lines.push((key.name().to_string(), line));
    }
    for (key, gauge) in registry.get_gauge_handles() {
        let value = f64::from_bits(gauge.load(Ordering::Relaxed));
        let line = format!("[Gauge] {}: {}{}", key.name(), value, suffix(&key));
        lines.push((key.name().to_string(), line));
    }
    lines.sort();
    lines.into_iter().map(|(_, line)| line).collect()
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, _description: SharedString) {
        self.remember_unit(key, unit);
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, _description: SharedString) {
        self.remember_unit(key, unit);
    }

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| c.clone()).into()
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| g.clone()).into()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| h.clone()).into()
    }
}
