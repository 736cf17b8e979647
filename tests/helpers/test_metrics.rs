//! A simple in-memory metrics recorder for testing.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    counters: Arc<Mutex<HashMap<String, u64>>>,
    gauges: Arc<Mutex<HashMap<String, f64>>>,
}

impl TestMetrics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get_counter(&self, name: &str) -> u64 {
        self.counters.lock().unwrap().get(name).cloned().unwrap_or(0)
    }

    pub fn get_gauge(&self, name: &str) -> Option<f64> {
        self.gauges.lock().unwrap().get(name).cloned()
    }

    pub fn gauge_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gauges.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Recorder for TestMetrics {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata) -> Counter {
        Counter::from_arc(Arc::new(MetricCounter {
            name: key.name().to_string(),
            counters: self.counters.clone(),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata) -> Gauge {
        Gauge::from_arc(Arc::new(MetricGauge {
            name: key.name().to_string(),
            gauges: self.gauges.clone(),
        }))
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata) -> Histogram {
        // Not implemented for this test helper
        Histogram::noop()
    }
}

#[derive(Debug)]
struct MetricCounter {
    name: String,
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl metrics::CounterFn for MetricCounter {
    fn increment(&self, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(self.name.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.counters.lock().unwrap().insert(self.name.clone(), value);
    }
}

#[derive(Debug)]
struct MetricGauge {
    name: String,
    gauges: Arc<Mutex<HashMap<String, f64>>>,
}

impl metrics::GaugeFn for MetricGauge {
    fn increment(&self, value: f64) {
        *self.gauges.lock().unwrap().entry(self.name.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        *self.gauges.lock().unwrap().entry(self.name.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        self.gauges.lock().unwrap().insert(self.name.clone(), value);
    }
}
