//! # Gauges
//!
//! A gauge is a named value that can be read on demand. This crate has two
//! kinds, both of which wrap a single provider read and always answer with a
//! `String`:
//!
//! - **`LazyGauge`**: reads once and remembers the answer for the rest of the
//!   process lifetime. Used for values that cannot change while the process
//!   runs (OS bitness, CPU identity, core counts).
//! - **`CachedGauge`**: re-reads at most once per cache window, serving the
//!   stored answer in between. Used for everything else.
//!
//! Neither kind spawns work or owns a thread; a value is only computed when
//! somebody asks for it.

use crate::coerce::{read_guarded, Reading};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

pub mod cached;
pub mod lazy;

pub use cached::CachedGauge;
pub use lazy::LazyGauge;

/// A value that can be observed on demand.
pub trait Gauge: Send + Sync {
    /// Returns the current value. Empty when the value is unavailable.
    fn value(&self) -> String;
}

/// Flat mapping from dotted metric name to gauge.
pub type GaugeMap = BTreeMap<String, Arc<dyn Gauge>>;

/// A provider read that has already been bound to its coercion.
pub(crate) type ValueSource = Box<dyn Fn() -> String + Send + Sync>;

pub(crate) fn value_source<V, F>(read: F) -> ValueSource
where
    V: Display,
    F: Fn() -> Reading<V> + Send + Sync + 'static,
{
    Box::new(move || read_guarded(&read))
}

/// Reads every gauge in `gauges` once, in key order.
pub fn read_all(gauges: &GaugeMap) -> BTreeMap<String, String> {
    gauges
        .iter()
        .map(|(key, gauge)| (key.clone(), gauge.value()))
        .collect()
}
