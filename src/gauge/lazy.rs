//! One-shot memoized gauge.

use super::{value_source, Gauge, ValueSource};
use crate::coerce::Reading;
use std::fmt::{self, Display};
use std::sync::OnceLock;

/// A gauge that invokes its source at most once.
///
/// The first call to `value` performs the read and stores the coerced result
/// permanently; a failed or empty read is stored as `""` and never retried.
/// Concurrent first callers block until that single read finishes and then
/// all observe the same value.
pub struct LazyGauge {
    source: ValueSource,
    resolved: OnceLock<String>,
}

impl LazyGauge {
    pub fn new<V, F>(read: F) -> Self
    where
        V: Display,
        F: Fn() -> Reading<V> + Send + Sync + 'static,
    {
        Self {
            source: value_source(read),
            resolved: OnceLock::new(),
        }
    }

    /// Returns `true` once the source has been read.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

impl Gauge for LazyGauge {
    fn value(&self) -> String {
        self.resolved.get_or_init(|| (self.source)()).clone()
    }
}

impl fmt::Debug for LazyGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyGauge")
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}
