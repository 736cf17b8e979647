//! Time-windowed cached gauge.

use super::{value_source, Gauge, ValueSource};
use crate::clock::Clock;
use crate::coerce::Reading;
use std::fmt::{self, Display};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

struct CacheState {
    refreshed_at: Option<Duration>,
    value: String,
}

/// A gauge that re-reads its source at most once per cache window.
///
/// A read less than `window` after the last refresh returns the stored value.
/// Any later read, including one exactly `window` after the last refresh,
/// invokes the source again and replaces both the value and the refresh time.
/// This happens even when the read fails: the stored value becomes `""` and
/// the failing source is not retried until the window has elapsed again.
///
/// The refresh runs while the cell's lock is held, so concurrent callers never
/// trigger more than one read per window.
pub struct CachedGauge {
    clock: Arc<dyn Clock>,
    window: Duration,
    source: ValueSource,
    state: Mutex<CacheState>,
}

impl CachedGauge {
    pub fn new<V, F>(clock: Arc<dyn Clock>, window: Duration, read: F) -> Self
    where
        V: Display,
        F: Fn() -> Reading<V> + Send + Sync + 'static,
    {
        Self {
            clock,
            window,
            source: value_source(read),
            state: Mutex::new(CacheState {
                refreshed_at: None,
                value: String::new(),
            }),
        }
    }
}

impl Gauge for CachedGauge {
    fn value(&self) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.tick();

        if let Some(refreshed_at) = state.refreshed_at {
            // A clock that went backwards counts as no time elapsed.
            if now.saturating_sub(refreshed_at) < self.window {
                return state.value.clone();
            }
        }

        state.value = (self.source)();
        state.refreshed_at = Some(now);
        state.value.clone()
    }
}

impl fmt::Debug for CachedGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedGauge")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
