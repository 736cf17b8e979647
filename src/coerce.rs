//! Conversion of raw provider reads into gauge values.
//!
//! A read either fails, comes back empty, or yields a value. All three outcomes
//! collapse into a `String`: failures and absent values become `""`, everything
//! else is rendered with `Display`. Callers must treat an empty reading as
//! "unavailable", never as an error to escalate.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// The outcome of a single read from the system-information provider.
///
/// `Ok(None)` means the provider answered but has no value for this host.
pub type Reading<T> = Result<Option<T>, ReadFailure>;

/// Why a provider read produced no value.
#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ReadFailure {
    pub fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            what,
            detail: detail.into(),
        }
    }
}

/// Renders a reading as a gauge value. Never fails.
pub fn coerce<V: Display>(raw: Reading<V>) -> String {
    match raw {
        Ok(Some(value)) => value.to_string(),
        Ok(None) | Err(_) => String::new(),
    }
}

/// Invokes `source` and coerces its outcome.
///
/// A panic inside the source is caught and handled like a failed read, so one
/// misbehaving accessor cannot take down the caller. The process-wide panic
/// hook still runs first and, by default, prints the panic message to stderr;
/// silencing it with `std::panic::set_hook` is left to the binary.
pub fn read_guarded<V, F>(source: &F) -> String
where
    V: Display,
    F: Fn() -> Reading<V> + ?Sized,
{
    panic::catch_unwind(AssertUnwindSafe(source))
        .map(coerce)
        .unwrap_or_default()
}
