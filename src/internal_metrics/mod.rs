//! # Internal Metrics Module
//!
//! Gauge readings can be mirrored into the `metrics` facade by the reporter
//! (see `Snapshot::publish`). Whatever recorder the embedding application
//! installs receives them. The binary ships one recorder of its own:
//!
//! - **`LoggingRecorder`**: keeps every counter and gauge in a
//!   `metrics_util` registry and logs them at a fixed interval.

pub mod logging_recorder;

pub use logging_recorder::LoggingRecorder;
