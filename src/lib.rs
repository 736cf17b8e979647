//! osgauges - operating system and hardware gauges
//!
//! This library exposes a flat, named set of gauges describing the host the
//! process runs on (`self.pid`, `os.*`, `os.net.ipv4.*`, `os.net.ipv6.*`,
//! `hw.*`). Every gauge answers with a string, never fails, and reads the
//! underlying source at most once (for immutable values) or at most once per
//! cache window (for everything else).
//!
//! ```no_run
//! use osgauges::EnvironmentGaugeSet;
//!
//! let gauges = EnvironmentGaugeSet::new().metrics()?;
//! println!("{}", gauges["hw.cpu.logical.count"].value());
//! # Ok::<(), osgauges::registry::RegistryError>(())
//! ```

pub mod cli;
pub mod clock;
pub mod coerce;
pub mod config;
pub mod gauge;
pub mod gauge_set;
pub mod internal_metrics;
pub mod provider;
pub mod registry;
pub mod reporter;

// Re-export the types most callers need
pub use clock::{Clock, ManualClock, SystemClock};
pub use coerce::{ReadFailure, Reading};
pub use gauge::{Gauge, GaugeMap};
pub use gauge_set::EnvironmentGaugeSet;
pub use provider::SystemInfoProvider;
