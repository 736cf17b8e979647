//! # System Information Provider
//!
//! The `SystemInfoProvider` trait is the seam between the gauge set and the
//! operating system. Each method is one zero-argument read of a live counter
//! and reports its outcome as a `Reading`: a failed read is an `Err`, a value
//! the host simply does not have is `Ok(None)`.
//!
//! - **`HostProvider`**: (Defined in `host.rs`) reads the local machine via
//!   `sysinfo` and Linux procfs.
//! - **`procfs`**: parsers for the procfs and `/etc` files the host provider
//!   consumes.
//! - **`FakeProvider`**: (Defined in `fake.rs`, behind `test-utils`) a scripted
//!   provider for tests.

use crate::coerce::Reading;
use std::fmt;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
pub mod host;
pub mod procfs;

pub use host::HostProvider;

/// Internet protocol family a network counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub const ALL: [IpFamily; 2] = [IpFamily::V4, IpFamily::V6];

    /// Namespace segment used in metric names.
    pub fn namespace(self) -> &'static str {
        match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// TCP counters for one protocol family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpStats {
    /// Connections currently established.
    pub connections_established: u64,
    /// Active opens (`SYN-SENT` transitions).
    pub connections_active: u64,
    /// Passive opens (`SYN-RCVD` transitions from `LISTEN`).
    pub connections_passive: u64,
    /// Failed connection attempts.
    pub connection_failures: u64,
    /// Established connections that were reset.
    pub connections_reset: u64,
    pub segments_sent: u64,
    pub segments_received: u64,
    pub segments_retransmitted: u64,
}

/// UDP counters for one protocol family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UdpStats {
    pub datagrams_sent: u64,
    pub datagrams_received: u64,
    /// Datagrams received for a port nobody listens on.
    pub datagrams_no_port: u64,
    pub datagrams_received_errors: u64,
}

/// Read access to the operating system and hardware counters.
///
/// Implementations are shared between every gauge of a gauge set, so all
/// methods take `&self`. None of them may block indefinitely; timing out a
/// hung system call is the implementation's job.
pub trait SystemInfoProvider: Send + Sync {
    // Operating system identity
    fn process_id(&self) -> Reading<u32>;
    /// Bit width of the operating system, typically 32 or 64.
    fn os_bitness(&self) -> Reading<u32>;
    fn os_family(&self) -> Reading<String>;
    fn os_version(&self) -> Reading<String>;
    /// Seconds since boot.
    fn system_uptime(&self) -> Reading<u64>;

    // Processes and files
    fn process_count(&self) -> Reading<u64>;
    fn thread_count(&self) -> Reading<u64>;
    fn open_file_descriptors(&self) -> Reading<u64>;
    fn max_file_descriptors(&self) -> Reading<u64>;

    // Network identity and counters
    fn host_name(&self) -> Reading<String>;
    fn domain_name(&self) -> Reading<String>;
    fn dns_servers(&self) -> Reading<Vec<String>>;
    fn default_gateway(&self, family: IpFamily) -> Reading<String>;
    fn tcp_stats(&self, family: IpFamily) -> Reading<TcpStats>;
    fn udp_stats(&self, family: IpFamily) -> Reading<UdpStats>;

    // Processor
    fn processor_identifier(&self) -> Reading<String>;
    fn logical_processor_count(&self) -> Reading<u64>;
    fn physical_processor_count(&self) -> Reading<u64>;
    fn physical_package_count(&self) -> Reading<u64>;
    /// Maximum processor frequency in Hz.
    fn max_frequency(&self) -> Reading<u64>;
    fn interrupts(&self) -> Reading<u64>;
    fn context_switches(&self) -> Reading<u64>;

    // Memory, all in bytes
    fn total_memory(&self) -> Reading<u64>;
    fn available_memory(&self) -> Reading<u64>;
    fn page_size(&self) -> Reading<u64>;
    fn swap_used(&self) -> Reading<u64>;
    fn swap_total(&self) -> Reading<u64>;
    fn virtual_memory_used(&self) -> Reading<u64>;
    fn virtual_memory_max(&self) -> Reading<u64>;

    // Sensors
    /// CPU temperature in degrees Celsius.
    fn cpu_temperature(&self) -> Reading<f64>;
}
