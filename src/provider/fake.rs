//! Scripted provider for tests.

use super::{IpFamily, SystemInfoProvider, TcpStats, UdpStats};
use crate::coerce::{ReadFailure, Reading};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

/// What an accessor of the `FakeProvider` does when called.
#[derive(Debug, Clone)]
pub enum Response {
    /// Returns this value, parsed into the accessor's type.
    Value(String),
    /// Returns `Ok(None)`.
    Absent,
    /// Returns `Err(ReadFailure::Unsupported)`.
    Unsupported,
    /// Panics inside the accessor.
    Panic,
}

/// A provider whose accessors return scripted responses.
///
/// Every accessor answers `"1"` (or the single-element equivalent) until told
/// otherwise. Accessors are addressed by their method name; per-family
/// accessors append the family, e.g. `tcp_stats.ipv6`. Structured records
/// (`TcpStats`, `UdpStats`) fill every field with the scripted number.
#[derive(Debug, Default)]
pub struct FakeProvider {
    responses: Mutex<HashMap<String, Response>>,
    call_count: Mutex<HashMap<String, u32>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `accessor` to return `value`.
    pub fn set_value(&self, accessor: &str, value: impl ToString) {
        self.respond(accessor, Response::Value(value.to_string()));
    }

    pub fn respond(&self, accessor: &str, response: Response) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(accessor.to_string(), response);
    }

    /// Number of times `accessor` has been invoked.
    pub fn get_call_count(&self, accessor: &str) -> u32 {
        let call_count = self.call_count.lock().unwrap();
        call_count.get(accessor).copied().unwrap_or(0)
    }

    /// Total number of accessor invocations.
    pub fn total_calls(&self) -> u32 {
        self.call_count.lock().unwrap().values().sum()
    }

    fn read<T>(&self, accessor: &str) -> Reading<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        {
            let mut call_count = self.call_count.lock().unwrap();
            *call_count.entry(accessor.to_string()).or_insert(0) += 1;
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(accessor)
            .cloned()
            .unwrap_or_else(|| Response::Value("1".to_string()));

        match response {
            Response::Value(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ReadFailure::parse("fake response", e.to_string())),
            Response::Absent => Ok(None),
            Response::Unsupported => Err(ReadFailure::Unsupported("scripted failure")),
            Response::Panic => panic!("scripted panic in {}", accessor),
        }
    }

    fn family_key(accessor: &str, family: IpFamily) -> String {
        format!("{}.{}", accessor, family.namespace())
    }
}

impl SystemInfoProvider for FakeProvider {
    fn process_id(&self) -> Reading<u32> {
        self.read("process_id")
    }

    fn os_bitness(&self) -> Reading<u32> {
        self.read("os_bitness")
    }

    fn os_family(&self) -> Reading<String> {
        self.read("os_family")
    }

    fn os_version(&self) -> Reading<String> {
        self.read("os_version")
    }

    fn system_uptime(&self) -> Reading<u64> {
        self.read("system_uptime")
    }

    fn process_count(&self) -> Reading<u64> {
        self.read("process_count")
    }

    fn thread_count(&self) -> Reading<u64> {
        self.read("thread_count")
    }

    fn open_file_descriptors(&self) -> Reading<u64> {
        self.read("open_file_descriptors")
    }

    fn max_file_descriptors(&self) -> Reading<u64> {
        self.read("max_file_descriptors")
    }

    fn host_name(&self) -> Reading<String> {
        self.read("host_name")
    }

    fn domain_name(&self) -> Reading<String> {
        self.read("domain_name")
    }

    fn dns_servers(&self) -> Reading<Vec<String>> {
        let raw: Option<String> = self.read("dns_servers")?;
        Ok(raw.map(|list| list.split(',').map(|s| s.trim().to_string()).collect()))
    }

    fn default_gateway(&self, family: IpFamily) -> Reading<String> {
        self.read(&Self::family_key("default_gateway", family))
    }

    fn tcp_stats(&self, family: IpFamily) -> Reading<TcpStats> {
        let n: Option<u64> = self.read(&Self::family_key("tcp_stats", family))?;
        Ok(n.map(|n| TcpStats {
            connections_established: n,
            connections_active: n,
            connections_passive: n,
            connection_failures: n,
            connections_reset: n,
            segments_sent: n,
            segments_received: n,
            segments_retransmitted: n,
        }))
    }

    fn udp_stats(&self, family: IpFamily) -> Reading<UdpStats> {
        let n: Option<u64> = self.read(&Self::family_key("udp_stats", family))?;
        Ok(n.map(|n| UdpStats {
            datagrams_sent: n,
            datagrams_received: n,
            datagrams_no_port: n,
            datagrams_received_errors: n,
        }))
    }

    fn processor_identifier(&self) -> Reading<String> {
        self.read("processor_identifier")
    }

    fn logical_processor_count(&self) -> Reading<u64> {
        self.read("logical_processor_count")
    }

    fn physical_processor_count(&self) -> Reading<u64> {
        self.read("physical_processor_count")
    }

    fn physical_package_count(&self) -> Reading<u64> {
        self.read("physical_package_count")
    }

    fn max_frequency(&self) -> Reading<u64> {
        self.read("max_frequency")
    }

    fn interrupts(&self) -> Reading<u64> {
        self.read("interrupts")
    }

    fn context_switches(&self) -> Reading<u64> {
        self.read("context_switches")
    }

    fn total_memory(&self) -> Reading<u64> {
        self.read("total_memory")
    }

    fn available_memory(&self) -> Reading<u64> {
        self.read("available_memory")
    }

    fn page_size(&self) -> Reading<u64> {
        self.read("page_size")
    }

    fn swap_used(&self) -> Reading<u64> {
        self.read("swap_used")
    }

    fn swap_total(&self) -> Reading<u64> {
        self.read("swap_total")
    }

    fn virtual_memory_used(&self) -> Reading<u64> {
        self.read("virtual_memory_used")
    }

    fn virtual_memory_max(&self) -> Reading<u64> {
        self.read("virtual_memory_max")
    }

    fn cpu_temperature(&self) -> Reading<f64> {
        self.read("cpu_temperature")
    }
}
