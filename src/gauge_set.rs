//! # Operating Environment Gauge Set
//!
//! `EnvironmentGaugeSet` turns the accessors of a `SystemInfoProvider` into a
//! flat map of named gauges:
//!
//! - `self.pid`
//! - `os.*`: OS identity, process and file-descriptor counts, network identity
//! - `os.net.ipv4.*`, `os.net.ipv6.*`: default gateway and TCP/UDP counters
//! - `hw.*`: CPU identity and topology, memory, sensors
//!
//! Values that cannot change while the process runs are read once; everything
//! else is cached for the configured window. A failing accessor only blanks
//! its own key.

use crate::clock::{Clock, SystemClock};
use crate::coerce::Reading;
use crate::gauge::GaugeMap;
use crate::provider::{HostProvider, IpFamily, SystemInfoProvider, TcpStats, UdpStats};
use crate::registry::{GaugeMapBuilder, RegistryError};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_WINDOW: Duration = Duration::from_secs(1);

const TCP_FIELDS: &[(&str, fn(&TcpStats) -> u64)] = &[
    ("tcp.connections.active", |s| s.connections_active),
    ("tcp.connections.established", |s| s.connections_established),
    ("tcp.connections.passive", |s| s.connections_passive),
    ("tcp.connections.reset", |s| s.connections_reset),
    ("tcp.connections.failures", |s| s.connection_failures),
    ("tcp.segments.sent", |s| s.segments_sent),
    ("tcp.segments.received", |s| s.segments_received),
    ("tcp.segments.retransmitted", |s| s.segments_retransmitted),
];

const UDP_FIELDS: &[(&str, fn(&UdpStats) -> u64)] = &[
    ("udp.datagrams.sent", |s| s.datagrams_sent),
    ("udp.datagrams.received", |s| s.datagrams_received),
    ("udp.datagrams.received.errors", |s| s.datagrams_received_errors),
    ("udp.datagrams.received.no-port", |s| s.datagrams_no_port),
];

/// Projects one field out of a structured reading.
fn field<T, U>(reading: Reading<T>, project: impl FnOnce(T) -> U) -> Reading<U> {
    reading.map(|value| value.map(project))
}

/// Builds gauge maps over one provider, clock and cache window.
#[derive(Clone)]
pub struct EnvironmentGaugeSet {
    provider: Arc<dyn SystemInfoProvider>,
    clock: Arc<dyn Clock>,
    cache_window: Duration,
}

impl Default for EnvironmentGaugeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentGaugeSet {
    /// Reads the local machine with a one second cache window.
    pub fn new() -> Self {
        Self::with_cache_window(DEFAULT_CACHE_WINDOW)
    }

    pub fn with_cache_window(cache_window: Duration) -> Self {
        Self::with_parts(
            Arc::new(HostProvider::new()),
            Arc::new(SystemClock::new()),
            cache_window,
        )
    }

    pub fn with_parts(
        provider: Arc<dyn SystemInfoProvider>,
        clock: Arc<dyn Clock>,
        cache_window: Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            cache_window,
        }
    }

    fn builder(&self) -> GaugeMapBuilder {
        GaugeMapBuilder::new(Arc::clone(&self.clock), self.cache_window)
    }

    /// Returns every gauge of the set under its fully qualified name.
    ///
    /// Each call builds fresh cells; callers that want caching across reads
    /// should keep the returned map.
    pub fn metrics(&self) -> Result<GaugeMap, RegistryError> {
        let mut product = self.builder();

        let p = Arc::clone(&self.provider);
        product.lazy("self.pid", move || p.process_id())?;

        product.merge("os", self.operating_system_gauges()?)?;
        product.merge("hw", self.hardware_gauges()?)?;

        Ok(product.build())
    }

    /// Operating system gauges, keyed without the `os` prefix.
    pub fn operating_system_gauges(&self) -> Result<GaugeMap, RegistryError> {
        let mut product = self.builder();

        let p = Arc::clone(&self.provider);
        product.lazy("bits", move || p.os_bitness())?;
        let p = Arc::clone(&self.provider);
        product.lazy("family", move || p.os_family())?;
        let p = Arc::clone(&self.provider);
        product.lazy("version", move || p.os_version())?;
        let p = Arc::clone(&self.provider);
        product.cached("uptime", move || p.system_uptime())?;

        let p = Arc::clone(&self.provider);
        product.cached("proc.process.count", move || p.process_count())?;
        let p = Arc::clone(&self.provider);
        product.cached("proc.thread.count", move || p.thread_count())?;

        let p = Arc::clone(&self.provider);
        product.cached("fs.fd.open", move || p.open_file_descriptors())?;
        let p = Arc::clone(&self.provider);
        product.cached("fs.fd.max", move || p.max_file_descriptors())?;

        let p = Arc::clone(&self.provider);
        product.cached("net.hostname", move || p.host_name())?;
        let p = Arc::clone(&self.provider);
        product.cached("net.domainname", move || p.domain_name())?;
        let p = Arc::clone(&self.provider);
        product.cached("net.dnsservers", move || {
            field(p.dns_servers(), |servers| servers.join("; "))
        })?;

        for family in IpFamily::ALL {
            let prefix = format!("net.{}", family.namespace());
            product.merge(&prefix, self.ip_gauges(family)?)?;
        }

        Ok(product.build())
    }

    /// Gateway and TCP/UDP counters of one protocol family, keyed without the
    /// `os.net.<family>` prefix.
    pub fn ip_gauges(&self, family: IpFamily) -> Result<GaugeMap, RegistryError> {
        let mut product = self.builder();

        let p = Arc::clone(&self.provider);
        product.cached("gateway.default", move || p.default_gateway(family))?;

        for &(key, pick) in TCP_FIELDS {
            self.tcp_gauge(&mut product, family, key, pick)?;
        }
        for &(key, pick) in UDP_FIELDS {
            self.udp_gauge(&mut product, family, key, pick)?;
        }

        Ok(product.build())
    }

    fn tcp_gauge(
        &self,
        product: &mut GaugeMapBuilder,
        family: IpFamily,
        key: &str,
        pick: fn(&TcpStats) -> u64,
    ) -> Result<(), RegistryError> {
        let p = Arc::clone(&self.provider);
        product.cached(key, move || field(p.tcp_stats(family), |stats| pick(&stats)))?;
        Ok(())
    }

    fn udp_gauge(
        &self,
        product: &mut GaugeMapBuilder,
        family: IpFamily,
        key: &str,
        pick: fn(&UdpStats) -> u64,
    ) -> Result<(), RegistryError> {
        let p = Arc::clone(&self.provider);
        product.cached(key, move || field(p.udp_stats(family), |stats| pick(&stats)))?;
        Ok(())
    }

    /// Hardware gauges, keyed without the `hw` prefix.
    pub fn hardware_gauges(&self) -> Result<GaugeMap, RegistryError> {
        let mut product = self.builder();

        let p = Arc::clone(&self.provider);
        product.lazy("cpu.id", move || p.processor_identifier())?;
        let p = Arc::clone(&self.provider);
        product.lazy("cpu.logical.count", move || p.logical_processor_count())?;
        let p = Arc::clone(&self.provider);
        product.lazy("cpu.physical.count", move || p.physical_processor_count())?;
        let p = Arc::clone(&self.provider);
        product.lazy("cpu.physical.packages", move || p.physical_package_count())?;

        // TODO: per-core current frequency once the provider reports one value per CPU.
        let p = Arc::clone(&self.provider);
        product.cached("cpu.freq.max", move || p.max_frequency())?;
        let p = Arc::clone(&self.provider);
        product.cached("cpu.interrupts", move || p.interrupts())?;
        let p = Arc::clone(&self.provider);
        product.cached("cpu.context-switches", move || p.context_switches())?;

        let p = Arc::clone(&self.provider);
        product.cached("mem.total", move || p.total_memory())?;
        let p = Arc::clone(&self.provider);
        product.cached("mem.available", move || p.available_memory())?;
        let p = Arc::clone(&self.provider);
        product.cached("mem.page.size", move || p.page_size())?;
        let p = Arc::clone(&self.provider);
        product.cached("mem.swap.used", move || p.swap_used())?;
        let p = Arc::clone(&self.provider);
        product.cached("mem.swap.total", move || p.swap_total())?;
        let p = Arc::clone(&self.provider);
        product.cached("mem.virtual.used", move || p.virtual_memory_used())?;
        let p = Arc::clone(&self.provider);
        product.cached("mem.virtual.total", move || p.virtual_memory_max())?;

        let p = Arc::clone(&self.provider);
        product.cached("sensors.cpu.temperature", move || p.cpu_temperature())?;

        Ok(product.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::provider::fake::FakeProvider;

    fn gauge_set(provider: &Arc<FakeProvider>) -> EnvironmentGaugeSet {
        EnvironmentGaugeSet::with_parts(
            provider.clone(),
            Arc::new(ManualClock::default()),
            DEFAULT_CACHE_WINDOW,
        )
    }

    #[test]
    fn test_ip_gauges_keys() {
        let provider = Arc::new(FakeProvider::new());
        let keys: Vec<String> = gauge_set(&provider)
            .ip_gauges(IpFamily::V4)
            .unwrap()
            .into_keys()
            .collect();

        assert_eq!(
            keys,
            vec![
                "gateway.default",
                "tcp.connections.active",
                "tcp.connections.established",
                "tcp.connections.failures",
                "tcp.connections.passive",
                "tcp.connections.reset",
                "tcp.segments.received",
                "tcp.segments.retransmitted",
                "tcp.segments.sent",
                "udp.datagrams.received",
                "udp.datagrams.received.errors",
                "udp.datagrams.received.no-port",
                "udp.datagrams.sent",
            ]
        );
    }

    #[test]
    fn test_tcp_fields_map_to_their_keys() {
        let provider = Arc::new(FakeProvider::new());
        provider.set_value("tcp_stats.ipv6", 9);
        let gauges = gauge_set(&provider).ip_gauges(IpFamily::V6).unwrap();

        assert_eq!(gauges["tcp.segments.sent"].value(), "9");
        assert_eq!(provider.get_call_count("tcp_stats.ipv6"), 1);
        assert_eq!(provider.get_call_count("tcp_stats.ipv4"), 0);
    }

    #[test]
    fn test_dns_servers_are_joined() {
        let provider = Arc::new(FakeProvider::new());
        provider.set_value("dns_servers", "10.0.0.2,10.0.0.3");
        let gauges = gauge_set(&provider).operating_system_gauges().unwrap();

        assert_eq!(gauges["net.dnsservers"].value(), "10.0.0.2; 10.0.0.3");
    }

    #[test]
    fn test_building_the_set_reads_nothing() {
        let provider = Arc::new(FakeProvider::new());
        let gauges = gauge_set(&provider).metrics().unwrap();

        assert!(!gauges.is_empty());
        assert_eq!(provider.total_calls(), 0);
    }
}
