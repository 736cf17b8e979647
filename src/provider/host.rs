//! Provider backed by the local machine.
//!
//! Portable values (OS identity, CPU list, memory totals, sensors) come from
//! the `sysinfo` crate. Counters `sysinfo` does not expose (file descriptors,
//! TCP/UDP tables, interrupts, commit limits) are read from procfs, so on
//! non-Linux hosts those readings are simply empty.

use super::procfs::{self, ProcFs};
use super::{IpFamily, SystemInfoProvider, TcpStats, UdpStats};
use crate::coerce::{ReadFailure, Reading};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use sysinfo::{Components, System};

const CPU_SENSOR_LABELS: &[&str] = &["package", "tctl", "tdie", "cpu", "coretemp", "k10temp"];

/// Reads counters from the machine the process runs on.
///
/// Creating a `HostProvider` is cheap: nothing is read until the first
/// accessor call. The `sysinfo::System` handle is refreshed per call, under a
/// lock, with only the parts the accessor needs.
pub struct HostProvider {
    system: Mutex<System>,
    fs: ProcFs,
}

impl Default for HostProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProvider {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Resolves procfs, sysfs and `/etc` paths against `root` instead of `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            system: Mutex::new(System::new()),
            fs: ProcFs::new(root),
        }
    }

    fn system(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snmp_section(&self, section: &str) -> Result<HashMap<String, i64>, ReadFailure> {
        let content = self.fs.read("proc/net/snmp")?;
        procfs::parse_snmp_section(&content, section)
    }

    /// Resolves the DNS domain of `host`: from the name itself when it is
    /// qualified, then from its canonical name in `etc/hosts`, then from the
    /// local domain of `etc/resolv.conf`.
    fn dns_domain(&self, host: Option<&str>) -> Reading<String> {
        if let Some(host) = host {
            if let Some(domain) = procfs::domain_of(host) {
                return Ok(Some(domain));
            }
            let canonical = match self.fs.read("etc/hosts") {
                Ok(hosts) => procfs::parse_hosts_canonical(&hosts, host),
                Err(_) => None,
            };
            if let Some(domain) = canonical.as_deref().and_then(procfs::domain_of) {
                return Ok(Some(domain));
            }
        }
        match self.fs.read("etc/resolv.conf") {
            Ok(content) => Ok(procfs::parse_resolv_domain(&content)),
            Err(ReadFailure::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn meminfo(&self, key: &str) -> Reading<u64> {
        let content = self.fs.read("proc/meminfo")?;
        procfs::parse_meminfo_bytes(&content, key)
    }
}

fn bitness_of(arch: &str) -> u32 {
    if arch.contains("64") || arch == "s390x" {
        64
    } else {
        32
    }
}

impl SystemInfoProvider for HostProvider {
    fn process_id(&self) -> Reading<u32> {
        let pid =
            sysinfo::get_current_pid().map_err(|e| ReadFailure::Unavailable(e.to_string()))?;
        Ok(Some(pid.as_u32()))
    }

    fn os_bitness(&self) -> Reading<u32> {
        Ok(System::cpu_arch().map(|arch| bitness_of(&arch)))
    }

    fn os_family(&self) -> Reading<String> {
        Ok(System::name())
    }

    fn os_version(&self) -> Reading<String> {
        let version = match (System::os_version(), System::kernel_version()) {
            (Some(os), Some(kernel)) => Some(format!("{} build {}", os, kernel)),
            (Some(os), None) => Some(os),
            (None, kernel) => kernel,
        };
        Ok(version)
    }

    fn system_uptime(&self) -> Reading<u64> {
        Ok(Some(System::uptime()))
    }

    fn process_count(&self) -> Reading<u64> {
        Ok(Some(self.fs.count_pid_dirs()?))
    }

    fn thread_count(&self) -> Reading<u64> {
        let content = self.fs.read("proc/loadavg")?;
        Ok(Some(procfs::parse_loadavg_threads(&content)?))
    }

    fn open_file_descriptors(&self) -> Reading<u64> {
        let (allocated, _) = procfs::parse_file_nr(&self.fs.read("proc/sys/fs/file-nr")?)?;
        Ok(Some(allocated))
    }

    fn max_file_descriptors(&self) -> Reading<u64> {
        let (_, max) = procfs::parse_file_nr(&self.fs.read("proc/sys/fs/file-nr")?)?;
        Ok(Some(max))
    }

    fn host_name(&self) -> Reading<String> {
        Ok(System::host_name())
    }

    fn domain_name(&self) -> Reading<String> {
        self.dns_domain(System::host_name().as_deref())
    }

    fn dns_servers(&self) -> Reading<Vec<String>> {
        let content = self.fs.read("etc/resolv.conf")?;
        Ok(Some(procfs::parse_nameservers(&content)))
    }

    fn default_gateway(&self, family: IpFamily) -> Reading<String> {
        let gateway = match family {
            IpFamily::V4 => {
                let content = self.fs.read("proc/net/route")?;
                procfs::parse_default_gateway_v4(&content)?.map(|a| a.to_string())
            }
            IpFamily::V6 => {
                let content = self.fs.read("proc/net/ipv6_route")?;
                procfs::parse_default_gateway_v6(&content)?.map(|a| a.to_string())
            }
        };
        Ok(gateway)
    }

    fn tcp_stats(&self, family: IpFamily) -> Reading<TcpStats> {
        match family {
            IpFamily::V4 => Ok(Some(procfs::tcp_stats(&self.snmp_section("Tcp")?))),
            // Linux keeps a single TCP table shared by both families.
            IpFamily::V6 => Err(ReadFailure::Unsupported("separate TCPv6 counters")),
        }
    }

    fn udp_stats(&self, family: IpFamily) -> Reading<UdpStats> {
        let stats = match family {
            IpFamily::V4 => procfs::udp_stats(&self.snmp_section("Udp")?, ""),
            IpFamily::V6 => {
                let table = procfs::parse_snmp6(&self.fs.read("proc/net/snmp6")?);
                procfs::udp_stats(&table, "Udp6")
            }
        };
        Ok(Some(stats))
    }

    fn processor_identifier(&self) -> Reading<String> {
        let mut system = self.system();
        system.refresh_cpu();
        let identifier = system.cpus().first().map(|cpu| {
            format!("{} {}", cpu.vendor_id().trim(), cpu.brand().trim())
                .trim()
                .to_string()
        });
        Ok(identifier)
    }

    fn logical_processor_count(&self) -> Reading<u64> {
        let mut system = self.system();
        system.refresh_cpu();
        match system.cpus().len() {
            0 => Ok(None),
            n => Ok(Some(n as u64)),
        }
    }

    fn physical_processor_count(&self) -> Reading<u64> {
        Ok(self.system().physical_core_count().map(|n| n as u64))
    }

    fn physical_package_count(&self) -> Reading<u64> {
        let content = self.fs.read("proc/cpuinfo")?;
        match procfs::count_physical_packages(&content) {
            0 => Ok(None),
            n => Ok(Some(n)),
        }
    }

    fn max_frequency(&self) -> Reading<u64> {
        let content = self
            .fs
            .read("sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq")?;
        Ok(Some(procfs::parse_max_freq_hz(&content)?))
    }

    fn interrupts(&self) -> Reading<u64> {
        Ok(Some(procfs::parse_stat_counter(&self.fs.read("proc/stat")?, "intr")?))
    }

    fn context_switches(&self) -> Reading<u64> {
        Ok(Some(procfs::parse_stat_counter(&self.fs.read("proc/stat")?, "ctxt")?))
    }

    fn total_memory(&self) -> Reading<u64> {
        let mut system = self.system();
        system.refresh_memory();
        Ok(Some(system.total_memory()))
    }

    fn available_memory(&self) -> Reading<u64> {
        let mut system = self.system();
        system.refresh_memory();
        Ok(Some(system.available_memory()))
    }

    fn page_size(&self) -> Reading<u64> {
        let auxv = self.fs.read_bytes("proc/self/auxv")?;
        Ok(procfs::parse_auxv_page_size(&auxv))
    }

    fn swap_used(&self) -> Reading<u64> {
        let mut system = self.system();
        system.refresh_memory();
        Ok(Some(system.used_swap()))
    }

    fn swap_total(&self) -> Reading<u64> {
        let mut system = self.system();
        system.refresh_memory();
        Ok(Some(system.total_swap()))
    }

    fn virtual_memory_used(&self) -> Reading<u64> {
        self.meminfo("Committed_AS")
    }

    fn virtual_memory_max(&self) -> Reading<u64> {
        self.meminfo("CommitLimit")
    }

    fn cpu_temperature(&self) -> Reading<f64> {
        let components = Components::new_with_refreshed_list();
        for component in &components {
            let label = component.label().to_lowercase();
            if !CPU_SENSOR_LABELS.iter().any(|needle| label.contains(needle)) {
                continue;
            }
            let celsius = f64::from(component.temperature());
            if celsius.is_finite() {
                return Ok(Some(celsius));
            }
        }
        Ok(None)
    }
}
