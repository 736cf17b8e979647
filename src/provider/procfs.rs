//! Readers and parsers for Linux procfs, sysfs and `/etc` files.
//!
//! All paths are resolved against a configurable root so the host provider
//! can be pointed at a fixture tree. The parsers are plain functions over
//! file contents and never touch the filesystem themselves.

use super::{TcpStats, UdpStats};
use crate::coerce::ReadFailure;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

/// Filesystem access rooted at a configurable directory (normally `/`).
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    /// Reads a whole file, e.g. `proc/net/snmp`.
    pub fn read(&self, relative: &str) -> Result<String, ReadFailure> {
        Ok(fs::read_to_string(self.path(relative))?)
    }

    /// Reads a whole binary file, e.g. `proc/self/auxv`.
    pub fn read_bytes(&self, relative: &str) -> Result<Vec<u8>, ReadFailure> {
        Ok(fs::read(self.path(relative))?)
    }

    /// Counts the numeric (per-process) entries of `proc/`.
    pub fn count_pid_dirs(&self) -> Result<u64, ReadFailure> {
        let mut count = 0;
        for entry in fs::read_dir(self.path("proc"))? {
            let entry = entry?;
            let is_pid = entry
                .file_name()
                .to_str()
                .is_some_and(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()));
            if is_pid {
                count += 1;
            }
        }
        Ok(count)
    }
}

// ============ /proc/net/snmp and /proc/net/snmp6 ============

/// Extracts one section of `/proc/net/snmp`.
///
/// Each protocol occupies two lines with the same prefix: a header line with
/// field names and a line with the values.
/// Tcp: RtoAlgorithm RtoMin ... CurrEstab InSegs ...
/// Tcp: 1 200 ... 12 34567 ...
pub fn parse_snmp_section(
    content: &str,
    section: &str,
) -> Result<HashMap<String, i64>, ReadFailure> {
    let prefix = format!("{}:", section);
    let mut lines = content
        .lines()
        .filter(|line| line.split_whitespace().next() == Some(prefix.as_str()));

    let (header, values) = match (lines.next(), lines.next()) {
        (Some(header), Some(values)) => (header, values),
        _ => return Err(ReadFailure::parse("/proc/net/snmp", format!("no {} section", section))),
    };

    let table = header
        .split_whitespace()
        .skip(1)
        .zip(values.split_whitespace().skip(1))
        .filter_map(|(key, value)| value.parse::<i64>().ok().map(|v| (key.to_string(), v)))
        .collect();
    Ok(table)
}

/// Parses the `name value` lines of `/proc/net/snmp6`.
pub fn parse_snmp6(content: &str) -> HashMap<String, i64> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let key = parts.next()?;
            let value = parts.next()?.parse::<i64>().ok()?;
            Some((key.to_string(), value))
        })
        .collect()
}

fn counter(table: &HashMap<String, i64>, key: &str) -> u64 {
    table.get(key).map_or(0, |v| (*v).max(0) as u64)
}

/// Builds `TcpStats` from the `Tcp` section of `/proc/net/snmp`.
pub fn tcp_stats(table: &HashMap<String, i64>) -> TcpStats {
    TcpStats {
        connections_established: counter(table, "CurrEstab"),
        connections_active: counter(table, "ActiveOpens"),
        connections_passive: counter(table, "PassiveOpens"),
        connection_failures: counter(table, "AttemptFails"),
        connections_reset: counter(table, "EstabResets"),
        segments_sent: counter(table, "OutSegs"),
        segments_received: counter(table, "InSegs"),
        segments_retransmitted: counter(table, "RetransSegs"),
    }
}

/// Builds `UdpStats` from a UDP table.
///
/// `key_prefix` is `""` for the `Udp` section of `/proc/net/snmp` and `"Udp6"`
/// for `/proc/net/snmp6`.
pub fn udp_stats(table: &HashMap<String, i64>, key_prefix: &str) -> UdpStats {
    let get = |name: &str| counter(table, &format!("{}{}", key_prefix, name));
    UdpStats {
        datagrams_sent: get("OutDatagrams"),
        datagrams_received: get("InDatagrams"),
        datagrams_no_port: get("NoPorts"),
        datagrams_received_errors: get("InErrors"),
    }
}

// ============ Kernel counters ============

/// Parses `/proc/sys/fs/file-nr` into `(allocated, max)`.
pub fn parse_file_nr(content: &str) -> Result<(u64, u64), ReadFailure> {
    let fields: Vec<u64> = content
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|e| ReadFailure::parse("/proc/sys/fs/file-nr", format!("{}", e)))?;
    match fields.as_slice() {
        [allocated, _, max, ..] => Ok((*allocated, *max)),
        _ => Err(ReadFailure::parse("/proc/sys/fs/file-nr", "expected three fields")),
    }
}

/// Returns the first value of the `name` line of `/proc/stat` (`intr`, `ctxt`).
pub fn parse_stat_counter(content: &str, name: &str) -> Result<u64, ReadFailure> {
    content
        .lines()
        .find_map(|line| {
            let mut parts = line.split_whitespace();
            (parts.next() == Some(name)).then(|| parts.next()).flatten()
        })
        .ok_or_else(|| ReadFailure::parse("/proc/stat", format!("no {} line", name)))?
        .parse()
        .map_err(|e| ReadFailure::parse("/proc/stat", format!("{}: {}", name, e)))
}

/// Returns the total number of scheduling entities (threads) from
/// `/proc/loadavg`, whose fourth field reads `running/total`.
pub fn parse_loadavg_threads(content: &str) -> Result<u64, ReadFailure> {
    content
        .split_whitespace()
        .nth(3)
        .and_then(|field| field.split_once('/'))
        .and_then(|(_, total)| total.parse().ok())
        .ok_or_else(|| ReadFailure::parse("/proc/loadavg", content.trim().to_string()))
}

/// Returns a `/proc/meminfo` entry converted to bytes.
pub fn parse_meminfo_bytes(content: &str, key: &str) -> Result<Option<u64>, ReadFailure> {
    for line in content.lines() {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        if name.trim() != key {
            continue;
        }
        let mut parts = rest.split_whitespace();
        let value: u64 = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ReadFailure::parse("/proc/meminfo", line.to_string()))?;
        let bytes = match parts.next() {
            Some("kB") => value * 1024,
            _ => value,
        };
        return Ok(Some(bytes));
    }
    Ok(None)
}

const AT_NULL: u64 = 0;
const AT_PAGESZ: u64 = 6;

/// Returns the `AT_PAGESZ` entry of `/proc/self/auxv`.
///
/// The auxiliary vector is a list of native-endian `(type, value)` pairs of
/// machine words, terminated by an `AT_NULL` entry.
pub fn parse_auxv_page_size(auxv: &[u8]) -> Option<u64> {
    const WORD: usize = std::mem::size_of::<usize>();
    let word = |bytes: &[u8]| -> u64 {
        let mut buf = [0u8; WORD];
        buf.copy_from_slice(bytes);
        usize::from_ne_bytes(buf) as u64
    };
    for entry in auxv.chunks_exact(2 * WORD) {
        let (kind, value) = entry.split_at(WORD);
        match word(kind) {
            AT_NULL => return None,
            AT_PAGESZ => return Some(word(value)),
            _ => {}
        }
    }
    None
}

// ============ CPU topology ============

/// Counts distinct `physical id` values in `/proc/cpuinfo`.
///
/// Some platforms (many ARM boards, most VMs) omit the field entirely; a
/// machine that lists processors but no package ids has one package.
pub fn count_physical_packages(content: &str) -> u64 {
    let mut packages = HashSet::new();
    let mut processors = 0u64;
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "processor" => processors += 1,
            "physical id" => {
                packages.insert(value.trim().to_string());
            }
            _ => {}
        }
    }
    match (packages.len() as u64, processors) {
        (0, 0) => 0,
        (0, _) => 1,
        (n, _) => n,
    }
}

/// Converts `cpuinfo_max_freq` (kHz) to Hz.
pub fn parse_max_freq_hz(content: &str) -> Result<u64, ReadFailure> {
    content
        .trim()
        .parse::<u64>()
        .map(|khz| khz * 1000)
        .map_err(|e| ReadFailure::parse("cpuinfo_max_freq", e.to_string()))
}

// ============ Network identity ============

/// Returns everything after the first label of a fully qualified name.
pub fn domain_of(name: &str) -> Option<String> {
    let (_, domain) = name.trim().trim_end_matches('.').split_once('.')?;
    (!domain.is_empty()).then(|| domain.to_string())
}

/// Finds the canonical name of `host` in `/etc/hosts`.
///
/// The canonical name is the first name on the line that lists `host`, which
/// is what the resolver reports for it.
pub fn parse_hosts_canonical(content: &str, host: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split('#').next().unwrap_or("");
        let mut names = line.split_whitespace().skip(1);
        let canonical = names.next()?;
        let listed = std::iter::once(canonical)
            .chain(names)
            .any(|name| name.eq_ignore_ascii_case(host));
        listed.then(|| canonical.to_string())
    })
}

/// Returns the local domain of `/etc/resolv.conf`: the `domain` entry or the
/// first `search` entry, whichever appears last.
pub fn parse_resolv_domain(content: &str) -> Option<String> {
    content
        .lines()
        .map(|line| line.split(['#', ';']).next().unwrap_or(""))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("domain" | "search"), Some(domain)) => {
                    Some(domain.trim_end_matches('.').to_string())
                }
                _ => None,
            }
        })
        .filter(|domain| !domain.is_empty())
        .last()
}

/// Collects the `nameserver` entries of `/etc/resolv.conf`, in order.
pub fn parse_nameservers(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split(['#', ';']).next().unwrap_or(""))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("nameserver"), Some(address)) => Some(address.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Finds the IPv4 default gateway in `/proc/net/route`.
///
/// Addresses are hex dumps of the in-memory (network order) bytes. When
/// several default routes exist the one with the lowest metric wins.
pub fn parse_default_gateway_v4(content: &str) -> Result<Option<Ipv4Addr>, ReadFailure> {
    let mut best: Option<(u32, Ipv4Addr)> = None;
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            continue;
        }
        let (destination, gateway, metric, mask) = (fields[1], fields[2], fields[6], fields[7]);
        if destination != "00000000" || mask != "00000000" {
            continue;
        }
        let gateway = u32::from_str_radix(gateway, 16)
            .map_err(|e| ReadFailure::parse("/proc/net/route", e.to_string()))?;
        if gateway == 0 {
            continue;
        }
        let metric: u32 = metric.parse().unwrap_or(u32::MAX);
        let address = Ipv4Addr::from(gateway.to_ne_bytes());
        if best.map_or(true, |(m, _)| metric < m) {
            best = Some((metric, address));
        }
    }
    Ok(best.map(|(_, address)| address))
}

/// Finds the IPv6 default gateway in `/proc/net/ipv6_route`.
///
/// Columns: destination, prefix length, source, prefix length, next hop,
/// metric, refcount, use, flags, interface.
pub fn parse_default_gateway_v6(content: &str) -> Result<Option<Ipv6Addr>, ReadFailure> {
    let mut best: Option<(u32, Ipv6Addr)> = None;
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let (destination, prefix_len, next_hop, metric) =
            (fields[0], fields[1], fields[4], fields[5]);
        if prefix_len != "00" || destination.bytes().any(|b| b != b'0') {
            continue;
        }
        let next_hop = u128::from_str_radix(next_hop, 16)
            .map_err(|e| ReadFailure::parse("/proc/net/ipv6_route", e.to_string()))?;
        if next_hop == 0 {
            continue;
        }
        let metric = u32::from_str_radix(metric, 16).unwrap_or(u32::MAX);
        if best.map_or(true, |(m, _)| metric < m) {
            best = Some((metric, Ipv6Addr::from(next_hop)));
        }
    }
    Ok(best.map(|(_, address)| address))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNMP: &str = "\
Ip: Forwarding DefaultTTL InReceives
Ip: 1 64 123456
Tcp: RtoAlgorithm RtoMin RtoMax MaxConn ActiveOpens PassiveOpens AttemptFails EstabResets CurrEstab InSegs OutSegs RetransSegs InErrs OutRsts InCsumErrors
Tcp: 1 200 120000 -1 5012 310 42 17 9 981234 876543 321 0 77 0
Udp: InDatagrams NoPorts InErrors OutDatagrams RcvbufErrors SndbufErrors InCsumErrors IgnoredMulti MemErrors
Udp: 7000 12 3 6500 0 0 0 0 0
";

    const SNMP6: &str = "\
Ip6InReceives                   	4321
Udp6InDatagrams                 	410
Udp6NoPorts                     	2
Udp6InErrors                    	1
Udp6OutDatagrams                	405
";

    #[test]
    fn test_tcp_stats_from_snmp() {
        let table = parse_snmp_section(SNMP, "Tcp").unwrap();
        assert_eq!(
            tcp_stats(&table),
            TcpStats {
                connections_established: 9,
                connections_active: 5012,
                connections_passive: 310,
                connection_failures: 42,
                connections_reset: 17,
                segments_sent: 876543,
                segments_received: 981234,
                segments_retransmitted: 321,
            }
        );
    }

    #[test]
    fn test_udp_stats_from_snmp_and_snmp6() {
        let v4 = udp_stats(&parse_snmp_section(SNMP, "Udp").unwrap(), "");
        assert_eq!(v4.datagrams_received, 7000);
        assert_eq!(v4.datagrams_sent, 6500);
        assert_eq!(v4.datagrams_no_port, 12);
        assert_eq!(v4.datagrams_received_errors, 3);

        let v6 = udp_stats(&parse_snmp6(SNMP6), "Udp6");
        assert_eq!(
            v6,
            UdpStats {
                datagrams_sent: 405,
                datagrams_received: 410,
                datagrams_no_port: 2,
                datagrams_received_errors: 1,
            }
        );
    }

    #[test]
    fn test_missing_snmp_section_is_an_error() {
        assert!(parse_snmp_section("Ip: A\nIp: 1\n", "Tcp").is_err());
    }

    #[test]
    fn test_file_nr() {
        assert_eq!(
            parse_file_nr("2304\t0\t9223372036854775807\n").unwrap(),
            (2304, 9223372036854775807)
        );
        assert!(parse_file_nr("12 0").is_err());
    }

    #[test]
    fn test_stat_counters() {
        let stat = "cpu  1 2 3 4\ncpu0 1 2 3 4\nintr 98765 1 2 3\nctxt 123456\nbtime 1700000000\n";
        assert_eq!(parse_stat_counter(stat, "intr").unwrap(), 98765);
        assert_eq!(parse_stat_counter(stat, "ctxt").unwrap(), 123456);
        assert!(parse_stat_counter(stat, "softirq").is_err());
    }

    #[test]
    fn test_loadavg_threads() {
        assert_eq!(parse_loadavg_threads("0.52 0.58 0.59 3/1024 48213\n").unwrap(), 1024);
        assert!(parse_loadavg_threads("garbage").is_err());
    }

    #[test]
    fn test_meminfo_bytes() {
        let meminfo = "MemTotal:       16303488 kB\nCommitLimit:    12345 kB\nCommitted_AS:   6789 kB\nHugePages_Total:       0\n";
        assert_eq!(parse_meminfo_bytes(meminfo, "CommitLimit").unwrap(), Some(12345 * 1024));
        assert_eq!(parse_meminfo_bytes(meminfo, "Committed_AS").unwrap(), Some(6789 * 1024));
        assert_eq!(parse_meminfo_bytes(meminfo, "HugePages_Total").unwrap(), Some(0));
        assert_eq!(parse_meminfo_bytes(meminfo, "SwapTotal").unwrap(), None);
    }

    fn auxv(entries: &[(u64, u64)]) -> Vec<u8> {
        entries
            .iter()
            .flat_map(|&(kind, value)| [kind as usize, value as usize])
            .flat_map(usize::to_ne_bytes)
            .collect()
    }

    #[test]
    fn test_auxv_page_size() {
        // AT_PHDR, AT_PAGESZ, AT_CLKTCK, AT_NULL
        let vector = auxv(&[(3, 0x4000), (6, 16384), (17, 100), (0, 0)]);
        assert_eq!(parse_auxv_page_size(&vector), Some(16384));

        let without = auxv(&[(3, 0x4000), (0, 0), (6, 4096)]);
        assert_eq!(parse_auxv_page_size(&without), None);
        assert_eq!(parse_auxv_page_size(&[]), None);
    }

    #[test]
    fn test_physical_packages() {
        let two_sockets = "processor\t: 0\nphysical id\t: 0\n\nprocessor\t: 1\nphysical id\t: 1\n\nprocessor\t: 2\nphysical id\t: 0\n";
        assert_eq!(count_physical_packages(two_sockets), 2);

        let arm = "processor\t: 0\nBogoMIPS\t: 108.00\n\nprocessor\t: 1\nBogoMIPS\t: 108.00\n";
        assert_eq!(count_physical_packages(arm), 1);
        assert_eq!(count_physical_packages(""), 0);
    }

    #[test]
    fn test_max_freq_is_reported_in_hz() {
        assert_eq!(parse_max_freq_hz("3600000\n").unwrap(), 3_600_000_000);
    }

    #[test]
    fn test_domain_of_qualified_name() {
        assert_eq!(domain_of("vm.corp.example"), Some("corp.example".into()));
        assert_eq!(domain_of("vm.corp.example."), Some("corp.example".into()));
        assert_eq!(domain_of("vm"), None);
        assert_eq!(domain_of("vm."), None);
    }

    #[test]
    fn test_hosts_canonical_name() {
        let hosts = "127.0.0.1\tlocalhost\n\
                     # 10.0.0.9 vm.old.example vm\n\
                     127.0.1.1\tvm.corp.example vm\n";
        assert_eq!(parse_hosts_canonical(hosts, "vm"), Some("vm.corp.example".into()));
        assert_eq!(parse_hosts_canonical(hosts, "VM"), Some("vm.corp.example".into()));
        assert_eq!(parse_hosts_canonical(hosts, "db"), None);
    }

    #[test]
    fn test_resolv_domain_last_entry_wins() {
        assert_eq!(
            parse_resolv_domain("nameserver 10.0.0.2\nsearch corp.example lab.example\n"),
            Some("corp.example".into())
        );
        assert_eq!(
            parse_resolv_domain("search corp.example\ndomain lab.example.\n"),
            Some("lab.example".into())
        );
        assert_eq!(parse_resolv_domain("nameserver 10.0.0.2\n# domain x.example\n"), None);
    }

    #[test]
    fn test_nameservers() {
        let resolv = "# generated\nnameserver 10.0.0.2\nsearch corp.example\nnameserver 2001:db8::53 # secondary\n;nameserver 9.9.9.9\n";
        assert_eq!(parse_nameservers(resolv), vec!["10.0.0.2", "2001:db8::53"]);
    }

    #[test]
    fn test_default_gateway_v4() {
        let route = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
wlan0\t00000000\t0102A8C0\t0003\t0\t0\t600\t00000000\t0\t0\t0
eth0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
eth0\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0
";
        let expected = Ipv4Addr::from(0x0101A8C0u32.to_ne_bytes());
        assert_eq!(parse_default_gateway_v4(route).unwrap(), Some(expected));
        assert_eq!(parse_default_gateway_v4("Iface\tDestination\n").unwrap(), None);
    }

    #[test]
    fn test_default_gateway_v6() {
        let route = "\
fe800000000000000000000000000000 40 00000000000000000000000000000000 00 00000000000000000000000000000000 00000100 00000001 00000000 00000001 eth0
00000000000000000000000000000000 00 00000000000000000000000000000000 00 fe800000000000000000000000000001 00000400 00000001 00000000 00000003 eth0
00000000000000000000000000000000 00 00000000000000000000000000000000 00 00000000000000000000000000000000 ffffffff 00000001 00000000 00200200 lo
";
        assert_eq!(
            parse_default_gateway_v6(route).unwrap(),
            Some("fe80::1".parse::<Ipv6Addr>().unwrap())
        );
    }
}
