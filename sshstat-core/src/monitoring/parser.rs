//! Parsers for remote command output
//!
//! Each function consumes the output of one command from
//! [`super::commands`] and produces one part of a [`StatsSnapshot`]. None of
//! them perform I/O. Lines that do not match the expected shape are skipped;
//! only missing essential data is an error.
//!
//! [`StatsSnapshot`]: crate::models::StatsSnapshot

use std::collections::BTreeMap;

use crate::error::{ParseError, ParseResult};
use crate::models::{
    FilesystemInfo, LoadAverage, MemoryInfo, NetworkInterfaceInfo, ProcessCounts, RawCpuCounters,
    Statistic,
};

/// Columns before `steal` that the aggregate cpu line must carry
const REQUIRED_CPU_FIELDS: usize = 7;

/// `df -Pk` reports 1024-byte blocks
const DF_BLOCK_SIZE: u64 = 1024;

/// Stateless parser for remote command output
pub struct SnapshotParser;

impl SnapshotParser {
    /// Parses the hostname command output (first non-empty line).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the output is blank.
    pub fn parse_hostname(output: &str) -> ParseResult<String> {
        output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| ParseError::new(Statistic::Hostname, "empty hostname"))
    }

    /// Parses `/proc/uptime` into seconds since boot.
    ///
    /// Format: `350735.47 234388.90`
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the first field is missing or not a number.
    pub fn parse_uptime(output: &str) -> ParseResult<f64> {
        output
            .split_whitespace()
            .next()
            .and_then(parse_float)
            .filter(|secs| *secs >= 0.0)
            .ok_or_else(|| ParseError::new(Statistic::Uptime, "no uptime value"))
    }

    /// Parses the three load averages from `/proc/loadavg`.
    ///
    /// Format: `0.52 0.34 0.28 3/1234 56789`
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if any of the first three fields is missing or
    /// not a number.
    pub fn parse_loadavg(output: &str) -> ParseResult<LoadAverage> {
        let parts: Vec<&str> = output.split_whitespace().collect();
        let field = |i: usize| {
            parts.get(i).and_then(|v| parse_float(v)).ok_or_else(|| {
                ParseError::new(Statistic::Load, format!("load average {} missing", i + 1))
            })
        };

        Ok(LoadAverage {
            one: field(0)?,
            five: field(1)?,
            fifteen: field(2)?,
        })
    }

    /// Parses the `running/total` field of `/proc/loadavg`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the field is missing or malformed.
    pub fn parse_process_counts(output: &str) -> ParseResult<ProcessCounts> {
        output
            .split_whitespace()
            .find_map(|field| {
                let (running, total) = field.split_once('/')?;
                Some(ProcessCounts {
                    running: running.parse().ok()?,
                    total: total.parse().ok()?,
                })
            })
            .ok_or_else(|| ParseError::new(Statistic::Load, "no running/total process field"))
    }

    /// Parses `/proc/meminfo` into byte figures.
    ///
    /// Lines look like `MemTotal:       16384000 kB`; unknown keys are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if `MemTotal` is absent.
    pub fn parse_meminfo(output: &str) -> ParseResult<MemoryInfo> {
        let mut memory = MemoryInfo::default();
        let mut saw_total = false;

        for line in output.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let Some(value) = parse_meminfo_value(rest) else {
                continue;
            };
            match key.trim() {
                "MemTotal" => {
                    memory.total = value;
                    saw_total = true;
                }
                "MemFree" => memory.free = value,
                "Buffers" => memory.buffers = value,
                "Cached" => memory.cached = value,
                "SwapTotal" => memory.swap_total = value,
                "SwapFree" => memory.swap_free = value,
                _ => {}
            }
        }

        if !saw_total {
            return Err(ParseError::new(
                Statistic::Memory,
                "MemTotal not found in /proc/meminfo",
            ));
        }
        Ok(memory)
    }

    /// Parses the aggregate `cpu` line of `/proc/stat`.
    ///
    /// Format: `cpu  user nice system idle iowait irq softirq [steal [guest ...]]`
    ///
    /// The eighth column is read as `steal`, as the kernel lays it out, and
    /// counts towards the total. `guest` is already included in `user` and is
    /// kept out of the total.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if there is no aggregate line or it has fewer
    /// than seven numeric fields.
    pub fn parse_cpu(output: &str) -> ParseResult<RawCpuCounters> {
        let fields: Vec<&str> = output
            .lines()
            .map(|l| l.split_whitespace())
            .find_map(|mut parts| (parts.next() == Some("cpu")).then(|| parts.collect()))
            .ok_or_else(|| ParseError::new(Statistic::Cpu, "no aggregate cpu line"))?;

        if fields.len() < REQUIRED_CPU_FIELDS {
            return Err(ParseError::new(
                Statistic::Cpu,
                format!(
                    "expected at least {REQUIRED_CPU_FIELDS} counters, found {}",
                    fields.len()
                ),
            ));
        }

        let required = |i: usize| -> ParseResult<u64> {
            fields[i].parse().map_err(|_| {
                ParseError::new(
                    Statistic::Cpu,
                    format!("counter {} is not an integer: '{}'", i + 1, fields[i]),
                )
            })
        };
        let optional = |i: usize| -> u64 {
            fields
                .get(i)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default()
        };

        Ok(RawCpuCounters {
            user: required(0)?,
            nice: required(1)?,
            system: required(2)?,
            idle: required(3)?,
            iowait: required(4)?,
            irq: required(5)?,
            softirq: required(6)?,
            steal: optional(7),
            guest: optional(8),
        })
    }

    /// Parses `df -Pk` output into one entry per real filesystem.
    ///
    /// Format: `Filesystem 1024-blocks Used Available Capacity Mounted on`.
    /// The header, malformed rows and zero-sized pseudo filesystems are
    /// skipped. A device name printed alone on its line is joined with the
    /// following line. Mount points may contain spaces.
    #[must_use]
    pub fn parse_filesystems(output: &str) -> Vec<FilesystemInfo> {
        let mut filesystems = Vec::new();
        let mut pending: Option<String> = None;

        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let joined = match pending.take() {
                Some(device) => format!("{device} {line}"),
                None => line.to_string(),
            };

            let fields: Vec<&str> = joined.split_whitespace().collect();
            if fields.len() == 1 {
                pending = Some(joined);
                continue;
            }
            if fields.len() < 6 {
                tracing::trace!(line = %joined, "Skipping short df row");
                continue;
            }

            let (Ok(total), Ok(used)) = (fields[1].parse::<u64>(), fields[2].parse::<u64>())
            else {
                // Header row or garbage
                continue;
            };
            if total == 0 {
                continue;
            }

            filesystems.push(FilesystemInfo {
                mount_point: fields[5..].join(" "),
                used: used.min(total) * DF_BLOCK_SIZE,
                free: total.saturating_sub(used) * DF_BLOCK_SIZE,
            });
        }

        filesystems
    }

    /// Parses `/proc/net/dev` into per-interface byte counters.
    ///
    /// Format after two header lines:
    /// `eth0: rx_bytes rx_packets ... (8 rx fields) tx_bytes tx_packets ...`
    ///
    /// Addresses are left empty; see [`Self::parse_addresses`].
    #[must_use]
    pub fn parse_net_dev(output: &str) -> BTreeMap<String, NetworkInterfaceInfo> {
        let mut interfaces = BTreeMap::new();

        for line in output.lines() {
            let Some((name, stats)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || name.contains('|') {
                continue;
            }

            let parts: Vec<&str> = stats.split_whitespace().collect();
            if parts.len() < 9 {
                continue;
            }
            let (Ok(rx_bytes), Ok(tx_bytes)) = (parts[0].parse(), parts[8].parse()) else {
                continue;
            };

            interfaces.insert(
                name.to_string(),
                NetworkInterfaceInfo {
                    rx_bytes,
                    tx_bytes,
                    ..NetworkInterfaceInfo::default()
                },
            );
        }

        interfaces
    }

    /// Parses `ip -o addr show` output into per-interface addresses.
    ///
    /// Format: `2: eth0    inet 10.0.0.5/24 brd 10.0.0.255 scope global eth0 ...`
    ///
    /// The first address of each family wins. Counters are left at zero.
    #[must_use]
    pub fn parse_addresses(output: &str) -> BTreeMap<String, NetworkInterfaceInfo> {
        let mut interfaces: BTreeMap<String, NetworkInterfaceInfo> = BTreeMap::new();

        for line in output.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 || !parts[0].ends_with(':') {
                continue;
            }
            let name = parts[1].trim_end_matches(':');
            let name = name.split_once('@').map_or(name, |(base, _)| base);
            if name.is_empty() {
                continue;
            }

            let entry = interfaces.entry(name.to_string()).or_default();
            match parts[2] {
                "inet" if entry.ipv4.is_empty() => entry.ipv4 = parts[3].to_string(),
                "inet6" if entry.ipv6.is_empty() => entry.ipv6 = parts[3].to_string(),
                _ => {}
            }
        }

        interfaces
    }

    /// Merges addresses into counter entries
    ///
    /// Interfaces that only appear in one of the two maps are kept.
    #[must_use]
    pub fn merge_interfaces(
        mut counters: BTreeMap<String, NetworkInterfaceInfo>,
        addresses: BTreeMap<String, NetworkInterfaceInfo>,
    ) -> BTreeMap<String, NetworkInterfaceInfo> {
        for (name, addr) in addresses {
            let entry = counters.entry(name).or_default();
            if entry.ipv4.is_empty() {
                entry.ipv4 = addr.ipv4;
            }
            if entry.ipv6.is_empty() {
                entry.ipv6 = addr.ipv6;
            }
        }
        counters
    }
}

/// Parses a float, accepting a decimal comma
fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    s.parse::<f64>()
        .ok()
        .or_else(|| s.replacen(',', ".", 1).parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parses `  16384000 kB` into bytes
fn parse_meminfo_value(s: &str) -> Option<u64> {
    let mut parts = s.split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    let multiplier = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        None => 1,
        Some("kb") => 1024,
        Some("mb") => 1024 * 1024,
        Some("gb") => 1024 * 1024 * 1024,
        Some(_) => return None,
    };
    value.checked_mul(multiplier)
}
