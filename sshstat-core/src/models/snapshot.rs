//! Statistics collected from one poll of one target
//!
//! All byte figures are in bytes; CPU counters are in `USER_HZ` ticks as
//! reported by the kernel.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One statistic gathered by a dedicated remote command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Fully-qualified hostname
    Hostname,
    /// Seconds since boot
    Uptime,
    /// Load averages and process counts
    Load,
    /// Memory and swap
    Memory,
    /// Aggregate CPU counters
    Cpu,
    /// Mounted filesystem usage
    Filesystems,
    /// Interface byte counters
    Network,
    /// Interface addresses
    Addresses,
}

impl Statistic {
    /// Returns the statistic name as a lowercase string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hostname => "hostname",
            Self::Uptime => "uptime",
            Self::Load => "load",
            Self::Memory => "memory",
            Self::Cpu => "cpu",
            Self::Filesystems => "filesystems",
            Self::Network => "network",
            Self::Addresses => "addresses",
        }
    }

    /// Whether a poll must fail when this statistic is unavailable
    #[must_use]
    pub const fn is_essential(&self) -> bool {
        matches!(self, Self::Hostname | Self::Cpu)
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw cumulative CPU counters from the aggregate `cpu` line of `/proc/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawCpuCounters {
    /// Time in user mode
    pub user: u64,
    /// Time in user mode with low priority
    pub nice: u64,
    /// Time in system mode
    pub system: u64,
    /// Time in the idle task
    pub idle: u64,
    /// Time waiting for I/O
    pub iowait: u64,
    /// Time servicing hardware interrupts
    pub irq: u64,
    /// Time servicing softirqs
    pub softirq: u64,
    /// Time stolen by the hypervisor (optional column)
    pub steal: u64,
    /// Time running guest vCPUs (optional column, already included in `user`)
    pub guest: u64,
}

impl RawCpuCounters {
    /// Sum of the mutually exclusive categories
    ///
    /// `guest` is left out because the kernel already counts it in `user`.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Per-category difference `self - previous`
    ///
    /// Returns `None` if any counter went backwards (reboot or wrap).
    #[must_use]
    pub fn checked_delta(&self, previous: &Self) -> Option<Self> {
        Some(Self {
            user: self.user.checked_sub(previous.user)?,
            nice: self.nice.checked_sub(previous.nice)?,
            system: self.system.checked_sub(previous.system)?,
            idle: self.idle.checked_sub(previous.idle)?,
            iowait: self.iowait.checked_sub(previous.iowait)?,
            irq: self.irq.checked_sub(previous.irq)?,
            softirq: self.softirq.checked_sub(previous.softirq)?,
            steal: self.steal.checked_sub(previous.steal)?,
            guest: self.guest.checked_sub(previous.guest)?,
        })
    }
}

/// CPU time breakdown in percent, rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuPercentages {
    /// User mode
    pub user: f64,
    /// Low priority user mode
    pub nice: f64,
    /// System mode
    pub system: f64,
    /// Idle
    pub idle: f64,
    /// Waiting for I/O
    pub iowait: f64,
    /// Hardware interrupts
    pub irq: f64,
    /// Softirqs
    pub softirq: f64,
    /// Stolen by the hypervisor
    pub steal: f64,
    /// Running guests (subset of `user`)
    pub guest: f64,
}

impl CpuPercentages {
    /// All categories at 0%, reported when no usable baseline exists
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            user: 0.0,
            nice: 0.0,
            system: 0.0,
            idle: 0.0,
            iowait: 0.0,
            irq: 0.0,
            softirq: 0.0,
            steal: 0.0,
            guest: 0.0,
        }
    }

    /// Sum of the mutually exclusive categories (100 ± rounding once a
    /// baseline exists, 0 otherwise)
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Whether every category is exactly zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Load averages from `/proc/loadavg`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadAverage {
    /// 1-minute load average
    pub one: f64,
    /// 5-minute load average
    pub five: f64,
    /// 15-minute load average
    pub fifteen: f64,
}

/// Scheduler entity counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessCounts {
    /// Currently runnable
    pub running: u32,
    /// Total existing
    pub total: u32,
}

/// Memory and swap figures in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// `MemTotal`
    pub total: u64,
    /// `MemFree`
    pub free: u64,
    /// `Buffers`
    pub buffers: u64,
    /// `Cached`
    pub cached: u64,
    /// `SwapTotal`
    pub swap_total: u64,
    /// `SwapFree`
    pub swap_free: u64,
}

impl MemoryInfo {
    /// Memory in use by applications: total minus free, buffers and cache
    #[must_use]
    pub fn used(&self) -> u64 {
        self.total
            .saturating_sub(self.free)
            .saturating_sub(self.buffers)
            .saturating_sub(self.cached)
    }

    /// Swap in use
    #[must_use]
    pub fn swap_used(&self) -> u64 {
        self.swap_total.saturating_sub(self.swap_free)
    }
}

/// Usage of one mounted filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemInfo {
    /// Where the filesystem is mounted
    pub mount_point: String,
    /// Used bytes
    pub used: u64,
    /// Free bytes (total minus used)
    pub free: u64,
}

impl FilesystemInfo {
    /// Total size in bytes
    #[must_use]
    pub fn total(&self) -> u64 {
        self.used + self.free
    }
}

/// Addresses and cumulative byte counters of one interface
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkInterfaceInfo {
    /// First IPv4 address in CIDR form, empty when unassigned
    pub ipv4: String,
    /// First IPv6 address in CIDR form, empty when unassigned
    pub ipv6: String,
    /// Received bytes since boot
    pub rx_bytes: u64,
    /// Transmitted bytes since boot
    pub tx_bytes: u64,
}

/// Result of one successful poll of one target
///
/// Interfaces are keyed by name in a sorted map so presentation order is
/// always lexicographic. Non-essential statistics that could not be
/// collected hold their default value and have an entry in `issues`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Display name of the polled target (`user@host:port`)
    pub target: String,
    /// Hostname reported by the target
    pub hostname: String,
    /// Seconds since boot
    pub uptime_secs: f64,
    /// Load averages
    pub load: LoadAverage,
    /// CPU breakdown since the previous successful poll
    pub cpu: CpuPercentages,
    /// Process counts
    pub processes: ProcessCounts,
    /// Memory and swap
    pub memory: MemoryInfo,
    /// Mounted filesystems
    pub filesystems: Vec<FilesystemInfo>,
    /// Interfaces by name
    pub interfaces: BTreeMap<String, NetworkInterfaceInfo>,
    /// Statistics that degraded, with the reason
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub issues: BTreeMap<Statistic, String>,
    /// When the poll completed
    pub collected_at: DateTime<Utc>,
}

impl StatsSnapshot {
    /// Uptime as a duration, whole seconds
    #[must_use]
    pub fn uptime(&self) -> Duration {
        Duration::from_secs(self.uptime_secs.max(0.0) as u64)
    }

    /// Returns the collection error recorded for `statistic`, if any
    #[must_use]
    pub fn issue(&self, statistic: Statistic) -> Option<&str> {
        self.issues.get(&statistic).map(String::as_str)
    }

    /// Interface names in presentation order
    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }
}
