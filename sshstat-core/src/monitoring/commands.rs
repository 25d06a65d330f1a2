//! The fixed set of read-only commands run on every target
//!
//! Each statistic has its own command so a failure stays scoped to it. The
//! parsers in [`super::parser`] consume exactly these output shapes.

use crate::models::Statistic;

/// One remote command and the statistic it feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCommand {
    /// Statistic produced from the output
    pub statistic: Statistic,
    /// Shell command line executed on the target
    pub command: &'static str,
}

/// Fully-qualified hostname, falling back to the kernel's node name
pub const HOSTNAME_COMMAND: &str = "hostname -f 2>/dev/null || cat /proc/sys/kernel/hostname";
/// `<uptime> <idle>` in seconds
pub const UPTIME_COMMAND: &str = "cat /proc/uptime";
/// `<1m> <5m> <15m> <running>/<total> <last pid>`
pub const LOADAVG_COMMAND: &str = "cat /proc/loadavg";
/// `Key:   value kB` lines
pub const MEMINFO_COMMAND: &str = "cat /proc/meminfo";
/// Kernel CPU accounting
pub const CPU_COMMAND: &str = "cat /proc/stat";
/// POSIX df listing in 1024-byte blocks
pub const FILESYSTEMS_COMMAND: &str = "df -Pk 2>/dev/null";
/// Per-interface counters
pub const NET_DEV_COMMAND: &str = "cat /proc/net/dev";
/// One line per assigned address
pub const ADDRESSES_COMMAND: &str = "ip -o addr show 2>/dev/null";

/// Commands in execution order
pub const COMMAND_SET: [RemoteCommand; 8] = [
    RemoteCommand {
        statistic: Statistic::Hostname,
        command: HOSTNAME_COMMAND,
    },
    RemoteCommand {
        statistic: Statistic::Uptime,
        command: UPTIME_COMMAND,
    },
    RemoteCommand {
        statistic: Statistic::Load,
        command: LOADAVG_COMMAND,
    },
    RemoteCommand {
        statistic: Statistic::Memory,
        command: MEMINFO_COMMAND,
    },
    RemoteCommand {
        statistic: Statistic::Cpu,
        command: CPU_COMMAND,
    },
    RemoteCommand {
        statistic: Statistic::Filesystems,
        command: FILESYSTEMS_COMMAND,
    },
    RemoteCommand {
        statistic: Statistic::Network,
        command: NET_DEV_COMMAND,
    },
    RemoteCommand {
        statistic: Statistic::Addresses,
        command: ADDRESSES_COMMAND,
    },
];
