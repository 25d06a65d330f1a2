//! Terminal report formatting.

use std::fmt::{Display, Write as _};

use sshstat_core::models::{Statistic, StatsSnapshot};

/// Moves the cursor home and clears the screen
const ESC_CLEAR: &str = "\x1b[H\x1b[2J";
const ESC_BRIGHT_WHITE: &str = "\x1b[37;1m";
const ESC_RED: &str = "\x1b[31m";
const ESC_RESET: &str = "\x1b[0m";

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// ANSI styling, or plain text when colors are disabled
#[derive(Debug, Clone, Copy)]
pub struct Style {
    color: bool,
}

impl Style {
    /// Creates a style; `color = false` emits no escape sequences at all
    pub const fn new(color: bool) -> Self {
        Self { color }
    }

    /// Highlights a value
    pub fn value(self, value: impl Display) -> String {
        if self.color {
            format!("{ESC_BRIGHT_WHITE}{value}{ESC_RESET}")
        } else {
            value.to_string()
        }
    }

    /// Marks an error
    pub fn error(self, value: impl Display) -> String {
        if self.color {
            format!("{ESC_RED}{value}{ESC_RESET}")
        } else {
            value.to_string()
        }
    }

    /// Screen clear sequence for redraws
    pub const fn clear(self) -> &'static str {
        if self.color { ESC_CLEAR } else { "" }
    }
}

/// Formats a byte count with a binary unit
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b < KIB => format!("{b} bytes"),
        b if b < MIB => format!("{:6.2} KiB", b as f64 / KIB as f64),
        b if b < GIB => format!("{:6.2} MiB", b as f64 / MIB as f64),
        b => format!("{:6.2} GiB", b as f64 / GIB as f64),
    }
}

/// Formats seconds since boot as `N days, HH:MM:SS`
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    let clock = format!("{hours:02}:{minutes:02}:{seconds:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

/// Renders the full report for one snapshot
///
/// Statistics that degraded during collection are replaced by their error.
pub fn render_report(snapshot: &StatsSnapshot, style: Style) -> String {
    let mut out = String::new();
    let issue = |statistic: Statistic| {
        snapshot
            .issue(statistic)
            .map(|msg| format!("    {}\n", style.error(format!("{statistic} unavailable: {msg}"))))
    };

    let uptime = snapshot.issue(Statistic::Uptime).map_or_else(
        || style.value(format_uptime(snapshot.uptime().as_secs())),
        |_| style.error("?"),
    );
    let _ = writeln!(out, "{} up {uptime}\n", style.value(&snapshot.hostname));

    out.push_str("Load:\n");
    if let Some(line) = issue(Statistic::Load) {
        out.push_str(&line);
    } else {
        let load = &snapshot.load;
        let _ = writeln!(
            out,
            "    {}",
            style.value(format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen))
        );
    }
    out.push('\n');

    let cpu = &snapshot.cpu;
    let categories = [
        (cpu.user, "user"),
        (cpu.system, "sys"),
        (cpu.nice, "nice"),
        (cpu.idle, "idle"),
        (cpu.iowait, "iowait"),
        (cpu.irq, "hardirq"),
        (cpu.softirq, "softirq"),
        (cpu.steal, "steal"),
        (cpu.guest, "guest"),
    ];
    let cpu_line = categories
        .iter()
        .map(|(value, name)| format!("{}% {name}", style.value(format!("{value:.2}"))))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "CPU:\n    {cpu_line}\n");

    out.push_str("Processes:\n");
    if let Some(line) = issue(Statistic::Load) {
        out.push_str(&line);
    } else {
        let _ = writeln!(
            out,
            "    {} running of {} total",
            style.value(snapshot.processes.running),
            style.value(snapshot.processes.total)
        );
    }
    out.push('\n');

    out.push_str("Memory:\n");
    if let Some(line) = issue(Statistic::Memory) {
        out.push_str(&line);
    } else {
        let mem = &snapshot.memory;
        let bytes = |b: u64| style.value(format_bytes(b));
        let _ = writeln!(out, "    free    = {}", bytes(mem.free));
        let _ = writeln!(out, "    used    = {}", bytes(mem.used()));
        let _ = writeln!(out, "    buffers = {}", bytes(mem.buffers));
        let _ = writeln!(out, "    cached  = {}", bytes(mem.cached));
        let _ = writeln!(
            out,
            "    swap    = {} free of {}",
            bytes(mem.swap_free),
            bytes(mem.swap_total)
        );
    }
    out.push('\n');

    if let Some(line) = issue(Statistic::Filesystems) {
        out.push_str("Filesystems:\n");
        out.push_str(&line);
        out.push('\n');
    } else if !snapshot.filesystems.is_empty() {
        out.push_str("Filesystems:\n");
        for fs in &snapshot.filesystems {
            let _ = writeln!(
                out,
                "    {}: {} free of {}",
                style.value(format!("{:>8}", fs.mount_point)),
                style.value(format_bytes(fs.free)),
                style.value(format_bytes(fs.total()))
            );
        }
        out.push('\n');
    }

    let net_issues: Vec<String> = [Statistic::Network, Statistic::Addresses]
        .into_iter()
        .filter_map(issue)
        .collect();
    if !snapshot.interfaces.is_empty() || !net_issues.is_empty() {
        out.push_str("Network Interfaces:\n");
        for line in &net_issues {
            out.push_str(line);
        }
        for (name, info) in &snapshot.interfaces {
            let _ = write!(out, "    {} - {}", style.value(name), style.value(&info.ipv4));
            if info.ipv6.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, ", {}", style.value(&info.ipv6));
            }
            let _ = writeln!(
                out,
                "      rx = {}, tx = {}\n",
                style.value(format_bytes(info.rx_bytes)),
                style.value(format_bytes(info.tx_bytes))
            );
        }
    }

    out
}

/// Renders one failed poll as a single line
pub fn render_failure(target: &str, error: impl Display, style: Style) -> String {
    format!("{}: {}\n", style.value(target), style.error(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sshstat_core::models::{
        CpuPercentages, FilesystemInfo, LoadAverage, MemoryInfo, NetworkInterfaceInfo,
        ProcessCounts,
    };
    use std::collections::BTreeMap;

    fn snapshot() -> StatsSnapshot {
        let mut interfaces = BTreeMap::new();
        interfaces.insert(
            "wlan0".to_string(),
            NetworkInterfaceInfo {
                ipv4: "192.168.1.4/24".into(),
                ..NetworkInterfaceInfo::default()
            },
        );
        interfaces.insert(
            "eth0".to_string(),
            NetworkInterfaceInfo {
                ipv4: "10.0.0.5/24".into(),
                ipv6: "fe80::1/64".into(),
                rx_bytes: 2048,
                tx_bytes: 512,
            },
        );
        StatsSnapshot {
            target: "root@db1:22".into(),
            hostname: "db1.example.com".into(),
            uptime_secs: 90_061.0,
            load: LoadAverage {
                one: 0.5,
                five: 0.25,
                fifteen: 0.1,
            },
            cpu: CpuPercentages {
                user: 10.93,
                idle: 89.07,
                ..CpuPercentages::zero()
            },
            processes: ProcessCounts {
                running: 2,
                total: 180,
            },
            memory: MemoryInfo {
                total: 4 * GIB,
                free: GIB,
                buffers: 0,
                cached: GIB,
                swap_total: 0,
                swap_free: 0,
            },
            filesystems: vec![FilesystemInfo {
                mount_point: "/".into(),
                used: GIB,
                free: GIB,
            }],
            interfaces,
            issues: BTreeMap::new(),
            collected_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "  2.00 KiB");
        assert_eq!(format_bytes(3 * MIB / 2), "  1.50 MiB");
        assert_eq!(format_bytes(10 * GIB), " 10.00 GiB");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(59), "00:00:59");
        assert_eq!(format_uptime(90_061), "1 day, 01:01:01");
        assert_eq!(format_uptime(3 * 86_400 + 7200), "3 days, 02:00:00");
    }

    #[test]
    fn test_plain_report() {
        let report = render_report(&snapshot(), Style::new(false));
        assert!(report.starts_with("db1.example.com up 1 day, 01:01:01\n"));
        assert!(report.contains("    0.50 0.25 0.10\n"));
        assert!(report.contains("10.93% user, 0.00% sys"));
        assert!(report.contains("    2 running of 180 total\n"));
        assert!(report.contains("    used    =   2.00 GiB\n"));
        assert!(report.contains("           /:   1.00 GiB free of   2.00 GiB\n"));
        assert!(!report.contains('\x1b'));

        let eth0 = report.find("eth0 - 10.0.0.5/24, fe80::1/64").unwrap();
        let wlan0 = report.find("wlan0 - 192.168.1.4/24\n").unwrap();
        assert!(eth0 < wlan0);
        assert!(report.contains("rx =   2.00 KiB, tx = 512 bytes"));
    }

    #[test]
    fn test_report_shows_issues_inline() {
        let mut snap = snapshot();
        snap.filesystems.clear();
        snap.issues
            .insert(Statistic::Filesystems, "df: command not found".into());
        let report = render_report(&snap, Style::new(false));
        assert!(report.contains("Filesystems:\n    filesystems unavailable: df: command not found\n"));
    }

    #[test]
    fn test_colored_output() {
        let style = Style::new(true);
        assert_eq!(style.value("x"), "\x1b[37;1mx\x1b[0m");
        assert_eq!(style.error("x"), "\x1b[31mx\x1b[0m");
        assert_eq!(style.clear(), "\x1b[H\x1b[2J");
        assert_eq!(Style::new(false).clear(), "");
    }

    #[test]
    fn test_render_failure() {
        assert_eq!(
            render_failure("root@db2:22", "unreachable", Style::new(false)),
            "root@db2:22: unreachable\n"
        );
    }
}
