//! Property tests for the snapshot parsers

use proptest::prelude::*;
use sshstat_core::models::MemoryInfo;
use sshstat_core::monitoring::SnapshotParser;

proptest! {
    /// Property: used memory matches the formula and never underflows
    #[test]
    fn memory_used_is_never_negative(
        total in 0u64..1_000_000_000,
        free in 0u64..1_000_000_000,
        buffers in 0u64..1_000_000_000,
        cached in 0u64..1_000_000_000,
    ) {
        let mem = MemoryInfo { total, free, buffers, cached, ..MemoryInfo::default() };
        let used = mem.used();
        prop_assert!(used <= total);
        if free + buffers + cached <= total {
            prop_assert_eq!(used, total - free - buffers - cached);
        }
    }

    /// Property: meminfo kB figures are scaled to bytes
    #[test]
    fn meminfo_scales_kilobytes(total in 1u64..100_000_000, free in 0u64..100_000_000) {
        let text = format!("MemTotal: {total} kB\nMemFree: {free} kB\n");
        let mem = SnapshotParser::parse_meminfo(&text).unwrap();
        prop_assert_eq!(mem.total, total * 1024);
        prop_assert_eq!(mem.free, free * 1024);
    }

    /// Property: interfaces come out sorted by name regardless of input order
    #[test]
    fn interfaces_are_sorted(names in prop::collection::hash_set("[a-z]{1,6}[0-9]{0,2}", 1..12)) {
        let text: String = names
            .iter()
            .map(|n| format!("{n}: 1 0 0 0 0 0 0 0 2 0 0 0 0 0 0 0\n"))
            .collect();
        let interfaces = SnapshotParser::parse_net_dev(&text);
        let parsed: Vec<&String> = interfaces.keys().collect();
        let mut expected: Vec<&String> = names.iter().collect();
        expected.sort();
        prop_assert_eq!(parsed, expected);
    }

    /// Property: every well-formed df row gives one entry with used + free = total
    #[test]
    fn df_rows_preserve_total(
        rows in prop::collection::vec((1u64..1_000_000_000, 0u64..=100), 1..10),
    ) {
        let mut text = String::from("Filesystem 1024-blocks Used Available Capacity Mounted on\n");
        for (i, (total, pct)) in rows.iter().enumerate() {
            let used = total * pct / 100;
            text.push_str(&format!("/dev/sd{i} {total} {used} {} {pct}% /mnt/d{i}\n", total - used));
            text.push_str(&format!("tmpfs{i} 0 0 0 - /run/t{i}\n"));
        }
        let filesystems = SnapshotParser::parse_filesystems(&text);
        prop_assert_eq!(filesystems.len(), rows.len());
        for (fs, (total, _)) in filesystems.iter().zip(&rows) {
            prop_assert_eq!(fs.total(), total * 1024);
        }
    }

    /// Property: the aggregate cpu line is parsed regardless of surrounding lines
    #[test]
    fn cpu_line_found_among_per_core_lines(values in prop::array::uniform8(0u64..u64::from(u32::MAX)), cores in 0usize..8) {
        let mut text = String::new();
        for core in 0..cores {
            text.push_str(&format!("cpu{core} 9 9 9 9 9 9 9 9\n"));
        }
        text.push_str(&format!(
            "cpu  {} {} {} {} {} {} {} {}\nintr 1 2 3\n",
            values[0], values[1], values[2], values[3], values[4], values[5], values[6], values[7]
        ));
        let raw = SnapshotParser::parse_cpu(&text).unwrap();
        prop_assert_eq!(raw.user, values[0]);
        prop_assert_eq!(raw.idle, values[3]);
        prop_assert_eq!(raw.steal, values[7]);
    }
}
