//! CPU usage from two consecutive readings of the kernel counters
//!
//! The counters in `/proc/stat` are cumulative since boot, so a single
//! reading says nothing about current load. [`cpu_delta`] turns two
//! readings into a percentage breakdown; the poller supplies the previous
//! reading from the registry.

use crate::models::{CpuPercentages, RawCpuCounters};

/// Computes the CPU breakdown between `previous` and `current`
///
/// Each category is `100 * category_delta / total_delta`, rounded to two
/// decimals. All categories are 0 when no time elapsed or any counter went
/// backwards (remote reboot).
#[must_use]
pub fn cpu_delta(previous: &RawCpuCounters, current: &RawCpuCounters) -> CpuPercentages {
    let Some(delta) = current.checked_delta(previous) else {
        tracing::debug!("CPU counters went backwards, treating as reset");
        return CpuPercentages::zero();
    };

    let total = delta.total();
    if total == 0 {
        return CpuPercentages::zero();
    }

    #[allow(clippy::cast_precision_loss)]
    let percent = |ticks: u64| round2(100.0 * ticks as f64 / total as f64);

    CpuPercentages {
        user: percent(delta.user),
        nice: percent(delta.nice),
        system: percent(delta.system),
        idle: percent(delta.idle),
        iowait: percent(delta.iowait),
        irq: percent(delta.irq),
        softirq: percent(delta.softirq),
        steal: percent(delta.steal),
        guest: percent(delta.guest),
    }
}

/// Breakdown for a poll with an optional baseline (zero on the first poll)
#[must_use]
pub fn cpu_since(previous: Option<&RawCpuCounters>, current: &RawCpuCounters) -> CpuPercentages {
    previous.map_or_else(CpuPercentages::zero, |prev| cpu_delta(prev, current))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
