//! Property tests for the CPU delta calculator

use proptest::prelude::*;
use sshstat_core::models::RawCpuCounters;
use sshstat_core::monitoring::{cpu_delta, cpu_since};

fn counters_strategy() -> impl Strategy<Value = RawCpuCounters> {
    prop::array::uniform9(0u64..1_000_000_000).prop_map(|v| RawCpuCounters {
        user: v[0],
        nice: v[1],
        system: v[2],
        idle: v[3],
        iowait: v[4],
        irq: v[5],
        softirq: v[6],
        steal: v[7],
        guest: v[8].min(v[0]),
    })
}

fn add(base: &RawCpuCounters, inc: &RawCpuCounters) -> RawCpuCounters {
    RawCpuCounters {
        user: base.user + inc.user,
        nice: base.nice + inc.nice,
        system: base.system + inc.system,
        idle: base.idle + inc.idle,
        iowait: base.iowait + inc.iowait,
        irq: base.irq + inc.irq,
        softirq: base.softirq + inc.softirq,
        steal: base.steal + inc.steal,
        guest: base.guest + inc.guest,
    }
}

proptest! {
    /// Property: with increasing counters the categories sum to 100 within rounding
    #[test]
    fn percentages_sum_to_hundred(
        previous in counters_strategy(),
        increment in counters_strategy(),
    ) {
        prop_assume!(increment.total() > 0);
        let cpu = cpu_delta(&previous, &add(&previous, &increment));
        prop_assert!((cpu.sum() - 100.0).abs() <= 0.1, "sum was {}", cpu.sum());
    }

    /// Property: no category is ever negative or above 100
    #[test]
    fn percentages_are_bounded(
        previous in counters_strategy(),
        increment in counters_strategy(),
    ) {
        let cpu = cpu_delta(&previous, &add(&previous, &increment));
        for value in [cpu.user, cpu.nice, cpu.system, cpu.idle, cpu.iowait, cpu.irq, cpu.softirq, cpu.steal, cpu.guest] {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    /// Property: any decreasing counter yields all zeros
    #[test]
    fn decrease_is_treated_as_reset(
        current in counters_strategy(),
        bump in 1u64..1_000,
    ) {
        let previous = RawCpuCounters { idle: current.idle + bump, ..current };
        prop_assert!(cpu_delta(&previous, &current).is_zero());
    }

    /// Property: the first poll of a target reports zero in every category
    #[test]
    fn first_poll_is_zero(current in counters_strategy()) {
        prop_assert!(cpu_since(None, &current).is_zero());
    }

    /// Property: values carry at most two decimals
    #[test]
    fn values_are_rounded(
        previous in counters_strategy(),
        increment in counters_strategy(),
    ) {
        let cpu = cpu_delta(&previous, &add(&previous, &increment));
        let scaled = cpu.user * 100.0;
        prop_assert!((scaled - scaled.round()).abs() < 1e-6);
    }
}
