//! Core data types: monitored targets and the statistics collected from them.

mod snapshot;
mod target;

pub use snapshot::{
    CpuPercentages, FilesystemInfo, LoadAverage, MemoryInfo, NetworkInterfaceInfo, ProcessCounts,
    RawCpuCounters, Statistic, StatsSnapshot,
};
pub use target::{DEFAULT_SSH_PORT, Target, TargetId};
