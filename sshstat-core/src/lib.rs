//! `sshstat` Core Library
//!
//! Agentless telemetry for remote Linux hosts: connects over SSH, reads
//! `/proc` and friends, and turns the output into typed snapshots.
//!
//! # Crate Structure
//!
//! - [`models`] - Targets and snapshot data structures
//! - [`monitoring`] - Session client, parsers, CPU delta, registry and poller
//! - [`exposition`] - Gauge samples and text exposition for the metrics endpoint
//! - [`config`] - Settings, target lists and key resolution
//! - [`error`] - Error taxonomy
//! - [`tracing`] - Logging setup and span names

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod exposition;
pub mod models;
pub mod monitoring;
pub mod tracing;

pub use config::{AppSettings, ConfigManager, MetricsSettings, TargetList, parse_target_spec, resolve_identity};
pub use error::{
    ConfigError, ConfigResult, ErrorKind, ParseError, ParseResult, PollError, SessionError,
    SessionResult, SshstatError,
};
pub use exposition::{MetricSample, batch_samples, render_text};
pub use models::{
    CpuPercentages, FilesystemInfo, LoadAverage, MemoryInfo, NetworkInterfaceInfo, ProcessCounts,
    RawCpuCounters, Statistic, StatsSnapshot, Target, TargetId,
};
pub use monitoring::{
    Connector, HostKeyPolicy, PollBatch, PollOutcome, PollSettings, Poller, RemoteSession,
    SessionConfig, SshConnector, TargetRegistry, cpu_delta,
};
pub use tracing::{TracingConfig, TracingError, TracingLevel, TracingOutput, init_tracing};
