//! Remote statistics collection engine
//!
//! Agentless: every statistic comes from reading `/proc/*`, `df` and `ip`
//! output over SSH. The pieces, in data-flow order:
//!
//! - [`session`]: connects to a target and runs commands
//! - [`commands`]: the fixed command set, one per statistic
//! - [`SnapshotParser`]: turns command output into typed values
//! - [`cpu`]: CPU percentages from two counter readings
//! - [`registry`]: targets and their carried CPU counters
//! - [`poller`]: drives all of the above per target and across targets

pub mod commands;
pub mod cpu;
mod parser;
pub mod poller;
pub mod registry;
pub mod session;
mod settings;

pub use commands::{COMMAND_SET, RemoteCommand};
pub use cpu::{cpu_delta, cpu_since};
pub use parser::SnapshotParser;
pub use poller::{PollBatch, PollOutcome, Poller};
pub use registry::{PollGuard, SlotHandle, TargetRegistry};
pub use session::{Connector, RemoteSession, SessionConfig, SshConnector, SshSession};
pub use settings::{HostKeyPolicy, PollSettings};
