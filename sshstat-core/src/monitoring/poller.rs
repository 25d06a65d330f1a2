//! Polling of registered targets
//!
//! A poll opens one session, runs the command set in order, parses every
//! output, and then applies the CPU delta against the target's carried
//! counters. The delta is computed before the new counters are committed,
//! and nothing is committed unless the whole poll succeeded.
//!
//! [`Poller::poll_all`] fans out one task per target with an optional
//! concurrency cap. Every task is bounded by the per-target timeout, so a
//! batch always completes with exactly one outcome per target.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::instrument;

use super::commands::COMMAND_SET;
use super::cpu::cpu_since;
use super::parser::SnapshotParser;
use super::registry::{SlotHandle, TargetRegistry};
use super::session::{Connector, RemoteSession};
use super::settings::PollSettings;
use crate::error::{ParseResult, PollError};
use crate::models::{CpuPercentages, RawCpuCounters, Statistic, StatsSnapshot, Target, TargetId};

/// Upper bound for tearing down a session after a poll
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of polling one target
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Slot that was polled
    pub id: TargetId,
    /// Display name of the target
    pub target: String,
    /// Snapshot or the reason there is none
    pub result: Result<StatsSnapshot, PollError>,
    /// Wall time spent on this target
    pub elapsed: Duration,
}

impl PollOutcome {
    /// Whether a snapshot was produced
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The snapshot, if the poll succeeded
    #[must_use]
    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        self.result.as_ref().ok()
    }

    /// The error, if the poll failed
    #[must_use]
    pub fn error(&self) -> Option<&PollError> {
        self.result.as_ref().err()
    }
}

/// Outcomes of one poll-all sweep, ordered by target id
#[derive(Debug, Clone, Default)]
pub struct PollBatch {
    /// One outcome per registered target
    pub outcomes: Vec<PollOutcome>,
    /// Wall time of the whole sweep
    pub elapsed: Duration,
}

impl PollBatch {
    /// Number of targets polled
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of successful polls
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed polls
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Whether there was at least one target and none succeeded
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    /// Successful snapshots in target order
    pub fn snapshots(&self) -> impl Iterator<Item = &StatsSnapshot> {
        self.outcomes.iter().filter_map(PollOutcome::snapshot)
    }
}

/// Polls the targets of a registry through a connector
pub struct Poller {
    registry: Arc<TargetRegistry>,
    connector: Arc<dyn Connector>,
    settings: PollSettings,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("targets", &self.registry.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Creates a poller over `registry`
    #[must_use]
    pub fn new(
        registry: Arc<TargetRegistry>,
        connector: Arc<dyn Connector>,
        settings: PollSettings,
    ) -> Self {
        Self {
            registry,
            connector,
            settings,
        }
    }

    /// The polled registry
    #[must_use]
    pub const fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    /// Settings applied to every poll
    #[must_use]
    pub const fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Polls a single target
    pub async fn poll(&self, id: TargetId) -> PollOutcome {
        let Some(slot) = self.registry.slot(id) else {
            return PollOutcome {
                id,
                target: id.to_string(),
                result: Err(PollError::Config(format!("unknown target {id}"))),
                elapsed: Duration::ZERO,
            };
        };
        poll_slot(
            slot.clone(),
            Arc::clone(&self.connector),
            self.settings.effective_timeout(),
        )
        .await
    }

    /// Polls every registered target concurrently
    ///
    /// Returns one outcome per target, sorted by id. A failing, hanging or
    /// panicking target only affects its own outcome.
    #[instrument(name = "poll.all", skip(self), fields(targets = self.registry.len()))]
    pub async fn poll_all(&self) -> PollBatch {
        let start = Instant::now();
        let timeout = self.settings.effective_timeout();
        let concurrency = self.settings.effective_concurrency(self.registry.len());

        let mut outcomes: Vec<PollOutcome> = stream::iter(self.registry.slots().cloned())
            .map(|slot| {
                let connector = Arc::clone(&self.connector);
                async move {
                    let id = slot.id();
                    let target = slot.target().display_name();
                    match tokio::spawn(poll_slot(slot, connector, timeout)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(target_name = %target, error = %e, "Poll task failed");
                            PollOutcome {
                                id,
                                target,
                                result: Err(PollError::TaskFailed(e.to_string())),
                                elapsed: start.elapsed(),
                            }
                        }
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|o| o.id);

        let batch = PollBatch {
            outcomes,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            total = batch.total(),
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            duration_ms = u64::try_from(batch.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Poll sweep completed"
        );
        batch
    }
}

#[instrument(name = "poll.target", skip_all, fields(target_name = %slot.target()))]
async fn poll_slot(slot: SlotHandle, connector: Arc<dyn Connector>, timeout: Duration) -> PollOutcome {
    let start = Instant::now();
    let result = match slot.try_begin_poll() {
        Ok(guard) => {
            match tokio::time::timeout(timeout, collect(connector.as_ref(), slot.target())).await {
                Ok(Ok((mut snapshot, raw))) => {
                    snapshot.cpu = cpu_since(guard.previous(), &raw);
                    guard.commit(raw);
                    Ok(snapshot)
                }
                Ok(Err(e)) => Err(e),
                Err(_) => Err(PollError::TimedOut(timeout)),
            }
        }
        Err(e) => Err(e),
    };

    let elapsed = start.elapsed();
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match &result {
        Ok(_) => tracing::debug!(duration_ms, "Poll succeeded"),
        Err(e) => tracing::warn!(duration_ms, kind = %e.kind(), error = %e, "Poll failed"),
    }

    PollOutcome {
        id: slot.id(),
        target: slot.target().display_name(),
        result,
        elapsed,
    }
}

/// Connects, collects and closes; CPU percentages are left at zero
async fn collect(
    connector: &dyn Connector,
    target: &Target,
) -> Result<(StatsSnapshot, RawCpuCounters), PollError> {
    let session = connector.connect(target).await?;
    let result = collect_from(session.as_ref(), target).await;
    if tokio::time::timeout(CLOSE_TIMEOUT, session.close()).await.is_err() {
        tracing::debug!("Session close timed out");
    }
    result
}

async fn collect_from(
    session: &dyn RemoteSession,
    target: &Target,
) -> Result<(StatsSnapshot, RawCpuCounters), PollError> {
    let mut outputs: BTreeMap<Statistic, String> = BTreeMap::new();
    let mut issues: BTreeMap<Statistic, String> = BTreeMap::new();

    for entry in COMMAND_SET {
        match session.run(entry.command).await {
            Ok(output) => {
                outputs.insert(entry.statistic, output);
            }
            Err(e) => {
                let partial = e.partial_output().map(str::to_string);
                let err = PollError::from_command(e, entry.statistic);
                if entry.statistic.is_essential() || err.is_connection_error() {
                    return Err(err);
                }
                tracing::warn!(statistic = %entry.statistic, error = %err, "Statistic unavailable");
                issues.insert(entry.statistic, err.to_string());
                // Rows printed before the failure are still usable
                if let Some(partial) = partial {
                    outputs.insert(entry.statistic, partial);
                }
            }
        }
    }

    let output = |statistic: Statistic| outputs.get(&statistic).map(String::as_str);

    let hostname = SnapshotParser::parse_hostname(output(Statistic::Hostname).unwrap_or_default())?;
    let raw_cpu = SnapshotParser::parse_cpu(output(Statistic::Cpu).unwrap_or_default())?;

    let uptime_secs = degrade(&mut issues, output(Statistic::Uptime), SnapshotParser::parse_uptime);
    let load = degrade(&mut issues, output(Statistic::Load), SnapshotParser::parse_loadavg);
    let processes = degrade(
        &mut issues,
        output(Statistic::Load),
        SnapshotParser::parse_process_counts,
    );
    let memory = degrade(&mut issues, output(Statistic::Memory), SnapshotParser::parse_meminfo);

    let filesystems = output(Statistic::Filesystems)
        .map(SnapshotParser::parse_filesystems)
        .unwrap_or_default();
    let counters = output(Statistic::Network)
        .map(SnapshotParser::parse_net_dev)
        .unwrap_or_default();
    let addresses = output(Statistic::Addresses)
        .map(SnapshotParser::parse_addresses)
        .unwrap_or_default();

    let snapshot = StatsSnapshot {
        target: target.display_name(),
        hostname,
        uptime_secs,
        load,
        cpu: CpuPercentages::zero(),
        processes,
        memory,
        filesystems,
        interfaces: SnapshotParser::merge_interfaces(counters, addresses),
        issues,
        collected_at: Utc::now(),
    };
    Ok((snapshot, raw_cpu))
}

/// Parses a non-essential statistic, recording an issue instead of failing
fn degrade<T: Default>(
    issues: &mut BTreeMap<Statistic, String>,
    output: Option<&str>,
    parse: impl FnOnce(&str) -> ParseResult<T>,
) -> T {
    let Some(output) = output else {
        return T::default();
    };
    match parse(output) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(statistic = %e.statistic, error = %e.reason, "Unparseable statistic");
            issues.entry(e.statistic).or_insert_with(|| e.to_string());
            T::default()
        }
    }
}
