//! Poller behavior across healthy, failing and hanging targets

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sshstat_core::error::{ErrorKind, PollError, SessionError, SessionResult};
use sshstat_core::models::{RawCpuCounters, Statistic, Target, TargetId};
use sshstat_core::monitoring::commands::{
    ADDRESSES_COMMAND, CPU_COMMAND, FILESYSTEMS_COMMAND, HOSTNAME_COMMAND, LOADAVG_COMMAND,
    MEMINFO_COMMAND, NET_DEV_COMMAND, UPTIME_COMMAND,
};
use sshstat_core::monitoring::{
    Connector, PollSettings, Poller, RemoteSession, TargetRegistry,
};

const MEMINFO: &str = "MemTotal: 8000 kB\nMemFree: 2000 kB\nBuffers: 500 kB\nCached: 1500 kB\nSwapTotal: 1000 kB\nSwapFree: 750 kB\n";
const DF: &str = "Filesystem 1024-blocks Used Available Capacity Mounted on\n/dev/sda1 1000 400 600 40% /\ntmpfs 0 0 0 - /dev/shm\n";
const NET_DEV: &str = "Inter-| Receive | Transmit\n face |bytes packets|bytes packets\n  wlan0: 10 0 0 0 0 0 0 0 20 0 0 0 0 0 0 0\n  eth0: 30 0 0 0 0 0 0 0 40 0 0 0 0 0 0 0\n    lo: 50 0 0 0 0 0 0 0 50 0 0 0 0 0 0 0\n";
const ADDRS: &str = "1: lo    inet 127.0.0.1/8 scope host lo\n2: eth0    inet 10.0.0.5/24 brd 10.0.0.255 scope global eth0\n2: eth0    inet6 fe80::1/64 scope link\n";

/// How a fake host behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Healthy,
    Unreachable,
    Hang,
    FailCommand(&'static str),
    /// The command prints its normal output but exits non-zero
    FailAfterOutput(&'static str),
    DropConnection(&'static str),
}

#[derive(Default)]
struct FakeState {
    behaviors: HashMap<String, Behavior>,
    cpu_lines: HashMap<String, VecDeque<String>>,
}

#[derive(Clone, Default)]
struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    fn set(&self, host: &str, behavior: Behavior) {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .insert(host.to_string(), behavior);
    }

    fn push_cpu(&self, host: &str, line: &str) {
        self.state
            .lock()
            .unwrap()
            .cpu_lines
            .entry(host.to_string())
            .or_default()
            .push_back(line.to_string());
    }

    fn behavior(&self, host: &str) -> Behavior {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .get(host)
            .copied()
            .unwrap_or(Behavior::Healthy)
    }
}

struct FakeSession {
    host: String,
    behavior: Behavior,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, target: &Target) -> SessionResult<Box<dyn RemoteSession>> {
        match self.behavior(&target.host) {
            Behavior::Unreachable => Err(SessionError::Unreachable {
                target: target.display_name(),
                reason: "Connection refused".to_string(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("poll should have timed out")
            }
            behavior => Ok(Box::new(FakeSession {
                host: target.host.clone(),
                behavior,
                state: Arc::clone(&self.state),
            })),
        }
    }
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn run(&self, command: &str) -> SessionResult<String> {
        match self.behavior {
            Behavior::FailCommand(failing) if failing == command => {
                return Err(SessionError::CommandFailed {
                    command: command.to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "permission denied".to_string(),
                    stdout: String::new(),
                });
            }
            Behavior::DropConnection(failing) if failing == command => {
                return Err(SessionError::Unreachable {
                    target: self.host.clone(),
                    reason: "Connection reset by peer".to_string(),
                });
            }
            _ => {}
        }

        let output = match command {
            HOSTNAME_COMMAND => format!("{}.example.com\n", self.host),
            UPTIME_COMMAND => "3600.25 7000.00\n".to_string(),
            LOADAVG_COMMAND => "0.50 0.40 0.30 2/150 4242\n".to_string(),
            MEMINFO_COMMAND => MEMINFO.to_string(),
            CPU_COMMAND => {
                let mut state = self.state.lock().unwrap();
                let queue = state.cpu_lines.entry(self.host.clone()).or_default();
                let line = if queue.len() > 1 {
                    queue.pop_front().unwrap_or_default()
                } else {
                    queue.front().cloned().unwrap_or_default()
                };
                format!("{line}\nintr 1 2 3\n")
            }
            FILESYSTEMS_COMMAND => DF.to_string(),
            NET_DEV_COMMAND => NET_DEV.to_string(),
            ADDRESSES_COMMAND => ADDRS.to_string(),
            other => panic!("unexpected command {other}"),
        };
        if matches!(self.behavior, Behavior::FailAfterOutput(failing) if failing == command) {
            return Err(SessionError::CommandFailed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "df: /mnt/fuse: Operation not permitted".to_string(),
                stdout: output,
            });
        }
        Ok(output)
    }

    async fn close(self: Box<Self>) {}
}

fn poller(hosts: &[&str], connector: &FakeConnector, settings: PollSettings) -> Poller {
    let registry: TargetRegistry = hosts
        .iter()
        .map(|h| Target::new("root", *h, 22))
        .collect();
    Poller::new(Arc::new(registry), Arc::new(connector.clone()), settings)
}

#[tokio::test]
async fn test_one_unreachable_target_does_not_abort_batch() {
    let connector = FakeConnector::default();
    for host in ["a", "b", "c"] {
        connector.push_cpu(host, "cpu 100 0 200 600 10 0 5 0");
    }
    connector.set("b", Behavior::Unreachable);

    let batch = poller(&["a", "b", "c"], &connector, PollSettings::default())
        .poll_all()
        .await;

    assert_eq!(batch.total(), 3);
    assert_eq!(batch.succeeded(), 2);
    let ids: Vec<TargetId> = batch.outcomes.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![TargetId(0), TargetId(1), TargetId(2)]);

    let failed = &batch.outcomes[1];
    assert_eq!(failed.target, "root@b:22");
    assert_eq!(failed.error().unwrap().kind(), ErrorKind::Connection);
    assert!(batch.outcomes[0].is_success());
    assert!(batch.outcomes[2].is_success());
}

#[tokio::test]
async fn test_snapshot_contents() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 100 0 200 600 10 0 5 0");

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let outcome = poller.poll(TargetId(0)).await;
    let snapshot = outcome.snapshot().unwrap();

    assert_eq!(snapshot.target, "root@db1:22");
    assert_eq!(snapshot.hostname, "db1.example.com");
    assert_eq!(snapshot.uptime().as_secs(), 3600);
    assert!((snapshot.load.one - 0.5).abs() < f64::EPSILON);
    assert_eq!(snapshot.processes.running, 2);
    assert_eq!(snapshot.processes.total, 150);
    assert_eq!(snapshot.memory.used(), 4000 * 1024);
    assert_eq!(snapshot.memory.swap_free, 750 * 1024);
    assert_eq!(snapshot.filesystems.len(), 1);
    assert_eq!(snapshot.filesystems[0].mount_point, "/");

    let names: Vec<&str> = snapshot.interface_names().collect();
    assert_eq!(names, vec!["eth0", "lo", "wlan0"]);
    assert_eq!(snapshot.interfaces["eth0"].ipv4, "10.0.0.5/24");
    assert_eq!(snapshot.interfaces["eth0"].ipv6, "fe80::1/64");
    assert_eq!(snapshot.interfaces["eth0"].rx_bytes, 30);
    assert!(snapshot.interfaces["wlan0"].ipv4.is_empty());
    assert!(snapshot.issues.is_empty());
}

#[tokio::test]
async fn test_first_poll_zero_then_delta() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 100 0 200 600 10 0 5 0");
    connector.push_cpu("db1", "cpu 200 0 400 1200 20 0 10 0");

    let poller = poller(&["db1"], &connector, PollSettings::default());

    let first = poller.poll(TargetId(0)).await;
    assert!(first.snapshot().unwrap().cpu.is_zero());

    let second = poller.poll(TargetId(0)).await;
    let cpu = second.snapshot().unwrap().cpu;
    assert!((cpu.user - 10.93).abs() < 0.001);
    assert!((cpu.idle - 65.57).abs() < 0.001);
    assert!((cpu.sum() - 100.0).abs() < 0.1);
}

#[tokio::test]
async fn test_failure_leaves_carried_state_untouched() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 100 0 100 800 0 0 0 0");
    connector.push_cpu("db1", "cpu 200 0 200 1600 0 0 0 0");

    let poller = poller(&["db1"], &connector, PollSettings::default());
    assert!(poller.poll(TargetId(0)).await.is_success());
    let baseline = poller.registry().last_cpu(TargetId(0)).await.unwrap();
    assert_eq!(baseline.user, 100);

    connector.set("db1", Behavior::Unreachable);
    let failed = poller.poll(TargetId(0)).await;
    assert!(failed.error().unwrap().is_connection_error());
    assert_eq!(poller.registry().last_cpu(TargetId(0)).await, Some(baseline));

    connector.set("db1", Behavior::Healthy);
    let recovered = poller.poll(TargetId(0)).await;
    let cpu = recovered.snapshot().unwrap().cpu;
    assert!((cpu.user - 10.0).abs() < f64::EPSILON);
    assert!((cpu.idle - 80.0).abs() < f64::EPSILON);
    assert_eq!(
        poller.registry().last_cpu(TargetId(0)).await.map(|c| c.user),
        Some(200)
    );
}

#[tokio::test]
async fn test_counter_reset_reports_zero_and_rebaselines() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 5000 0 5000 90000 0 0 0 0");
    connector.push_cpu("db1", "cpu 10 0 10 80 0 0 0 0");
    connector.push_cpu("db1", "cpu 20 0 20 160 0 0 0 0");

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let _ = poller.poll(TargetId(0)).await;

    let after_reboot = poller.poll(TargetId(0)).await;
    assert!(after_reboot.snapshot().unwrap().cpu.is_zero());

    let next = poller.poll(TargetId(0)).await;
    let cpu = next.snapshot().unwrap().cpu;
    assert!((cpu.idle - 80.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_hanging_target_times_out() {
    let connector = FakeConnector::default();
    connector.push_cpu("fast", "cpu 1 1 1 1 1 1 1 0");
    connector.set("slow", Behavior::Hang);

    let settings = PollSettings::default().with_timeout_secs(1);
    let batch = poller(&["slow", "fast"], &connector, settings)
        .poll_all()
        .await;

    assert_eq!(batch.total(), 2);
    assert_eq!(
        batch.outcomes[0].error(),
        Some(&PollError::TimedOut(Duration::from_secs(1)))
    );
    assert!(batch.outcomes[1].is_success());
    assert!(batch.elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn test_non_essential_failure_degrades() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 1 1 1 1 1 1 1 0");
    connector.set("db1", Behavior::FailCommand(FILESYSTEMS_COMMAND));

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let outcome = poller.poll(TargetId(0)).await;
    let snapshot = outcome.snapshot().unwrap();

    assert!(snapshot.filesystems.is_empty());
    assert!(
        snapshot
            .issue(Statistic::Filesystems)
            .unwrap()
            .contains("permission denied")
    );
    assert!(snapshot.issue(Statistic::Memory).is_none());
    assert_eq!(snapshot.memory.total, 8000 * 1024);
}

#[tokio::test]
async fn test_unreadable_mount_keeps_remaining_filesystems() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 1 1 1 1 1 1 1 0");
    connector.set("db1", Behavior::FailAfterOutput(FILESYSTEMS_COMMAND));

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let outcome = poller.poll(TargetId(0)).await;
    let snapshot = outcome.snapshot().unwrap();

    assert_eq!(snapshot.filesystems.len(), 1);
    assert_eq!(snapshot.filesystems[0].mount_point, "/");
    assert!(
        snapshot
            .issue(Statistic::Filesystems)
            .unwrap()
            .contains("Operation not permitted")
    );
}

#[tokio::test]
async fn test_partial_output_of_essential_statistic_still_fails() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 1 1 1 1 1 1 1 0");
    connector.set("db1", Behavior::FailAfterOutput(CPU_COMMAND));

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let outcome = poller.poll(TargetId(0)).await;

    assert_eq!(outcome.error().unwrap().kind(), ErrorKind::Collection);
    assert_eq!(poller.registry().last_cpu(TargetId(0)).await, None);
}

#[tokio::test]
async fn test_essential_failure_fails_poll_without_commit() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 1 1 1 1 1 1 1 0");
    connector.set("db1", Behavior::FailCommand(CPU_COMMAND));

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let outcome = poller.poll(TargetId(0)).await;

    match outcome.error() {
        Some(PollError::Collection { statistic, .. }) => assert_eq!(*statistic, Statistic::Cpu),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(poller.registry().last_cpu(TargetId(0)).await, None);
}

#[tokio::test]
async fn test_connection_lost_mid_poll_fails_poll() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 1 1 1 1 1 1 1 0");
    connector.set("db1", Behavior::DropConnection(NET_DEV_COMMAND));

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let outcome = poller.poll(TargetId(0)).await;

    assert_eq!(outcome.error().unwrap().kind(), ErrorKind::Connection);
    assert_eq!(poller.registry().last_cpu(TargetId(0)).await, None);
}

#[tokio::test]
async fn test_in_flight_poll_makes_target_busy() {
    let connector = FakeConnector::default();
    connector.push_cpu("db1", "cpu 1 1 1 1 1 1 1 0");

    let poller = poller(&["db1"], &connector, PollSettings::default());
    let guard = poller
        .registry()
        .slot(TargetId(0))
        .unwrap()
        .try_begin_poll()
        .unwrap();

    let outcome = poller.poll(TargetId(0)).await;
    assert_eq!(outcome.error(), Some(&PollError::Busy));

    guard.commit(RawCpuCounters::default());
    assert!(poller.poll(TargetId(0)).await.is_success());
}

#[tokio::test]
async fn test_concurrency_cap_still_polls_everything() {
    let connector = FakeConnector::default();
    let hosts = ["h0", "h1", "h2", "h3", "h4"];
    for host in hosts {
        connector.push_cpu(host, "cpu 1 1 1 1 1 1 1 0");
    }

    let settings = PollSettings::default().with_concurrency(2);
    let batch = poller(&hosts, &connector, settings).poll_all().await;

    assert_eq!(batch.total(), 5);
    assert_eq!(batch.succeeded(), 5);
    assert!(!batch.all_failed());
}

#[tokio::test]
async fn test_unknown_target_id() {
    let connector = FakeConnector::default();
    let poller = poller(&["db1"], &connector, PollSettings::default());
    let outcome = poller.poll(TargetId(7)).await;
    assert_eq!(outcome.error().unwrap().kind(), ErrorKind::Configuration);
}
