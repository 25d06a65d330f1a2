//! SSH session client
//!
//! Commands run through the system `ssh` binary. [`SshConnector::connect`]
//! starts an OpenSSH control master for the target, authenticated once with
//! a private key; every [`RemoteSession::run`] afterwards is multiplexed over
//! that one connection. The master is torn down by [`RemoteSession::close`],
//! or on drop if the session is abandoned mid-poll.
//!
//! The [`Connector`] and [`RemoteSession`] traits are the seam the poller
//! depends on, so tests can substitute an in-memory transport.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::instrument;

use super::settings::{HostKeyPolicy, PollSettings};
use crate::error::{SessionError, SessionResult};
use crate::models::Target;

/// Exit status `ssh` uses for its own failures (connect, auth, host key)
const SSH_ERROR_STATUS: i32 = 255;

/// Extra time the control master outlives the connect timeout when idle
const CONTROL_PERSIST_SLACK_SECS: u64 = 30;

/// Distinguishes control sockets of sessions within one process
static CONTROL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An authenticated connection able to run commands on one target
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Runs `command` on the target and returns its standard output
    ///
    /// # Errors
    ///
    /// [`SessionError::Unreachable`] if the transport failed,
    /// [`SessionError::CommandFailed`] if the command exited unsuccessfully.
    async fn run(&self, command: &str) -> SessionResult<String>;

    /// Releases the connection
    async fn close(self: Box<Self>);
}

/// Opens sessions to targets
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects and authenticates to `target`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the target is unreachable, rejects the
    /// credentials or host key, or has no identity configured.
    async fn connect(&self, target: &Target) -> SessionResult<Box<dyn RemoteSession>>;
}

/// Options shared by every session a connector opens
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Key used for targets without their own, already resolved
    pub default_identity: Option<PathBuf>,
    /// Handshake timeout passed to `ssh`
    pub connect_timeout: Duration,
    /// Host key checking policy
    pub host_key_policy: HostKeyPolicy,
    /// Directory holding control sockets
    pub control_dir: PathBuf,
    /// SSH client program
    pub program: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_identity: None,
            connect_timeout: Duration::from_secs(5),
            host_key_policy: HostKeyPolicy::default(),
            control_dir: std::env::temp_dir(),
            program: PathBuf::from("ssh"),
        }
    }
}

impl SessionConfig {
    /// Builds session options from poll settings and a resolved default key
    #[must_use]
    pub fn from_settings(settings: &PollSettings, default_identity: Option<PathBuf>) -> Self {
        Self {
            default_identity,
            connect_timeout: settings.effective_connect_timeout(),
            host_key_policy: settings.host_key_policy,
            ..Self::default()
        }
    }

    /// Sets the directory for control sockets
    #[must_use]
    pub fn with_control_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.control_dir = dir.into();
        self
    }

    /// Sets the SSH client program
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn next_control_path(&self) -> PathBuf {
        let n = CONTROL_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.control_dir
            .join(format!("sshstat-{}-{n}", std::process::id()))
    }
}

/// Connector backed by the system OpenSSH client
#[derive(Debug, Clone)]
pub struct SshConnector {
    config: Arc<SessionConfig>,
}

impl SshConnector {
    /// Creates a connector with the given options
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Options this connector applies
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for SshConnector {
    #[instrument(
        name = "session.connect",
        skip(self, target),
        fields(host = %target.host, port = target.port)
    )]
    async fn connect(&self, target: &Target) -> SessionResult<Box<dyn RemoteSession>> {
        let identity = target
            .identity_file
            .as_ref()
            .or(self.config.default_identity.as_ref())
            .cloned()
            .ok_or_else(|| SessionError::NoIdentity(target.display_name()))?;

        let session = SshSession {
            target_name: target.display_name(),
            host: target.host.clone(),
            common_args: common_args(&self.config, target, &identity),
            control_path: self.config.next_control_path(),
            program: self.config.program.clone(),
            // Nothing to tear down until the master is up
            closed: true,
        };

        let persist = self.config.connect_timeout.as_secs() + CONTROL_PERSIST_SLACK_SECS;
        let mut cmd = session.command();
        cmd.arg("-o")
            .arg("ControlMaster=yes")
            .arg("-o")
            .arg(format!("ControlPersist={persist}s"))
            .arg("-f")
            .arg("-N")
            .arg(&session.host)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| SessionError::Spawn(e.to_string()))?;
        // The forked master keeps stderr open, so it is only drained on failure
        let status = child
            .wait()
            .await
            .map_err(|e| SessionError::Spawn(e.to_string()))?;

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            tracing::debug!(
                target_name = %session.target_name,
                status = %status,
                error = %stderr.trim(),
                "SSH connect failed"
            );
            return Err(SessionError::Unreachable {
                target: session.target_name.clone(),
                reason: failure_reason(status, &stderr),
            });
        }

        let mut session = session;
        session.closed = false;
        tracing::debug!(target_name = %session.target_name, "SSH control master established");
        Ok(Box::new(session))
    }
}

/// Live session multiplexed over an OpenSSH control master
#[derive(Debug)]
pub struct SshSession {
    target_name: String,
    host: String,
    common_args: Vec<OsString>,
    control_path: PathBuf,
    program: PathBuf,
    closed: bool,
}

impl SshSession {
    /// Base `ssh` invocation sharing this session's control socket
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.common_args)
            .arg("-o")
            .arg(control_path_option(&self.control_path))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn exit_args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-o"),
            control_path_option(&self.control_path),
            OsString::from("-O"),
            OsString::from("exit"),
            OsString::from(&self.host),
        ]
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    #[instrument(name = "session.exec", skip(self), fields(target_name = %self.target_name))]
    async fn run(&self, command: &str) -> SessionResult<String> {
        let output = self
            .command()
            .arg("-o")
            .arg("ControlMaster=no")
            .arg(&self.host)
            .arg(command)
            .output()
            .await
            .map_err(|e| SessionError::Spawn(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.code() == Some(SSH_ERROR_STATUS) {
            return Err(SessionError::Unreachable {
                target: self.target_name.clone(),
                reason: failure_reason(output.status, &stderr),
            });
        }
        if !output.status.success() {
            return Err(SessionError::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn close(mut self: Box<Self>) {
        self.closed = true;
        let result = Command::new(&self.program)
            .args(self.exit_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = result {
            tracing::debug!(target_name = %self.target_name, error = %e, "Failed to stop control master");
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let program = self.program.clone();
        let args = self.exit_args();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = Command::new(program)
                    .args(args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await;
            });
        } else {
            let _ = std::process::Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }
}

/// Options common to the master and every multiplexed command
fn common_args(config: &SessionConfig, target: &Target, identity: &Path) -> Vec<OsString> {
    let options = [
        "BatchMode=yes".to_string(),
        format!("ConnectTimeout={}", config.connect_timeout.as_secs().max(1)),
        format!(
            "StrictHostKeyChecking={}",
            config.host_key_policy.ssh_option_value()
        ),
        "IdentitiesOnly=yes".to_string(),
    ];

    let mut args = Vec::with_capacity(options.len() * 2 + 6);
    for option in options {
        args.push(OsString::from("-o"));
        args.push(OsString::from(option));
    }
    args.push(OsString::from("-i"));
    args.push(identity.as_os_str().to_owned());
    args.push(OsString::from("-p"));
    args.push(OsString::from(target.port.to_string()));
    args.push(OsString::from("-l"));
    args.push(OsString::from(&target.user));
    args
}

fn control_path_option(path: &Path) -> OsString {
    let mut option = OsString::from("ControlPath=");
    option.push(path.as_os_str());
    option
}

fn failure_reason(status: ExitStatus, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("ssh exited with {status}")
    } else {
        // Last line carries the actual error; earlier ones are warnings
        stderr.lines().last().unwrap_or(stderr).trim().to_string()
    }
}
