//! Error types for `sshstat`
//!
//! Each concern has its own error enum and `Result` alias. [`PollError`] is
//! what the poller reports per target; [`PollError::kind`] classifies it into
//! the configuration / connection / collection taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::models::Statistic;

/// Errors raised while loading settings, target lists or key material
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A target specification could not be understood
    #[error("Invalid target '{spec}': {reason}")]
    InvalidTarget {
        /// The offending specification text
        spec: String,
        /// Why it was rejected
        reason: String,
    },

    /// A port number was out of range or not numeric
    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    /// No private key was found to authenticate with
    #[error("No usable SSH key found (tried: {})", format_paths(.tried))]
    NoUsableKey {
        /// Paths that were probed
        tried: Vec<PathBuf>,
    },

    /// An explicitly configured key file does not exist
    #[error("SSH key file not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    /// Settings or target file could not be parsed
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// No configuration directory could be determined
    #[error("Cannot determine configuration directory")]
    NoConfigDir,

    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by the SSH session client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Connection, handshake, authentication or host key verification failed
    #[error("Target {target} unreachable: {reason}")]
    Unreachable {
        /// Display name of the target
        target: String,
        /// Message reported by the SSH client
        reason: String,
    },

    /// The remote command ran but exited unsuccessfully
    #[error("Remote command '{command}' failed ({status}): {stderr}")]
    CommandFailed {
        /// The command line that was executed
        command: String,
        /// Exit status description
        status: String,
        /// Trimmed standard error output
        stderr: String,
        /// Whatever the command printed before failing
        stdout: String,
    },

    /// No key was configured for the target and no default was supplied
    #[error("No SSH identity configured for {0}")]
    NoIdentity(String),

    /// The local `ssh` program could not be started
    #[error("Failed to spawn ssh: {0}")]
    Spawn(String),
}

impl SessionError {
    /// Output a failed command still produced, if any
    ///
    /// Tools like `df` exit non-zero when a single entry is unreadable but
    /// still print the rest.
    #[must_use]
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stdout, .. } if !stdout.trim().is_empty() => Some(stdout),
            _ => None,
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// A command's output did not have the expected shape
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to parse {statistic} output: {reason}")]
pub struct ParseError {
    /// Which statistic was being parsed
    pub statistic: Statistic,
    /// What was wrong with the input
    pub reason: String,
}

impl ParseError {
    /// Creates a parse error for the given statistic
    #[must_use]
    pub fn new(statistic: Statistic, reason: impl Into<String>) -> Self {
        Self {
            statistic,
            reason: reason.into(),
        }
    }
}

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Coarse classification of a per-target failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad target syntax, port or missing key
    Configuration,
    /// Unreachable host, handshake/auth failure or timeout
    Connection,
    /// Remote command failed or produced unparseable output
    Collection,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

/// Failure of one poll of one target
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The target could not be polled because of its configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The target could not be reached or authenticated against
    #[error("Connection error: {0}")]
    Unreachable(String),

    /// Connect plus collection did not finish in time
    #[error("Timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// An essential statistic could not be collected
    #[error("Collection error ({statistic}): {reason}")]
    Collection {
        /// The statistic that failed
        statistic: Statistic,
        /// Failure description
        reason: String,
    },

    /// Another poll of this target is still in flight
    #[error("A poll is already in progress for this target")]
    Busy,

    /// The poll task panicked or was cancelled
    #[error("Poll task failed: {0}")]
    TaskFailed(String),
}

impl PollError {
    /// Returns the taxonomy bucket of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Unreachable(_) | Self::TimedOut(_) | Self::Busy => ErrorKind::Connection,
            Self::Collection { .. } | Self::TaskFailed(_) => ErrorKind::Collection,
        }
    }

    /// Returns true for connection-class failures
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection)
    }
}

impl PollError {
    /// Maps a session error raised by a remote command for `statistic`
    ///
    /// A failed command becomes a collection error scoped to that statistic;
    /// transport failures stay connection errors.
    #[must_use]
    pub fn from_command(err: SessionError, statistic: Statistic) -> Self {
        match err {
            SessionError::CommandFailed { .. } => Self::Collection {
                statistic,
                reason: err.to_string(),
            },
            other => other.into(),
        }
    }
}

/// Session errors raised while connecting are connection failures, except a
/// missing identity which is a configuration problem.
impl From<SessionError> for PollError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoIdentity(_) => Self::Config(err.to_string()),
            SessionError::Unreachable { .. }
            | SessionError::Spawn(_)
            | SessionError::CommandFailed { .. } => Self::Unreachable(err.to_string()),
        }
    }
}

impl From<ParseError> for PollError {
    fn from(err: ParseError) -> Self {
        Self::Collection {
            statistic: err.statistic,
            reason: err.reason,
        }
    }
}

impl From<ConfigError> for PollError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Top-level error type for `sshstat`
#[derive(Debug, Error)]
pub enum SshstatError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Poll error
    #[error(transparent)]
    Poll(#[from] PollError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
