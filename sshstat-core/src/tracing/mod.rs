//! Structured logging setup
//!
//! Library code only emits spans and events; binaries call [`init_tracing`]
//! once at startup. Span names live in [`span_names`] so log filters and
//! greps stay stable across releases.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Crates whose events pass the level-derived filter
const OWN_CRATES: [&str; 2] = ["sshstat_core", "sshstat"];

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum TracingError {
    /// The subscriber or the filter could not be installed
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// [`init_tracing`] was called twice
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// The log file could not be created
    #[error("Failed to create log file {}: {reason}", path.display())]
    LogFile {
        /// Requested log file
        path: PathBuf,
        /// OS error text
        reason: String,
    },

    /// A level name was not recognized
    #[error("Unknown log level '{0}'")]
    UnknownLevel(String),
}

/// Verbosity of the level-derived filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Errors and warnings, including per-target poll failures
    #[default]
    Warn,
    /// Adds one summary per sweep
    Info,
    /// Adds per-target and per-session detail
    Debug,
    /// Everything, including skipped parser rows
    Trace,
}

impl TracingLevel {
    /// Level for a `-v` count: none is warn, then info, debug, trace
    #[must_use]
    pub const fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Directive name understood by [`EnvFilter`]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "info" => Self::Info,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => return Err(TracingError::UnknownLevel(s.to_string())),
        };
        Ok(level)
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard output
    Stdout,
    /// Standard error, keeping stdout free for reports
    #[default]
    Stderr,
    /// A file, truncated on start and never colored
    File {
        /// Path to the log file
        path: PathBuf,
    },
}

/// Subscriber configuration
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Level applied to the `sshstat` crates
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// `EnvFilter` directives replacing the level-derived ones
    pub filter: Option<String>,
    /// Whether terminal output may use ANSI colors
    pub ansi: bool,
}

impl TracingConfig {
    /// Default configuration: warnings to stderr, no colors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Replaces the level-derived directives
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enables or disables ANSI colors
    #[must_use]
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Directives for the configured level, scoped to the `sshstat` crates
    #[must_use]
    pub fn default_directives(&self) -> String {
        OWN_CRATES
            .iter()
            .map(|name| format!("{name}={}", self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        let directives = self
            .filter
            .clone()
            .unwrap_or_else(|| self.default_directives());
        EnvFilter::try_new(directives).map_err(|e| TracingError::InitializationFailed(e.to_string()))
    }

    fn make_writer(&self) -> Result<(BoxMakeWriter, bool), TracingError> {
        match &self.output {
            TracingOutput::Stdout => Ok((BoxMakeWriter::new(std::io::stdout), self.ansi)),
            TracingOutput::Stderr => Ok((BoxMakeWriter::new(std::io::stderr), self.ansi)),
            TracingOutput::File { path } => {
                let file = std::fs::File::create(path).map_err(|e| TracingError::LogFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok((BoxMakeWriter::new(Arc::new(file)), false))
            }
        }
    }
}

/// Installs the global subscriber
///
/// # Errors
///
/// Fails if a subscriber was already installed through this function, the
/// custom filter does not parse, or the log file cannot be created.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let filter = config.env_filter()?;
    let (writer, ansi) = config.make_writer()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    tracing::debug!(level = %config.level, "Tracing initialized");
    Ok(())
}

/// Creates an info-level span with the given name and fields
///
/// ```ignore
/// let span = sshstat_core::trace_operation!(
///     sshstat_core::tracing::span_names::METRICS_SCRAPE,
///     targets = registry.len()
/// );
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Span names used across the crates
pub mod span_names {
    /// One poll-all sweep
    pub const POLL_ALL: &str = "poll.all";
    /// One target within a sweep
    pub const POLL_TARGET: &str = "poll.target";
    /// Session establishment
    pub const SESSION_CONNECT: &str = "session.connect";
    /// One remote command
    pub const SESSION_EXEC: &str = "session.exec";
    /// Settings or target list loading
    pub const CONFIG_LOAD: &str = "config.load";
    /// One metrics scrape
    pub const METRICS_SCRAPE: &str = "metrics.scrape";
}
