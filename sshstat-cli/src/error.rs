//! CLI error types and exit codes.

use sshstat_core::error::{ConfigError, ErrorKind, PollError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, collection, or other non-connection errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection failure - the target or every target could not be reached
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Collection error
    #[error("Collection error: {0}")]
    Collection(String),

    /// Runtime or HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// Serialization error
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<PollError> for CliError {
    fn from(err: PollError) -> Self {
        match err.kind() {
            ErrorKind::Configuration => Self::Config(err.to_string()),
            ErrorKind::Connection => Self::Connection(err.to_string()),
            ErrorKind::Collection => Self::Collection(err.to_string()),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, collection, output, IO)
    /// - 2: Connection failure
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Connection(_) => exit_codes::CONNECTION_FAILURE,
            Self::Config(_)
            | Self::Collection(_)
            | Self::Server(_)
            | Self::Output(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
