//! Monitored target identity.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Port used when a target does not name one
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Slot index of a target inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub usize);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A remote host monitored over SSH
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user
    pub user: String,
    /// Private key for this target, overriding the default identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl Target {
    /// Creates a target without an explicit key
    #[must_use]
    pub fn new(user: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            identity_file: None,
        }
    }

    /// Sets the private key used for this target
    #[must_use]
    pub fn with_identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Returns `user@host:port`, bracketing IPv6 literals
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.host.contains(':') {
            format!("{}@[{}]:{}", self.user, self.host, self.port)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}
