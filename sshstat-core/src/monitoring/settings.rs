//! Polling settings for remote statistics collection
//!
//! Stored in `config.toml` under `[poll]`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound for the per-target timeout
const MAX_TIMEOUT_SECS: u64 = 300;

/// How the SSH client treats unknown or changed host keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Only connect to hosts already in `known_hosts`
    Strict,
    /// Record keys of new hosts, reject changed keys
    #[default]
    AcceptNew,
    /// Accept any host key
    Off,
}

impl HostKeyPolicy {
    /// Value for OpenSSH's `StrictHostKeyChecking` option
    #[must_use]
    pub const fn ssh_option_value(self) -> &'static str {
        match self {
            Self::Strict => "yes",
            Self::AcceptNew => "accept-new",
            Self::Off => "no",
        }
    }
}

impl std::str::FromStr for HostKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" | "yes" => Ok(Self::Strict),
            "accept-new" => Ok(Self::AcceptNew),
            "off" | "no" => Ok(Self::Off),
            other => Err(format!("unknown host key policy '{other}'")),
        }
    }
}

/// Settings applied to every poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Overall per-target budget for connect plus all commands (1–300, default: 15)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// SSH connect timeout in seconds (default: 5)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Maximum number of targets polled at once; unbounded when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Host key checking policy
    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,
    /// Default private key for targets without their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
}

const fn default_timeout_secs() -> u64 {
    15
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            concurrency: None,
            host_key_policy: HostKeyPolicy::default(),
            identity_file: None,
        }
    }
}

impl PollSettings {
    /// Returns the per-target timeout clamped to the valid range (1–300 seconds)
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }

    /// Returns the SSH connect timeout, never longer than the overall timeout
    #[must_use]
    pub fn effective_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1)).min(self.effective_timeout())
    }

    /// Number of targets polled concurrently for a batch of `targets`
    #[must_use]
    pub fn effective_concurrency(&self, targets: usize) -> usize {
        self.concurrency
            .filter(|&cap| cap > 0)
            .map_or(targets, |cap| cap.min(targets))
            .max(1)
    }

    /// Sets the overall per-target timeout
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the concurrency cap
    #[must_use]
    pub const fn with_concurrency(mut self, cap: usize) -> Self {
        self.concurrency = Some(cap);
        self
    }
}
