//! Application settings stored in `config.toml`

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::monitoring::PollSettings;

/// Root of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Target list; relative paths are resolved against the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets_file: Option<PathBuf>,
    /// Polling behavior
    #[serde(default)]
    pub poll: PollSettings,
    /// Metrics endpoint
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Metrics endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Path the exposition is served on
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8090))
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

impl MetricsSettings {
    /// Route path with a guaranteed leading slash
    #[must_use]
    pub fn route_path(&self) -> String {
        let trimmed = self.path.trim();
        if trimmed.is_empty() {
            default_path()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::HostKeyPolicy;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings: AppSettings = toml::from_str("").unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.metrics.listen.port(), 8090);
        assert_eq!(settings.metrics.path, "/metrics");
        assert_eq!(settings.poll.timeout_secs, 15);
    }

    #[test]
    fn test_partial_sections() {
        let settings: AppSettings = toml::from_str(
            r#"
targets_file = "fleet.txt"

[poll]
timeout_secs = 30
concurrency = 8
host_key_policy = "strict"

[metrics]
listen = "127.0.0.1:9100"
"#,
        )
        .unwrap();
        assert_eq!(settings.poll.timeout_secs, 30);
        assert_eq!(settings.poll.connect_timeout_secs, 5);
        assert_eq!(settings.poll.concurrency, Some(8));
        assert_eq!(settings.poll.host_key_policy, HostKeyPolicy::Strict);
        assert_eq!(settings.metrics.listen, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(settings.metrics.path, "/metrics");
        assert_eq!(settings.targets_file, Some(PathBuf::from("fleet.txt")));
    }

    #[test]
    fn test_route_path() {
        let mut metrics = MetricsSettings::default();
        assert_eq!(metrics.route_path(), "/metrics");
        metrics.path = "stats".into();
        assert_eq!(metrics.route_path(), "/stats");
        metrics.path = "  ".into();
        assert_eq!(metrics.route_path(), "/metrics");
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = AppSettings {
            targets_file: Some(PathBuf::from("/etc/sshstat/targets.toml")),
            ..AppSettings::default()
        };
        let text = toml::to_string(&settings).unwrap();
        let parsed: AppSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
