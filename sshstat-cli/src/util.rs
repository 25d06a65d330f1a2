//! Shared utility functions used across command modules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sshstat_core::config::{AppSettings, ConfigManager, TargetList, resolve_identity};
use sshstat_core::error::ConfigError;
use sshstat_core::models::Target;
use sshstat_core::monitoring::{Connector, PollSettings, Poller, SessionConfig, SshConnector, TargetRegistry};

use crate::error::CliError;

/// User assumed when neither the target nor the environment names one
const FALLBACK_USER: &str = "root";

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads the config manager and `config.toml` in one step
pub fn load_settings(config_path: Option<&Path>) -> Result<(ConfigManager, AppSettings), CliError> {
    let manager = create_config_manager(config_path)?;
    let settings = manager
        .load_settings()
        .map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))?;
    Ok((manager, settings))
}

/// Login name of the invoking user, used for targets without `user@`
pub fn default_user() -> String {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| FALLBACK_USER.to_string())
}

/// Resolves the key for single-target use, where a missing key is fatal
pub fn require_identity(explicit: Option<&Path>, settings: &PollSettings) -> Result<PathBuf, CliError> {
    let explicit = explicit.or(settings.identity_file.as_deref());
    resolve_identity(explicit, dirs::home_dir().as_deref()).map_err(CliError::from)
}

/// Resolves the default key for multi-target use
///
/// A missing default key is not fatal: targets with their own key still
/// work and the rest fail individually at connect time.
pub fn optional_identity(
    explicit: Option<&Path>,
    settings: &PollSettings,
) -> Result<Option<PathBuf>, CliError> {
    let explicit = explicit.or(settings.identity_file.as_deref());
    match resolve_identity(explicit, dirs::home_dir().as_deref()) {
        Ok(path) => Ok(Some(path)),
        Err(e @ ConfigError::NoUsableKey { .. }) => {
            tracing::warn!(error = %e, "No default key, targets without identity_file will fail");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Loads the target list and logs the lines that were skipped
pub fn load_target_list(
    manager: &ConfigManager,
    settings: &AppSettings,
    explicit: Option<&Path>,
) -> Result<Vec<Target>, CliError> {
    let path = manager.targets_path(settings, explicit);
    let TargetList { targets, skipped } = manager
        .load_targets(settings, explicit, &default_user())
        .map_err(|e| CliError::Config(format!("Failed to load targets from {}: {e}", path.display())))?;

    for err in &skipped {
        tracing::warn!(error = %err, "Skipping target");
    }
    if targets.is_empty() {
        return Err(CliError::Config(format!("No usable targets in {}", path.display())));
    }
    Ok(targets)
}

/// Builds a poller over `targets` using the system SSH client
pub fn build_poller(
    targets: Vec<Target>,
    settings: &PollSettings,
    identity: Option<PathBuf>,
) -> Poller {
    let registry: TargetRegistry = targets.into_iter().collect();
    let connector: Arc<dyn Connector> =
        Arc::new(SshConnector::new(SessionConfig::from_settings(settings, identity)));
    Poller::new(Arc::new(registry), connector, settings.clone())
}

/// Creates the async runtime command handlers block on
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Server(format!("Failed to create async runtime: {e}")))
}
