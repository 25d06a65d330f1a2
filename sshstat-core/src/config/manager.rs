//! Configuration directory and settings file access

use std::path::{Path, PathBuf};

use tracing::instrument;

use super::settings::AppSettings;
use super::targets::{TargetList, load_targets};
use crate::error::{ConfigError, ConfigResult};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "SSHSTAT_CONFIG_DIR";
/// Settings file name inside the configuration directory
pub const SETTINGS_FILE: &str = "config.toml";
/// Target list used when settings do not name one
pub const DEFAULT_TARGETS_FILE: &str = "targets.toml";

/// Loads settings and target lists from the configuration directory
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses `$SSHSTAT_CONFIG_DIR`, else `<user config dir>/sshstat`
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoConfigDir`] if neither is available.
    pub fn new() -> ConfigResult<Self> {
        let config_dir = std::env::var_os(CONFIG_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("sshstat")))
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(Self { config_dir })
    }

    /// Uses an explicit configuration directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// The configuration directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of `config.toml`
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Loads `config.toml`, returning defaults if it does not exist
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the file is not valid, [`ConfigError::Io`]
    /// if it exists but cannot be read.
    #[instrument(name = "config.load", skip(self), fields(dir = %self.config_dir.display()))]
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        let path = self.settings_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(AppSettings::default());
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path,
            reason: e.to_string(),
        })
    }

    /// Resolves the target list path
    ///
    /// `explicit` wins over the settings; `~` is expanded and relative paths
    /// are taken relative to the configuration directory.
    #[must_use]
    pub fn targets_path(&self, settings: &AppSettings, explicit: Option<&Path>) -> PathBuf {
        match explicit.or(settings.targets_file.as_deref()) {
            Some(path) => {
                let expanded = path
                    .to_str()
                    .map_or_else(|| path.to_path_buf(), |s| PathBuf::from(shellexpand::tilde(s).as_ref()));
                if expanded.is_absolute() || explicit.is_some() {
                    expanded
                } else {
                    self.config_dir.join(expanded)
                }
            }
            None => self.config_dir.join(DEFAULT_TARGETS_FILE),
        }
    }

    /// Loads the target list named by `explicit` or the settings
    ///
    /// # Errors
    ///
    /// See [`load_targets`].
    pub fn load_targets(
        &self,
        settings: &AppSettings,
        explicit: Option<&Path>,
        default_user: &str,
    ) -> ConfigResult<TargetList> {
        load_targets(&self.targets_path(settings, explicit), default_user)
    }
}
