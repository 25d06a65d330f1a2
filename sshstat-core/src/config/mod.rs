//! Configuration for `sshstat`
//!
//! Settings live in `config.toml` inside the configuration directory and are
//! managed by [`ConfigManager`]. Target lists come from a separate file in
//! TOML or plain `user host port` format; see [`targets`]. Private keys are
//! resolved up front by [`identity::resolve_identity`] so the session client
//! never consults the user's environment itself.

pub mod identity;
mod manager;
pub mod settings;
pub mod targets;

pub use identity::{DEFAULT_KEY_NAMES, resolve_identity};
pub use manager::{CONFIG_DIR_ENV, ConfigManager, DEFAULT_TARGETS_FILE, SETTINGS_FILE};
pub use settings::{AppSettings, MetricsSettings};
pub use targets::{TargetList, load_targets, parse_target_spec, parse_targets_plain, parse_targets_toml};
