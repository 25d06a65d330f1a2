//! Private key resolution

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Key files probed under `~/.ssh`, in order of preference
pub const DEFAULT_KEY_NAMES: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

/// Picks the private key to authenticate with
///
/// An explicit path (with `~` expanded against `home`) must exist. Without
/// one, the first of [`DEFAULT_KEY_NAMES`] present in `home/.ssh` is used.
///
/// # Errors
///
/// [`ConfigError::KeyNotFound`] if the explicit key is missing,
/// [`ConfigError::NoUsableKey`] if no default key exists.
pub fn resolve_identity(explicit: Option<&Path>, home: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(path) = explicit {
        let expanded = expand_home(path, home);
        if !expanded.is_file() {
            return Err(ConfigError::KeyNotFound(expanded));
        }
        return Ok(expanded);
    }

    let Some(home) = home else {
        return Err(ConfigError::NoUsableKey { tried: Vec::new() });
    };
    let ssh_dir = home.join(".ssh");
    let candidates: Vec<PathBuf> = DEFAULT_KEY_NAMES.iter().map(|name| ssh_dir.join(name)).collect();

    match candidates.iter().find(|p| p.is_file()) {
        Some(found) => {
            tracing::debug!(key = %found.display(), "Using default SSH key");
            Ok(found.clone())
        }
        None => Err(ConfigError::NoUsableKey { tried: candidates }),
    }
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    match home {
        Some(home) => {
            let expanded = shellexpand::tilde_with_context(text, || home.to_str());
            PathBuf::from(expanded.as_ref())
        }
        None => path.to_path_buf(),
    }
}
