//! Target specifications and target list files
//!
//! Two file formats are accepted, chosen by extension:
//!
//! - `.toml`: `[[target]]` tables with `host`, optional `user`, `port` and
//!   `identity_file`
//! - anything else: one `user host port` triple per line, or a single
//!   `[user@]host[:port]` word; `#` starts a comment
//!
//! A bad entry is reported in [`TargetList::skipped`] and never prevents
//! the rest of the file from loading.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::instrument;

use crate::error::{ConfigError, ConfigResult};
use crate::models::{DEFAULT_SSH_PORT, Target};

/// Targets loaded from a file, plus the entries that were rejected
#[derive(Debug, Default)]
pub struct TargetList {
    /// Valid targets in file order
    pub targets: Vec<Target>,
    /// One error per rejected entry
    pub skipped: Vec<ConfigError>,
}

impl TargetList {
    /// Number of valid targets
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no valid target was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Parses `[user@]host[:port]`
///
/// IPv6 literals need brackets when a port is given (`[fe80::1]:2222`);
/// a bare IPv6 literal is taken as a host without port.
///
/// # Errors
///
/// [`ConfigError::InvalidTarget`] for malformed input,
/// [`ConfigError::InvalidPort`] for a port that is not in 1–65535.
pub fn parse_target_spec(spec: &str, default_user: &str) -> ConfigResult<Target> {
    let spec = spec.trim();
    let invalid = |reason: &str| ConfigError::InvalidTarget {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    if spec.is_empty() {
        return Err(invalid("empty target"));
    }
    if spec.chars().any(char::is_whitespace) {
        return Err(invalid("whitespace in target"));
    }

    let (user, rest) = match spec.split_once('@') {
        Some(("", _)) => return Err(invalid("empty user")),
        Some((user, rest)) => (user, rest),
        None => (default_user, spec),
    };

    let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| invalid("missing ']'"))?;
        let port = if after.is_empty() {
            None
        } else {
            Some(
                after
                    .strip_prefix(':')
                    .ok_or_else(|| invalid("unexpected text after ']'"))?,
            )
        };
        (host, port)
    } else if rest.matches(':').count() > 1 {
        (rest, None)
    } else {
        match rest.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (rest, None),
        }
    };

    if let Some(reason) = host_problem(host) {
        return Err(invalid(reason));
    }
    let port = port.map_or(Ok(DEFAULT_SSH_PORT), parse_port)?;

    Ok(Target::new(user, host, port))
}

/// Hosts are passed to `ssh` as a bare argument, so one starting with `-`
/// would be read as an option
fn host_problem(host: &str) -> Option<&'static str> {
    if host.is_empty() {
        Some("empty host")
    } else if host.starts_with('-') {
        Some("host must not start with '-'")
    } else {
        None
    }
}

fn parse_port(s: &str) -> ConfigResult<u16> {
    match s.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(s.to_string())),
    }
}

/// Parses the plain line format
#[must_use]
pub fn parse_targets_plain(content: &str, default_user: &str) -> TargetList {
    let mut list = TargetList::default();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.split_once('#').map_or(raw, |(before, _)| before).trim();
        if line.is_empty() {
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let parsed = match words.as_slice() {
            [user, host, port] => match host_problem(host) {
                Some(reason) => Err(ConfigError::InvalidTarget {
                    spec: line.to_string(),
                    reason: format!("line {}: {reason}", index + 1),
                }),
                None => parse_port(port).map(|port| Target::new(*user, *host, port)),
            },
            [spec] => parse_target_spec(spec, default_user),
            _ => Err(ConfigError::InvalidTarget {
                spec: line.to_string(),
                reason: format!("line {}: expected 'user host port'", index + 1),
            }),
        };

        match parsed {
            Ok(target) => list.targets.push(target),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping target entry");
                list.skipped.push(e);
            }
        }
    }

    list
}

#[derive(Debug, Deserialize)]
struct TargetFile {
    #[serde(default, rename = "target")]
    targets: Vec<TargetEntry>,
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    host: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    identity_file: Option<String>,
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// Parses the TOML format
///
/// # Errors
///
/// [`ConfigError::Parse`] if the document is not valid TOML or does not have
/// the expected shape. Individual bad entries are skipped instead.
pub fn parse_targets_toml(content: &str, path: &Path, default_user: &str) -> ConfigResult<TargetList> {
    let file: TargetFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut list = TargetList::default();
    for entry in file.targets {
        let host = entry.host.trim();
        let result = if let Some(reason) = host_problem(host) {
            Err(ConfigError::InvalidTarget {
                spec: entry.host.clone(),
                reason: reason.to_string(),
            })
        } else if entry.port == 0 {
            Err(ConfigError::InvalidPort(entry.port.to_string()))
        } else {
            let user = entry.user.as_deref().unwrap_or(default_user);
            let mut target = Target::new(user, host, entry.port);
            if let Some(key) = &entry.identity_file {
                target = target.with_identity(PathBuf::from(shellexpand::tilde(key).as_ref()));
            }
            Ok(target)
        };

        match result {
            Ok(target) => list.targets.push(target),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping target entry");
                list.skipped.push(e);
            }
        }
    }
    Ok(list)
}

/// Loads a target list file, picking the format from its extension
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, or is a TOML file
/// that fails to parse as a whole.
#[instrument(name = "config.load", skip_all, fields(path = %path.display()))]
pub fn load_targets(path: &Path, default_user: &str) -> ConfigResult<TargetList> {
    let content = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let list = if is_toml {
        parse_targets_toml(&content, path, default_user)?
    } else {
        parse_targets_plain(&content, default_user)
    };

    tracing::debug!(
        targets = list.len(),
        skipped = list.skipped.len(),
        "Loaded target list"
    );
    Ok(list)
}
