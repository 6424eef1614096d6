//! Configuration file resolution with global fallback.
//!
//! Resolves the configuration file path using a deterministic priority order:
//!
//! 1. `--config` flag (explicit path)
//! 2. `{project}/policy-lint.toml` or `.policy-lint.toml`
//! 3. `$POLICY_LINT_CONFIG_DIR/config.toml` or `~/.policy-lint/config.toml`
//! 4. No config found → defaults

use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly specified via `--config` flag.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Loaded from the global config directory.
    Global(PathBuf),
    /// No config found; defaults will be used.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Returns `true` if the config was loaded from the global directory.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

/// Project-level config file names, checked in order.
const PROJECT_CONFIG_NAMES: &[&str] = &["policy-lint.toml", ".policy-lint.toml"];

/// Config file name within the global config directory.
const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Environment variable overriding the global config directory.
const CONFIG_DIR_ENV: &str = "POLICY_LINT_CONFIG_DIR";

/// Resolves the configuration file path.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(project_dir, explicit, global_config_dir())
}

/// Takes `global_dir` as a parameter so tests need not touch the environment.
fn resolve_inner(
    project_dir: &Path,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(candidate) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.exists())
    {
        tracing::debug!("Found project config: {}", candidate.display());
        return ConfigSource::Project(candidate);
    }

    match global_dir.map(|dir| dir.join(GLOBAL_CONFIG_NAME)) {
        Some(candidate) if candidate.exists() => {
            tracing::debug!("Found global config: {}", candidate.display());
            ConfigSource::Global(candidate)
        }
        _ => ConfigSource::Default,
    }
}

/// Returns the global config directory path.
///
/// Resolution: `$POLICY_LINT_CONFIG_DIR` > `~/.policy-lint/`
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".policy-lint"))
}
