//! Configuration types for policy-lint.

use crate::exclusion::ListKind;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration for policy-lint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Preset to use (`all`, `raw-ptr`, `style`, `rewrite`).
    #[serde(default)]
    pub preset: Option<String>,

    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// External exclusion list files.
    #[serde(default)]
    pub exclusion_lists: Vec<ExclusionListConfig>,

    /// Per-rule configurations.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// Relative paths inside the file (root, exclusion lists) are resolved
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    fn rebase(&mut self, base: &Path) {
        if let Some(root) = &self.engine.root {
            if root.is_relative() {
                self.engine.root = Some(base.join(root));
            }
        }
        for list in &mut self.exclusion_lists {
            if list.file.is_relative() {
                list.file = base.join(&list.file);
            }
        }
    }

    /// Checks if a rule is enabled.
    ///
    /// A non-empty `engine.enabled_rules` acts as an allow-list; a per-rule
    /// `enabled = false` always disables.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        let listed = self.engine.enabled_rules.is_empty()
            || self.engine.enabled_rules.iter().any(|r| r == rule_name);
        listed
            && self
                .rules
                .get(rule_name)
                .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Gets the severity override for a rule.
    #[must_use]
    pub fn rule_severity(&self, rule_name: &str) -> Option<crate::Severity> {
        self.rules.get(rule_name).and_then(|c| c.severity)
    }

    /// Gets the configuration block for a rule.
    #[must_use]
    pub fn rule_config(&self, rule_name: &str) -> Option<&RuleConfig> {
        self.rules.get(rule_name)
    }

    /// Rule ids mentioned anywhere in the configuration.
    #[must_use]
    pub fn referenced_rules(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .engine
            .enabled_rules
            .iter()
            .map(String::as_str)
            .chain(self.rules.keys().map(String::as_str))
            .chain(
                self.exclusion_lists
                    .iter()
                    .flat_map(|l| l.rules.iter().map(String::as_str)),
            )
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Engine-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory exclusion path patterns are relative to.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Rule ids to run. Empty means every rule of the preset.
    #[serde(default)]
    pub enabled_rules: Vec<String>,

    /// Extra path patterns excluded for every rule.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Whether rewrite-capable rules produce edits.
    #[serde(default)]
    pub rewrite: bool,

    /// Maximum number of units analyzed in parallel.
    #[serde(default)]
    pub parallelism: Option<usize>,
}

/// One external exclusion list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionListConfig {
    /// Whether lines are path patterns or qualified symbol names.
    pub kind: ListKind,
    /// Path of the list file.
    pub file: PathBuf,
    /// Rules the list applies to. Empty means every rule.
    #[serde(default)]
    pub rules: Vec<String>,
}

impl ExclusionListConfig {
    /// Returns true if the list applies to the rule.
    #[must_use]
    pub fn applies_to(&self, rule_name: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| r == rule_name)
    }
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Severity override for this rule.
    #[serde(default)]
    pub severity: Option<crate::Severity>,

    /// Rule-specific options as key-value pairs.
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl RuleConfig {
    /// Gets a boolean option with a default value.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    /// Gets a string option with a default value.
    #[must_use]
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }

    /// Gets a string array option.
    #[must_use]
    pub fn get_str_array(&self, key: &str) -> Vec<String> {
        self.options
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConfigError {
    /// IO error reading a config or exclusion list file.
    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(policy_lint::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    #[diagnostic(
        code(policy_lint::config::parse),
        help("run `policy-lint init` to generate a valid configuration")
    )]
    Parse {
        /// Parse error message.
        message: String,
    },
}

/// A non-fatal configuration problem. The offending entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// File (or other source) the entry came from.
    pub origin: String,
    /// 1-indexed line, when the entry came from a line-based file.
    pub line: Option<usize>,
    /// What is wrong.
    pub message: String,
}

impl ConfigWarning {
    /// Creates a warning not tied to a line.
    #[must_use]
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            line: None,
            message: message.into(),
        }
    }

    /// Creates a warning for a line of a file.
    #[must_use]
    pub fn at_line(origin: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            line: Some(line),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.origin, line, self.message),
            None => write!(f, "{}: {}", self.origin, self.message),
        }
    }
}
