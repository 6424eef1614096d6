//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# policy-lint configuration

# Rule preset: "all", "raw-ptr", "style" or "rewrite"
preset = "all"

[engine]
# Directory that exclusion path patterns are relative to
# root = "/src/chromium"

# Only run these rules (default: every rule of the preset)
# enabled_rules = ["raw-ptr-field", "unsafe-buffers"]

# Path patterns excluded for every rule
exclude = [
    "third_party/",
    "out/**/gen/",
]

# Produce an edit script from rewrite-capable rules
rewrite = false

# Units analyzed in parallel (default: number of CPUs)
# parallelism = 8

# External exclusion lists: one pattern per line, '#' comments
# [[exclusion_lists]]
# kind = "paths"
# file = "tools/clang/rewrite_raw_ptr_fields/manual-paths-to-ignore.txt"
# rules = ["raw-ptr-field", "raw-ref-field"]
#
# [[exclusion_lists]]
# kind = "symbols"
# file = "tools/clang/rewrite_raw_ptr_fields/manual-fields-to-ignore.txt"

# Per-rule configuration

[rules.discouraged-type]
enabled = true
# severity = "warning"
types = ["std::vector"]
namespace = "blink"

# [rules.c-array-to-std-array]
# enabled = false
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("policy-lint.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created policy-lint.toml");
    println!("\nNext steps:");
    println!("  1. Edit policy-lint.toml to configure rules");
    println!("  2. Run: policy-lint check out/Default/dumps");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_lint_core::Config;

    #[test]
    fn default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.preset.as_deref(), Some("all"));
        assert_eq!(config.engine.exclude.len(), 2);
        assert!(config.exclusion_lists.is_empty());
        let discouraged = config.rule_config("discouraged-type").unwrap();
        assert_eq!(discouraged.get_str("namespace", ""), "blink");
    }
}
