//! Rule presets for common configurations.

use crate::{
    discouraged_type, CArrayToStdArray, DiscouragedType, MissingOverride, RawPtrCast,
    RawPtrField, RawPtrToStackAllocated, RawRefField, RedundantOverride, RedundantVirtual,
    UnsafeBuffers,
};
use policy_lint_core::{Config, RuleBox};
use tracing::warn;

/// Preset configurations for policy-lint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Every built-in rule.
    All,
    /// Pointer-safety rules (PL001-PL004).
    RawPtr,
    /// Style and type-policy rules (PL005-PL009).
    Style,
    /// Rules that can produce rewrites.
    Rewrite,
}

impl Preset {
    /// Looks up a preset by its configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::All),
            "raw-ptr" => Some(Self::RawPtr),
            "style" => Some(Self::Style),
            "rewrite" => Some(Self::Rewrite),
            _ => None,
        }
    }

    /// Returns the rules for this preset.
    #[must_use]
    pub fn rules(self) -> Vec<RuleBox> {
        match self {
            Self::All => all_rules(),
            Self::RawPtr => raw_ptr_rules(),
            Self::Style => style_rules(),
            Self::Rewrite => rewrite_rules(),
        }
    }
}

/// Returns all available rules.
#[must_use]
pub fn all_rules() -> Vec<RuleBox> {
    vec![
        Box::new(RawPtrField::new()),
        Box::new(RawRefField::new()),
        Box::new(RawPtrCast::new()),
        Box::new(RawPtrToStackAllocated::new()),
        Box::new(DiscouragedType::new()),
        Box::new(UnsafeBuffers::new()),
        Box::new(MissingOverride::new()),
        Box::new(RedundantVirtual::new()),
        Box::new(RedundantOverride::new()),
        Box::new(CArrayToStdArray::new()),
    ]
}

/// Returns the pointer-safety rules.
///
/// Includes:
/// - `raw-ptr-field` (PL001)
/// - `raw-ref-field` (PL002)
/// - `raw-ptr-cast` (PL003)
/// - `raw-ptr-to-stack-allocated` (PL004)
#[must_use]
pub fn raw_ptr_rules() -> Vec<RuleBox> {
    vec![
        Box::new(RawPtrField::new()),
        Box::new(RawRefField::new()),
        Box::new(RawPtrCast::new()),
        Box::new(RawPtrToStackAllocated::new()),
    ]
}

/// Returns the style and type-policy rules (PL005-PL009).
#[must_use]
pub fn style_rules() -> Vec<RuleBox> {
    vec![
        Box::new(DiscouragedType::new()),
        Box::new(UnsafeBuffers::new()),
        Box::new(MissingOverride::new()),
        Box::new(RedundantVirtual::new()),
        Box::new(RedundantOverride::new()),
    ]
}

/// Returns every rule that offers rewrites.
#[must_use]
pub fn rewrite_rules() -> Vec<RuleBox> {
    all_rules()
        .into_iter()
        .filter(|rule| rule.supports_rewrite())
        .collect()
}

/// Looks up a built-in rule by name or code.
#[must_use]
pub fn rule_by_name(name: &str) -> Option<RuleBox> {
    all_rules()
        .into_iter()
        .find(|rule| rule.name() == name || rule.code() == name)
}

/// Builds the rule set described by a configuration.
///
/// The preset defaults to `all`; an unknown preset name falls back to it
/// with a warning. Rule options are applied here, while enablement and
/// severity overrides are left to the engine.
#[must_use]
pub fn build_rules(config: &Config) -> Vec<RuleBox> {
    let preset = match config.preset.as_deref() {
        None => Preset::All,
        Some(name) => Preset::from_name(name).unwrap_or_else(|| {
            warn!("Unknown preset `{name}`, using `all`");
            Preset::All
        }),
    };

    preset
        .rules()
        .into_iter()
        .map(|rule| match (rule.name(), config.rule_config(rule.name())) {
            (discouraged_type::NAME, Some(options)) => Box::new(
                DiscouragedType::new()
                    .types(options.get_str_array("types"))
                    .namespace(
                        options.get_str("namespace", discouraged_type::DEFAULT_NAMESPACE),
                    ),
            ) as RuleBox,
            _ => rule,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(rules: &[RuleBox]) -> Vec<&'static str> {
        rules.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_preset_rules() {
        assert_eq!(Preset::All.rules().len(), 10);
        assert_eq!(
            names(&Preset::RawPtr.rules()),
            vec![
                "raw-ptr-field",
                "raw-ref-field",
                "raw-ptr-cast",
                "raw-ptr-to-stack-allocated"
            ]
        );
        assert_eq!(Preset::Style.rules().len(), 5);
    }

    #[test]
    fn test_rewrite_preset() {
        insta::assert_snapshot!(names(&rewrite_rules()).join("\n"), @r"
        raw-ptr-field
        raw-ref-field
        missing-override
        redundant-virtual
        redundant-override
        c-array-to-std-array
        ");
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<&str> = all_rules().iter().map(|r| r.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 10);
    }

    #[test]
    fn test_rule_by_name_or_code() {
        assert_eq!(rule_by_name("unsafe-buffers").map(|r| r.code()), Some("PL006"));
        assert_eq!(rule_by_name("PL010").map(|r| r.name()), Some("c-array-to-std-array"));
        assert!(rule_by_name("no-such-rule").is_none());
    }

    #[test]
    fn test_preset_from_name() {
        assert_eq!(Preset::from_name("raw-ptr"), Some(Preset::RawPtr));
        assert_eq!(Preset::from_name("recommended"), None);
    }

    #[test]
    fn test_build_rules_from_config() {
        let config = Config::parse(
            r#"
preset = "style"

[rules.discouraged-type]
types = ["std::map"]
"#,
        )
        .expect("valid config");
        let rules = build_rules(&config);
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0].name(), "discouraged-type");

        let unknown = Config::parse("preset = \"bogus\"").expect("valid config");
        assert_eq!(build_rules(&unknown).len(), 10);
    }
}
