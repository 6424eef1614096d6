//! The rule trait.

use crate::context::RuleMatch;
use crate::location::LocationPolicy;
use crate::matcher::Matcher;
use crate::rewrite::RewriteContext;
use crate::source::RawLocation;
use crate::types::{Message, Severity};

/// Whether a rule reports declarations or use sites.
///
/// Implicit template instantiations are copies of their pattern: use-site
/// rules see every copy, declaration rules only the pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleTarget {
    /// One opportunity per written declaration.
    Declaration,
    /// One opportunity per use, including inside instantiations.
    #[default]
    UseSite,
}

/// Annotations and file pragmas that override exclusion lists for a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationPolicy {
    /// Annotations that suppress a match on the node or an enclosing scope.
    pub suppress: &'static [&'static str],
    /// Annotations that force a match to be reported.
    pub opt_in: &'static [&'static str],
    /// File pragmas that suppress every match in the file.
    pub suppress_pragmas: &'static [&'static str],
    /// File pragmas that force matches in the file to be reported.
    pub opt_in_pragmas: &'static [&'static str],
}

/// A coding-policy rule.
///
/// A rule is a [`Matcher`] plus what to say about (and optionally how to
/// fix) each match. Filtering, location resolution and deduplication are
/// done by the engine.
///
/// # Example
///
/// ```
/// use policy_lint_core::{Matcher, Message, NodeKind, Rule, RuleMatch, Severity};
///
/// pub struct NoGotoLabels {
///     matcher: Matcher,
/// }
///
/// impl Rule for NoGotoLabels {
///     fn name(&self) -> &'static str { "no-goto-labels" }
///     fn code(&self) -> &'static str { "X001" }
///     fn matcher(&self) -> &Matcher { &self.matcher }
///     fn message(&self, _m: &RuleMatch<'_>) -> Message {
///         Message::new("labels are not allowed")
///     }
/// }
///
/// let rule = NoGotoLabels { matcher: Matcher::kind(NodeKind::Other) };
/// assert_eq!(rule.default_severity(), Severity::Error);
/// ```
pub trait Rule: Send + Sync {
    /// Returns the kebab-case id of this rule (e.g., "raw-ptr-field").
    fn name(&self) -> &'static str;

    /// Returns the rule code (e.g., "PL001").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the default severity for diagnostics from this rule.
    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Top-level matcher.
    fn matcher(&self) -> &Matcher;

    /// Declaration or use-site rule.
    fn target(&self) -> RuleTarget {
        RuleTarget::UseSite
    }

    /// Which end of a macro chain diagnostics and edits attach to.
    fn location_policy(&self) -> LocationPolicy {
        LocationPolicy::Expansion
    }

    /// Annotation and pragma overrides.
    fn annotation_policy(&self) -> AnnotationPolicy {
        AnnotationPolicy::default()
    }

    /// Path patterns always excluded for this rule.
    fn default_excluded_paths(&self) -> &'static [&'static str] {
        &[]
    }

    /// Location the diagnostic is reported at. Defaults to the start of the
    /// matched node.
    fn anchor(&self, m: &RuleMatch<'_>) -> RawLocation {
        m.node().range.begin
    }

    /// Diagnostic message for a match.
    fn message(&self, m: &RuleMatch<'_>) -> Message;

    /// Suggested fix shown with diagnostics.
    fn help(&self) -> Option<&'static str> {
        None
    }

    /// Whether [`Rule::rewrite`] produces edits.
    fn supports_rewrite(&self) -> bool {
        false
    }

    /// Proposes edits for an accepted match.
    fn rewrite(&self, _m: &RuleMatch<'_>, _edits: &mut RewriteContext<'_>) {}
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    struct TestRule {
        matcher: Matcher,
    }

    impl Rule for TestRule {
        fn name(&self) -> &'static str {
            "test-rule"
        }
        fn code(&self) -> &'static str {
            "TEST001"
        }
        fn description(&self) -> &'static str {
            "A test rule"
        }
        fn matcher(&self) -> &Matcher {
            &self.matcher
        }
        fn message(&self, _m: &RuleMatch<'_>) -> Message {
            Message::new("test violation")
        }
    }

    #[test]
    fn test_rule_defaults() {
        let rule = TestRule {
            matcher: Matcher::kind(NodeKind::Field),
        };
        assert_eq!(rule.name(), "test-rule");
        assert_eq!(rule.code(), "TEST001");
        assert_eq!(rule.default_severity(), Severity::Error);
        assert_eq!(rule.target(), RuleTarget::UseSite);
        assert_eq!(rule.location_policy(), LocationPolicy::Expansion);
        assert_eq!(rule.annotation_policy(), AnnotationPolicy::default());
        assert!(!rule.supports_rewrite());
        assert!(rule.default_excluded_paths().is_empty());
    }
}
