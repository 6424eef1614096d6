//! Rule requiring `override` or `final` on overriding methods.
//!
//! # Rationale
//!
//! Without `override`, a later change to the base-class signature turns the
//! method into an unrelated overload without any compiler error.

use policy_lint_core::{
    Matcher, Message, NodeKind, RewriteContext, Rule, RuleMatch, RuleTarget, Severity,
    SpecifierKind,
};

/// Rule code for missing-override.
pub const CODE: &str = "PL007";

/// Rule name for missing-override.
pub const NAME: &str = "missing-override";

/// Flags overriding methods without `override` or `final`.
#[derive(Debug, Clone)]
pub struct MissingOverride {
    matcher: Matcher,
    severity: Severity,
}

impl Default for MissingOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl MissingOverride {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Method),
                Matcher::IsOverride,
                Matcher::not(Matcher::HasSpecifier(SpecifierKind::Override)),
                Matcher::not(Matcher::HasSpecifier(SpecifierKind::Final)),
            ]),
            severity: Severity::Warning,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl Rule for MissingOverride {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Requires override or final on overriding methods"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Declaration
    }

    fn message(&self, _m: &RuleMatch<'_>) -> Message {
        Message::new("Overriding method must be marked with 'override' or 'final'.")
    }

    fn supports_rewrite(&self) -> bool {
        true
    }

    fn rewrite(&self, m: &RuleMatch<'_>, edits: &mut RewriteContext<'_>) {
        if let Some(at) = m.node().declarator_end {
            edits.insert(at, " override");
        }
    }
}
