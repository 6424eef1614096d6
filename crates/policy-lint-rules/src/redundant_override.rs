//! Rule flagging `override` next to `final`.

use policy_lint_core::{
    Matcher, Message, NodeKind, RewriteContext, Rule, RuleMatch, RuleTarget, Severity,
    SourceRange, SpecifierKind,
};

/// Rule code for redundant-override.
pub const CODE: &str = "PL009";

/// Rule name for redundant-override.
pub const NAME: &str = "redundant-override";

/// Flags `override` on methods that are also `final`.
#[derive(Debug, Clone)]
pub struct RedundantOverride {
    matcher: Matcher,
    severity: Severity,
}

impl Default for RedundantOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl RedundantOverride {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Method),
                Matcher::HasSpecifier(SpecifierKind::Override),
                Matcher::HasSpecifier(SpecifierKind::Final),
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

impl Rule for RedundantOverride {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Flags 'override' combined with 'final'"
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
        Message::new("'override' is redundant; 'final' implies 'override'.")
    }

    fn supports_rewrite(&self) -> bool {
        true
    }

    fn rewrite(&self, m: &RuleMatch<'_>, edits: &mut RewriteContext<'_>) {
        if let Some(override_) = m.node().specifier(SpecifierKind::Override) {
            let range = override_.range;
            edits.remove(SourceRange::new(range.begin, range.end.advanced(1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, positions, rewrite, run, virtual_fixture, VIRTUAL_TEXT};

    #[test]
    fn flags_override_with_final() {
        let report = run(RedundantOverride::new(), &virtual_fixture());
        assert_eq!(positions(&report), vec![(20, 3), (28, 3)]);
    }

    #[test]
    fn macro_spelled_override_is_not_rewritten() {
        let at_override = at(VIRTUAL_TEXT, "override final");
        assert_eq!(
            rewrite(RedundantOverride::new(), &virtual_fixture()),
            format!("r:::virtual.h:::{at_override}:::9:::\n")
        );
    }
}
