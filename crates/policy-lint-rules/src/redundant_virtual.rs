//! Rule flagging `virtual` next to `override` or `final`.
//!
//! Both keywords already imply `virtual`; repeating it hides which methods
//! introduce a new virtual and which override one.

use policy_lint_core::{
    Matcher, Message, NodeKind, RewriteContext, Rule, RuleMatch, RuleTarget, Severity,
    SourceRange, SpecifierKind,
};

/// Rule code for redundant-virtual.
pub const CODE: &str = "PL008";

/// Rule name for redundant-virtual.
pub const NAME: &str = "redundant-virtual";

/// Flags `virtual` on methods that also say `override` or `final`.
#[derive(Debug, Clone)]
pub struct RedundantVirtual {
    matcher: Matcher,
    severity: Severity,
}

impl Default for RedundantVirtual {
    fn default() -> Self {
        Self::new()
    }
}

impl RedundantVirtual {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Method),
                Matcher::HasSpecifier(SpecifierKind::Virtual),
                Matcher::any_of(vec![
                    Matcher::HasSpecifier(SpecifierKind::Override),
                    Matcher::HasSpecifier(SpecifierKind::Final),
                ]),
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

impl Rule for RedundantVirtual {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Flags 'virtual' combined with 'override' or 'final'"
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

    fn message(&self, m: &RuleMatch<'_>) -> Message {
        let implied_by = if m.node().specifier(SpecifierKind::Override).is_some() {
            SpecifierKind::Override
        } else {
            SpecifierKind::Final
        };
        Message::new("'virtual' is redundant; '%0' implies 'virtual'.").arg(implied_by.to_string())
    }

    fn supports_rewrite(&self) -> bool {
        true
    }

    fn rewrite(&self, m: &RuleMatch<'_>, edits: &mut RewriteContext<'_>) {
        // The keyword and the space after it.
        if let Some(virtual_) = m.node().specifier(SpecifierKind::Virtual) {
            let range = virtual_.range;
            edits.remove(SourceRange::new(range.begin, range.end.advanced(1)));
        }
    }
}
