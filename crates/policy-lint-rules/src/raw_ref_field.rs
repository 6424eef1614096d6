//! Rule requiring `raw_ref<T>` for reference fields.
//!
//! The reference counterpart of [`RawPtrField`](crate::RawPtrField); it
//! shares its suppression annotation.

use crate::raw_ptr_field::EXCLUSION_POLICY;
use policy_lint_core::{
    AnnotationPolicy, LocationPolicy, Matcher, Message, NodeKind, RewriteContext, Rule, RuleMatch,
    RuleTarget, Severity, TypeMatcher,
};

/// Rule code for raw-ref-field.
pub const CODE: &str = "PL002";

/// Rule name for raw-ref-field.
pub const NAME: &str = "raw-ref-field";

/// Header providing `raw_ref<T>`.
pub const HEADER: &str = "base/memory/raw_ref.h";

/// Flags fields of native reference type.
#[derive(Debug, Clone)]
pub struct RawRefField {
    matcher: Matcher,
    severity: Severity,
}

impl Default for RawRefField {
    fn default() -> Self {
        Self::new()
    }
}

impl RawRefField {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Field),
                Matcher::has_type(TypeMatcher::reference_to(TypeMatcher::Any.bind("referent"))),
            ]),
            severity: Severity::Error,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl Rule for RawRefField {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Requires raw_ref<T> instead of reference fields"
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

    fn location_policy(&self) -> LocationPolicy {
        LocationPolicy::Spelling
    }

    fn annotation_policy(&self) -> AnnotationPolicy {
        EXCLUSION_POLICY
    }

    fn message(&self, _m: &RuleMatch<'_>) -> Message {
        Message::new("Use raw_ref<T> instead of a native reference.")
    }

    fn supports_rewrite(&self) -> bool {
        true
    }

    fn rewrite(&self, m: &RuleMatch<'_>, edits: &mut RewriteContext<'_>) {
        let (Some(type_range), Some(referent)) = (m.node().type_range, m.bound_type_id("referent"))
        else {
            return;
        };
        if edits.replace(type_range, format!("raw_ref<{}>", m.type_name(referent))) {
            edits.include_user_header(HEADER);
        }
    }
}
