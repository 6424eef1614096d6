//! Rule forbidding `raw_ptr<T>`/`raw_ref<T>` to `STACK_ALLOCATED` types.
//!
//! Objects of a `STACK_ALLOCATED()` class never live on the heap, so the
//! protection `raw_ptr` offers does not apply and only adds cost.

use policy_lint_core::utils::last_segment;
use policy_lint_core::{
    Matcher, Message, NodeKind, RawLocation, Rule, RuleMatch, RuleTarget, Severity, TypeMatcher,
};

/// Rule code for raw-ptr-to-stack-allocated.
pub const CODE: &str = "PL004";

/// Rule name for raw-ptr-to-stack-allocated.
pub const NAME: &str = "raw-ptr-to-stack-allocated";

/// Annotation carried by records declared with `STACK_ALLOCATED()`.
pub const STACK_ALLOCATED: &str = "stack_allocated";

/// Flags `raw_ptr`/`raw_ref` declarations whose pointee is stack allocated.
#[derive(Debug, Clone)]
pub struct RawPtrToStackAllocated {
    matcher: Matcher,
    severity: Severity,
}

impl Default for RawPtrToStackAllocated {
    fn default() -> Self {
        Self::new()
    }
}

impl RawPtrToStackAllocated {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        let pointee = || {
            TypeMatcher::record_decl(Matcher::has_annotation(STACK_ALLOCATED)).bind("pointee")
        };
        let wrapper = TypeMatcher::AnyOf(vec![
            TypeMatcher::specialization_of("base::raw_ptr", vec![pointee()]),
            TypeMatcher::specialization_of("base::raw_ref", vec![pointee()]),
        ])
        .bind("pointer");

        Self {
            matcher: Matcher::all_of(vec![
                Matcher::any_of(vec![
                    Matcher::kind(NodeKind::Field),
                    Matcher::kind(NodeKind::Var),
                    Matcher::kind(NodeKind::Param),
                ]),
                Matcher::has_type(TypeMatcher::underlying(wrapper)),
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

impl Rule for RawPtrToStackAllocated {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Forbids raw_ptr<T>/raw_ref<T> to STACK_ALLOCATED objects"
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

    fn anchor(&self, m: &RuleMatch<'_>) -> RawLocation {
        let node = m.node();
        node.type_range.unwrap_or(node.range).begin
    }

    fn message(&self, m: &RuleMatch<'_>) -> Message {
        let pointer = m
            .bound_type_id("pointer")
            .and_then(|ty| m.tree.type_qualified_name(ty))
            .map_or("raw_ptr", last_segment);
        let pointee = m
            .bound_type_id("pointee")
            .map(|ty| m.type_name(ty))
            .unwrap_or_default();
        Message::new("Do not use '%0<T>' on a `STACK_ALLOCATED` object '%1'.")
            .arg(pointer)
            .arg(pointee)
    }
}
