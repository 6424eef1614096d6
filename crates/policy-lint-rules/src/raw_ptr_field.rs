//! Rule requiring `raw_ptr<T>` for pointer fields.
//!
//! # Rationale
//!
//! A raw pointer stored in an object easily outlives its pointee.
//! `raw_ptr<T>` lets the allocator quarantine freed memory that is still
//! referenced, turning a use-after-free into a crash instead of an exploit.
//!
//! # Configuration
//!
//! - `severity`: diagnostic severity (default: error)
//!
//! # Suppression
//!
//! - `RAW_PTR_EXCLUSION` on the field (annotation `raw_ptr_exclusion`)
//! - a `symbols` exclusion list naming the field
//!
//! Function pointers are never flagged.

use policy_lint_core::{
    AnnotationPolicy, LocationPolicy, Matcher, Message, NodeKind, RewriteContext, Rule, RuleMatch,
    RuleTarget, Severity, TypeMatcher,
};

/// Rule code for raw-ptr-field.
pub const CODE: &str = "PL001";

/// Rule name for raw-ptr-field.
pub const NAME: &str = "raw-ptr-field";

/// Header providing `raw_ptr<T>`.
pub const HEADER: &str = "base/memory/raw_ptr.h";

/// Annotation spelled by `RAW_PTR_EXCLUSION`.
pub const RAW_PTR_EXCLUSION: &str = "raw_ptr_exclusion";

pub(crate) const EXCLUSION_POLICY: AnnotationPolicy = AnnotationPolicy {
    suppress: &[RAW_PTR_EXCLUSION],
    opt_in: &[],
    suppress_pragmas: &[],
    opt_in_pragmas: &[],
};

/// Flags fields of raw pointer type.
#[derive(Debug, Clone)]
pub struct RawPtrField {
    matcher: Matcher,
    severity: Severity,
}

impl Default for RawPtrField {
    fn default() -> Self {
        Self::new()
    }
}

impl RawPtrField {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Field),
                Matcher::has_type(TypeMatcher::pointer_to(
                    TypeMatcher::not(TypeMatcher::Function).bind("pointee"),
                )),
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

impl Rule for RawPtrField {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Requires raw_ptr<T> instead of raw pointer fields"
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
        Message::new("Use raw_ptr<T> instead of a raw pointer.")
    }

    fn help(&self) -> Option<&'static str> {
        Some("mark the field RAW_PTR_EXCLUSION if raw_ptr<T> cannot be used")
    }

    fn supports_rewrite(&self) -> bool {
        true
    }

    fn rewrite(&self, m: &RuleMatch<'_>, edits: &mut RewriteContext<'_>) {
        let (Some(type_range), Some(pointee)) = (m.node().type_range, m.bound_type_id("pointee"))
        else {
            return;
        };
        if edits.replace(type_range, format!("raw_ptr<{}>", m.type_name(pointee))) {
            edits.include_user_header(HEADER);
        }
    }
}
