//! Rule flagging unchecked buffer access.
//!
//! # Rationale
//!
//! Indexing through a raw pointer, or calling a function that does so on
//! the caller's behalf, cannot be bounds-checked. Such code must either move
//! to `base::span` or be wrapped in `UNSAFE_BUFFERS()` next to a comment
//! explaining why it is in bounds.
//!
//! # Suppression
//!
//! - `UNSAFE_BUFFERS(...)` around the expression
//! - `UNSAFE_BUFFER_USAGE` on the enclosing function
//! - `#pragma allow_unsafe_buffers` opts a whole file out
//!
//! Files covered by a path exclusion (legacy code not yet cleaned up) are
//! skipped unless they carry `#pragma check_unsafe_buffers`.

use policy_lint_core::{
    AnnotationPolicy, Matcher, Message, NodeKind, Rule, RuleMatch, Severity, TypeMatcher,
};

/// Rule code for unsafe-buffers.
pub const CODE: &str = "PL006";

/// Rule name for unsafe-buffers.
pub const NAME: &str = "unsafe-buffers";

/// Annotation spelled by `UNSAFE_BUFFER_USAGE`.
pub const UNSAFE_BUFFER_USAGE: &str = "unsafe_buffer_usage";

/// Pragma opting a file out.
pub const ALLOW_PRAGMA: &str = "allow_unsafe_buffers";

/// Pragma opting an excluded file back in.
pub const CHECK_PRAGMA: &str = "check_unsafe_buffers";

/// Flags pointer subscripts and calls to unsafe functions outside
/// `UNSAFE_BUFFERS()`.
#[derive(Debug, Clone)]
pub struct UnsafeBuffers {
    matcher: Matcher,
    severity: Severity,
}

impl Default for UnsafeBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl UnsafeBuffers {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::any_of(vec![
                    Matcher::all_of(vec![
                        Matcher::kind(NodeKind::ArraySubscript),
                        Matcher::operand(Matcher::has_type(TypeMatcher::pointer_to(
                            TypeMatcher::Any,
                        ))),
                    ]),
                    Matcher::all_of(vec![
                        Matcher::kind(NodeKind::Call),
                        Matcher::refers_to(
                            Matcher::has_annotation(UNSAFE_BUFFER_USAGE).bind("callee"),
                        ),
                    ]),
                ]),
                Matcher::not(Matcher::ancestor(Matcher::kind(NodeKind::SuppressScope))),
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

impl Rule for UnsafeBuffers {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Flags unchecked buffer access outside UNSAFE_BUFFERS()"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    fn annotation_policy(&self) -> AnnotationPolicy {
        AnnotationPolicy {
            suppress: &[UNSAFE_BUFFER_USAGE],
            opt_in: &[],
            suppress_pragmas: &[ALLOW_PRAGMA],
            opt_in_pragmas: &[CHECK_PRAGMA],
        }
    }

    fn message(&self, m: &RuleMatch<'_>) -> Message {
        match m.bound_node("callee") {
            Some(callee) => Message::new("function '%0' introduces unsafe buffer manipulation")
                .arg(callee.qualified_name.as_deref().unwrap_or("<anonymous>")),
            None => Message::new("unsafe buffer access"),
        }
    }

    fn help(&self) -> Option<&'static str> {
        Some("use base::span, or wrap the expression in UNSAFE_BUFFERS() with a safety comment")
    }
}
