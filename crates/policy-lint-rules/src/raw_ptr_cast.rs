//! Rule forbidding bit-casts of `raw_ptr<T>*`.
//!
//! # Rationale
//!
//! Reinterpreting the address of a `raw_ptr<T>` as some other type lets code
//! copy or overwrite the wrapped pointer without going through `raw_ptr`,
//! which unbalances its reference count and bypasses its checks.
//!
//! Casts in a few headers are known to be benign (standard containers of
//! `raw_ptr`, `CHECK_EQ` on `raw_ptr`) and are always ignored.

use policy_lint_core::{
    CastKind, Matcher, Message, NodeKind, Rule, RuleMatch, Severity, TypeMatcher,
};

/// Rule code for raw-ptr-cast.
pub const CODE: &str = "PL003";

/// Rule name for raw-ptr-cast.
pub const NAME: &str = "raw-ptr-cast";

/// Paths where a `raw_ptr<T>*` cast is expected.
pub const IGNORED_PATHS: &[&str] = &[
    "buildtools/third_party/libc++",
    "base/check_op.h",
    "ui/views/controls/table/table_view.cc",
    "base/containers/vector_buffer.h",
    "base/containers/circular_deque.h",
];

/// Flags bit-casts whose source is a pointer to `base::raw_ptr<…>`.
#[derive(Debug, Clone)]
pub struct RawPtrCast {
    matcher: Matcher,
    severity: Severity,
}

impl Default for RawPtrCast {
    fn default() -> Self {
        Self::new()
    }
}

impl RawPtrCast {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Cast),
                Matcher::CastKind(CastKind::BitCast),
                Matcher::operand(Matcher::has_type(TypeMatcher::pointer_to(
                    TypeMatcher::specialization("base::raw_ptr"),
                ))),
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

impl Rule for RawPtrCast {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Forbids casting raw_ptr<T>* to another type"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    fn default_excluded_paths(&self) -> &'static [&'static str] {
        IGNORED_PATHS
    }

    fn message(&self, _m: &RuleMatch<'_>) -> Message {
        Message::new(
            "Casting raw_ptr<T>* to another type is not allowed as it may cause BRP ref count \
             mismatch and bypass security checks.",
        )
    }
}
