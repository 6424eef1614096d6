//! Rule discouraging standard containers in Blink data members.
//!
//! # Rationale
//!
//! Blink code keeps its object graph in its own containers, which integrate
//! with the garbage collector and its allocator. A `std::vector` member
//! silently opts out of both.
//!
//! # Configuration
//!
//! - `types`: qualified names of discouraged types (default: `["std::vector"]`)
//! - `namespace`: namespace whose fields are checked (default: `blink`)
//!
//! # Suppression
//!
//! - `ALLOW_DISCOURAGED_TYPE(...)` on the field, or on any alias the field's
//!   type is spelled through (annotation `allow_discouraged_type`)
//!
//! Parameters and locals are never flagged. Neither is a field spelled
//! through an alias whose innermost layer is declared outside the namespace;
//! such aliases are audited where they are declared.

use policy_lint_core::{
    AnnotationPolicy, Matcher, Message, NodeKind, Rule, RuleMatch, RuleTarget, Severity,
    TypeMatcher,
};

/// Rule code for discouraged-type.
pub const CODE: &str = "PL005";

/// Rule name for discouraged-type.
pub const NAME: &str = "discouraged-type";

/// Annotation spelled by `ALLOW_DISCOURAGED_TYPE`.
pub const ALLOW_DISCOURAGED_TYPE: &str = "allow_discouraged_type";

/// Default discouraged types.
pub const DEFAULT_TYPES: &[&str] = &["std::vector"];

/// Default checked namespace.
pub const DEFAULT_NAMESPACE: &str = "blink";

/// Flags fields whose type is a discouraged container.
#[derive(Debug, Clone)]
pub struct DiscouragedType {
    types: Vec<String>,
    namespace: String,
    matcher: Matcher,
    severity: Severity,
}

impl Default for DiscouragedType {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscouragedType {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        let types: Vec<String> = DEFAULT_TYPES.iter().map(ToString::to_string).collect();
        let namespace = DEFAULT_NAMESPACE.to_string();
        Self {
            matcher: build_matcher(&types, &namespace),
            types,
            namespace,
            severity: Severity::Error,
        }
    }

    /// Sets the discouraged types. An empty list keeps the defaults.
    #[must_use]
    pub fn types(mut self, types: Vec<String>) -> Self {
        if !types.is_empty() {
            self.types = types;
            self.matcher = build_matcher(&self.types, &self.namespace);
        }
        self
    }

    /// Sets the checked namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self.matcher = build_matcher(&self.types, &self.namespace);
        self
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

fn build_matcher(types: &[String], namespace: &str) -> Matcher {
    let inside = format!("{namespace}::**");
    let discouraged = TypeMatcher::AnyOf(types.iter().map(TypeMatcher::record).collect());

    Matcher::all_of(vec![
        Matcher::kind(NodeKind::Field),
        Matcher::qualified_name(inside.clone()),
        Matcher::has_type(TypeMatcher::underlying(discouraged.bind("discouraged"))),
        Matcher::not(Matcher::has_type(TypeMatcher::any_alias(
            TypeMatcher::alias_annotated(ALLOW_DISCOURAGED_TYPE),
        ))),
        Matcher::not(Matcher::has_type(TypeMatcher::innermost_alias(
            TypeMatcher::not(TypeMatcher::named(inside)),
        ))),
    ])
}

impl Rule for DiscouragedType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Discourages standard containers in Blink data members"
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

    fn annotation_policy(&self) -> AnnotationPolicy {
        AnnotationPolicy {
            suppress: &[ALLOW_DISCOURAGED_TYPE],
            ..AnnotationPolicy::default()
        }
    }

    fn message(&self, m: &RuleMatch<'_>) -> Message {
        let ty = m
            .bound_type_id("discouraged")
            .map(|ty| m.type_name(ty))
            .unwrap_or_default();
        Message::new("'%0' is a discouraged type in '%1' data members")
            .arg(ty)
            .arg(self.namespace.clone())
    }

    fn help(&self) -> Option<&'static str> {
        Some("use a WTF container, or annotate the field with ALLOW_DISCOURAGED_TYPE(\"reason\")")
    }
}
