//! Rule suggesting `std::array` for local C arrays.
//!
//! # Rationale
//!
//! `std::array` knows its size, converts to `base::span` without losing
//! it, and can be bounds-checked. A local C array decays to a pointer at
//! the first opportunity.
//!
//! Rewrites are offered only when the new declaration can be spelled
//! unambiguously: the variable is named, every dimension is known, and
//! the element type is neither unnamed nor defined inline in the
//! declaration.

use policy_lint_core::{
    Matcher, Message, NodeKind, RewriteContext, Rule, RuleMatch, RuleTarget, Severity,
    SourceRange, SyntaxTree, Type, TypeId, TypeMatcher,
};

/// Rule code for c-array-to-std-array.
pub const CODE: &str = "PL010";

/// Rule name for c-array-to-std-array.
pub const NAME: &str = "c-array-to-std-array";

/// Suggests `std::array<T, N>` for local C array variables.
#[derive(Debug, Clone)]
pub struct CArrayToStdArray {
    matcher: Matcher,
    severity: Severity,
}

impl Default for CArrayToStdArray {
    fn default() -> Self {
        Self::new()
    }
}

impl CArrayToStdArray {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Var),
                Matcher::has_type(TypeMatcher::array_of(TypeMatcher::Any)),
                Matcher::ancestor(Matcher::any_of(vec![
                    Matcher::kind(NodeKind::Function),
                    Matcher::kind(NodeKind::Method),
                ])),
            ]),
            severity: Severity::Info,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl Rule for CArrayToStdArray {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Suggests std::array for local C arrays"
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
        Message::new("local C array '%0' can be a std::array").arg(m.display_name())
    }

    fn supports_rewrite(&self) -> bool {
        true
    }

    fn rewrite(&self, m: &RuleMatch<'_>, edits: &mut RewriteContext<'_>) {
        let node = m.node();
        if node.inline_type_definition {
            return;
        }
        let (Some(name), Some(ty), Some(type_range), Some(end)) = (
            node.name.as_deref(),
            node.ty,
            node.type_range,
            node.declarator_end,
        ) else {
            return;
        };
        let Some(spelled) = std_array(m.tree, ty) else {
            return;
        };
        if edits.replace(
            SourceRange::new(type_range.begin, end),
            format!("{spelled} {name}"),
        ) {
            edits.include_system_header("array");
        }
    }
}

/// Spells an array type as nested `std::array`s. `None` when a dimension
/// is unknown or the element type has no usable name.
fn std_array(tree: &SyntaxTree, ty: TypeId) -> Option<String> {
    match tree.ty(ty) {
        Type::Array {
            element,
            size: Some(n),
        } => {
            let element = match tree.ty(*element) {
                Type::Array { .. } => std_array(tree, *element)?,
                _ => element_name(tree, *element)?,
            };
            Some(format!("std::array<{element}, {n}>"))
        }
        _ => None,
    }
}

fn element_name(tree: &SyntaxTree, ty: TypeId) -> Option<String> {
    if let Type::Record { qualified_name, .. } = tree.ty(tree.desugar(ty)) {
        if qualified_name.is_empty() || qualified_name.contains("(anonymous") {
            return None;
        }
    }
    Some(tree.type_name(ty))
}
