//! Context types for rule execution.

use crate::matcher::Bindings;
use crate::tree::{Node, NodeId, SyntaxTree, Type, TypeId};

/// A successful match handed to a rule for messages and rewrites.
#[derive(Debug, Clone)]
pub struct RuleMatch<'t> {
    /// Tree of the unit being analyzed.
    pub tree: &'t SyntaxTree,
    /// Node the top-level matcher matched.
    pub node: NodeId,
    /// Captures of the matcher.
    pub bindings: Bindings,
}

impl<'t> RuleMatch<'t> {
    /// Creates a match record.
    #[must_use]
    pub fn new(tree: &'t SyntaxTree, node: NodeId, bindings: Bindings) -> Self {
        Self {
            tree,
            node,
            bindings,
        }
    }

    /// The matched node.
    #[must_use]
    pub fn node(&self) -> &'t Node {
        self.tree.node(self.node)
    }

    /// A captured node.
    #[must_use]
    pub fn bound_node(&self, name: &str) -> Option<&'t Node> {
        self.bindings.node(name).map(|id| self.tree.node(id))
    }

    /// A captured type.
    #[must_use]
    pub fn bound_type(&self, name: &str) -> Option<&'t Type> {
        self.bindings.ty(name).map(|id| self.tree.ty(id))
    }

    /// Id of a captured type.
    #[must_use]
    pub fn bound_type_id(&self, name: &str) -> Option<TypeId> {
        self.bindings.ty(name)
    }

    /// Source spelling of a type.
    #[must_use]
    pub fn type_name(&self, ty: TypeId) -> String {
        self.tree.type_name(ty)
    }

    /// Qualified name of the matched node, falling back to its simple name.
    #[must_use]
    pub fn display_name(&self) -> &'t str {
        let node = self.node();
        node.qualified_name
            .as_deref()
            .or(node.name.as_deref())
            .unwrap_or("<anonymous>")
    }
}
