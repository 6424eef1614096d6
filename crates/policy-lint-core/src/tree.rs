//! Read-only view of a translation unit's syntax tree.
//!
//! The tree is produced by an external frontend and shipped as a JSON dump.
//! Nodes and types live in flat arrays addressed by [`NodeId`] and
//! [`TypeId`]; parent links are derived once by [`SyntaxTree::finalize`].

use crate::source::{RawLocation, SourceMap, SourceRange};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on alias/array layers followed when desugaring a type.
const MAX_TYPE_DEPTH: usize = 64;

/// Index of a node in [`SyntaxTree::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the index into [`SyntaxTree::nodes`].
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a type in [`SyntaxTree::types`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Returns the index into [`SyntaxTree::types`].
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Root of the tree.
    TranslationUnit,
    /// Namespace declaration.
    Namespace,
    /// Class, struct or union declaration.
    Record,
    /// Non-static data member.
    Field,
    /// Free function.
    Function,
    /// Member function, constructor or destructor.
    Method,
    /// Function parameter.
    Param,
    /// Variable declaration.
    Var,
    /// `using`/`typedef` alias declaration.
    TypeAlias,
    /// Compound statement.
    Block,
    /// Call expression.
    Call,
    /// Explicit or implicit cast.
    Cast,
    /// `base[index]` expression.
    ArraySubscript,
    /// Reference to a declaration.
    DeclRef,
    /// Member access.
    MemberRef,
    /// Unary operator.
    UnaryOp,
    /// Binary operator.
    BinaryOp,
    /// Region wrapped in a suppression construct such as `UNSAFE_BUFFERS(...)`.
    SuppressScope,
    /// Anything else.
    Other,
}

impl NodeKind {
    /// Every node kind, in declaration order.
    pub const ALL: [NodeKind; 19] = [
        Self::TranslationUnit,
        Self::Namespace,
        Self::Record,
        Self::Field,
        Self::Function,
        Self::Method,
        Self::Param,
        Self::Var,
        Self::TypeAlias,
        Self::Block,
        Self::Call,
        Self::Cast,
        Self::ArraySubscript,
        Self::DeclRef,
        Self::MemberRef,
        Self::UnaryOp,
        Self::BinaryOp,
        Self::SuppressScope,
        Self::Other,
    ];

    /// Returns true for declaration kinds.
    #[must_use]
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            Self::Namespace
                | Self::Record
                | Self::Field
                | Self::Function
                | Self::Method
                | Self::Param
                | Self::Var
                | Self::TypeAlias
        )
    }
}

/// Cast kind as classified by the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    /// Reinterpretation of a pointer as another pointer type.
    BitCast,
    /// Cast that changes nothing at runtime.
    NoOp,
    /// Derived-to-base pointer conversion.
    DerivedToBase,
    /// Base-to-derived pointer conversion.
    BaseToDerived,
    /// Integral conversion.
    IntegralCast,
    /// Load of an lvalue.
    LValueToRValue,
    /// Array-to-pointer decay.
    ArrayToPointerDecay,
    /// Anything else.
    #[serde(other)]
    Other,
}

/// Virtual-function specifier keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecifierKind {
    /// `virtual`
    Virtual,
    /// `override`
    Override,
    /// `final`
    Final,
}

impl std::fmt::Display for SpecifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Virtual => write!(f, "virtual"),
            Self::Override => write!(f, "override"),
            Self::Final => write!(f, "final"),
        }
    }
}

/// A specifier keyword and where it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifier {
    /// Which keyword.
    pub kind: SpecifierKind,
    /// Range of the keyword token.
    pub range: SourceRange,
}

/// A type in the unit's type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// Builtin type such as `int` or `const char`.
    Builtin {
        /// Spelling of the type.
        name: String,
    },
    /// `T*`
    Pointer {
        /// Pointed-to type.
        pointee: TypeId,
    },
    /// `T&`
    Reference {
        /// Referenced type.
        pointee: TypeId,
    },
    /// Class type, possibly a template specialization.
    Record {
        /// Fully qualified name without template arguments.
        qualified_name: String,
        /// Template arguments, in order.
        #[serde(default)]
        args: Vec<TypeId>,
        /// Declaration of the record, when visible in this unit.
        #[serde(default)]
        decl: Option<NodeId>,
    },
    /// `using`/`typedef` alias.
    Alias {
        /// Fully qualified alias name.
        qualified_name: String,
        /// Aliased type.
        target: TypeId,
        /// Annotations attached to the alias declaration.
        #[serde(default)]
        annotations: Vec<String>,
    },
    /// C array.
    Array {
        /// Element type.
        element: TypeId,
        /// Element count, when constant.
        #[serde(default)]
        size: Option<u64>,
    },
    /// Template type parameter.
    TemplateParam {
        /// Parameter name.
        name: String,
    },
    /// Function type.
    Function {
        /// Printed signature.
        #[serde(default)]
        signature: String,
    },
}

/// A node of the syntax tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node kind.
    pub kind: NodeKind,
    /// Unqualified name, for named declarations.
    #[serde(default)]
    pub name: Option<String>,
    /// Fully qualified name, for named declarations.
    #[serde(default)]
    pub qualified_name: Option<String>,
    /// Source range of the whole node.
    pub range: SourceRange,
    /// Declared or expression type.
    #[serde(default)]
    pub ty: Option<TypeId>,
    /// Range of the written type (for declarations).
    #[serde(default)]
    pub type_range: Option<SourceRange>,
    /// Annotation strings (`__attribute__((annotate(...)))` and friends).
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Children in source order.
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Declaration referenced by a call or reference expression.
    #[serde(default)]
    pub refers_to: Option<NodeId>,
    /// Cast classification, for casts.
    #[serde(default)]
    pub cast_kind: Option<CastKind>,
    /// Template pattern this node was implicitly instantiated from.
    #[serde(default)]
    pub instantiated_from: Option<NodeId>,
    /// Virtual specifiers written on a method.
    #[serde(default)]
    pub specifiers: Vec<Specifier>,
    /// Whether a method overrides a base-class method.
    #[serde(default)]
    pub overrides: bool,
    /// Where a trailing specifier would be inserted on a method declarator.
    #[serde(default)]
    pub declarator_end: Option<RawLocation>,
    /// Whether the declared type is defined inline in the declaration.
    #[serde(default)]
    pub inline_type_definition: bool,
    /// Parent node, derived by [`SyntaxTree::finalize`].
    #[serde(skip)]
    pub parent: Option<NodeId>,
}

impl Node {
    /// Creates a node with only kind and range set.
    #[must_use]
    pub fn new(kind: NodeKind, range: SourceRange) -> Self {
        Self {
            kind,
            name: None,
            qualified_name: None,
            range,
            ty: None,
            type_range: None,
            annotations: Vec::new(),
            children: Vec::new(),
            refers_to: None,
            cast_kind: None,
            instantiated_from: None,
            specifiers: Vec::new(),
            overrides: false,
            declarator_end: None,
            inline_type_definition: false,
            parent: None,
        }
    }

    /// Sets the unqualified and qualified names.
    ///
    /// The unqualified name is the last `::` segment of `qualified`.
    #[must_use]
    pub fn named(mut self, qualified: impl Into<String>) -> Self {
        let qualified = qualified.into();
        let name = qualified
            .rsplit("::")
            .next()
            .unwrap_or(qualified.as_str())
            .to_string();
        self.name = Some(name);
        self.qualified_name = Some(qualified);
        self
    }

    /// Sets the node type.
    #[must_use]
    pub fn typed(mut self, ty: TypeId) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Sets the written-type range.
    #[must_use]
    pub fn with_type_range(mut self, range: SourceRange) -> Self {
        self.type_range = Some(range);
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Sets the referenced declaration.
    #[must_use]
    pub fn referring_to(mut self, decl: NodeId) -> Self {
        self.refers_to = Some(decl);
        self
    }

    /// Sets the cast kind.
    #[must_use]
    pub fn with_cast_kind(mut self, kind: CastKind) -> Self {
        self.cast_kind = Some(kind);
        self
    }

    /// Marks the node as an implicit instantiation of `pattern`.
    #[must_use]
    pub fn instantiated_from(mut self, pattern: NodeId) -> Self {
        self.instantiated_from = Some(pattern);
        self
    }

    /// Adds a virtual specifier.
    #[must_use]
    pub fn with_specifier(mut self, kind: SpecifierKind, range: SourceRange) -> Self {
        self.specifiers.push(Specifier { kind, range });
        self
    }

    /// Marks a method as overriding.
    #[must_use]
    pub fn overriding(mut self) -> Self {
        self.overrides = true;
        self
    }

    /// Sets the declarator end used for specifier insertion.
    #[must_use]
    pub fn with_declarator_end(mut self, at: RawLocation) -> Self {
        self.declarator_end = Some(at);
        self
    }

    /// Marks the declared type as defined inline.
    #[must_use]
    pub fn with_inline_type_definition(mut self) -> Self {
        self.inline_type_definition = true;
        self
    }

    /// Returns true if the node carries the annotation.
    #[must_use]
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }

    /// Returns the first specifier of the given kind.
    #[must_use]
    pub fn specifier(&self, kind: SpecifierKind) -> Option<&Specifier> {
        self.specifiers.iter().find(|s| s.kind == kind)
    }
}

/// Types a type refers to directly.
fn type_references(ty: &Type) -> Vec<TypeId> {
    match ty {
        Type::Pointer { pointee } | Type::Reference { pointee } => vec![*pointee],
        Type::Record { args, .. } => args.clone(),
        Type::Alias { target, .. } => vec![*target],
        Type::Array { element, .. } => vec![*element],
        Type::Builtin { .. } | Type::TemplateParam { .. } | Type::Function { .. } => Vec::new(),
    }
}

/// Errors raised while loading or validating a tree dump.
#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    /// The dump could not be read.
    #[error("failed to read syntax tree {path}: {source}")]
    #[diagnostic(code(policy_lint::tree::io))]
    Io {
        /// Dump path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The dump is not valid JSON for the schema.
    #[error("malformed syntax tree dump: {0}")]
    #[diagnostic(
        code(policy_lint::tree::json),
        help("the dump must follow the schema emitted by the frontend exporter")
    )]
    Json(#[from] serde_json::Error),

    /// A node, type, file or expansion id is out of range.
    #[error("node {node} references missing {what} {id}")]
    #[diagnostic(code(policy_lint::tree::dangling))]
    Dangling {
        /// Index of the offending node.
        node: usize,
        /// What kind of id dangles.
        what: &'static str,
        /// The dangling id.
        id: u32,
    },

    /// A node is listed as the child of two parents (or of itself).
    #[error("node {child} has more than one parent")]
    #[diagnostic(code(policy_lint::tree::shared_child))]
    SharedChild {
        /// Index of the shared child.
        child: usize,
    },

    /// Parent links or type references loop back on themselves.
    #[error("{what} {index} is part of a cycle")]
    #[diagnostic(code(policy_lint::tree::cycle))]
    Cycle {
        /// `"node"` or `"type"`.
        what: &'static str,
        /// Index of a node or type on the cycle.
        index: usize,
    },
}

/// A translation unit's syntax tree with its type table and source map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Main file of the unit.
    pub unit: PathBuf,
    /// Buffers and macro expansions.
    #[serde(flatten)]
    pub sources: SourceMap,
    /// Type table.
    #[serde(default)]
    pub types: Vec<Type>,
    /// Node table.
    pub nodes: Vec<Node>,
    /// Root node (normally a translation unit).
    pub root: NodeId,
}

impl SyntaxTree {
    /// Loads a tree dump from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails structural validation.
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let content = std::fs::read_to_string(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses a tree dump.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the tree fails validation.
    pub fn from_json(content: &str) -> Result<Self, TreeError> {
        let mut tree: Self = serde_json::from_str(content)?;
        tree.finalize()?;
        Ok(tree)
    }

    /// Validates ids, derives parent links and fills in line tables.
    ///
    /// # Errors
    ///
    /// Returns an error on dangling ids or a node with two parents.
    pub fn finalize(&mut self) -> Result<(), TreeError> {
        self.sources.finalize();
        self.validate()?;

        for node in &mut self.nodes {
            node.parent = None;
        }
        for index in 0..self.nodes.len() {
            let children = self.nodes[index].children.clone();
            for child in children {
                let slot = &mut self.nodes[child.index()].parent;
                if slot.is_some() || child.index() == index {
                    return Err(TreeError::SharedChild {
                        child: child.index(),
                    });
                }
                *slot = Some(NodeId(u32::try_from(index).unwrap_or(u32::MAX)));
            }
        }
        self.check_node_cycles()
    }

    /// Every node must be reachable from a node without a parent. With at
    /// most one parent per node, anything left over sits on a parent cycle.
    fn check_node_cycles(&self) -> Result<(), TreeError> {
        let mut reached = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| i)
            .collect();
        while let Some(index) = stack.pop() {
            reached[index] = true;
            stack.extend(self.nodes[index].children.iter().map(|c| c.index()));
        }
        match reached.iter().position(|r| !r) {
            Some(index) => Err(TreeError::Cycle {
                what: "node",
                index,
            }),
            None => Ok(()),
        }
    }

    /// Rejects type references that lead back to the type they start from.
    fn check_type_cycles(&self) -> Result<(), TreeError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.types.len()];
        for start in 0..self.types.len() {
            if marks[start] != Mark::New {
                continue;
            }
            // (type, next referenced type to visit)
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::Active;
            while let Some((index, next)) = stack.pop() {
                let referenced = type_references(&self.types[index]);
                let Some(child) = referenced.get(next).map(|t| t.index()) else {
                    marks[index] = Mark::Done;
                    continue;
                };
                stack.push((index, next + 1));
                match marks[child] {
                    Mark::Active => {
                        return Err(TreeError::Cycle {
                            what: "type",
                            index: child,
                        })
                    }
                    Mark::New => {
                        marks[child] = Mark::Active;
                        stack.push((child, 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), TreeError> {
        let node_count = self.nodes.len();
        let type_count = self.types.len();
        let dangling = |node: usize, what: &'static str, id: u32| TreeError::Dangling {
            node,
            what,
            id,
        };

        if self.root.index() >= node_count {
            return Err(dangling(0, "root node", self.root.0));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            for child in &node.children {
                if child.index() >= node_count {
                    return Err(dangling(index, "child node", child.0));
                }
            }
            for id in [node.refers_to, node.instantiated_from].into_iter().flatten() {
                if id.index() >= node_count {
                    return Err(dangling(index, "node", id.0));
                }
            }
            if let Some(ty) = node.ty {
                if ty.index() >= type_count {
                    return Err(dangling(index, "type", ty.0));
                }
            }
        }

        for ty in &self.types {
            if let Some(bad) = type_references(ty).iter().find(|t| t.index() >= type_count) {
                return Err(dangling(0, "type", bad.0));
            }
            if let Type::Record { decl: Some(decl), .. } = ty {
                if decl.index() >= node_count {
                    return Err(dangling(0, "record declaration", decl.0));
                }
            }
        }

        self.check_type_cycles()
    }

    /// Returns a node. Ids handed out by the tree are always valid.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns a type. Ids handed out by the tree are always valid.
    #[must_use]
    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Iterates over the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Returns the descendants of a node in pre-order, excluding the node.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// Returns every node exactly once: pre-order from the root, followed by
    /// any nodes unreachable from the root in index order.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        order.push(self.root);
        order.extend(self.descendants(self.root));

        if order.len() < self.nodes.len() {
            let mut seen = vec![false; self.nodes.len()];
            for id in &order {
                seen[id.index()] = true;
            }
            let orphans: Vec<NodeId> = seen
                .iter()
                .enumerate()
                .filter(|(_, s)| !**s)
                .map(|(i, _)| NodeId(u32::try_from(i).unwrap_or(u32::MAX)))
                .collect();
            tracing::debug!("{} node(s) unreachable from root", orphans.len());
            order.extend(orphans);
        }
        order
    }

    /// Returns the nearest ancestor of one of the given kinds.
    #[must_use]
    pub fn enclosing(&self, id: NodeId, kinds: &[NodeKind]) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| kinds.contains(&self.node(a).kind))
    }

    /// Returns true if the node is declared outside any function or record.
    #[must_use]
    pub fn is_file_scope(&self, id: NodeId) -> bool {
        self.enclosing(
            id,
            &[
                NodeKind::Function,
                NodeKind::Method,
                NodeKind::Record,
                NodeKind::Block,
            ],
        )
        .is_none()
    }

    /// Follows alias layers to the first non-alias type.
    #[must_use]
    pub fn desugar(&self, ty: TypeId) -> TypeId {
        let mut current = ty;
        for _ in 0..MAX_TYPE_DEPTH {
            match self.ty(current) {
                Type::Alias { target, .. } => current = *target,
                _ => break,
            }
        }
        current
    }

    /// Follows alias and array layers to the underlying element type.
    #[must_use]
    pub fn underlying(&self, ty: TypeId) -> TypeId {
        let mut current = ty;
        for _ in 0..MAX_TYPE_DEPTH {
            match self.ty(current) {
                Type::Alias { target, .. } => current = *target,
                Type::Array { element, .. } => current = *element,
                _ => break,
            }
        }
        current
    }

    /// Returns the alias layers of a type, outermost first, looking through
    /// array element types.
    #[must_use]
    pub fn alias_chain(&self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = ty;
        for _ in 0..MAX_TYPE_DEPTH {
            match self.ty(current) {
                Type::Alias { target, .. } => {
                    chain.push(current);
                    current = *target;
                }
                Type::Array { element, .. } => current = *element,
                _ => break,
            }
        }
        chain
    }

    /// Returns the innermost alias layer, the one naming the real type.
    #[must_use]
    pub fn innermost_alias(&self, ty: TypeId) -> Option<TypeId> {
        self.alias_chain(ty).last().copied()
    }

    /// Returns the qualified name of a record or alias type.
    #[must_use]
    pub fn type_qualified_name(&self, ty: TypeId) -> Option<&str> {
        match self.ty(ty) {
            Type::Record { qualified_name, .. } | Type::Alias { qualified_name, .. } => {
                Some(qualified_name)
            }
            _ => None,
        }
    }

    /// Renders a type the way it would be written in source.
    #[must_use]
    pub fn type_name(&self, ty: TypeId) -> String {
        self.type_name_at_depth(ty, 0)
    }

    fn type_name_at_depth(&self, ty: TypeId, depth: usize) -> String {
        if depth > MAX_TYPE_DEPTH {
            return "...".to_string();
        }
        let name = |t: TypeId| self.type_name_at_depth(t, depth + 1);
        match self.ty(ty) {
            Type::Builtin { name } | Type::TemplateParam { name } => name.clone(),
            Type::Pointer { pointee } => format!("{}*", name(*pointee)),
            Type::Reference { pointee } => format!("{}&", name(*pointee)),
            Type::Record {
                qualified_name,
                args,
                ..
            } => {
                if args.is_empty() {
                    qualified_name.clone()
                } else {
                    let args: Vec<String> = args.iter().map(|a| name(*a)).collect();
                    format!("{qualified_name}<{}>", args.join(", "))
                }
            }
            Type::Alias { qualified_name, .. } => qualified_name.clone(),
            Type::Array { element, size } => match size {
                Some(n) => format!("{}[{n}]", name(*element)),
                None => format!("{}[]", name(*element)),
            },
            Type::Function { signature } => signature.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FileId, SourceFile};

    fn range(begin: u32, end: u32) -> SourceRange {
        SourceRange::in_file(FileId(0), begin, end)
    }

    fn small_tree() -> SyntaxTree {
        let mut sources = SourceMap::new();
        sources.add_file(SourceFile::from_text("a.h", "struct S { int* p; };\n"));
        let types = vec![
            Type::Builtin { name: "int".into() },
            Type::Pointer { pointee: TypeId(0) },
        ];
        let mut root = Node::new(NodeKind::TranslationUnit, range(0, 22));
        root.children = vec![NodeId(1)];
        let mut record = Node::new(NodeKind::Record, range(0, 21)).named("S");
        record.children = vec![NodeId(2)];
        let field = Node::new(NodeKind::Field, range(11, 18))
            .named("S::p")
            .typed(TypeId(1));
        let mut tree = SyntaxTree {
            unit: PathBuf::from("a.h"),
            sources,
            types,
            nodes: vec![root, record, field],
            root: NodeId(0),
        };
        tree.finalize().expect("valid tree");
        tree
    }

    #[test]
    fn finalize_derives_parents() {
        let tree = small_tree();
        assert_eq!(tree.parent(NodeId(2)), Some(NodeId(1)));
        assert_eq!(tree.parent(NodeId(1)), Some(NodeId(0)));
        assert_eq!(tree.ancestors(NodeId(2)).collect::<Vec<_>>(), vec![NodeId(1), NodeId(0)]);
    }

    #[test]
    fn finalize_rejects_shared_child() {
        let mut tree = small_tree();
        tree.nodes[0].children.push(NodeId(2));
        assert!(matches!(
            tree.finalize(),
            Err(TreeError::SharedChild { child: 2 })
        ));
    }

    #[test]
    fn finalize_rejects_dangling_type() {
        let mut tree = small_tree();
        tree.nodes[2].ty = Some(TypeId(9));
        assert!(matches!(tree.finalize(), Err(TreeError::Dangling { .. })));
    }

    #[test]
    fn finalize_rejects_dangling_record_declaration() {
        let mut tree = small_tree();
        tree.types.push(Type::Record {
            qualified_name: "S".into(),
            args: vec![],
            decl: Some(NodeId(99)),
        });
        assert!(matches!(
            tree.finalize(),
            Err(TreeError::Dangling { id: 99, .. })
        ));
    }

    #[test]
    fn finalize_rejects_detached_parent_cycle() {
        let mut tree = small_tree();
        let mut first = Node::new(NodeKind::Other, range(0, 0));
        first.children = vec![NodeId(4)];
        let mut second = Node::new(NodeKind::Other, range(0, 0));
        second.children = vec![NodeId(3)];
        tree.nodes.extend([first, second]);
        assert!(matches!(
            tree.finalize(),
            Err(TreeError::Cycle { what: "node", .. })
        ));
    }

    #[test]
    fn finalize_rejects_self_referencing_types() {
        let mut tree = small_tree();
        tree.types.push(Type::Array {
            element: TypeId(2),
            size: None,
        });
        assert!(matches!(
            tree.finalize(),
            Err(TreeError::Cycle { what: "type", index: 2 })
        ));

        let mut tree = small_tree();
        tree.types.push(Type::Alias {
            qualified_name: "A".into(),
            target: TypeId(3),
            annotations: vec![],
        });
        tree.types.push(Type::Pointer { pointee: TypeId(2) });
        assert!(matches!(
            tree.finalize(),
            Err(TreeError::Cycle { what: "type", .. })
        ));
    }

    #[test]
    fn shared_type_is_not_a_cycle() {
        let mut tree = small_tree();
        tree.types.push(Type::Record {
            qualified_name: "std::pair".into(),
            args: vec![TypeId(1), TypeId(1)],
            decl: Some(NodeId(1)),
        });
        tree.finalize().expect("diamond-shaped type references are fine");
    }

    #[test]
    fn preorder_visits_every_node_once() {
        let mut tree = small_tree();
        tree.nodes.push(Node::new(NodeKind::Other, range(0, 0)));
        tree.finalize().expect("valid tree");
        assert_eq!(
            tree.preorder(),
            vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]
        );
    }

    #[test]
    fn field_is_not_file_scope() {
        let tree = small_tree();
        assert!(tree.is_file_scope(NodeId(1)));
        assert!(!tree.is_file_scope(NodeId(2)));
    }

    #[test]
    fn type_names_render_like_source() {
        let mut tree = small_tree();
        tree.types.push(Type::Record {
            qualified_name: "std::vector".into(),
            args: vec![TypeId(0)],
            decl: None,
        });
        tree.types.push(Type::Alias {
            qualified_name: "blink::IntVector".into(),
            target: TypeId(2),
            annotations: vec![],
        });
        tree.types.push(Type::Array {
            element: TypeId(3),
            size: Some(4),
        });
        assert_eq!(tree.type_name(TypeId(1)), "int*");
        assert_eq!(tree.type_name(TypeId(2)), "std::vector<int>");
        assert_eq!(tree.type_name(TypeId(4)), "blink::IntVector[4]");
        assert_eq!(tree.desugar(TypeId(3)), TypeId(2));
        assert_eq!(tree.underlying(TypeId(4)), TypeId(2));
        assert_eq!(tree.alias_chain(TypeId(4)), vec![TypeId(3)]);
    }

    #[test]
    fn parses_json_dump() {
        let json = r#"{
            "unit": "a.cc",
            "files": [{ "path": "a.cc", "text": "int x;\n" }],
            "types": [{ "builtin": { "name": "int" } }],
            "nodes": [
                { "kind": "translation_unit",
                  "range": { "begin": { "file": { "file": 0, "offset": 0 } },
                             "end": { "file": { "file": 0, "offset": 7 } } },
                  "children": [1] },
                { "kind": "var", "name": "x", "qualified_name": "x", "ty": 0,
                  "range": { "begin": { "file": { "file": 0, "offset": 0 } },
                             "end": { "file": { "file": 0, "offset": 5 } } } }
            ],
            "root": 0
        }"#;
        let tree = SyntaxTree::from_json(json).expect("valid dump");
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.parent(NodeId(1)), Some(NodeId(0)));
        assert_eq!(tree.sources.files[0].line_starts, vec![0, 7]);
    }
}
