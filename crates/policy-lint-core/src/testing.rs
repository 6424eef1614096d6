//! Helpers for building syntax trees in tests.
//!
//! Not part of the stable API.

use crate::source::{
    Expansion, ExpansionId, FileId, FileKind, RawLocation, SourceFile, SourceMap, SourceRange,
};
use crate::tree::{Node, NodeId, NodeKind, SyntaxTree, TreeError, Type, TypeId};
use std::path::PathBuf;

/// Shorthand for a buffer location.
#[must_use]
pub fn loc(file: FileId, offset: u32) -> RawLocation {
    RawLocation::file(file, offset)
}

/// Shorthand for a range inside one buffer.
#[must_use]
pub fn range(file: FileId, begin: u32, end: u32) -> SourceRange {
    SourceRange::in_file(file, begin, end)
}

/// Shorthand for a range inside one macro expansion.
#[must_use]
pub fn macro_range(expansion: ExpansionId, begin: u32, end: u32) -> SourceRange {
    SourceRange::new(
        RawLocation::in_macro(expansion, begin),
        RawLocation::in_macro(expansion, end),
    )
}

/// Incrementally builds a [`SyntaxTree`].
///
/// The root translation-unit node is created up front; every other node is
/// attached to a parent with [`TreeBuilder::node`].
#[derive(Debug)]
pub struct TreeBuilder {
    unit: PathBuf,
    sources: SourceMap,
    types: Vec<Type>,
    nodes: Vec<Node>,
}

impl TreeBuilder {
    /// Starts a tree for the given unit.
    #[must_use]
    pub fn new(unit: impl Into<PathBuf>) -> Self {
        Self {
            unit: unit.into(),
            sources: SourceMap::new(),
            types: Vec::new(),
            nodes: vec![Node::new(
                NodeKind::TranslationUnit,
                range(FileId(0), 0, 0),
            )],
        }
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Adds a user file without text.
    pub fn file(&mut self, path: &str) -> FileId {
        self.sources.add_file(SourceFile::new(path, FileKind::User))
    }

    /// Adds a user file with text (and therefore line information).
    pub fn file_with_text(&mut self, path: &str, text: &str) -> FileId {
        self.sources.add_file(SourceFile::from_text(path, text))
    }

    /// Adds a file of the given kind.
    pub fn file_of_kind(&mut self, path: &str, kind: FileKind) -> FileId {
        self.sources.add_file(SourceFile::new(path, kind))
    }

    /// Adds a fully configured file.
    pub fn add_file(&mut self, file: SourceFile) -> FileId {
        self.sources.add_file(file)
    }

    /// Adds a macro expansion.
    pub fn expansion(
        &mut self,
        macro_name: &str,
        spelling: RawLocation,
        invocation: SourceRange,
    ) -> ExpansionId {
        self.sources.add_expansion(Expansion {
            macro_name: macro_name.to_string(),
            spelling,
            invocation,
        })
    }

    /// Adds a type.
    pub fn ty(&mut self, ty: Type) -> TypeId {
        self.types.push(ty);
        TypeId(to_u32(self.types.len() - 1))
    }

    /// Adds a builtin type.
    pub fn builtin(&mut self, name: &str) -> TypeId {
        self.ty(Type::Builtin {
            name: name.to_string(),
        })
    }

    /// Adds a pointer type.
    pub fn pointer(&mut self, pointee: TypeId) -> TypeId {
        self.ty(Type::Pointer { pointee })
    }

    /// Adds a reference type.
    pub fn reference(&mut self, pointee: TypeId) -> TypeId {
        self.ty(Type::Reference { pointee })
    }

    /// Adds a record type, a specialization when `args` is non-empty.
    pub fn record(&mut self, qualified_name: &str, args: Vec<TypeId>) -> TypeId {
        self.ty(Type::Record {
            qualified_name: qualified_name.to_string(),
            args,
            decl: None,
        })
    }

    /// Adds a record type backed by a declaration node.
    pub fn record_with_decl(&mut self, qualified_name: &str, decl: NodeId) -> TypeId {
        self.ty(Type::Record {
            qualified_name: qualified_name.to_string(),
            args: Vec::new(),
            decl: Some(decl),
        })
    }

    /// Adds an alias type.
    pub fn alias(&mut self, qualified_name: &str, target: TypeId) -> TypeId {
        self.ty(Type::Alias {
            qualified_name: qualified_name.to_string(),
            target,
            annotations: Vec::new(),
        })
    }

    /// Adds an alias type carrying an annotation.
    pub fn annotated_alias(
        &mut self,
        qualified_name: &str,
        target: TypeId,
        annotation: &str,
    ) -> TypeId {
        self.ty(Type::Alias {
            qualified_name: qualified_name.to_string(),
            target,
            annotations: vec![annotation.to_string()],
        })
    }

    /// Adds an array type.
    pub fn array(&mut self, element: TypeId, size: Option<u64>) -> TypeId {
        self.ty(Type::Array { element, size })
    }

    /// Appends a node as the last child of `parent`.
    pub fn node(&mut self, parent: NodeId, node: Node) -> NodeId {
        self.nodes.push(node);
        let id = NodeId(to_u32(self.nodes.len() - 1));
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Appends a node reachable from no parent.
    pub fn orphan(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(to_u32(self.nodes.len() - 1))
    }

    /// Mutable access to an already added node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Finishes the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree fails validation.
    pub fn try_build(self) -> Result<SyntaxTree, TreeError> {
        let mut tree = SyntaxTree {
            unit: self.unit,
            sources: self.sources,
            types: self.types,
            nodes: self.nodes,
            root: NodeId(0),
        };
        tree.finalize()?;
        Ok(tree)
    }

    /// Finishes the tree.
    ///
    /// # Panics
    ///
    /// Panics if the tree fails validation.
    #[must_use]
    pub fn build(self) -> SyntaxTree {
        match self.try_build() {
            Ok(tree) => tree,
            Err(err) => panic!("invalid test tree: {err}"),
        }
    }
}

fn to_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
