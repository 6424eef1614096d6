//! Composable structural predicates over syntax nodes.
//!
//! A [`Matcher`] either fails or succeeds with a set of named [`Bindings`].
//! Node predicates and [`TypeMatcher`]s nest freely, so a rule can say
//! "a field in `blink::` whose underlying type is `std::vector<…>`, unless an
//! alias layer carries `allow_discouraged_type`" as one value.
//!
//! Evaluation never mutates the tree. Branches that can fail after binding
//! (`any_of` alternatives, `not`, and the relationship searches) work on a
//! scratch copy of the bindings and only commit it on success.

use crate::tree::{CastKind, NodeId, NodeKind, SpecifierKind, SyntaxTree, Type, TypeId};
use crate::utils::paths::path_matches;
use std::collections::{BTreeMap, BTreeSet};

/// A captured node or type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// A syntax node.
    Node(NodeId),
    /// A type.
    Type(TypeId),
}

/// Named captures produced by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(BTreeMap<String, Bound>);

impl Bindings {
    /// Creates an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a capture, replacing any earlier capture of the same name.
    pub fn insert(&mut self, name: impl Into<String>, bound: Bound) {
        self.0.insert(name.into(), bound);
    }

    /// Returns a captured node.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<NodeId> {
        match self.0.get(name) {
            Some(Bound::Node(id)) => Some(*id),
            _ => None,
        }
    }

    /// Returns a captured type.
    #[must_use]
    pub fn ty(&self, name: &str) -> Option<TypeId> {
        match self.0.get(name) {
            Some(Bound::Type(id)) => Some(*id),
            _ => None,
        }
    }

    /// Returns true if a capture with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Runs `f` against a scratch copy and commits it only on success.
fn try_scoped(bindings: &mut Bindings, f: impl FnOnce(&mut Bindings) -> bool) -> bool {
    let mut scratch = bindings.clone();
    if f(&mut scratch) {
        *bindings = scratch;
        true
    } else {
        false
    }
}

/// Predicate over a syntax node.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Always matches.
    Any,
    /// Node has the given kind.
    Kind(NodeKind),
    /// Unqualified name equals the string.
    Name(String),
    /// Qualified name matches a `::` pattern with `*`/`**` wildcards.
    QualifiedName(String),
    /// Node carries the annotation.
    HasAnnotation(String),
    /// Node's type satisfies the type matcher.
    HasType(TypeMatcher),
    /// Cast node of the given kind.
    CastKind(CastKind),
    /// Node is an implicit template instantiation copy.
    IsInstantiation,
    /// Node has no enclosing function, method, record or block.
    IsFileScope,
    /// Method overrides a base-class method.
    IsOverride,
    /// Method has the specifier written.
    HasSpecifier(SpecifierKind),
    /// Immediate parent matches.
    Parent(Box<Matcher>),
    /// Some ancestor matches (nearest first).
    Ancestor(Box<Matcher>),
    /// Some direct child matches (source order).
    Child(Box<Matcher>),
    /// Some descendant matches (pre-order).
    Descendant(Box<Matcher>),
    /// First child (cast source, subscript base, callee) matches.
    Operand(Box<Matcher>),
    /// Referenced declaration matches.
    RefersTo(Box<Matcher>),
    /// Every matcher matches, evaluated left to right.
    AllOf(Vec<Matcher>),
    /// Some matcher matches; the first success wins.
    AnyOf(Vec<Matcher>),
    /// The matcher does not match. Never produces bindings.
    Not(Box<Matcher>),
    /// Matches like the inner matcher and captures the node.
    Bind(String, Box<Matcher>),
}

impl Matcher {
    /// `kind == k`
    #[must_use]
    pub fn kind(kind: NodeKind) -> Self {
        Self::Kind(kind)
    }

    /// Unqualified name test.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Qualified name pattern test.
    #[must_use]
    pub fn qualified_name(pattern: impl Into<String>) -> Self {
        Self::QualifiedName(pattern.into())
    }

    /// Annotation presence test.
    #[must_use]
    pub fn has_annotation(annotation: impl Into<String>) -> Self {
        Self::HasAnnotation(annotation.into())
    }

    /// Type test.
    #[must_use]
    pub fn has_type(ty: TypeMatcher) -> Self {
        Self::HasType(ty)
    }

    /// Parent test.
    #[must_use]
    pub fn parent(inner: Matcher) -> Self {
        Self::Parent(Box::new(inner))
    }

    /// Ancestor test.
    #[must_use]
    pub fn ancestor(inner: Matcher) -> Self {
        Self::Ancestor(Box::new(inner))
    }

    /// Child test.
    #[must_use]
    pub fn child(inner: Matcher) -> Self {
        Self::Child(Box::new(inner))
    }

    /// Descendant test.
    #[must_use]
    pub fn descendant(inner: Matcher) -> Self {
        Self::Descendant(Box::new(inner))
    }

    /// Operand test.
    #[must_use]
    pub fn operand(inner: Matcher) -> Self {
        Self::Operand(Box::new(inner))
    }

    /// Referenced-declaration test.
    #[must_use]
    pub fn refers_to(inner: Matcher) -> Self {
        Self::RefersTo(Box::new(inner))
    }

    /// Conjunction.
    #[must_use]
    pub fn all_of(matchers: Vec<Matcher>) -> Self {
        Self::AllOf(matchers)
    }

    /// Disjunction.
    #[must_use]
    pub fn any_of(matchers: Vec<Matcher>) -> Self {
        Self::AnyOf(matchers)
    }

    /// Negation.
    #[must_use]
    pub fn not(inner: Matcher) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Captures the matched node under `name`.
    #[must_use]
    pub fn bind(self, name: impl Into<String>) -> Self {
        Self::Bind(name.into(), Box::new(self))
    }

    /// Evaluates the matcher against a node.
    #[must_use]
    pub fn evaluate(&self, tree: &SyntaxTree, node: NodeId) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        self.eval(tree, node, &mut bindings).then_some(bindings)
    }

    /// Returns true if the matcher matches the node.
    #[must_use]
    pub fn matches(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        self.evaluate(tree, node).is_some()
    }

    pub(crate) fn eval(&self, tree: &SyntaxTree, id: NodeId, bindings: &mut Bindings) -> bool {
        let node = tree.node(id);
        match self {
            Self::Any => true,
            Self::Kind(kind) => node.kind == *kind,
            Self::Name(name) => node.name.as_deref() == Some(name.as_str()),
            Self::QualifiedName(pattern) => node
                .qualified_name
                .as_deref()
                .is_some_and(|q| path_matches(q, pattern)),
            Self::HasAnnotation(annotation) => node.has_annotation(annotation),
            Self::HasType(ty) => node.ty.is_some_and(|t| ty.eval(tree, t, bindings)),
            Self::CastKind(kind) => node.cast_kind == Some(*kind),
            Self::IsInstantiation => node.instantiated_from.is_some(),
            Self::IsFileScope => tree.is_file_scope(id),
            Self::IsOverride => node.overrides,
            Self::HasSpecifier(kind) => node.specifier(*kind).is_some(),
            Self::Parent(inner) => tree
                .parent(id)
                .is_some_and(|p| inner.eval(tree, p, bindings)),
            Self::Ancestor(inner) => tree
                .ancestors(id)
                .any(|a| try_scoped(bindings, |b| inner.eval(tree, a, b))),
            Self::Child(inner) => node
                .children
                .iter()
                .any(|&c| try_scoped(bindings, |b| inner.eval(tree, c, b))),
            Self::Descendant(inner) => tree
                .descendants(id)
                .into_iter()
                .any(|d| try_scoped(bindings, |b| inner.eval(tree, d, b))),
            Self::Operand(inner) => node
                .children
                .first()
                .is_some_and(|&c| inner.eval(tree, c, bindings)),
            Self::RefersTo(inner) => node
                .refers_to
                .is_some_and(|d| inner.eval(tree, d, bindings)),
            Self::AllOf(matchers) => matchers.iter().all(|m| m.eval(tree, id, bindings)),
            Self::AnyOf(matchers) => matchers
                .iter()
                .any(|m| try_scoped(bindings, |b| m.eval(tree, id, b))),
            Self::Not(inner) => !inner.eval(tree, id, &mut bindings.clone()),
            Self::Bind(name, inner) => {
                if inner.eval(tree, id, bindings) {
                    bindings.insert(name.clone(), Bound::Node(id));
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Rough evaluation cost, used to order conjunctions.
    #[must_use]
    pub fn cost(&self) -> u32 {
        match self {
            Self::Any => 0,
            Self::Kind(_)
            | Self::Name(_)
            | Self::HasAnnotation(_)
            | Self::CastKind(_)
            | Self::IsInstantiation
            | Self::IsOverride
            | Self::HasSpecifier(_) => 1,
            Self::QualifiedName(_) => 2,
            Self::IsFileScope => 4,
            Self::HasType(ty) => 1 + ty.cost(),
            Self::Parent(inner) | Self::Operand(inner) | Self::RefersTo(inner) => {
                1 + inner.cost()
            }
            Self::Child(inner) => 4 + 2 * inner.cost(),
            Self::Ancestor(inner) => 8 + 4 * inner.cost(),
            Self::Descendant(inner) => 16 + 8 * inner.cost(),
            Self::AllOf(ms) | Self::AnyOf(ms) => ms.iter().map(Self::cost).sum(),
            Self::Not(inner) | Self::Bind(_, inner) => inner.cost(),
        }
    }

    /// Returns an equivalent matcher whose conjunctions test cheap
    /// predicates first.
    ///
    /// The sort is stable and disjunctions keep their order, so the branch
    /// whose bindings win is unchanged.
    #[must_use]
    pub fn optimized(&self) -> Self {
        match self {
            Self::AllOf(ms) => {
                let mut ms: Vec<Self> = ms.iter().map(Self::optimized).collect();
                ms.sort_by_key(Self::cost);
                Self::AllOf(ms)
            }
            Self::AnyOf(ms) => Self::AnyOf(ms.iter().map(Self::optimized).collect()),
            Self::Not(inner) => Self::Not(Box::new(inner.optimized())),
            Self::Bind(name, inner) => Self::Bind(name.clone(), Box::new(inner.optimized())),
            Self::Parent(inner) => Self::Parent(Box::new(inner.optimized())),
            Self::Ancestor(inner) => Self::Ancestor(Box::new(inner.optimized())),
            Self::Child(inner) => Self::Child(Box::new(inner.optimized())),
            Self::Descendant(inner) => Self::Descendant(Box::new(inner.optimized())),
            Self::Operand(inner) => Self::Operand(Box::new(inner.optimized())),
            Self::RefersTo(inner) => Self::RefersTo(Box::new(inner.optimized())),
            other => other.clone(),
        }
    }

    /// Node kinds this matcher can possibly match, or `None` for any kind.
    ///
    /// Used to build the dispatch table.
    #[must_use]
    pub fn interested_kinds(&self) -> Option<BTreeSet<NodeKind>> {
        match self {
            Self::Kind(kind) => Some(BTreeSet::from([*kind])),
            Self::CastKind(_) => Some(BTreeSet::from([NodeKind::Cast])),
            Self::Bind(_, inner) => inner.interested_kinds(),
            Self::AllOf(ms) => ms
                .iter()
                .filter_map(Self::interested_kinds)
                .reduce(|a, b| a.intersection(&b).copied().collect()),
            Self::AnyOf(ms) => {
                let mut union = BTreeSet::new();
                for m in ms {
                    union.extend(m.interested_kinds()?);
                }
                Some(union)
            }
            _ => None,
        }
    }
}

/// Predicate over a type.
///
/// Structural tests (`PointerTo`, `ReferenceTo`, `ArrayOf`, `Record`,
/// `Specialization`, `RecordDecl`, `Builtin`, `Function`) look through alias
/// layers. `Named`, `AliasAnnotated`, `AnyAlias` and `InnermostAlias` inspect
/// the alias layers themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeMatcher {
    /// Always matches.
    Any,
    /// Builtin type.
    Builtin,
    /// Pointer whose pointee matches.
    PointerTo(Box<TypeMatcher>),
    /// Reference whose referent matches.
    ReferenceTo(Box<TypeMatcher>),
    /// Array whose element type matches.
    ArrayOf(Box<TypeMatcher>),
    /// Record whose qualified name matches the pattern.
    Record(String),
    /// Template specialization whose name matches and whose leading
    /// arguments match positionally.
    Specialization {
        /// Qualified name pattern of the template.
        name: String,
        /// Matchers for the leading template arguments.
        args: Vec<TypeMatcher>,
    },
    /// Record whose declaration node matches.
    RecordDecl(Box<Matcher>),
    /// The type's own qualified name (record or alias) matches the pattern.
    Named(String),
    /// After removing all alias layers.
    Desugared(Box<TypeMatcher>),
    /// After removing all alias and array layers.
    Underlying(Box<TypeMatcher>),
    /// Some alias layer matches.
    AnyAlias(Box<TypeMatcher>),
    /// The innermost alias layer exists and matches.
    InnermostAlias(Box<TypeMatcher>),
    /// The type is an alias carrying the annotation.
    AliasAnnotated(String),
    /// Function type.
    Function,
    /// Every matcher matches.
    AllOf(Vec<TypeMatcher>),
    /// Some matcher matches; the first success wins.
    AnyOf(Vec<TypeMatcher>),
    /// The matcher does not match.
    Not(Box<TypeMatcher>),
    /// Matches like the inner matcher and captures the type.
    Bind(String, Box<TypeMatcher>),
}

impl TypeMatcher {
    /// Pointer test.
    #[must_use]
    pub fn pointer_to(inner: TypeMatcher) -> Self {
        Self::PointerTo(Box::new(inner))
    }

    /// Reference test.
    #[must_use]
    pub fn reference_to(inner: TypeMatcher) -> Self {
        Self::ReferenceTo(Box::new(inner))
    }

    /// Array test.
    #[must_use]
    pub fn array_of(inner: TypeMatcher) -> Self {
        Self::ArrayOf(Box::new(inner))
    }

    /// Record name test.
    #[must_use]
    pub fn record(pattern: impl Into<String>) -> Self {
        Self::Record(pattern.into())
    }

    /// Specialization test with no argument constraints.
    #[must_use]
    pub fn specialization(name: impl Into<String>) -> Self {
        Self::Specialization {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Specialization test constraining the leading arguments.
    #[must_use]
    pub fn specialization_of(name: impl Into<String>, args: Vec<TypeMatcher>) -> Self {
        Self::Specialization {
            name: name.into(),
            args,
        }
    }

    /// Record declaration test.
    #[must_use]
    pub fn record_decl(inner: Matcher) -> Self {
        Self::RecordDecl(Box::new(inner))
    }

    /// Own-name test.
    #[must_use]
    pub fn named(pattern: impl Into<String>) -> Self {
        Self::Named(pattern.into())
    }

    /// Desugared test.
    #[must_use]
    pub fn desugared(inner: TypeMatcher) -> Self {
        Self::Desugared(Box::new(inner))
    }

    /// Underlying element test.
    #[must_use]
    pub fn underlying(inner: TypeMatcher) -> Self {
        Self::Underlying(Box::new(inner))
    }

    /// Any-alias-layer test.
    #[must_use]
    pub fn any_alias(inner: TypeMatcher) -> Self {
        Self::AnyAlias(Box::new(inner))
    }

    /// Innermost-alias test.
    #[must_use]
    pub fn innermost_alias(inner: TypeMatcher) -> Self {
        Self::InnermostAlias(Box::new(inner))
    }

    /// Alias annotation test.
    #[must_use]
    pub fn alias_annotated(annotation: impl Into<String>) -> Self {
        Self::AliasAnnotated(annotation.into())
    }

    /// Negation.
    #[must_use]
    pub fn not(inner: TypeMatcher) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Captures the matched type under `name`.
    #[must_use]
    pub fn bind(self, name: impl Into<String>) -> Self {
        Self::Bind(name.into(), Box::new(self))
    }

    /// Returns true if the matcher matches the type.
    #[must_use]
    pub fn matches(&self, tree: &SyntaxTree, ty: TypeId) -> bool {
        self.eval(tree, ty, &mut Bindings::new())
    }

    pub(crate) fn eval(&self, tree: &SyntaxTree, ty: TypeId, bindings: &mut Bindings) -> bool {
        let desugared = tree.desugar(ty);
        match self {
            Self::Any => true,
            Self::Builtin => matches!(tree.ty(desugared), Type::Builtin { .. }),
            Self::Function => matches!(tree.ty(desugared), Type::Function { .. }),
            Self::PointerTo(inner) => match tree.ty(desugared) {
                Type::Pointer { pointee } => inner.eval(tree, *pointee, bindings),
                _ => false,
            },
            Self::ReferenceTo(inner) => match tree.ty(desugared) {
                Type::Reference { pointee } => inner.eval(tree, *pointee, bindings),
                _ => false,
            },
            Self::ArrayOf(inner) => match tree.ty(desugared) {
                Type::Array { element, .. } => inner.eval(tree, *element, bindings),
                _ => false,
            },
            Self::Record(pattern) => match tree.ty(desugared) {
                Type::Record { qualified_name, .. } => path_matches(qualified_name, pattern),
                _ => false,
            },
            Self::Specialization { name, args } => match tree.ty(desugared) {
                Type::Record {
                    qualified_name,
                    args: actual,
                    ..
                } => {
                    !actual.is_empty()
                        && actual.len() >= args.len()
                        && path_matches(qualified_name, name)
                        && args
                            .iter()
                            .zip(actual)
                            .all(|(m, &a)| m.eval(tree, a, bindings))
                }
                _ => false,
            },
            Self::RecordDecl(inner) => match tree.ty(desugared) {
                Type::Record { decl: Some(d), .. } => inner.eval(tree, *d, bindings),
                _ => false,
            },
            Self::Named(pattern) => tree
                .type_qualified_name(ty)
                .is_some_and(|q| path_matches(q, pattern)),
            Self::Desugared(inner) => inner.eval(tree, desugared, bindings),
            Self::Underlying(inner) => inner.eval(tree, tree.underlying(ty), bindings),
            Self::AnyAlias(inner) => tree
                .alias_chain(ty)
                .into_iter()
                .any(|a| try_scoped(bindings, |b| inner.eval(tree, a, b))),
            Self::InnermostAlias(inner) => tree
                .innermost_alias(ty)
                .is_some_and(|a| inner.eval(tree, a, bindings)),
            Self::AliasAnnotated(annotation) => match tree.ty(ty) {
                Type::Alias { annotations, .. } => annotations.iter().any(|a| a == annotation),
                _ => false,
            },
            Self::AllOf(ms) => ms.iter().all(|m| m.eval(tree, ty, bindings)),
            Self::AnyOf(ms) => ms
                .iter()
                .any(|m| try_scoped(bindings, |b| m.eval(tree, ty, b))),
            Self::Not(inner) => !inner.eval(tree, ty, &mut bindings.clone()),
            Self::Bind(name, inner) => {
                if inner.eval(tree, ty, bindings) {
                    bindings.insert(name.clone(), Bound::Type(ty));
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Rough evaluation cost.
    #[must_use]
    pub fn cost(&self) -> u32 {
        match self {
            Self::Any => 0,
            Self::Builtin
            | Self::Function
            | Self::Record(_)
            | Self::Named(_)
            | Self::AliasAnnotated(_) => 1,
            Self::PointerTo(inner)
            | Self::ReferenceTo(inner)
            | Self::ArrayOf(inner)
            | Self::Desugared(inner)
            | Self::Underlying(inner)
            | Self::InnermostAlias(inner) => 1 + inner.cost(),
            Self::AnyAlias(inner) => 2 + 2 * inner.cost(),
            Self::Specialization { args, .. } => 2 + args.iter().map(Self::cost).sum::<u32>(),
            Self::RecordDecl(inner) => 1 + inner.cost(),
            Self::AllOf(ms) | Self::AnyOf(ms) => ms.iter().map(Self::cost).sum(),
            Self::Not(inner) | Self::Bind(_, inner) => inner.cost(),
        }
    }
}
