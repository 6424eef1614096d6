//! Path and symbol exclusion lists, and the filter that applies them.

use crate::config::{ConfigError, ConfigWarning};
use crate::rule::AnnotationPolicy;
use crate::source::SourceFile;
use crate::tree::{NodeId, NodeKind, SyntaxTree};
use crate::utils::paths::path_matches;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// What the lines of an exclusion list name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// File path prefixes or globs.
    Paths,
    /// Fully qualified symbol names (with `*`/`**` wildcards).
    Symbols,
}

/// One path entry.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Matches paths starting with the prefix, or containing it after a `/`.
    Prefix(String),
    /// Matches paths the glob matches.
    Glob(glob::Pattern),
}

impl PathPattern {
    /// Parses a path entry. Entries with glob metacharacters become globs.
    ///
    /// # Errors
    ///
    /// Returns the glob error for an invalid pattern.
    pub fn parse(entry: &str) -> Result<Self, glob::PatternError> {
        let entry = entry.strip_prefix("./").unwrap_or(entry);
        if entry.contains(['*', '?', '[']) {
            glob::Pattern::new(entry).map(Self::Glob)
        } else {
            Ok(Self::Prefix(entry.to_string()))
        }
    }

    /// Checks a normalized, `/`-separated path.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => {
                path.starts_with(prefix.as_str()) || path.contains(&format!("/{prefix}"))
            }
            Self::Glob(pattern) => {
                if pattern.matches(path) {
                    return true;
                }
                // `dir/**` also covers the directory itself.
                pattern
                    .as_str()
                    .strip_suffix("/**")
                    .is_some_and(|dir| path == dir || path.starts_with(&format!("{dir}/")))
            }
        }
    }
}

/// Ordered path patterns plus symbol patterns. Matching is a pure OR.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    paths: Vec<PathPattern>,
    symbols: Vec<String>,
}

impl ExclusionList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses list text. Blank lines and `#` comment lines are ignored;
    /// malformed lines are skipped and reported as warnings.
    #[must_use]
    pub fn parse(kind: ListKind, content: &str, origin: &str) -> (Self, Vec<ConfigWarning>) {
        let mut list = Self::new();
        let mut warnings = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let result = match kind {
                ListKind::Paths => list.add_path(line),
                ListKind::Symbols => list.add_symbol(line),
            };
            if let Err(message) = result {
                let warning = ConfigWarning::at_line(origin, index + 1, message);
                warn!("{warning}");
                warnings.push(warning);
            }
        }

        (list, warnings)
    }

    /// Reads and parses a list file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read. Malformed lines are
    /// returned as warnings instead.
    pub fn load(kind: ListKind, path: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(kind, &content, &path.display().to_string()))
    }

    /// Adds a path entry.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem for an invalid glob.
    pub fn add_path(&mut self, entry: &str) -> Result<(), String> {
        let pattern = PathPattern::parse(entry)
            .map_err(|e| format!("invalid path pattern `{entry}`: {e}"))?;
        self.paths.push(pattern);
        Ok(())
    }

    /// Adds a symbol entry.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem for a malformed name.
    pub fn add_symbol(&mut self, entry: &str) -> Result<(), String> {
        if entry.contains(char::is_whitespace) {
            return Err(format!("symbol `{entry}` contains whitespace"));
        }
        if entry.replace("::", "").contains(':') {
            return Err(format!("symbol `{entry}` has a stray `:`"));
        }
        self.symbols
            .push(entry.strip_prefix("::").unwrap_or(entry).to_string());
        Ok(())
    }

    /// Appends all entries of another list.
    pub fn merge(&mut self, other: &Self) {
        self.paths.extend(other.paths.iter().cloned());
        self.symbols.extend(other.symbols.iter().cloned());
    }

    /// Returns true if the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.symbols.is_empty()
    }

    /// Checks a normalized path against the path entries.
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p.matches(path))
    }

    /// Checks a qualified name against the symbol entries.
    #[must_use]
    pub fn matches_symbol(&self, name: &str) -> bool {
        self.symbols.iter().any(|s| path_matches(name, s))
    }
}

/// Outcome of filtering one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Nothing applied.
    Accept,
    /// An opt-in annotation or pragma forced acceptance.
    ForcedAccept(String),
    /// A suppression annotation or pragma applied.
    Suppressed(String),
    /// A symbol entry matched the named symbol.
    ExcludedSymbol(String),
    /// A path entry matched the physical file.
    ExcludedPath(String),
}

impl FilterDecision {
    /// Returns true if the match should be reported.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept | Self::ForcedAccept(_))
    }
}

/// Applies annotation, symbol and path policy to a match, in that order.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionFilter<'a> {
    annotations: &'a AnnotationPolicy,
    exclusions: &'a ExclusionList,
}

impl<'a> ExclusionFilter<'a> {
    /// Creates a filter for one rule.
    #[must_use]
    pub fn new(annotations: &'a AnnotationPolicy, exclusions: &'a ExclusionList) -> Self {
        Self {
            annotations,
            exclusions,
        }
    }

    /// Decides whether a match on `node` is reported.
    ///
    /// `file` is the physical file the match resolved to and `path` its
    /// normalized path; line directives never reach this point.
    #[must_use]
    pub fn decide(
        &self,
        tree: &SyntaxTree,
        node: NodeId,
        file: &SourceFile,
        path: &str,
    ) -> FilterDecision {
        if let Some(decision) = self.annotation_override(tree, node, file) {
            return decision;
        }

        if let Some(symbol) = self.excluded_symbol(tree, node) {
            return FilterDecision::ExcludedSymbol(symbol);
        }

        if self.exclusions.matches_path(path) {
            return FilterDecision::ExcludedPath(path.to_string());
        }

        FilterDecision::Accept
    }

    fn annotation_override(
        &self,
        tree: &SyntaxTree,
        node: NodeId,
        file: &SourceFile,
    ) -> Option<FilterDecision> {
        let policy = self.annotations;
        let scopes = std::iter::once(node).chain(tree.ancestors(node).filter(|&a| {
            matches!(
                tree.node(a).kind,
                NodeKind::Record | NodeKind::Function | NodeKind::Method
            )
        }));

        for scope in scopes {
            let n = tree.node(scope);
            if let Some(marker) = policy.suppress.iter().find(|m| n.has_annotation(m)) {
                return Some(FilterDecision::Suppressed((*marker).to_string()));
            }
            if let Some(marker) = policy.opt_in.iter().find(|m| n.has_annotation(m)) {
                return Some(FilterDecision::ForcedAccept((*marker).to_string()));
            }
        }

        if let Some(pragma) = policy.suppress_pragmas.iter().find(|p| file.has_pragma(p)) {
            return Some(FilterDecision::Suppressed((*pragma).to_string()));
        }
        if let Some(pragma) = policy.opt_in_pragmas.iter().find(|p| file.has_pragma(p)) {
            return Some(FilterDecision::ForcedAccept((*pragma).to_string()));
        }

        None
    }

    /// Symbols related to the match: the node's own name, the declaration
    /// it refers to, every alias layer of its type and the type behind them.
    fn excluded_symbol(&self, tree: &SyntaxTree, node: NodeId) -> Option<String> {
        let n = tree.node(node);
        let mut names: Vec<&str> = Vec::new();
        names.extend(n.qualified_name.as_deref());
        if let Some(decl) = n.refers_to {
            names.extend(tree.node(decl).qualified_name.as_deref());
        }
        if let Some(ty) = n.ty {
            for alias in tree.alias_chain(ty) {
                names.extend(tree.type_qualified_name(alias));
            }
            names.extend(tree.type_qualified_name(tree.underlying(ty)));
        }

        names
            .into_iter()
            .find(|name| self.exclusions.matches_symbol(name))
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FileKind;
    use crate::testing::{range, TreeBuilder};
    use crate::tree::Node;

    const LIST: &str = "\
# Paths that are not rewritten.
base/allocator/

third_party/**
*.pb.h
[broken
";

    #[test]
    fn parse_skips_comments_blanks_and_bad_lines() {
        let (list, warnings) = ExclusionList::parse(ListKind::Paths, LIST, "paths.txt");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, Some(6));
        assert!(list.matches_path("base/allocator/partition.cc"));
        assert!(list.matches_path("src/base/allocator/partition.cc"));
        assert!(list.matches_path("third_party/skia/a.h"));
        assert!(list.matches_path("third_party"));
        assert!(list.matches_path("foo.pb.h"));
        assert!(!list.matches_path("base/memory/raw_ptr.h"));
    }

    #[test]
    fn symbol_lines_are_validated() {
        let content = "blink::Node::next_\nbad name\nns:bad\n::cc::**\n";
        let (list, warnings) = ExclusionList::parse(ListKind::Symbols, content, "fields.txt");
        assert_eq!(warnings.len(), 2);
        assert!(list.matches_symbol("blink::Node::next_"));
        assert!(list.matches_symbol("cc::Layer::children_"));
        assert!(!list.matches_symbol("blink::Node::prev_"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ExclusionList::load(ListKind::Paths, Path::new("/nonexistent/list.txt"));
        assert!(matches!(err, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("paths.txt");
        std::fs::write(&path, "gen/\n").expect("write");
        let (list, warnings) = ExclusionList::load(ListKind::Paths, &path).expect("load");
        assert!(warnings.is_empty());
        assert!(list.matches_path("gen/a.h"));
    }

    const SUPPRESS: &[&str] = &["allow_x"];
    const OPT_IN: &[&str] = &["check_x"];

    fn policy() -> AnnotationPolicy {
        AnnotationPolicy {
            suppress: SUPPRESS,
            opt_in: OPT_IN,
            suppress_pragmas: &["allow_x_file"],
            opt_in_pragmas: &["check_x_file"],
        }
    }

    /// `struct ns::S { T a; T b [[allow_x]]; }` where `T` aliases `cc::Vec`.
    fn tree(record_annotation: Option<&str>) -> (SyntaxTree, NodeId, NodeId) {
        let mut b = TreeBuilder::new("a.h");
        let f = b.file("a.h");
        let int = b.builtin("int");
        let target = b.record("cc::Vec", vec![int]);
        let alias = b.alias("ns::T", target);
        let mut rec = Node::new(NodeKind::Record, range(f, 0, 50)).named("ns::S");
        if let Some(a) = record_annotation {
            rec = rec.annotated(a);
        }
        let rec = b.node(b.root(), rec);
        let a = b.node(
            rec,
            Node::new(NodeKind::Field, range(f, 10, 20)).named("ns::S::a").typed(alias),
        );
        let bb = b.node(
            rec,
            Node::new(NodeKind::Field, range(f, 20, 30))
                .named("ns::S::b")
                .typed(alias)
                .annotated("allow_x"),
        );
        (b.build(), a, bb)
    }

    #[test]
    fn suppression_annotation_rejects() {
        let (tree, a, b) = tree(None);
        let list = ExclusionList::new();
        let policy = policy();
        let filter = ExclusionFilter::new(&policy, &list);
        let file = &tree.sources.files[0];
        assert_eq!(filter.decide(&tree, a, file, "a.h"), FilterDecision::Accept);
        assert_eq!(
            filter.decide(&tree, b, file, "a.h"),
            FilterDecision::Suppressed("allow_x".into())
        );
    }

    #[test]
    fn opt_in_wins_over_symbol_and_path_entries() {
        let (tree, a, _) = tree(Some("check_x"));
        let mut list = ExclusionList::new();
        list.add_symbol("ns::S::a").expect("valid");
        list.add_path("a.h").expect("valid");
        let policy = policy();
        let filter = ExclusionFilter::new(&policy, &list);
        let decision = filter.decide(&tree, a, &tree.sources.files[0], "a.h");
        assert_eq!(decision, FilterDecision::ForcedAccept("check_x".into()));
        assert!(decision.is_accepted());
    }

    #[test]
    fn closest_marker_wins() {
        // Field suppresses, enclosing record opts in: the field is closer.
        let (tree, _, b) = tree(Some("check_x"));
        let list = ExclusionList::new();
        let policy = policy();
        let filter = ExclusionFilter::new(&policy, &list);
        assert!(!filter
            .decide(&tree, b, &tree.sources.files[0], "a.h")
            .is_accepted());
    }

    #[test]
    fn symbol_entry_matches_alias_target_namespace() {
        let (tree, a, _) = tree(None);
        let mut list = ExclusionList::new();
        list.add_symbol("cc::**").expect("valid");
        let policy = AnnotationPolicy::default();
        let filter = ExclusionFilter::new(&policy, &list);
        assert_eq!(
            filter.decide(&tree, a, &tree.sources.files[0], "a.h"),
            FilterDecision::ExcludedSymbol("cc::Vec".into())
        );
    }

    #[test]
    fn path_entry_rejects_and_pragmas_override() {
        let (mut tree, a, _) = tree(None);
        let mut list = ExclusionList::new();
        list.add_path("a.h").expect("valid");
        let policy = policy();
        let filter = ExclusionFilter::new(&policy, &list);
        assert_eq!(
            filter.decide(&tree, a, &tree.sources.files[0], "a.h"),
            FilterDecision::ExcludedPath("a.h".into())
        );

        tree.sources.files[0].pragmas.push("check_x_file".into());
        assert!(filter
            .decide(&tree, a, &tree.sources.files[0], "a.h")
            .is_accepted());

        tree.sources.files[0].pragmas.push("allow_x_file".into());
        assert!(!filter
            .decide(&tree, a, &tree.sources.files[0], "a.h")
            .is_accepted());
        assert_eq!(tree.sources.files[0].kind, FileKind::User);
    }
}
