//! Rule registry and per-unit dispatch.

use crate::config::{Config, ConfigWarning};
use crate::context::RuleMatch;
use crate::exclusion::{ExclusionFilter, ExclusionList};
use crate::location::{LocationResolver, Resolution, ResolvedLocation};
use crate::matcher::Matcher;
use crate::reporter::Reporter;
use crate::rewrite::{RewriteContext, RewritePlanner};
use crate::rule::{AnnotationPolicy, Rule, RuleBox, RuleTarget};
use crate::tree::{NodeKind, SyntaxTree};
use crate::types::{Diagnostic, RunReport, Severity, UnitReport};
use crate::utils::paths::normalize_path;

use miette::Diagnostic as MietteDiagnostic;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors that can occur while building an [`Engine`].
#[derive(Debug, Error, MietteDiagnostic)]
pub enum EngineError {
    /// IO error resolving the root directory.
    #[error("IO error: {0}")]
    #[diagnostic(code(policy_lint::engine::io))]
    Io(#[from] std::io::Error),

    /// No rule is enabled.
    #[error("no rules enabled")]
    #[diagnostic(
        code(policy_lint::engine::no_rules),
        help("check `engine.enabled_rules` and the `enabled` flags in the configuration")
    )]
    NoRules,
}

/// Builder for configuring an [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    root: Option<PathBuf>,
    rules: Vec<RuleBox>,
    config: Option<Config>,
    lists: Vec<(ExclusionList, Vec<String>)>,
    exclude_patterns: Vec<String>,
    enable_only: Vec<String>,
    rewrite: Option<bool>,
    parallelism: Option<usize>,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory exclusion paths are relative to.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds a rule.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed rule.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several boxed rules.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = RuleBox>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds an already parsed exclusion list for the given rules (empty
    /// means every rule).
    #[must_use]
    pub fn exclusion_list(mut self, list: ExclusionList, rules: Vec<String>) -> Self {
        self.lists.push((list, rules));
        self
    }

    /// Adds an extra path pattern excluded for every rule.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Restricts the run to the named rules.
    #[must_use]
    pub fn enable_only<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enable_only.extend(rules.into_iter().map(Into::into));
        self
    }

    /// Turns rewrite mode on or off, overriding the configuration.
    #[must_use]
    pub fn rewrite(mut self, rewrite: bool) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// Caps the number of units analyzed in parallel.
    #[must_use]
    pub fn parallelism(mut self, jobs: usize) -> Self {
        self.parallelism = Some(jobs);
        self
    }

    /// Builds the engine.
    ///
    /// Unknown rule ids, unreadable exclusion list files and malformed list
    /// lines are logged and returned by [`Engine::warnings`]; they never
    /// fail the build.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be made absolute or no rule is
    /// left enabled.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut config = self.config.unwrap_or_default();
        if !self.enable_only.is_empty() {
            config.engine.enabled_rules = self.enable_only;
        }
        let mut warnings = Vec::new();

        let known: HashSet<&str> = self.rules.iter().map(|r| r.name()).collect();
        for id in config.referenced_rules() {
            if !known.contains(id) {
                let warning =
                    ConfigWarning::new("configuration", format!("unknown rule id `{id}`"));
                warn!("{warning}");
                warnings.push(warning);
            }
        }

        let root = match self.root.or_else(|| config.engine.root.clone()) {
            Some(root) if root.is_relative() => Some(std::env::current_dir()?.join(root)),
            other => other,
        };

        let mut global = ExclusionList::new();
        for pattern in config.engine.exclude.iter().chain(&self.exclude_patterns) {
            if let Err(message) = global.add_path(pattern) {
                let warning = ConfigWarning::new("engine.exclude", message);
                warn!("{warning}");
                warnings.push(warning);
            }
        }

        let mut lists = self.lists;
        for list_config in &config.exclusion_lists {
            match ExclusionList::load(list_config.kind, &list_config.file) {
                Ok((list, list_warnings)) => {
                    debug!(
                        "Loaded {:?} exclusion list {}",
                        list_config.kind,
                        list_config.file.display()
                    );
                    warnings.extend(list_warnings);
                    lists.push((list, list_config.rules.clone()));
                }
                Err(e) => {
                    let warning =
                        ConfigWarning::new(list_config.file.display().to_string(), e.to_string());
                    warn!("Skipping exclusion list: {warning}");
                    warnings.push(warning);
                }
            }
        }

        let mut entries = Vec::new();
        for rule in self.rules {
            let name = rule.name();
            if !config.is_rule_enabled(name) {
                debug!("Skipping disabled rule: {}", name);
                continue;
            }

            let mut exclusions = global.clone();
            for (list, rules) in &lists {
                if rules.is_empty() || rules.iter().any(|r| r == name) {
                    exclusions.merge(list);
                }
            }
            for pattern in rule.default_excluded_paths() {
                if let Err(message) = exclusions.add_path(pattern) {
                    warn!("{name}: {message}");
                }
            }

            entries.push(RuleEntry {
                matcher: rule.matcher().optimized(),
                severity: config
                    .rule_severity(name)
                    .unwrap_or_else(|| rule.default_severity()),
                annotations: rule.annotation_policy(),
                target: rule.target(),
                exclusions,
                rule,
            });
        }

        if entries.is_empty() {
            return Err(EngineError::NoRules);
        }

        let mut dispatch = vec![Vec::new(); NodeKind::ALL.len()];
        for (index, entry) in entries.iter().enumerate() {
            match entry.matcher.interested_kinds() {
                Some(kinds) => {
                    for kind in kinds {
                        dispatch[kind as usize].push(index);
                    }
                }
                None => {
                    for slot in &mut dispatch {
                        slot.push(index);
                    }
                }
            }
        }

        Ok(Engine {
            root,
            entries,
            dispatch,
            rewrite: self.rewrite.unwrap_or(config.engine.rewrite),
            parallelism: self.parallelism.or(config.engine.parallelism),
            warnings,
        })
    }
}

struct RuleEntry {
    rule: RuleBox,
    matcher: Matcher,
    severity: Severity,
    annotations: AnnotationPolicy,
    target: RuleTarget,
    exclusions: ExclusionList,
}

/// Runs the enabled rules over syntax trees.
///
/// Use [`Engine::builder()`] to construct an instance. An engine is
/// immutable once built and can be shared across worker threads.
pub struct Engine {
    root: Option<PathBuf>,
    entries: Vec<RuleEntry>,
    /// Rule indices per node kind, in registration order.
    dispatch: Vec<Vec<usize>>,
    rewrite: bool,
    parallelism: Option<usize>,
    warnings: Vec<ConfigWarning>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.root)
            .field("rules", &self.rule_names())
            .field("rewrite", &self.rewrite)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates a new builder for configuring an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Ids of the enabled rules, in registration order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.rule.name()).collect()
    }

    /// Returns the number of enabled rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether rewrite-capable rules produce edits.
    #[must_use]
    pub fn rewrite_enabled(&self) -> bool {
        self.rewrite
    }

    /// Configuration problems found while building.
    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Analyzes one tree.
    #[must_use]
    pub fn run_tree(&self, tree: &SyntaxTree) -> UnitReport {
        debug!("Analyzing unit {}", tree.unit.display());

        let resolver = LocationResolver::new(&tree.sources);
        let mut reporter = Reporter::new();
        let mut planner = RewritePlanner::new();

        for node in tree.preorder() {
            let n = tree.node(node);
            for &index in &self.dispatch[n.kind as usize] {
                let entry = &self.entries[index];
                if entry.target == RuleTarget::Declaration && n.instantiated_from.is_some() {
                    continue;
                }
                let Some(bindings) = entry.matcher.evaluate(tree, node) else {
                    continue;
                };
                let pending = RuleMatch::new(tree, node, bindings);
                self.accept(entry, &pending, resolver, &mut reporter, &mut planner);
            }
        }

        let duplicates = reporter.duplicates();
        let conflicts = planner.conflicts();
        let mut report = UnitReport::new(tree.unit.clone());
        report.edits = planner.accepted().to_vec();
        report.conflicts = conflicts;
        report.diagnostics = reporter.finish();

        debug!(
            "Unit {}: {} diagnostic(s), {} duplicate(s), {} edit(s), {} conflict(s)",
            tree.unit.display(),
            report.diagnostics.len(),
            duplicates,
            report.edits.len(),
            conflicts
        );
        report
    }

    /// Filters, resolves and reports one match.
    fn accept(
        &self,
        entry: &RuleEntry,
        pending: &RuleMatch<'_>,
        resolver: LocationResolver<'_>,
        reporter: &mut Reporter,
        planner: &mut RewritePlanner,
    ) {
        let rule = entry.rule.as_ref();
        let Some((resolved, degraded)) = Self::locate(rule, pending, resolver) else {
            return;
        };
        let Some(file) = pending.tree.sources.file(resolved.physical.file) else {
            return;
        };
        let path = normalize_path(&resolved.physical.path, self.root.as_deref());

        let decision = ExclusionFilter::new(&entry.annotations, &entry.exclusions).decide(
            pending.tree,
            pending.node,
            file,
            &path,
        );
        if !decision.is_accepted() {
            trace!("{} at {}: {:?}", rule.name(), resolved.canonical, decision);
            return;
        }

        let mut diagnostic = Diagnostic::new(
            rule.code(),
            rule.name(),
            entry.severity,
            resolved.canonical,
            &rule.message(pending),
        );
        if let Some(help) = rule.help() {
            diagnostic = diagnostic.with_help(help);
        }
        if degraded {
            diagnostic = diagnostic.degraded();
        }
        reporter.report(diagnostic);

        if self.rewrite && rule.supports_rewrite() {
            let mut edits = RewriteContext::new(resolver, rule.location_policy(), rule.name());
            rule.rewrite(pending, &mut edits);
            let dropped = planner.offer_match(edits.into_edits());
            if dropped > 0 {
                debug!("{}: {dropped} conflicting edit(s) dropped", rule.name());
            }
        }
    }

    /// Resolves the rule's anchor, falling back to the nearest syntax-tree
    /// ancestor whose start resolves.
    fn locate(
        rule: &dyn Rule,
        pending: &RuleMatch<'_>,
        resolver: LocationResolver<'_>,
    ) -> Option<(ResolvedLocation, bool)> {
        let policy = rule.location_policy();
        let error = match resolver.resolve(rule.anchor(pending), policy) {
            Ok(Resolution::Resolved(resolved)) => return Some((resolved, false)),
            Ok(Resolution::Unreachable) => return None,
            Err(e) => e,
        };

        let tree = pending.tree;
        for ancestor in tree.ancestors(pending.node) {
            match resolver.resolve(tree.node(ancestor).range.begin, policy) {
                Ok(Resolution::Resolved(resolved)) => {
                    debug!("{}: {error}; using enclosing node", rule.name());
                    return Some((resolved, true));
                }
                Ok(Resolution::Unreachable) => return None,
                Err(_) => {}
            }
        }

        warn!("{}: dropping match: {error}", rule.name());
        None
    }

    /// Loads and analyzes one tree dump. A dump that cannot be loaded
    /// becomes a failed report.
    #[must_use]
    pub fn run_unit(&self, path: &Path) -> UnitReport {
        match SyntaxTree::load(path) {
            Ok(tree) => {
                let mut report = self.run_tree(&tree);
                report.unit = path.to_path_buf();
                report
            }
            Err(e) => {
                warn!("Skipping unit {}: {}", path.display(), e);
                UnitReport::failed(path, e.to_string())
            }
        }
    }

    /// Analyzes several dumps in parallel. Reports keep the input order.
    #[must_use]
    pub fn run_units(&self, paths: &[PathBuf]) -> RunReport {
        info!("Analyzing {} unit(s) with {} rule(s)", paths.len(), self.entries.len());

        let pool = self.parallelism.and_then(|jobs| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| warn!("Falling back to the global thread pool: {e}"))
                .ok()
        });
        let units: Vec<UnitReport> = match pool {
            Some(pool) => pool.install(|| paths.par_iter().map(|p| self.run_unit(p)).collect()),
            None => paths.par_iter().map(|p| self.run_unit(p)).collect(),
        };

        let report = RunReport { units };
        let (errors, warnings, infos) = report.count_by_severity();
        info!(
            "Analysis complete: {} error(s), {} warning(s), {} info(s)",
            errors, warnings, infos
        );
        report
    }
}

