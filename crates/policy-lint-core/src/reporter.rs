//! Per-unit diagnostic collection and deduplication.

use crate::types::{CanonicalLocation, Diagnostic};
use std::collections::HashSet;
use tracing::trace;

/// Collects diagnostics for one unit, keeping the first per
/// (rule, canonical location).
#[derive(Debug, Default)]
pub struct Reporter {
    seen: HashSet<(String, CanonicalLocation)>,
    diagnostics: Vec<Diagnostic>,
    duplicates: usize,
}

impl Reporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic. Returns false if it was a duplicate.
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        let key = (diagnostic.rule.clone(), diagnostic.location.clone());
        if !self.seen.insert(key) {
            trace!("duplicate {} at {}", diagnostic.rule, diagnostic.location);
            self.duplicates += 1;
            return false;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    /// Returns true if a diagnostic for this key was already recorded.
    #[must_use]
    pub fn contains(&self, rule: &str, location: &CanonicalLocation) -> bool {
        self.seen.contains(&(rule.to_string(), location.clone()))
    }

    /// Number of dropped duplicates.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Returns the diagnostics ordered by file, line, column and rule id.
    #[must_use]
    pub fn finish(self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics;
        diagnostics.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.rule.cmp(&b.rule))
        });
        diagnostics
    }
}
