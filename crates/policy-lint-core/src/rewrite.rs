//! Edit candidates, per-rule edit collection and conflict-free planning.
//!
//! Rules describe edits through a [`RewriteContext`], which only hands out
//! edits for ranges that resolve to one physical user file. The
//! [`RewritePlanner`] then keeps the first of any overlapping pair.

use crate::location::{LocationPolicy, LocationResolver};
use crate::source::SourceRange;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use tracing::warn;

/// What an edit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditKind {
    /// Adds `#include "header"` if missing.
    IncludeUserHeader,
    /// Adds `#include <header>` if missing.
    IncludeSystemHeader,
    /// Replaces a byte range.
    Replace,
}

/// A proposed text edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditCandidate {
    /// Physical file the edit applies to.
    pub file: PathBuf,
    /// What the edit does.
    pub kind: EditKind,
    /// Byte offset (replacements only).
    pub offset: u32,
    /// Byte length (replacements only).
    pub length: u32,
    /// Replacement text, or the header for include edits.
    pub replacement: String,
    /// Rule that proposed the edit.
    pub rule: String,
}

impl EditCandidate {
    /// Creates a replacement.
    #[must_use]
    pub fn replace(
        file: impl Into<PathBuf>,
        offset: u32,
        length: u32,
        replacement: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            kind: EditKind::Replace,
            offset,
            length,
            replacement: replacement.into(),
            rule: rule.into(),
        }
    }

    /// Creates an include edit.
    #[must_use]
    pub fn include(
        file: impl Into<PathBuf>,
        kind: EditKind,
        header: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            kind,
            offset: 0,
            length: 0,
            replacement: header.into(),
            rule: rule.into(),
        }
    }

    /// One past the last replaced byte.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.length)
    }

    /// Returns true if both edits replace text in the same file and cannot
    /// both be applied.
    ///
    /// Two insertions conflict at the same offset; an insertion conflicts
    /// with a range strictly containing its offset.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.kind != EditKind::Replace || other.kind != EditKind::Replace {
            return false;
        }
        if self.file != other.file {
            return false;
        }
        match (self.length, other.length) {
            (0, 0) => self.offset == other.offset,
            (0, _) => other.offset < self.offset && self.offset < other.end(),
            (_, 0) => self.offset < other.offset && other.offset < self.end(),
            _ => self.offset < other.end() && other.offset < self.end(),
        }
    }

    /// Renders the edit as one line of the edit script.
    ///
    /// Newlines in the replacement are written as NUL so each edit stays on
    /// one line.
    #[must_use]
    pub fn to_script_line(&self) -> String {
        let file = self.file.display();
        match self.kind {
            EditKind::Replace => format!(
                "r:::{file}:::{}:::{}:::{}",
                self.offset,
                self.length,
                self.replacement.replace('\n', "\0")
            ),
            EditKind::IncludeUserHeader => {
                format!("include-user-header:::{file}:::-1:::-1:::{}", self.replacement)
            }
            EditKind::IncludeSystemHeader => {
                format!("include-system-header:::{file}:::-1:::-1:::{}", self.replacement)
            }
        }
    }
}

/// Collects the edits one rule proposes for one match.
#[derive(Debug)]
pub struct RewriteContext<'a> {
    resolver: LocationResolver<'a>,
    policy: LocationPolicy,
    rule: &'static str,
    edits: Vec<EditCandidate>,
    user_headers: BTreeSet<String>,
    system_headers: BTreeSet<String>,
    rejected: usize,
}

impl<'a> RewriteContext<'a> {
    /// Creates a context resolving ranges with the rule's policy.
    #[must_use]
    pub fn new(resolver: LocationResolver<'a>, policy: LocationPolicy, rule: &'static str) -> Self {
        Self {
            resolver,
            policy,
            rule,
            edits: Vec::new(),
            user_headers: BTreeSet::new(),
            system_headers: BTreeSet::new(),
            rejected: 0,
        }
    }

    /// Replaces the text of `range`. Returns false, proposing nothing, when
    /// the range does not resolve to one user file.
    pub fn replace(&mut self, range: SourceRange, text: impl Into<String>) -> bool {
        let Some((file, begin, end)) = self.resolver.physical_range(range, self.policy) else {
            self.rejected += 1;
            return false;
        };
        let Some(source) = self.resolver.sources().file(file) else {
            self.rejected += 1;
            return false;
        };
        self.edits.push(EditCandidate::replace(
            source.path.clone(),
            begin,
            end - begin,
            text,
            self.rule,
        ));
        true
    }

    /// Inserts text at a location.
    pub fn insert(&mut self, at: crate::source::RawLocation, text: impl Into<String>) -> bool {
        self.replace(SourceRange::new(at, at), text)
    }

    /// Removes the text of `range`.
    pub fn remove(&mut self, range: SourceRange) -> bool {
        self.replace(range, "")
    }

    /// Requests `#include "header"` in every file this match edits.
    pub fn include_user_header(&mut self, header: &str) {
        self.user_headers.insert(header.to_string());
    }

    /// Requests `#include <header>` in every file this match edits.
    pub fn include_system_header(&mut self, header: &str) {
        self.system_headers.insert(header.to_string());
    }

    /// Number of edits refused because their range was not editable.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Returns the replacements followed by the include edits they need.
    #[must_use]
    pub fn into_edits(self) -> Vec<EditCandidate> {
        let files: BTreeSet<PathBuf> = self.edits.iter().map(|e| e.file.clone()).collect();
        let mut edits = self.edits;
        for file in &files {
            for header in &self.user_headers {
                edits.push(EditCandidate::include(
                    file.clone(),
                    EditKind::IncludeUserHeader,
                    header.clone(),
                    self.rule,
                ));
            }
            for header in &self.system_headers {
                edits.push(EditCandidate::include(
                    file.clone(),
                    EditKind::IncludeSystemHeader,
                    header.clone(),
                    self.rule,
                ));
            }
        }
        edits
    }
}

/// Outcome of offering an edit to the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    /// The edit was kept.
    Accepted,
    /// An identical edit was already kept.
    Duplicate,
    /// The edit overlaps an earlier edit and was dropped.
    Conflict,
}

/// Accepts edits in discovery order, dropping later overlapping ones.
#[derive(Debug, Default)]
pub struct RewritePlanner {
    accepted: Vec<EditCandidate>,
    seen: HashSet<EditCandidate>,
    conflicts: usize,
}

impl RewritePlanner {
    /// Creates an empty planner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers an edit.
    pub fn offer(&mut self, edit: EditCandidate) -> Offer {
        let key = EditCandidate {
            rule: String::new(),
            ..edit.clone()
        };
        if self.seen.contains(&key) {
            return Offer::Duplicate;
        }
        if let Some(earlier) = self.accepted.iter().find(|e| e.overlaps(&edit)) {
            warn!(
                "dropping edit from {} at {}:{} (+{}): overlaps edit from {} at {} (+{})",
                edit.rule,
                edit.file.display(),
                edit.offset,
                edit.length,
                earlier.rule,
                earlier.offset,
                earlier.length
            );
            self.conflicts += 1;
            return Offer::Conflict;
        }
        self.seen.insert(key);
        self.accepted.push(edit);
        Offer::Accepted
    }

    /// Offers the edits of one match. Include edits are kept only for files
    /// where at least one of the match's replacements survived.
    ///
    /// Returns the number of edits dropped as conflicts.
    pub fn offer_match(&mut self, edits: Vec<EditCandidate>) -> usize {
        let (replacements, includes): (Vec<_>, Vec<_>) =
            edits.into_iter().partition(|e| e.kind == EditKind::Replace);

        let mut kept_files = BTreeSet::new();
        let mut dropped = 0;
        for edit in replacements {
            let file = edit.file.clone();
            match self.offer(edit) {
                Offer::Conflict => dropped += 1,
                Offer::Accepted | Offer::Duplicate => {
                    kept_files.insert(file);
                }
            }
        }
        for include in includes {
            if kept_files.contains(&include.file) {
                self.offer(include);
            }
        }
        dropped
    }

    /// Number of edits dropped so far.
    #[must_use]
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    /// Edits kept so far, in discovery order.
    #[must_use]
    pub fn accepted(&self) -> &[EditCandidate] {
        &self.accepted
    }

    /// Finishes planning. Edits are ordered by file, includes first, then
    /// by offset.
    #[must_use]
    pub fn finish(self) -> EditScript {
        let mut edits = self.accepted;
        edits.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.kind.cmp(&b.kind))
                .then(a.offset.cmp(&b.offset))
                .then(a.replacement.cmp(&b.replacement))
        });
        EditScript {
            edits,
            conflicts: self.conflicts,
        }
    }
}

/// Final, non-overlapping edits of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditScript {
    /// Ordered edits.
    pub edits: Vec<EditCandidate>,
    /// Number of edits dropped because of conflicts.
    pub conflicts: usize,
}

impl EditScript {
    /// Returns true if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Renders the script, one edit per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for edit in &self.edits {
            out.push_str(&edit.to_script_line());
            out.push('\n');
        }
        out
    }
}
