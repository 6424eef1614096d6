//! Core types for diagnostics and run results.

use crate::rewrite::{EditCandidate, EditScript, RewritePlanner};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail the run.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Presented location of a diagnostic, after macro and `#line` resolution.
///
/// Field order gives the report order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalLocation {
    /// Presented file path.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl CanonicalLocation {
    /// Creates a new location.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for CanonicalLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A message template with `%0`, `%1`, ... placeholders and their values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    template: &'static str,
    args: Vec<String>,
}

impl Message {
    /// Creates a message without arguments.
    #[must_use]
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            args: Vec::new(),
        }
    }

    /// Appends the value for the next placeholder.
    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Substituted values, in placeholder order.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Renders the template. Placeholders without a value are kept as is.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }
            match digits.parse::<usize>().ok().and_then(|i| self.args.get(i)) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('%');
                    out.push_str(&digits);
                }
            }
        }
        out
    }
}

/// A reported policy violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule code (e.g., "PL001").
    pub code: String,
    /// Rule id (e.g., "raw-ptr-field").
    pub rule: String,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Presented location.
    pub location: CanonicalLocation,
    /// Rendered message.
    pub message: String,
    /// Values substituted into the message template.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Suggested fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Whether the location fell back to an enclosing node.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        location: CanonicalLocation,
        message: &Message,
    ) -> Self {
        Self {
            code: code.into(),
            rule: rule.into(),
            severity,
            location,
            message: message.render(),
            args: message.args().to_vec(),
            help: None,
            degraded: false,
        }
    }

    /// Adds a suggested fix.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Marks the location as a fallback.
    #[must_use]
    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Formats the diagnostic for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!("{} {} at {}\n", self.code, self.rule, self.location);
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        if let Some(help) = &self.help {
            let _ = writeln!(output, "  = help: {help}");
        }
        if self.degraded {
            let _ = writeln!(output, "  = note: location approximated from an enclosing node");
        }
        output
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.location, self.severity, self.code, self.message
        )
    }
}

/// Result of analyzing one translation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitReport {
    /// Dump the unit was loaded from.
    pub unit: PathBuf,
    /// Deduplicated, ordered diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Accepted edits in discovery order (rewrite mode only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<EditCandidate>,
    /// Edits dropped because they overlapped an earlier edit.
    #[serde(default)]
    pub conflicts: usize,
    /// Set when the unit could not be analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl UnitReport {
    /// Creates an empty report for a unit.
    #[must_use]
    pub fn new(unit: impl Into<PathBuf>) -> Self {
        Self {
            unit: unit.into(),
            ..Self::default()
        }
    }

    /// Creates a report for a unit that failed to load.
    #[must_use]
    pub fn failed(unit: impl Into<PathBuf>, failure: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            failure: Some(failure.into()),
            ..Self::default()
        }
    }
}

/// Result of analyzing a set of units.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-unit results in input order.
    pub units: Vec<UnitReport>,
}

impl RunReport {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates over every diagnostic, unit by unit.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.units.iter().flat_map(|u| u.diagnostics.iter())
    }

    /// Units that failed to load.
    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.failure.is_some())
    }

    /// Returns true if any diagnostic has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics().any(|d| d.severity == Severity::Error)
    }

    /// Counts diagnostics by severity as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |s: Severity| self.diagnostics().filter(|d| d.severity == s).count();
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Merges the edits of all units into one script.
    ///
    /// Units may share headers, so edits are offered again in unit order and
    /// the same conflict policy applies across units.
    #[must_use]
    pub fn edit_script(&self) -> EditScript {
        let mut planner = RewritePlanner::new();
        for unit in &self.units {
            for edit in &unit.edits {
                planner.offer(edit.clone());
            }
        }
        let mut script = planner.finish();
        script.conflicts += self.units.iter().map(|u| u.conflicts).sum::<usize>();
        script
    }

    /// Formats every diagnostic followed by a summary line.
    #[must_use]
    pub fn format_report(&self) -> String {
        use std::fmt::Write;
        let mut report = String::new();
        for diagnostic in self.diagnostics() {
            let _ = writeln!(report, "{}", diagnostic.format());
        }
        for unit in self.failures() {
            let _ = writeln!(
                report,
                "failed to analyze {}: {}",
                unit.unit.display(),
                unit.failure.as_deref().unwrap_or_default()
            );
        }
        let (errors, warnings, infos) = self.count_by_severity();
        let _ = write!(
            report,
            "Found {} error(s), {} warning(s), {} info(s) in {} unit(s)",
            errors,
            warnings,
            infos,
            self.units.len()
        );
        report
    }

    /// Prints the report to stdout.
    pub fn print_report(&self) {
        println!("{}", self.format_report());
    }
}
