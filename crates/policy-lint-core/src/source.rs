//! Source buffers, macro expansions and raw locations.
//!
//! These types mirror what the frontend knows about text at traversal time.
//! A [`RawLocation`] is either a byte offset into a physical buffer or an
//! offset into a macro expansion; the [`crate::LocationResolver`] turns it
//! into something a human (and the exclusion policy) can use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Index of a buffer in the [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u32);

impl FileId {
    /// Returns the index into [`SourceMap::files`].
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a macro expansion in the [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionId(pub u32);

impl ExpansionId {
    /// Returns the index into [`SourceMap::expansions`].
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A location as reported by the frontend while walking the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawLocation {
    /// Byte offset into a buffer.
    File {
        /// Buffer holding the text.
        file: FileId,
        /// Byte offset from the start of the buffer.
        offset: u32,
    },
    /// Byte offset into the text produced by a macro expansion.
    Macro {
        /// Expansion the text came from.
        expansion: ExpansionId,
        /// Byte offset from the start of the expanded text.
        offset: u32,
    },
}

impl RawLocation {
    /// Creates a buffer location.
    #[must_use]
    pub fn file(file: FileId, offset: u32) -> Self {
        Self::File { file, offset }
    }

    /// Creates a location inside a macro expansion.
    #[must_use]
    pub fn in_macro(expansion: ExpansionId, offset: u32) -> Self {
        Self::Macro { expansion, offset }
    }

    /// Returns true if the location lies inside a macro expansion.
    #[must_use]
    pub fn is_macro(self) -> bool {
        matches!(self, Self::Macro { .. })
    }

    /// Returns the same location moved forward by `by` bytes.
    #[must_use]
    pub fn advanced(self, by: u32) -> Self {
        match self {
            Self::File { file, offset } => Self::File {
                file,
                offset: offset.saturating_add(by),
            },
            Self::Macro { expansion, offset } => Self::Macro {
                expansion,
                offset: offset.saturating_add(by),
            },
        }
    }
}

/// Half-open range of raw locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// First byte of the range.
    pub begin: RawLocation,
    /// One past the last byte of the range.
    pub end: RawLocation,
}

impl SourceRange {
    /// Creates a new range.
    #[must_use]
    pub fn new(begin: RawLocation, end: RawLocation) -> Self {
        Self { begin, end }
    }

    /// Creates a range inside a single buffer.
    #[must_use]
    pub fn in_file(file: FileId, begin: u32, end: u32) -> Self {
        Self {
            begin: RawLocation::file(file, begin),
            end: RawLocation::file(file, end),
        }
    }
}

/// Classification of a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Code inside the monitored tree.
    #[default]
    User,
    /// System or third-party headers outside the monitored tree.
    System,
    /// Synthetic text with no physical origin (token pasting and friends).
    Scratch,
}

/// A `#line N "file"` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDirective {
    /// Byte offset of the first line the directive applies to.
    pub offset: u32,
    /// Presented line number of that first line.
    pub line: u32,
    /// Presented file name, if the directive renames the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// One physical or synthetic text buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path as spelled by the frontend.
    pub path: PathBuf,
    /// Buffer classification.
    #[serde(default)]
    pub kind: FileKind,
    /// Full text, when the frontend ships it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Byte offsets of line starts. Computed from `text` when empty.
    #[serde(default)]
    pub line_starts: Vec<u32>,
    /// Line-remap directives in source order.
    #[serde(default)]
    pub line_directives: Vec<LineDirective>,
    /// File-level pragmas (e.g. `check_unsafe_buffers`).
    #[serde(default)]
    pub pragmas: Vec<String>,
}

impl SourceFile {
    /// Creates a buffer with no text attached.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            kind,
            text: None,
            line_starts: Vec::new(),
            line_directives: Vec::new(),
            pragmas: Vec::new(),
        }
    }

    /// Creates a user buffer from its text.
    #[must_use]
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut file = Self::new(path, FileKind::User);
        file.line_starts = compute_line_starts(&text);
        file.text = Some(text);
        file
    }

    /// Sets the buffer kind.
    #[must_use]
    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds a file-level pragma.
    #[must_use]
    pub fn with_pragma(mut self, pragma: impl Into<String>) -> Self {
        self.pragmas.push(pragma.into());
        self
    }

    /// Adds a line-remap directive.
    #[must_use]
    pub fn with_line_directive(mut self, directive: LineDirective) -> Self {
        self.line_directives.push(directive);
        self
    }

    /// Returns true if the buffer carries the given pragma.
    #[must_use]
    pub fn has_pragma(&self, pragma: &str) -> bool {
        self.pragmas.iter().any(|p| p == pragma)
    }

    /// Returns the 1-indexed `(line, column)` of a byte offset.
    ///
    /// Without line information every offset is on line 1.
    #[must_use]
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        if self.line_starts.is_empty() {
            return (1, offset.saturating_add(1));
        }
        let idx = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[idx];
        (to_u32(idx) + 1, offset.saturating_sub(line_start) + 1)
    }

    /// Returns the presented file name and line for a byte offset, honoring
    /// the last line directive at or before it.
    ///
    /// A directive without a file name keeps the name set by the nearest
    /// earlier directive that has one.
    #[must_use]
    pub fn presented_line(&self, offset: u32) -> (Option<&str>, u32) {
        let (line, _) = self.line_col(offset);
        let mut active: Vec<&LineDirective> = self
            .line_directives
            .iter()
            .filter(|d| d.offset <= offset)
            .collect();
        active.sort_by_key(|d| d.offset);

        match active.last() {
            Some(d) => {
                let (directive_line, _) = self.line_col(d.offset);
                let file = active.iter().rev().copied().find_map(|d| d.file.as_deref());
                (file, d.line + line.saturating_sub(directive_line))
            }
            None => (None, line),
        }
    }

    fn ensure_line_starts(&mut self) {
        if self.line_starts.is_empty() {
            if let Some(text) = &self.text {
                self.line_starts = compute_line_starts(text);
            }
        }
    }
}

fn compute_line_starts(text: &str) -> Vec<u32> {
    std::iter::once(0)
        .chain(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| to_u32(i + 1)),
        )
        .collect()
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// A single macro expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    /// Name of the expanded macro.
    pub macro_name: String,
    /// Where the expanded text was written (macro body, argument, or scratch).
    pub spelling: RawLocation,
    /// Where the macro was invoked.
    pub invocation: SourceRange,
}

/// All buffers and expansions of one translation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    /// Buffers, indexed by [`FileId`].
    #[serde(default)]
    pub files: Vec<SourceFile>,
    /// Expansions, indexed by [`ExpansionId`].
    #[serde(default)]
    pub expansions: Vec<Expansion>,
}

impl SourceMap {
    /// Creates an empty source map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a buffer.
    pub fn add_file(&mut self, file: SourceFile) -> FileId {
        self.files.push(file);
        FileId(to_u32(self.files.len() - 1))
    }

    /// Registers a macro expansion.
    pub fn add_expansion(&mut self, expansion: Expansion) -> ExpansionId {
        self.expansions.push(expansion);
        ExpansionId(to_u32(self.expansions.len() - 1))
    }

    /// Looks up a buffer.
    #[must_use]
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    /// Looks up an expansion.
    #[must_use]
    pub fn expansion(&self, id: ExpansionId) -> Option<&Expansion> {
        self.expansions.get(id.index())
    }

    /// Fills in derived data after deserialization.
    pub fn finalize(&mut self) {
        for file in &mut self.files {
            file.ensure_line_starts();
        }
    }
}
