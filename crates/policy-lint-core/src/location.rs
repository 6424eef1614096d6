//! Maps raw locations to physical and canonical locations.
//!
//! Two answers come out of a resolution. The *physical* location is a byte
//! offset in a real user file; exclusion lists and rewrites work on it. The
//! *canonical* location is what gets printed and deduplicated; it honors
//! `#line` directives, which therefore can rename a file in the output but
//! can never move it out of policy.

use crate::source::{FileId, FileKind, RawLocation, SourceMap, SourceRange};
use crate::types::CanonicalLocation;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Longest macro chain followed before giving up.
pub const MAX_DEPTH: usize = 256;

/// Which end of a macro chain a rule blames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationPolicy {
    /// The outermost macro invocation.
    #[default]
    Expansion,
    /// The text as written, possibly inside a macro body. Scratch text from
    /// token pasting falls back to the nearest invocation.
    Spelling,
}

/// A byte offset in a physical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalLocation {
    /// Buffer id.
    pub file: FileId,
    /// Real path of the buffer.
    pub path: PathBuf,
    /// Byte offset.
    pub offset: u32,
}

/// A fully resolved location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Where the text physically lives.
    pub physical: PhysicalLocation,
    /// Where diagnostics say it lives.
    pub canonical: CanonicalLocation,
}

/// Result of a successful walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The location is in a monitored user file.
    Resolved(ResolvedLocation),
    /// The location is in a system or third-party file and never reported.
    Unreachable,
}

/// Why a location could not be resolved.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ResolveError {
    /// A file id not present in the source map.
    #[error("unknown file id {0}")]
    #[diagnostic(code(policy_lint::location::unknown_file))]
    UnknownFile(u32),

    /// An expansion id not present in the source map.
    #[error("unknown macro expansion id {0}")]
    #[diagnostic(code(policy_lint::location::unknown_expansion))]
    UnknownExpansion(u32),

    /// Scratch text with no invocation to fall back to.
    #[error("location in scratch buffer {path} has no originating invocation")]
    #[diagnostic(code(policy_lint::location::scratch))]
    Scratch {
        /// Path of the scratch buffer.
        path: PathBuf,
    },

    /// The chain is cyclic or longer than [`MAX_DEPTH`].
    #[error("macro expansion chain exceeds {MAX_DEPTH} levels")]
    #[diagnostic(code(policy_lint::location::too_deep))]
    TooDeep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Begin,
    End,
}

/// Resolves raw locations of one unit.
#[derive(Debug, Clone, Copy)]
pub struct LocationResolver<'a> {
    sources: &'a SourceMap,
}

impl<'a> LocationResolver<'a> {
    /// Creates a resolver over a unit's source map.
    #[must_use]
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    /// Returns the underlying source map.
    #[must_use]
    pub fn sources(&self) -> &'a SourceMap {
        self.sources
    }

    /// Resolves a location for reporting.
    ///
    /// # Errors
    ///
    /// Returns an error when the chain cannot be followed to a physical file.
    pub fn resolve(
        &self,
        raw: RawLocation,
        policy: LocationPolicy,
    ) -> Result<Resolution, ResolveError> {
        let (file_id, offset) = self.walk(raw, policy, Edge::Begin)?;
        let file = self
            .sources
            .file(file_id)
            .ok_or(ResolveError::UnknownFile(file_id.0))?;

        if file.kind == FileKind::System {
            return Ok(Resolution::Unreachable);
        }

        let (presented, line) = file.presented_line(offset);
        let (_, column) = file.line_col(offset);
        let canonical = CanonicalLocation {
            file: presented.map_or_else(|| file.path.clone(), PathBuf::from),
            line,
            column,
        };

        Ok(Resolution::Resolved(ResolvedLocation {
            physical: PhysicalLocation {
                file: file_id,
                path: file.path.clone(),
                offset,
            },
            canonical,
        }))
    }

    /// Resolves a range to a byte span in one user file.
    ///
    /// Returns `None` when the range cannot be edited: under the expansion
    /// policy either end is inside a macro, the ends land in different
    /// files, the file is not a user file, or the span is reversed.
    #[must_use]
    pub fn physical_range(
        &self,
        range: SourceRange,
        policy: LocationPolicy,
    ) -> Option<(FileId, u32, u32)> {
        if policy == LocationPolicy::Expansion && (range.begin.is_macro() || range.end.is_macro())
        {
            return None;
        }
        let (begin_file, begin) = self.walk(range.begin, policy, Edge::Begin).ok()?;
        let (end_file, end) = self.walk(range.end, policy, Edge::End).ok()?;
        let kind = self.sources.file(begin_file)?.kind;
        (begin_file == end_file && kind == FileKind::User && begin <= end)
            .then_some((begin_file, begin, end))
    }

    fn walk(
        &self,
        raw: RawLocation,
        policy: LocationPolicy,
        edge: Edge,
    ) -> Result<(FileId, u32), ResolveError> {
        let mut current = raw;
        let mut policy = policy;
        let mut fallback: Option<RawLocation> = None;

        for _ in 0..MAX_DEPTH {
            match current {
                RawLocation::File { file, offset } => {
                    let source = self
                        .sources
                        .file(file)
                        .ok_or(ResolveError::UnknownFile(file.0))?;
                    if source.kind != FileKind::Scratch {
                        return Ok((file, offset));
                    }
                    match fallback.take() {
                        Some(invocation) => {
                            current = invocation;
                            policy = LocationPolicy::Expansion;
                        }
                        None => {
                            return Err(ResolveError::Scratch {
                                path: source.path.clone(),
                            })
                        }
                    }
                }
                RawLocation::Macro { expansion, offset } => {
                    let exp = self
                        .sources
                        .expansion(expansion)
                        .ok_or(ResolveError::UnknownExpansion(expansion.0))?;
                    let invocation = match edge {
                        Edge::Begin => exp.invocation.begin,
                        Edge::End => exp.invocation.end,
                    };
                    current = match policy {
                        LocationPolicy::Expansion => invocation,
                        LocationPolicy::Spelling => {
                            fallback = Some(invocation);
                            exp.spelling.advanced(offset)
                        }
                    };
                }
            }
        }

        Err(ResolveError::TooDeep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Expansion, ExpansionId, LineDirective, SourceFile};
    use crate::testing::{loc, range};

    /// `user.cc` invokes `M` at offset 10; `M`'s body lives in `macros.h`
    /// at offset 100 and pastes a token into a scratch buffer.
    fn sources() -> SourceMap {
        let mut map = SourceMap::new();
        let user = map.add_file(SourceFile::from_text(
            "user.cc",
            "int a;\nint b = M(x);\n#line 38 \"other.h\"\nint c;\n",
        ));
        let header = map.add_file(SourceFile::from_text("macros.h", &"x\n".repeat(80)));
        let scratch = map.add_file(SourceFile::new("<scratch space>", FileKind::Scratch));
        let system = map.add_file(SourceFile::new("/usr/include/c++/vector", FileKind::System));
        map.add_expansion(Expansion {
            macro_name: "M".into(),
            spelling: loc(header, 100),
            invocation: range(user, 15, 19),
        });
        map.add_expansion(Expansion {
            macro_name: "PASTE".into(),
            spelling: loc(scratch, 0),
            invocation: SourceRange::new(
                RawLocation::in_macro(ExpansionId(0), 2),
                RawLocation::in_macro(ExpansionId(0), 4),
            ),
        });
        map.add_expansion(Expansion {
            macro_name: "SYS".into(),
            spelling: loc(system, 4),
            invocation: range(user, 0, 3),
        });
        map.files[user.index()]
            .line_directives
            .push(LineDirective {
                offset: 40,
                line: 38,
                file: Some("other.h".into()),
            });
        map
    }

    fn resolved(resolution: Resolution) -> ResolvedLocation {
        match resolution {
            Resolution::Resolved(r) => r,
            Resolution::Unreachable => panic!("unexpectedly unreachable"),
        }
    }

    #[test]
    fn expansion_policy_blames_invocation() {
        let map = sources();
        let resolver = LocationResolver::new(&map);
        let r = resolved(
            resolver
                .resolve(RawLocation::in_macro(ExpansionId(0), 3), LocationPolicy::Expansion)
                .expect("resolves"),
        );
        assert_eq!(r.physical.path, PathBuf::from("user.cc"));
        assert_eq!(r.physical.offset, 15);
        assert_eq!((r.canonical.line, r.canonical.column), (2, 9));
    }

    #[test]
    fn spelling_policy_blames_macro_body() {
        let map = sources();
        let resolver = LocationResolver::new(&map);
        let r = resolved(
            resolver
                .resolve(RawLocation::in_macro(ExpansionId(0), 4), LocationPolicy::Spelling)
                .expect("resolves"),
        );
        assert_eq!(r.physical.path, PathBuf::from("macros.h"));
        assert_eq!(r.physical.offset, 104);
        assert_eq!(r.canonical.line, 53);
    }

    #[test]
    fn scratch_spelling_falls_back_to_invocation() {
        let map = sources();
        let resolver = LocationResolver::new(&map);
        let r = resolved(
            resolver
                .resolve(RawLocation::in_macro(ExpansionId(1), 1), LocationPolicy::Spelling)
                .expect("resolves"),
        );
        // PASTE was invoked inside M, whose invocation is in user.cc.
        assert_eq!(r.physical.path, PathBuf::from("user.cc"));
        assert_eq!(r.physical.offset, 15);
    }

    #[test]
    fn scratch_without_invocation_is_an_error() {
        let map = sources();
        let resolver = LocationResolver::new(&map);
        assert!(matches!(
            resolver.resolve(loc(FileId(2), 0), LocationPolicy::Spelling),
            Err(ResolveError::Scratch { .. })
        ));
    }

    #[test]
    fn system_locations_are_unreachable() {
        let map = sources();
        let resolver = LocationResolver::new(&map);
        assert_eq!(
            resolver.resolve(RawLocation::in_macro(ExpansionId(2), 0), LocationPolicy::Spelling),
            Ok(Resolution::Unreachable)
        );
        // The same expansion blamed at its invocation is a user location.
        assert!(matches!(
            resolver.resolve(RawLocation::in_macro(ExpansionId(2), 0), LocationPolicy::Expansion),
            Ok(Resolution::Resolved(_))
        ));
    }

    #[test]
    fn line_directive_changes_only_the_canonical_location() {
        let map = sources();
        let resolver = LocationResolver::new(&map);
        let r = resolved(
            resolver
                .resolve(loc(FileId(0), 40), LocationPolicy::Expansion)
                .expect("resolves"),
        );
        assert_eq!(r.physical.path, PathBuf::from("user.cc"));
        assert_eq!(r.canonical.file, PathBuf::from("other.h"));
        assert_eq!(r.canonical.line, 38);
    }

    #[test]
    fn cyclic_chain_is_an_error() {
        let mut map = SourceMap::new();
        map.add_expansion(Expansion {
            macro_name: "LOOP".into(),
            spelling: RawLocation::in_macro(ExpansionId(0), 0),
            invocation: SourceRange::new(
                RawLocation::in_macro(ExpansionId(0), 0),
                RawLocation::in_macro(ExpansionId(0), 0),
            ),
        });
        let resolver = LocationResolver::new(&map);
        assert_eq!(
            resolver.resolve(RawLocation::in_macro(ExpansionId(0), 0), LocationPolicy::Expansion),
            Err(ResolveError::TooDeep)
        );
    }

    #[test]
    fn physical_range_rules() {
        let map = sources();
        let resolver = LocationResolver::new(&map);
        assert_eq!(
            resolver.physical_range(range(FileId(0), 0, 3), LocationPolicy::Expansion),
            Some((FileId(0), 0, 3))
        );
        let in_macro = SourceRange::new(
            RawLocation::in_macro(ExpansionId(0), 0),
            RawLocation::in_macro(ExpansionId(0), 2),
        );
        assert_eq!(
            resolver.physical_range(in_macro, LocationPolicy::Expansion),
            None
        );
        assert_eq!(
            resolver.physical_range(in_macro, LocationPolicy::Spelling),
            Some((FileId(1), 100, 102))
        );
        let split = SourceRange::new(loc(FileId(0), 0), loc(FileId(1), 2));
        assert_eq!(resolver.physical_range(split, LocationPolicy::Spelling), None);
    }
}
