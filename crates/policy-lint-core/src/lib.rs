//! # policy-lint-core
//!
//! Core engine for enforcing coding-policy rules over syntax trees produced
//! by an external C++ frontend.
//!
//! This crate provides:
//!
//! - [`Matcher`] / [`TypeMatcher`], composable predicates with named captures
//! - [`Rule`], a matcher plus its message and optional rewrite
//! - [`ExclusionList`] and [`ExclusionFilter`] for path, symbol and
//!   annotation policy
//! - [`LocationResolver`] for macro chains and `#line` directives
//! - [`Reporter`] for per-location deduplication
//! - [`RewritePlanner`] for conflict-free edit scripts
//! - [`Engine`] for orchestrating all of the above over many units
//!
//! ## Example
//!
//! ```ignore
//! use policy_lint_core::Engine;
//!
//! let engine = Engine::builder()
//!     .root("/src/chromium")
//!     .rule(MyRule::new())
//!     .build()?;
//!
//! let report = engine.run_units(&dumps);
//! report.print_report();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod dispatcher;
mod exclusion;
mod location;
mod matcher;
mod reporter;
mod rewrite;
mod rule;
mod types;

pub mod source;
pub mod tree;
pub mod utils;

#[doc(hidden)]
pub mod testing;

pub use config::{Config, ConfigError, ConfigWarning, EngineConfig, ExclusionListConfig, RuleConfig};
pub use context::RuleMatch;
pub use dispatcher::{Engine, EngineBuilder, EngineError};
pub use exclusion::{ExclusionFilter, ExclusionList, FilterDecision, ListKind, PathPattern};
pub use location::{
    LocationPolicy, LocationResolver, PhysicalLocation, Resolution, ResolveError,
    ResolvedLocation,
};
pub use matcher::{Bindings, Bound, Matcher, TypeMatcher};
pub use reporter::Reporter;
pub use rewrite::{EditCandidate, EditKind, EditScript, Offer, RewriteContext, RewritePlanner};
pub use rule::{AnnotationPolicy, Rule, RuleBox, RuleTarget};
pub use source::{FileId, FileKind, RawLocation, SourceRange};
pub use tree::{CastKind, Node, NodeId, NodeKind, SpecifierKind, SyntaxTree, TreeError, Type, TypeId};
pub use types::{CanonicalLocation, Diagnostic, Message, RunReport, Severity, UnitReport};
