//! # policy-lint-rules
//!
//! Built-in coding-policy rules for policy-lint.
//!
//! ## Available Rules
//!
//! | Code | Name | Description |
//! |------|------|-------------|
//! | PL001 | `raw-ptr-field` | Requires `raw_ptr<T>` for pointer fields |
//! | PL002 | `raw-ref-field` | Requires `raw_ref<T>` for reference fields |
//! | PL003 | `raw-ptr-cast` | Forbids bit-casts from pointers to `raw_ptr<T>` |
//! | PL004 | `raw-ptr-to-stack-allocated` | Forbids `raw_ptr`/`raw_ref` to `STACK_ALLOCATED` objects |
//! | PL005 | `discouraged-type` | Forbids discouraged container types in data members |
//! | PL006 | `unsafe-buffers` | Flags unchecked buffer access outside `UNSAFE_BUFFERS` |
//! | PL007 | `missing-override` | Requires `override` or `final` on overriding methods |
//! | PL008 | `redundant-virtual` | Flags `virtual` combined with `override` or `final` |
//! | PL009 | `redundant-override` | Flags `override` combined with `final` |
//! | PL010 | `c-array-to-std-array` | Suggests `std::array` for local C arrays |
//!
//! ## Usage
//!
//! ```ignore
//! use policy_lint_core::Engine;
//! use policy_lint_rules::{RawPtrField, UnsafeBuffers};
//!
//! let engine = Engine::builder()
//!     .rule(RawPtrField::new())
//!     .rule(UnsafeBuffers::new())
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod c_array;
pub mod discouraged_type;
pub mod missing_override;
mod presets;
pub mod raw_ptr_cast;
pub mod raw_ptr_field;
pub mod raw_ptr_to_stack_allocated;
pub mod raw_ref_field;
pub mod redundant_override;
pub mod redundant_virtual;
pub mod unsafe_buffers;

#[cfg(test)]
mod test_support;

pub use c_array::CArrayToStdArray;
pub use discouraged_type::DiscouragedType;
pub use missing_override::MissingOverride;
pub use presets::{
    all_rules, build_rules, raw_ptr_rules, rewrite_rules, rule_by_name, style_rules, Preset,
};
pub use raw_ptr_cast::RawPtrCast;
pub use raw_ptr_field::RawPtrField;
pub use raw_ptr_to_stack_allocated::RawPtrToStackAllocated;
pub use raw_ref_field::RawRefField;
pub use redundant_override::RedundantOverride;
pub use redundant_virtual::RedundantVirtual;
pub use unsafe_buffers::UnsafeBuffers;

// Re-export core types for convenience
pub use policy_lint_core::{Rule, RuleBox, Severity};
