//! Utility functions shared by the engine and rule implementations.

pub mod paths;

#[doc(inline)]
pub use paths::{last_segment, normalize_path, path_matches};
