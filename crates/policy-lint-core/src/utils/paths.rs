//! Qualified-name and file-path helpers.

use std::path::{Component, Path};

/// Checks if a qualified name matches a pattern.
///
/// Supports wildcards:
/// - `*` matches any single segment
/// - `**` matches any number of segments
///
/// # Examples
///
/// ```
/// use policy_lint_core::utils::paths::path_matches;
///
/// assert!(path_matches("blink::Node::children_", "blink::**"));
/// assert!(path_matches("base::raw_ptr", "base::*"));
/// assert!(!path_matches("cc::Layer", "blink::**"));
/// ```
#[must_use]
pub fn path_matches(path: &str, pattern: &str) -> bool {
    let path_parts: Vec<&str> = split_qualified(path);
    let pattern_parts: Vec<&str> = split_qualified(pattern);

    match_parts(&path_parts, &pattern_parts)
}

/// Splits a qualified name on `::`, ignoring a leading global `::`.
fn split_qualified(name: &str) -> Vec<&str> {
    name.strip_prefix("::").unwrap_or(name).split("::").collect()
}

fn match_parts(path: &[&str], pattern: &[&str]) -> bool {
    let Some((&first_pattern, rest_pattern)) = pattern.split_first() else {
        return path.is_empty();
    };

    match first_pattern {
        "**" => (0..=path.len()).any(|i| match_parts(&path[i..], rest_pattern)),
        "*" => !path.is_empty() && match_parts(&path[1..], rest_pattern),
        literal => path.first() == Some(&literal) && match_parts(&path[1..], rest_pattern),
    }
}

/// Extracts the last segment from a qualified name.
#[must_use]
pub fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Renders a file path relative to `root` with forward slashes and without
/// `.` components, the form exclusion patterns are written against.
#[must_use]
pub fn normalize_path(path: &Path, root: Option<&Path>) -> String {
    let relative = root
        .and_then(|r| path.strip_prefix(r).ok())
        .unwrap_or(path);

    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::RootDir => parts.push(String::new()),
            Component::CurDir | Component::Prefix(_) => {}
        }
    }

    if parts.len() == 1 && parts[0].is_empty() {
        return "/".to_string();
    }
    parts.join("/")
}
