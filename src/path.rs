//! Path syntax and dot-segment normalization shared by [`crate::path_converter`],
//! [`crate::memory_fs`], and [`crate::virtual_fs`].
//!
//! Paths use `/` as separator; the root is the empty string. A path ending
//! in `/` denotes a directory. Drive-like prefixes (`c:/`) are accepted as
//! the first segment.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Splits `path` into its `/`-separated segments, dropping empty segments
/// produced by repeated separators.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalizes dot-segments in `path`.
///
/// `.` segments are removed; `..` pops one segment unless at root. `..`
/// above root is an error for write-oriented callers; read-oriented
/// callers should use [`normalize_lenient`] instead, which clamps to root.
pub fn normalize(path: &str) -> Result<String> {
    let mut out: Vec<&str> = Vec::new();
    for seg in segments(path) {
        match seg {
            "." => continue,
            ".." => {
                if out.pop().is_none() {
                    return Err(Error::InvalidPath(PathBuf::from(path)));
                }
            }
            other => out.push(other),
        }
    }
    let mut result = out.join("/");
    if is_directory_path(path) && !result.is_empty() {
        result.push('/');
    }
    Ok(result)
}

/// Like [`normalize`], but a `..` above root simply clamps to root instead
/// of failing — used by read-side operations per the spec's calibrated
/// scenarios.
pub fn normalize_lenient(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in segments(path) {
        match seg {
            "." => continue,
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    let mut result = out.join("/");
    if is_directory_path(path) && !result.is_empty() {
        result.push('/');
    }
    result
}

/// True if `path` is syntactically a directory path (empty, or ends in `/`).
pub fn is_directory_path(path: &str) -> bool {
    path.is_empty() || path.ends_with('/')
}

/// Returns the parent of `path`: strips a trailing separator, then removes
/// the last segment. The parent of the root is the root.
pub fn parent(path: &str) -> String {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => String::new(),
    }
}

/// Returns the final segment of `path` (the file/directory name).
pub fn name(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Joins a directory path with a child name.
pub fn join(dir: &str, child: &str) -> String {
    if dir.is_empty() {
        child.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{child}")
    } else {
        format!("{dir}/{child}")
    }
}

/// Rejects paths that are syntactically invalid for a leaf operation:
/// ending in `/`, or resolving to `""`, `.` or `..` at the leaf.
pub fn reject_leaf(path: &str) -> Result<()> {
    if path.is_empty() || path.ends_with('/') {
        return Err(Error::InvalidPath(PathBuf::from(path)));
    }
    let last = name(path);
    if last.is_empty() || last == "." || last == ".." {
        return Err(Error::InvalidPath(PathBuf::from(path)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_removes_dot_segments() {
        assert_eq!(normalize("./a/./b").unwrap(), "a/b");
        assert_eq!(normalize("a/b/../c").unwrap(), "a/c");
    }

    #[test]
    fn normalize_is_idempotent() {
        let p = "./a/../b/./c";
        let once = normalize(p).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_above_root_fails() {
        assert!(normalize("..").is_err());
        assert!(normalize("a/../..").is_err());
    }

    #[test]
    fn normalize_lenient_clamps_to_root() {
        assert_eq!(normalize_lenient(".."), "");
        assert_eq!(normalize_lenient("a/../.."), "");
    }

    #[test]
    fn parent_strips_trailing_separator_then_last_segment() {
        assert_eq!(parent("a/b/"), "a/");
        assert_eq!(parent("a/b"), "a/");
        assert_eq!(parent("a"), "");
        assert_eq!(parent(""), "");
    }

    #[test]
    fn dot_segment_resolution_matches_spec_example() {
        let a = normalize_lenient("./c:/../c:/dir");
        let b = normalize_lenient("c:/dir");
        assert_eq!(a, b);
    }

    #[test]
    fn reject_leaf_rejects_directory_and_dot_segments() {
        assert!(reject_leaf("a/").is_err());
        assert!(reject_leaf("").is_err());
        assert!(reject_leaf("a/.").is_err());
        assert!(reject_leaf("a/..").is_err());
        assert!(reject_leaf("a/b").is_ok());
    }
}
