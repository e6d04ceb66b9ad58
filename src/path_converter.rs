//! Bidirectional path rewriting between a parent namespace (exposed to
//! clients) and a child namespace (consumed by a backend) — spec §4.4.

use std::borrow::Cow;

/// Rewrites paths between `parent_stem` and `child_stem`.
///
/// When the two stems are equal, conversion is the identity and returns a
/// borrowed [`Cow`] to avoid an allocation on the fast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConverter {
    parent_stem: String,
    child_stem: String,
}

impl PathConverter {
    pub fn new(parent_stem: impl Into<String>, child_stem: impl Into<String>) -> Self {
        Self { parent_stem: parent_stem.into(), child_stem: child_stem.into() }
    }

    /// A converter with identical stems — every path maps to itself.
    pub fn identity() -> Self {
        Self::new("", "")
    }

    pub fn parent_stem(&self) -> &str {
        &self.parent_stem
    }

    pub fn child_stem(&self) -> &str {
        &self.child_stem
    }

    fn is_identity(&self) -> bool {
        self.parent_stem == self.child_stem
    }

    /// Maps a path in the parent namespace to the child namespace.
    ///
    /// Succeeds iff `p` starts with `parent_stem`; returns `None` otherwise.
    pub fn parent_to_child<'a>(&self, p: &'a str) -> Option<Cow<'a, str>> {
        if self.is_identity() {
            return Some(Cow::Borrowed(p));
        }
        let rest = p.strip_prefix(self.parent_stem.as_str())?;
        Some(Cow::Owned(format!("{}{}", self.child_stem, rest)))
    }

    /// Maps a path in the child namespace back to the parent namespace.
    ///
    /// Succeeds iff `c` starts with `child_stem`; returns `None` otherwise.
    pub fn child_to_parent<'a>(&self, c: &'a str) -> Option<Cow<'a, str>> {
        if self.is_identity() {
            return Some(Cow::Borrowed(c));
        }
        let rest = c.strip_prefix(self.child_stem.as_str())?;
        Some(Cow::Owned(format!("{}{}", self.parent_stem, rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_fast_path_borrows() {
        let conv = PathConverter::identity();
        match conv.parent_to_child("a/b") {
            Some(Cow::Borrowed(s)) => assert_eq!(s, "a/b"),
            _ => panic!("expected borrowed identity path"),
        }
    }

    #[test]
    fn rewrites_between_stems() {
        let conv = PathConverter::new("/mnt", "/data");
        assert_eq!(conv.parent_to_child("/mnt/x").unwrap(), "/data/x");
        assert_eq!(conv.child_to_parent("/data/x").unwrap(), "/mnt/x");
    }

    #[test]
    fn rejects_paths_outside_stem() {
        let conv = PathConverter::new("/mnt", "/data");
        assert!(conv.parent_to_child("/other/x").is_none());
        assert!(conv.child_to_parent("/other/x").is_none());
    }

    #[test]
    fn round_trips() {
        let conv = PathConverter::new("/a", "/b/c");
        let child = conv.parent_to_child("/a/file.txt").unwrap().into_owned();
        let parent = conv.child_to_parent(&child).unwrap();
        assert_eq!(parent, "/a/file.txt");
    }
}
