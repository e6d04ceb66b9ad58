//! Glob pattern parsing, matching, and the union/intersection algebra over
//! patterns (spec §4.7).
//!
//! `?` matches one non-separator character, `*` matches zero or more
//! non-separator characters, `**` matches zero or more characters
//! including separators; every other character is literal. The separator
//! is `/`.

use std::fmt;
use std::sync::{Arc, OnceLock};

use moka::sync::Cache;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    Question,
    Star,
    DoubleStar,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            '*' => {
                if i + 1 < chars.len() && chars[i + 1] == '*' {
                    tokens.push(Token::DoubleStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }
    tokens
}

fn is_wildcard(t: &Token) -> bool {
    !matches!(t, Token::Literal(_))
}

/// Decomposition of a glob pattern into a literal leading directory path
/// and the wildcard-bearing tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternInfo {
    pub prefix: String,
    pub suffix: String,
    pub subdirectories: bool,
}

fn pattern_info(tokens: &[Token]) -> PatternInfo {
    let first_wildcard = tokens.iter().position(is_wildcard).unwrap_or(tokens.len());

    // Prefix extends to the last '/' at or before the first wildcard, so
    // the wildcard tail always starts at a segment boundary.
    let last_sep_before = tokens[..first_wildcard]
        .iter()
        .rposition(|t| matches!(t, Token::Literal('/')))
        .map(|idx| idx + 1)
        .unwrap_or(0);

    let prefix: String = tokens[..last_sep_before]
        .iter()
        .map(|t| match t {
            Token::Literal(c) => *c,
            _ => unreachable!("prefix only contains literals"),
        })
        .collect();

    let suffix_tokens = &tokens[last_sep_before..];
    let suffix: String = render(suffix_tokens);

    let first_sep_in_suffix = suffix.find('/');
    let subdirectories = suffix.contains("**")
        || match first_sep_in_suffix {
            Some(idx) => suffix[idx + 1..].chars().any(|c| c == '*' || c == '?'),
            None => false,
        };

    PatternInfo { prefix, suffix, subdirectories }
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        match t {
            Token::Literal(c) => out.push(*c),
            Token::Question => out.push('?'),
            Token::Star => out.push('*'),
            Token::DoubleStar => out.push_str("**"),
        }
    }
    out
}

fn matches_tokens(tokens: &[Token], text: &[char]) -> bool {
    fn go(tokens: &[Token], text: &[char]) -> bool {
        match tokens.first() {
            None => text.is_empty(),
            Some(Token::Literal(c)) => {
                !text.is_empty() && text[0] == *c && go(&tokens[1..], &text[1..])
            }
            Some(Token::Question) => {
                !text.is_empty() && text[0] != '/' && go(&tokens[1..], &text[1..])
            }
            Some(Token::Star) => {
                // Try consuming zero, then one, then two... non-separator
                // characters; a star may never cross a separator.
                let mut i = 0;
                loop {
                    if go(&tokens[1..], &text[i..]) {
                        return true;
                    }
                    if i >= text.len() || text[i] == '/' {
                        return false;
                    }
                    i += 1;
                }
            }
            Some(Token::DoubleStar) => {
                for i in 0..=text.len() {
                    if go(&tokens[1..], &text[i..]) {
                        return true;
                    }
                }
                false
            }
        }
    }
    go(tokens, text)
}

/// A compiled glob pattern, the leaf of a [`GlobPattern`] algebra tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledGlob {
    source: String,
    tokens: Vec<Token>,
}

fn glob_cache() -> &'static Cache<String, Arc<CompiledGlob>> {
    static CACHE: OnceLock<Cache<String, Arc<CompiledGlob>>> = OnceLock::new();
    CACHE.get_or_init(|| Cache::new(1024))
}

impl CompiledGlob {
    pub fn compile(pattern: &str) -> Self {
        Self { source: pattern.to_string(), tokens: tokenize(pattern) }
    }

    /// Compiles `pattern`, memoizing the result: the same filter string is
    /// typically re-subscribed many times as mount points reconnect.
    pub fn compile_cached(pattern: &str) -> Arc<Self> {
        glob_cache().get_with(pattern.to_string(), || Arc::new(Self::compile(pattern)))
    }

    pub fn matches(&self, path: &str) -> bool {
        let chars: Vec<char> = path.chars().collect();
        matches_tokens(&self.tokens, &chars)
    }

    pub fn info(&self) -> PatternInfo {
        pattern_info(&self.tokens)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn is_literal(&self) -> bool {
        self.tokens.iter().all(|t| matches!(t, Token::Literal(_)))
    }

    fn is_universal(&self) -> bool {
        self.source == "**"
    }
}

/// A glob pattern, or a union/intersection combination of patterns.
///
/// Kept as a small algebra tree (rather than collapsed to one wildcard
/// string) so `matches` is always exact: `matches(p, union(a,b)) <=>
/// matches(p,a) || matches(p,b)`, and likewise for intersection. Use
/// [`GlobPattern::simplify`] to fold the tree into a single pattern where
/// that is possible without losing precision — this is what gives the
/// `"?b"`/`"*/*"`/`None` shapes from the spec's algebra examples.
#[derive(Debug, Clone)]
pub enum GlobPattern {
    Leaf(CompiledGlob),
    Union(Box<GlobPattern>, Box<GlobPattern>),
    Intersection(Box<GlobPattern>, Box<GlobPattern>),
    /// The empty pattern: matches nothing.
    Empty,
}

impl GlobPattern {
    pub fn compile(pattern: &str) -> Self {
        GlobPattern::Leaf(CompiledGlob::compile(pattern))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            GlobPattern::Leaf(g) => g.matches(path),
            GlobPattern::Union(a, b) => a.matches(path) || b.matches(path),
            GlobPattern::Intersection(a, b) => a.matches(path) && b.matches(path),
            GlobPattern::Empty => false,
        }
    }

    pub fn union(a: GlobPattern, b: GlobPattern) -> GlobPattern {
        GlobPattern::Union(Box::new(a), Box::new(b)).simplify()
    }

    pub fn intersection(a: GlobPattern, b: GlobPattern) -> GlobPattern {
        GlobPattern::Intersection(Box::new(a), Box::new(b)).simplify()
    }

    /// Folds the algebra tree into a single leaf pattern where that is
    /// possible without changing which paths match; otherwise returns the
    /// tree unchanged.
    pub fn simplify(self) -> GlobPattern {
        match self {
            GlobPattern::Union(a, b) => {
                let a = a.simplify();
                let b = b.simplify();
                if let (GlobPattern::Leaf(ga), GlobPattern::Leaf(gb)) = (&a, &b) {
                    if ga.is_literal() && gb.is_literal() && ga.source.chars().count() == gb.source.chars().count() {
                        let merged: String = ga
                            .source
                            .chars()
                            .zip(gb.source.chars())
                            .map(|(x, y)| if x == y { x } else { '?' })
                            .collect();
                        return GlobPattern::Leaf(CompiledGlob::compile(&merged));
                    }
                    if ga.source == gb.source {
                        return GlobPattern::Leaf(ga.clone());
                    }
                }
                GlobPattern::Union(Box::new(a), Box::new(b))
            }
            GlobPattern::Intersection(a, b) => {
                let a = a.simplify();
                let b = b.simplify();
                if let GlobPattern::Leaf(ga) = &a {
                    if ga.is_universal() {
                        return b;
                    }
                }
                if let GlobPattern::Leaf(gb) = &b {
                    if gb.is_universal() {
                        return a;
                    }
                }
                if let (GlobPattern::Leaf(ga), GlobPattern::Leaf(gb)) = (&a, &b) {
                    if ga.is_literal() && gb.is_literal() {
                        return if ga.source == gb.source {
                            GlobPattern::Leaf(ga.clone())
                        } else {
                            GlobPattern::Empty
                        };
                    }
                    if ga.source == gb.source {
                        return GlobPattern::Leaf(ga.clone());
                    }
                }
                GlobPattern::Intersection(Box::new(a), Box::new(b))
            }
            other => other,
        }
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobPattern::Leaf(g) => write!(f, "{}", g.as_str()),
            GlobPattern::Union(a, b) => write!(f, "({a}|{b})"),
            GlobPattern::Intersection(a, b) => write!(f, "({a}&{b})"),
            GlobPattern::Empty => write!(f, "\u{2205}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_matches_one_non_separator_char() {
        let g = CompiledGlob::compile("a?c");
        assert!(g.matches("abc"));
        assert!(!g.matches("a/c"));
        assert!(!g.matches("ac"));
    }

    #[test]
    fn star_does_not_cross_separator() {
        let g = CompiledGlob::compile("/tmp/hello*.txt");
        assert!(g.matches("/tmp/helloworld.txt"));
        assert!(!g.matches("/tmp/hello/world.txt"));
    }

    #[test]
    fn double_star_crosses_separators() {
        let g = CompiledGlob::compile("/tmp/**");
        assert!(g.matches("/tmp/a/b/c"));
    }

    #[test]
    fn pattern_info_splits_prefix_and_suffix() {
        let g = CompiledGlob::compile("/tmp/hello*.txt");
        let info = g.info();
        assert_eq!(info.prefix, "/tmp/");
        assert_eq!(info.suffix, "hello*.txt");
        assert!(!info.subdirectories);
    }

    #[test]
    fn pattern_info_detects_subdirectories_via_double_star() {
        let info = CompiledGlob::compile("/tmp/**").info();
        assert!(info.subdirectories);
    }

    #[test]
    fn pattern_info_detects_subdirectories_via_wildcard_after_separator() {
        let info = CompiledGlob::compile("/tmp/*/x*.txt").info();
        assert!(info.subdirectories);
    }

    #[test]
    fn union_of_literals_matches_spec_example() {
        let union = GlobPattern::union(GlobPattern::compile("ab"), GlobPattern::compile("cb"));
        assert_eq!(union.to_string(), "?b");
    }

    #[test]
    fn intersection_of_universal_and_narrower_matches_spec_example() {
        let inter =
            GlobPattern::intersection(GlobPattern::compile("**"), GlobPattern::compile("*/*"));
        assert_eq!(inter.to_string(), "*/*");
    }

    #[test]
    fn intersection_of_disjoint_literals_is_empty() {
        let inter =
            GlobPattern::intersection(GlobPattern::compile("kissa"), GlobPattern::compile("koira"));
        assert!(matches!(inter, GlobPattern::Empty));
    }

    #[test]
    fn union_matches_iff_either_matches() {
        let a = GlobPattern::compile("/a/*");
        let b = GlobPattern::compile("/b/*");
        let union = GlobPattern::union(a.clone(), b.clone());
        for p in ["/a/x", "/b/y", "/c/z"] {
            assert_eq!(union.matches(p), a.matches(p) || b.matches(p));
        }
    }

    #[test]
    fn compile_cached_memoizes_identical_filters() {
        let a = CompiledGlob::compile_cached("/tmp/hello*.txt");
        let b = CompiledGlob::compile_cached("/tmp/hello*.txt");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn intersection_matches_iff_both_match() {
        let a = GlobPattern::compile("/a/**");
        let b = GlobPattern::compile("/a/*.txt");
        let inter = GlobPattern::intersection(a.clone(), b.clone());
        for p in ["/a/x.txt", "/a/x.rs", "/b/x.txt"] {
            assert_eq!(inter.matches(p), a.matches(p) && b.matches(p));
        }
    }
}
