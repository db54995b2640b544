//! `.twigignore`: paths the working-tree scan never reports.
//!
//! One pattern per line; blank lines and `#` comments are skipped.
//! A pattern containing `*` or `?` is a glob over file names (`*.log`).
//! Anything else is a plain name matching any path component, so `build`
//! hides a whole directory and `Makefile` hides a file. A trailing `/` is
//! accepted and dropped.
//!
//! `.twig` is always ignored. A `.twigignore` file replaces the built-in
//! defaults rather than extending them.

use std::fs;
use std::path::Path;

pub const IGNORE_FILE: &str = ".twigignore";

const STATE_DIR: &str = ".twig";
const DEFAULT_NAMES: &[&str] = &[".git", "target"];

const MAX_PATTERNS: usize = 1000;
const MAX_PATTERN_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Name(String),
    Glob(Vec<char>),
}

impl Pattern {
    fn from_line(line: &str) -> Self {
        if line.contains(['*', '?']) {
            Pattern::Glob(line.chars().collect())
        } else {
            Pattern::Name(line.trim_end_matches('/').to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    /// Rules from `<root>/.twigignore`, or the defaults if there is none.
    pub fn load(root: &Path) -> Self {
        let path = root.join(IGNORE_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                if path.exists() {
                    tracing::warn!(error = %e, "unreadable {IGNORE_FILE}; using defaults");
                }
                Self::defaults()
            }
        }
    }

    pub fn defaults() -> Self {
        Self::with_patterns(DEFAULT_NAMES.iter().map(|n| Pattern::Name(n.to_string())))
    }

    /// Parse ignore-file content. Patterns past the first 1000, and
    /// patterns longer than 1024 bytes, are dropped.
    pub fn parse(content: &str) -> Self {
        Self::with_patterns(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .filter(|line| line.len() <= MAX_PATTERN_LEN)
                .take(MAX_PATTERNS)
                .map(Pattern::from_line),
        )
    }

    fn with_patterns(extra: impl Iterator<Item = Pattern>) -> Self {
        let mut patterns = vec![Pattern::Name(STATE_DIR.to_string())];
        patterns.extend(extra);
        IgnoreRules { patterns }
    }

    /// Should a directory with this name be pruned from a walk?
    pub fn is_dir_ignored(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| matches!(p, Pattern::Name(n) if n == name))
    }

    /// Is a `/`-separated working-tree path ignored?
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let file_name: Vec<char> = rel_path
            .rsplit('/')
            .next()
            .unwrap_or(rel_path)
            .chars()
            .collect();
        self.patterns.iter().any(|p| match p {
            Pattern::Name(name) => rel_path.split('/').any(|c| c == name),
            Pattern::Glob(glob) => glob_match(glob, &file_name),
        })
    }
}

/// `*` matches any run of characters, `?` exactly one.
fn glob_match(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| glob_match(rest, &text[skip..])),
        Some((&c, rest)) => match text.split_first() {
            Some((&t, tail)) if c == '?' || c == t => glob_match(rest, tail),
            _ => false,
        },
    }
}
