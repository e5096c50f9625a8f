//! Exclusion rules for bundling.

use glob::{MatchOptions, Pattern};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ordered list of exclusion patterns.
///
/// Patterns are tried in order and the first one that matches wins:
///
/// 1. exact equality with the relative path (`README.md`, `.git`)
/// 2. directory prefix when the pattern ends with `/` (`tests/`)
/// 3. prefix wildcard when the pattern ends with `*` (`draft*`)
/// 4. shell glob where `*` does not cross `/` (`*.pdf`)
///
/// Paths are compared in forward-slash form on every platform.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    patterns: Vec<String>,
}

impl ExcludeRules {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().replace('\\', "/"))
                .collect(),
        }
    }

    /// Append rules after the existing ones (lower precedence)
    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns
            .extend(patterns.into_iter().map(|p| p.into().replace('\\', "/")));
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Return the first pattern excluding `path`, if any
    pub fn first_match(&self, path: &str) -> Option<&str> {
        let path = path.replace('\\', "/");
        self.patterns
            .iter()
            .find(|pattern| Self::pattern_matches(pattern, &path))
            .map(String::as_str)
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.first_match(path).is_some()
    }

    fn pattern_matches(pattern: &str, path: &str) -> bool {
        if path == pattern {
            return true;
        }

        if let Some(dir) = pattern.strip_suffix('/') {
            if path == dir || path.starts_with(pattern) {
                return true;
            }
        }

        if let Some(prefix) = pattern.strip_suffix('*') {
            if path.starts_with(prefix) {
                return true;
            }
        }

        // Invalid glob syntax never matches
        Pattern::new(pattern)
            .map(|glob| glob.matches_with(path, GLOB_OPTIONS))
            .unwrap_or(false)
    }
}
