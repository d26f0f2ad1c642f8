// SPDX-License-Identifier: AGPL-3.0-or-later
//! Search matching for File Warden
//!
//! Matching is explicit about what it looks at: file names, file contents,
//! or either. Case-insensitive unless the query asks otherwise.

use fw_core::StorePath;
use serde::{Deserialize, Serialize};

/// What a query is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// File names only
    #[default]
    Name,
    /// File contents only
    Content,
    /// Name first, then contents
    NameOrContent,
}

impl SearchMode {
    pub fn needs_content(&self) -> bool {
        matches!(self, SearchMode::Content | SearchMode::NameOrContent)
    }
}

/// Where a hit was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchLocation {
    Name,
    Content,
}

/// Search query options
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Substring to look for; empty matches every file
    pub text: String,
    pub mode: SearchMode,
    pub case_sensitive: bool,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn name(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: SearchMode::Content,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(&self.text, self.case_sensitive)
    }
}

/// A single search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: StorePath,
    pub size: u64,
    pub location: MatchLocation,
}

/// Substring matcher with the case policy applied once up front
#[derive(Debug, Clone)]
pub struct Matcher {
    needle: String,
    case_sensitive: bool,
}

impl Matcher {
    pub fn new(needle: &str, case_sensitive: bool) -> Self {
        let needle = if case_sensitive {
            needle.to_string()
        } else {
            needle.to_lowercase()
        };
        Self { needle, case_sensitive }
    }

    pub fn matches_str(&self, haystack: &str) -> bool {
        if self.case_sensitive {
            haystack.contains(&self.needle)
        } else {
            haystack.to_lowercase().contains(&self.needle)
        }
    }

    /// Match against raw file bytes. Invalid UTF-8 is replaced, not rejected.
    pub fn matches_bytes(&self, haystack: &[u8]) -> bool {
        self.matches_str(&String::from_utf8_lossy(haystack))
    }

    /// Test a record; `content` is only consulted when the mode needs it.
    pub fn check(
        &self,
        mode: SearchMode,
        name: &str,
        content: Option<&[u8]>,
    ) -> Option<MatchLocation> {
        if mode != SearchMode::Content && self.matches_str(name) {
            return Some(MatchLocation::Name);
        }
        if mode.needs_content() && content.is_some_and(|c| self.matches_bytes(c)) {
            return Some(MatchLocation::Content);
        }
        None
    }
}

/// Glob-style name filter used by listings (case-insensitive).
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: Option<glob::Pattern>,
    fallback: String,
}

impl NameFilter {
    pub fn new(pattern: Option<&str>) -> Self {
        match pattern {
            None | Some("") | Some("*") => Self { pattern: None, fallback: String::new() },
            Some(p) => Self {
                pattern: glob::Pattern::new(p).ok(),
                fallback: p.to_lowercase(),
            },
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        match &self.pattern {
            Some(pattern) => pattern.matches_with(name, options),
            // Unparseable patterns degrade to a substring filter
            None if !self.fallback.is_empty() => name.to_lowercase().contains(&self.fallback),
            None => true,
        }
    }
}

/// Glob-style pattern matching
pub fn matches_glob(pattern: &str, name: &str) -> bool {
    NameFilter::new(Some(pattern)).matches(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_glob() {
        assert!(matches_glob("*", "anything.txt"));
        assert!(matches_glob("*.txt", "file.txt"));
        assert!(matches_glob("*.TXT", "file.txt"));
        assert!(!matches_glob("*.txt", "file.pdf"));
        assert!(matches_glob("file.*", "file.txt"));
        assert!(matches_glob("user?.json", "user1.json"));
        assert!(matches_glob("[", "a[b"));
    }

    #[test]
    fn test_name_match_case_insensitive() {
        let query = SearchQuery::name("REPORT");
        let matcher = query.matcher();
        assert_eq!(
            matcher.check(query.mode, "q1_report.txt", None),
            Some(MatchLocation::Name)
        );
        assert_eq!(matcher.check(query.mode, "notes.txt", None), None);
    }

    #[test]
    fn test_case_sensitive() {
        let query = SearchQuery::name("Report").case_sensitive();
        let matcher = query.matcher();
        assert!(matcher.check(query.mode, "Report.txt", None).is_some());
        assert!(matcher.check(query.mode, "report.txt", None).is_none());
    }

    #[test]
    fn test_content_mode_ignores_name() {
        let query = SearchQuery::content("hello");
        let matcher = query.matcher();
        assert_eq!(matcher.check(query.mode, "hello.txt", Some(b"nothing")), None);
        assert_eq!(
            matcher.check(query.mode, "a.txt", Some(b"Say HELLO")),
            Some(MatchLocation::Content)
        );
    }

    #[test]
    fn test_name_or_content_prefers_name() {
        let query = SearchQuery::name("abc").with_mode(SearchMode::NameOrContent);
        let matcher = query.matcher();
        assert_eq!(
            matcher.check(query.mode, "abc.txt", Some(b"abc")),
            Some(MatchLocation::Name)
        );
        assert_eq!(
            matcher.check(query.mode, "x.txt", Some(b"xxabcxx")),
            Some(MatchLocation::Content)
        );
        assert_eq!(matcher.check(query.mode, "x.txt", None), None);
    }

    #[test]
    fn test_binary_content() {
        let matcher = Matcher::new("key", false);
        assert!(matcher.matches_bytes(&[0xff, 0xfe, b'K', b'E', b'Y']));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let matcher = Matcher::new("", false);
        assert!(matcher.matches_str("anything"));
    }
}
