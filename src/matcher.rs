//! Text search capabilities used by autodetection conditions.
//!
//! Conditions never search text themselves. Each function leaf owns a
//! [`TextMatcher`] built at compile time by a [`MatcherFactory`]; hosts with
//! their own search engine implement the factory, everyone else uses
//! [`DefaultMatchers`].
//!
//! Both built-in matchers search forward and ignore case.

use regex::{Regex, RegexBuilder};
use std::fmt::Debug;
use thiserror::Error;

/// A compiled search pattern.
pub trait TextMatcher: Send + Sync + Debug {
    /// Returns true if the pattern occurs anywhere in `text`.
    fn is_found(&self, text: &str) -> bool;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    /// The engine rejected the pattern; the text is the engine's own message.
    #[error("{0}")]
    InvalidPattern(String),
    #[error("out of memory")]
    LowMemory,
}

/// Builds matchers for condition function leaves.
pub trait MatcherFactory {
    fn substring(&self, pattern: &str) -> Result<Box<dyn TextMatcher>, MatcherError>;
    fn regex(&self, pattern: &str) -> Result<Box<dyn TextMatcher>, MatcherError>;
}

/// Matchers backed by simple case folding and the `regex` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMatchers;

impl MatcherFactory for DefaultMatchers {
    fn substring(&self, pattern: &str) -> Result<Box<dyn TextMatcher>, MatcherError> {
        Ok(Box::new(SubstringMatcher::new(pattern)?))
    }

    fn regex(&self, pattern: &str) -> Result<Box<dyn TextMatcher>, MatcherError> {
        Ok(Box::new(RegexMatcher::new(pattern)?))
    }
}

/// Case-insensitive substring search.
#[derive(Debug, Clone)]
pub struct SubstringMatcher {
    folded: String,
}

impl SubstringMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let mut folded = String::new();
        folded.try_reserve(pattern.len()).map_err(|_| MatcherError::LowMemory)?;
        folded.extend(pattern.chars().flat_map(char::to_lowercase));
        Ok(SubstringMatcher { folded })
    }
}

impl TextMatcher for SubstringMatcher {
    fn is_found(&self, text: &str) -> bool {
        if self.folded.is_empty() {
            return true;
        }
        // ASCII only: compare in place.
        if text.is_ascii() && self.folded.is_ascii() {
            let needle = self.folded.as_bytes();
            return text.as_bytes().windows(needle.len()).any(|w| w.eq_ignore_ascii_case(needle));
        }
        text.to_lowercase().contains(&self.folded)
    }
}

/// Case-insensitive regular expression search.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    re: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|err| MatcherError::InvalidPattern(err.to_string()))?;
        Ok(RegexMatcher { re })
    }
}

impl TextMatcher for RegexMatcher {
    fn is_found(&self, text: &str) -> bool {
        self.re.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_ignores_case() {
        let m = SubstringMatcher::new("unix").unwrap();
        assert!(m.is_found("UNIX Type: L8"));
        assert!(!m.is_found("Windows_NT"));
    }

    #[test]
    fn substring_folds_non_ascii() {
        let m = SubstringMatcher::new("ÄRGER").unwrap();
        assert!(m.is_found("kein ärger hier"));
    }

    #[test]
    fn regex_ignores_case() {
        let m = RegexMatcher::new("^220.*microsoft ftp").unwrap();
        assert!(m.is_found("220 Microsoft FTP Service"));
        assert!(!m.is_found("220 ProFTPD Server"));
    }

    #[test]
    fn invalid_regex_reports_engine_text() {
        let err = RegexMatcher::new("[").unwrap_err();
        let MatcherError::InvalidPattern(text) = err else {
            panic!("expected invalid pattern");
        };
        assert!(text.contains("unclosed character class"));
    }
}
