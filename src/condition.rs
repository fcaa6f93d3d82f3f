//! Server type autodetection conditions.
//!
//! A condition is a small boolean language evaluated against the server's
//! welcome banner and its `SYST` reply:
//!
//! ```text
//! syst_contains("UNIX") and not welcome_contains("NetWare")
//! reg_exp_in_welcome("^220.*Microsoft FTP") or (syst_contains("Windows_NT"))
//! ```
//!
//! ## How the parts work together
//!
//! ```text
//! source ── Lexer (lexer.rs) ──▶ tokens, function tokens own a TextMatcher
//!                  │
//!                  ▼
//!           parse_condition (parser.rs)
//!             Or  := And (OR Or)?
//!             And := Not (AND And)?
//!             Not := NOT Term | Term
//!             Term:= Function | '(' Or ')'
//!                  │
//!                  ▼
//!           Node tree (tree.rs) ──▶ evaluate(welcome, syst)
//! ```
//!
//! An empty condition compiles to a tree that is always true. Compiled
//! conditions are immutable and can be shared between connections.

#[path = "condition/lexer.rs"]
mod lexer;
#[path = "condition/parser.rs"]
mod parser;
#[path = "condition/tree.rs"]
mod tree;

pub use tree::{ConditionFunction, Node};

pub(crate) use lexer::{is_ident_byte, read_string_literal};

use crate::error::CompileError;
use crate::matcher::{DefaultMatchers, MatcherFactory};

/// A compiled autodetection condition.
#[derive(Debug)]
pub struct Condition {
    root: Node,
}

impl Condition {
    /// Compile `source` using the built-in matchers.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        Self::compile_with(source, &DefaultMatchers)
    }

    /// Compile `source`, building search matchers through `matchers`.
    pub fn compile_with(source: &str, matchers: &dyn MatcherFactory) -> Result<Self, CompileError> {
        let root = parser::parse_condition(source, matchers)?;
        tracing::debug!(condition = source, "compiled autodetect condition");
        Ok(Condition { root })
    }

    /// A condition that holds for every server.
    pub fn always_true() -> Self {
        Condition { root: Node::AlwaysTrue }
    }

    pub fn evaluate(&self, welcome: &str, syst: &str) -> bool {
        self.root.evaluate(welcome, syst)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Message;
    use crate::matcher::{MatcherError, TextMatcher};

    #[test]
    fn empty_condition_is_always_true() {
        for source in ["", "   ", "\r\n\t"] {
            let cond = Condition::compile(source).unwrap();
            assert!(matches!(cond.root(), Node::AlwaysTrue));
            assert!(cond.evaluate("", ""));
            assert!(cond.evaluate("220 welcome", "UNIX Type: L8"));
        }
    }

    #[test]
    fn syst_contains_ignores_case() {
        let cond = Condition::compile("syst_contains(\"unix\")").unwrap();
        assert!(cond.evaluate("", "UNIX Type: L8"));
        assert!(!cond.evaluate("UNIX", "VMS V5.4"));
    }

    #[test]
    fn empty_pattern_matches_anything() {
        let cond = Condition::compile("syst_contains(\"\")").unwrap();
        assert!(cond.evaluate("", ""));
        assert!(cond.evaluate("x", "y"));
    }

    #[test]
    fn negated_disjunction() {
        let cond = Condition::compile("not (syst_contains(\"UNIX\") or syst_contains(\"Windows\"))").unwrap();
        assert!(!cond.evaluate("", "UNIX Type: L8"));
        assert!(cond.evaluate("", "VMS V5.4"));
    }

    #[test]
    fn welcome_functions_search_the_banner() {
        let cond =
            Condition::compile("welcome_contains(\"ProFTPD\") and reg_exp_in_welcome(\"^220 .*server\")").unwrap();
        assert!(cond.evaluate("220 ProFTPD 1.3.5 Server", "UNIX Type: L8"));
        assert!(!cond.evaluate("220 vsFTPd 3.0", "ProFTPD"));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let err = Condition::compile("syst_contains(\"abc").unwrap_err();
        assert_eq!(err.message(), Some(Message::MissingStringTerminator));
    }

    #[test]
    fn invalid_regex_surfaces_engine_text() {
        let err = Condition::compile("reg_exp_in_syst(\"[\")").unwrap_err();
        let CompileError::Regex { text, offset } = err else {
            panic!("expected a regex error, got {err:?}");
        };
        assert!(text.contains("unclosed character class"), "{text}");
        assert_eq!(offset, 17);
    }

    struct SilentEngine;

    impl MatcherFactory for SilentEngine {
        fn substring(&self, pattern: &str) -> Result<Box<dyn TextMatcher>, MatcherError> {
            DefaultMatchers.substring(pattern)
        }

        fn regex(&self, _: &str) -> Result<Box<dyn TextMatcher>, MatcherError> {
            Err(MatcherError::InvalidPattern(String::new()))
        }
    }

    #[test]
    fn regex_failure_without_engine_text_uses_catalog() {
        let source = "syst_contains(\"x\") or reg_exp_in_syst(\"a+\")";
        let err = Condition::compile_with(source, &SilentEngine).unwrap_err();
        assert_eq!(err, CompileError::at(Message::InvalidRegularExpression, 39));
        assert_eq!(err.describe(&crate::error::EnglishMessages), "invalid regular expression");
    }
}
