//! Lexical analysis of autodetection conditions.
//!
//! The lexer works one symbol at a time: [`Lexer::peek`] scans the next
//! symbol (and caches it), [`Lexer::bump`] moves past it. Function symbols are
//! scanned together with their single string argument; the matcher for the
//! argument is built right away and handed to the parser through
//! [`Lexer::take_function`].

use super::tree::ConditionFunction;
use crate::error::{CompileError, Message};
use crate::matcher::{MatcherError, MatcherFactory, TextMatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TokenKind {
    Eos,
    Or,
    And,
    Not,
    LeftParen,
    RightParen,
    Function,
}

pub(super) type FunctionData = (ConditionFunction, Option<Box<dyn TextMatcher>>);

pub(super) struct Lexer<'a> {
    src: &'a [u8],
    /// Start of the current symbol.
    pos: usize,
    /// End of the current symbol, `None` until a symbol has been scanned.
    sym_end: Option<usize>,
    current: Option<TokenKind>,
    function: Option<FunctionData>,
    matchers: &'a dyn MatcherFactory,
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Lexer<'a> {
    pub(super) fn new(source: &'a str, matchers: &'a dyn MatcherFactory) -> Self {
        Lexer { src: source.as_bytes(), pos: 0, sym_end: None, current: None, function: None, matchers }
    }

    /// Offset of the current symbol (used for error positions).
    pub(super) fn position(&self) -> usize {
        self.pos
    }

    pub(super) fn peek(&mut self) -> Result<TokenKind, CompileError> {
        if let Some(kind) = self.current {
            return Ok(kind);
        }
        let kind = self.scan()?;
        self.current = Some(kind);
        Ok(kind)
    }

    /// Skip the current symbol.
    pub(super) fn bump(&mut self) {
        match self.sym_end.take() {
            Some(end) => {
                self.pos = end;
                self.current = None;
                if self.function.take().is_some() {
                    tracing::error!("condition lexer: function data were not used");
                }
            }
            None => tracing::error!("condition lexer: bump() without a scanned symbol"),
        }
    }

    /// Hand the current function symbol's data over to the caller (once).
    pub(super) fn take_function(&mut self) -> Option<FunctionData> {
        self.function.take()
    }

    fn skip_blanks(&self, mut s: usize) -> usize {
        while s < self.src.len() && self.src[s] <= b' ' {
            s += 1;
        }
        s
    }

    fn scan(&mut self) -> Result<TokenKind, CompileError> {
        let src = self.src;
        let s = self.skip_blanks(self.pos);
        if s == src.len() {
            self.pos = s;
            return Ok(TokenKind::Eos);
        }

        match src[s] {
            b'(' | b')' => {
                self.pos = s;
                self.sym_end = Some(s + 1);
                Ok(if src[s] == b'(' { TokenKind::LeftParen } else { TokenKind::RightParen })
            }
            _ => self.scan_word(s),
        }
    }

    fn scan_word(&mut self, beg: usize) -> Result<TokenKind, CompileError> {
        let src = self.src;
        let mut s = beg;
        while s < src.len() && is_ident_byte(src[s]) {
            s += 1;
        }
        if s == beg {
            return Err(CompileError::at(Message::UnexpectedSymbol, s));
        }

        let id = &src[beg..s];
        let keyword = if id.eq_ignore_ascii_case(b"or") {
            Some(TokenKind::Or)
        } else if id.eq_ignore_ascii_case(b"and") {
            Some(TokenKind::And)
        } else if id.eq_ignore_ascii_case(b"not") {
            Some(TokenKind::Not)
        } else {
            None
        };
        if let Some(kind) = keyword {
            self.pos = beg;
            self.sym_end = Some(s);
            return Ok(kind);
        }

        let function = ConditionFunction::ALL
            .into_iter()
            .find(|f| f.name().as_bytes().eq_ignore_ascii_case(id))
            .ok_or(CompileError::at(Message::UnknownFunction, beg))?;

        s = self.skip_blanks(s);
        if s >= src.len() || src[s] != b'(' {
            return Err(CompileError::at(Message::MissingFunctionParameters, s));
        }
        s = self.skip_blanks(s + 1);
        if s >= src.len() || src[s] != b'"' {
            return Err(CompileError::at(Message::MissingStringParameter, s));
        }
        let literal_beg = s + 1;
        let (pattern, quote) = read_string_literal(src, literal_beg)?;
        s = self.skip_blanks(quote + 1);
        if s >= src.len() || src[s] != b')' {
            return Err(CompileError::at(Message::MissingFunctionParenthesis, s));
        }

        let matcher = if pattern.is_empty() {
            None
        } else {
            let built = if function.is_regex() {
                self.matchers.regex(&pattern)
            } else {
                self.matchers.substring(&pattern)
            };
            match built {
                Ok(matcher) => Some(matcher),
                Err(MatcherError::LowMemory) => return Err(CompileError::LowMemory),
                Err(MatcherError::InvalidPattern(text)) if text.is_empty() => {
                    return Err(CompileError::at(Message::InvalidRegularExpression, literal_beg));
                }
                Err(MatcherError::InvalidPattern(text)) => {
                    return Err(CompileError::Regex { text, offset: literal_beg });
                }
            }
        };

        self.pos = beg;
        self.sym_end = Some(s + 1);
        self.function = Some((function, matcher));
        Ok(TokenKind::Function)
    }
}

/// Read a double-quoted literal whose content starts at `beg`.
///
/// Returns the unescaped text and the offset of the closing quote. Raw line
/// breaks are not allowed inside the literal.
pub(crate) fn read_string_literal(src: &[u8], beg: usize) -> Result<(String, usize), CompileError> {
    let mut s = beg;
    let mut escapes = 0;
    loop {
        if s >= src.len() {
            return Err(CompileError::at(Message::MissingStringTerminator, s));
        }
        match src[s] {
            b'"' => break,
            b'\r' | b'\n' => return Err(CompileError::at(Message::MissingStringTerminator, s)),
            b'\\' if s + 1 < src.len() => {
                s += 1;
                escapes += 1;
                if !matches!(src[s], b'"' | b'\\' | b't' | b'r' | b'n') {
                    return Err(CompileError::at(Message::UnknownEscapeSequence, s));
                }
            }
            _ => {}
        }
        s += 1;
    }

    let raw = &src[beg..s];
    let mut out: Vec<u8> = Vec::new();
    out.try_reserve_exact(raw.len() - escapes).map_err(|_| CompileError::LowMemory)?;
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() {
            i += 1;
            out.push(match raw[i] {
                b't' => b'\t',
                b'r' => b'\r',
                b'n' => b'\n',
                other => other,
            });
        } else {
            out.push(raw[i]);
        }
        i += 1;
    }
    let text = String::from_utf8(out).map_err(|_| CompileError::at(Message::UnexpectedSymbol, beg))?;
    Ok((text, s))
}
