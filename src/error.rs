//! Error types shared by the compilers and the listing interpreter.
//!
//! Two channels are kept apart everywhere:
//!
//! - **Low memory**: an allocation failed. It can surface at any point and says
//!   nothing about the input text.
//! - **Diagnostics**: the input text is wrong. A diagnostic is either a numeric
//!   [`Message`] plus a byte offset, or (for regular expressions) the engine's
//!   own formatted text, which takes priority over any generic message.
//!
//! Compiling functions return `Result` and stop at the first failure, so the
//! first error found is the one reported.

use std::borrow::Cow;
use thiserror::Error;

/// Numeric diagnostic identifiers.
///
/// The numbers are stable; hosts that localize messages key their own tables by
/// [`Message::id`] and plug them in through [`MessageCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Message {
    UnexpectedSymbol = 1,
    UnknownFunction = 2,
    MissingFunctionParameters = 3,
    MissingStringParameter = 4,
    MissingStringTerminator = 5,
    UnknownEscapeSequence = 6,
    MissingFunctionParenthesis = 7,
    MissingRightParenthesis = 8,
    InvalidRegularExpression = 9,
    NestingTooDeep = 10,

    RuleStartExpected = 20,
    EmptyRule = 21,
    UnknownColumn = 22,
    UnknownIdentifier = 23,
    NumberOverflow = 24,
    NegativeNumber = 25,
    CommaOrParenthesisExpected = 26,
    CommaOrSemicolonExpected = 27,
    InvalidFunctionParameters = 28,
    IncompatibleOperands = 29,
    ColumnNotAssignable = 30,
    InvalidMonthNames = 31,
    EmptyIdentifier = 32,

    FirstColumnNotName = 40,
    ExtensionColumnMisplaced = 41,
    DuplicateColumnKind = 42,
    InvalidColumnId = 43,
    DuplicateColumnId = 44,
    InvalidEmptyValue = 45,
    ReservedColumnId = 46,
}

impl Message {
    /// Stable numeric id of this message.
    pub fn id(self) -> u16 {
        self as u16
    }
}

/// Lookup of diagnostic text by numeric message id.
pub trait MessageCatalog {
    fn lookup(&self, message: Message) -> Cow<'_, str>;
}

/// Built-in English texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishMessages;

impl MessageCatalog for EnglishMessages {
    fn lookup(&self, message: Message) -> Cow<'_, str> {
        Cow::Borrowed(english_text(message))
    }
}

fn english_text(message: Message) -> &'static str {
    match message {
        Message::UnexpectedSymbol => "unexpected symbol",
        Message::UnknownFunction => "unknown function",
        Message::MissingFunctionParameters => "missing function parameters (expected '(')",
        Message::MissingStringParameter => "missing string parameter (expected '\"')",
        Message::MissingStringTerminator => "missing string terminator '\"'",
        Message::UnknownEscapeSequence => "unknown escape sequence (use \\\", \\\\, \\t, \\r or \\n)",
        Message::MissingFunctionParenthesis => "missing ')' after the function parameter",
        Message::MissingRightParenthesis => "missing right parenthesis ')'",
        Message::InvalidRegularExpression => "invalid regular expression",
        Message::NestingTooDeep => "expression is nested too deeply",
        Message::RuleStartExpected => "expected '*' starting a new rule",
        Message::EmptyRule => "rule must contain at least one function",
        Message::UnknownColumn => "unknown column identifier",
        Message::UnknownIdentifier => "unknown identifier",
        Message::NumberOverflow => "number is too large",
        Message::NegativeNumber => "number must not be negative here",
        Message::CommaOrParenthesisExpected => "expected ',' or ')'",
        Message::CommaOrSemicolonExpected => "expected ',' or ';'",
        Message::InvalidFunctionParameters => "invalid number or type of function parameters",
        Message::IncompatibleOperands => "operand types do not fit the operator",
        Message::ColumnNotAssignable => "a value cannot be assigned to this column",
        Message::InvalidMonthNames => "month names must be twelve space-separated names",
        Message::EmptyIdentifier => "identifier is empty",
        Message::FirstColumnNotName => "the first column must be the name column",
        Message::ExtensionColumnMisplaced => "the extension column may only be the second column",
        Message::DuplicateColumnKind => "a standard column kind is used more than once",
        Message::InvalidColumnId => "column identifier may only contain letters, digits and '_'",
        Message::DuplicateColumnId => "column identifier is not unique",
        Message::InvalidEmptyValue => "invalid empty value for the column type",
        Message::ReservedColumnId => "column identifier is reserved",
    }
}

/// Allocation failure while interpreting a listing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("out of memory")]
pub struct LowMemory;

/// Failure to compile a condition or a listing grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("out of memory")]
    LowMemory,
    #[error("{} at offset {offset}", english_text(*.message))]
    Diagnostic { message: Message, offset: usize },
    #[error("{text} at offset {offset}")]
    Regex { text: String, offset: usize },
}

impl CompileError {
    pub(crate) fn at(message: Message, offset: usize) -> Self {
        CompileError::Diagnostic { message, offset }
    }

    /// Byte offset of the error inside the compiled text, if it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CompileError::LowMemory => None,
            CompileError::Diagnostic { offset, .. } | CompileError::Regex { offset, .. } => Some(*offset),
        }
    }

    /// Message id of the diagnostic. Engine errors report
    /// [`Message::InvalidRegularExpression`] next to their own text.
    pub fn message(&self) -> Option<Message> {
        match self {
            CompileError::Diagnostic { message, .. } => Some(*message),
            CompileError::Regex { .. } => Some(Message::InvalidRegularExpression),
            CompileError::LowMemory => None,
        }
    }

    /// Human readable description; engine text wins over the catalog.
    pub fn describe(&self, catalog: &dyn MessageCatalog) -> String {
        match self {
            CompileError::LowMemory => "out of memory".to_string(),
            CompileError::Diagnostic { message, .. } => catalog.lookup(*message).into_owned(),
            CompileError::Regex { text, .. } => text.clone(),
        }
    }
}

impl From<LowMemory> for CompileError {
    fn from(_: LowMemory) -> Self {
        CompileError::LowMemory
    }
}

/// Invalid column definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("column {index}: {}", english_text(*.message))]
pub struct ColumnError {
    pub index: usize,
    pub message: Message,
}

/// Failure to parse a complete listing with one server type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    #[error("out of memory")]
    LowMemory,
    #[error("no rule matches the listing at offset {offset}")]
    Unparsed { offset: usize },
}

impl From<LowMemory> for ListingError {
    fn from(_: LowMemory) -> Self {
        ListingError::LowMemory
    }
}

/// Failure to compile a server type definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerTypeError {
    #[error("server type '{name}': autodetect condition: {source}")]
    Condition { name: String, source: CompileError },
    #[error("server type '{name}': {source}")]
    Columns { name: String, source: ColumnError },
    #[error("server type '{name}': parsing rules: {source}")]
    Rules { name: String, source: CompileError },
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Numbers;

    impl MessageCatalog for Numbers {
        fn lookup(&self, message: Message) -> Cow<'_, str> {
            Cow::Owned(format!("#{}", message.id()))
        }
    }

    #[test]
    fn regex_text_takes_priority_over_catalog() {
        let err = CompileError::Regex { text: "unclosed character class".to_string(), offset: 17 };
        assert_eq!(err.describe(&Numbers), "unclosed character class");
        assert_eq!(err.offset(), Some(17));
        assert_eq!(err.message(), Some(Message::InvalidRegularExpression));
    }

    #[test]
    fn diagnostic_uses_catalog_text() {
        let err = CompileError::at(Message::MissingStringTerminator, 14);
        assert_eq!(err.describe(&Numbers), "#5");
        assert_eq!(err.describe(&EnglishMessages), "missing string terminator '\"'");
        assert_eq!(err.to_string(), "missing string terminator '\"' at offset 14");
    }

    #[test]
    fn low_memory_has_no_offset() {
        let err: CompileError = LowMemory.into();
        assert_eq!(err, CompileError::LowMemory);
        assert_eq!(err.offset(), None);
        assert_eq!(err.message(), None);
    }
}
