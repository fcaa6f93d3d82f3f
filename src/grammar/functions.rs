//! Built-in grammar functions and their admissible parameter lists.

use super::months;
use super::params::{OperandType, ParamKind, Parameter};
use crate::columns::{Column, ColumnRef};
use crate::error::{CompileError, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    SkipWhiteSpaces,
    WhiteSpaces,
    WhiteSpacesAndLineEnds,
    RestOfLine,
    Word,
    Number,
    PositiveNumber,
    NumberWithSeparators,
    Month3,
    MonthTxt,
    Month,
    Day,
    Year,
    Time,
    YearOrTime,
    All,
    AllTo,
    AllUpTo,
    UnixLink,
    UnixDevice,
    If,
    Assign,
    CutWhiteSpacesEnd,
    CutWhiteSpacesStart,
    CutWhiteSpaces,
    Back,
    AddStringToColumn,
    CutEndOfString,
    SkipToNumber,
}

impl Function {
    pub const ALL: [Function; 29] = [
        Function::SkipWhiteSpaces,
        Function::WhiteSpaces,
        Function::WhiteSpacesAndLineEnds,
        Function::RestOfLine,
        Function::Word,
        Function::Number,
        Function::PositiveNumber,
        Function::NumberWithSeparators,
        Function::Month3,
        Function::MonthTxt,
        Function::Month,
        Function::Day,
        Function::Year,
        Function::Time,
        Function::YearOrTime,
        Function::All,
        Function::AllTo,
        Function::AllUpTo,
        Function::UnixLink,
        Function::UnixDevice,
        Function::If,
        Function::Assign,
        Function::CutWhiteSpacesEnd,
        Function::CutWhiteSpacesStart,
        Function::CutWhiteSpaces,
        Function::Back,
        Function::AddStringToColumn,
        Function::CutEndOfString,
        Function::SkipToNumber,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::SkipWhiteSpaces => "skip_white_spaces",
            Function::WhiteSpaces => "white_spaces",
            Function::WhiteSpacesAndLineEnds => "white_spaces_and_line_ends",
            Function::RestOfLine => "rest_of_line",
            Function::Word => "word",
            Function::Number => "number",
            Function::PositiveNumber => "positive_number",
            Function::NumberWithSeparators => "number_with_separators",
            Function::Month3 => "month_3",
            Function::MonthTxt => "month_txt",
            Function::Month => "month",
            Function::Day => "day",
            Function::Year => "year",
            Function::Time => "time",
            Function::YearOrTime => "year_or_time",
            Function::All => "all",
            Function::AllTo => "all_to",
            Function::AllUpTo => "all_up_to",
            Function::UnixLink => "unix_link",
            Function::UnixDevice => "unix_device",
            Function::If => "if",
            Function::Assign => "assign",
            Function::CutWhiteSpacesEnd => "cut_white_spaces_end",
            Function::CutWhiteSpacesStart => "cut_white_spaces_start",
            Function::CutWhiteSpaces => "cut_white_spaces",
            Function::Back => "back",
            Function::AddStringToColumn => "add_string_to_column",
            Function::CutEndOfString => "cut_end_of_string",
            Function::SkipToNumber => "skip_to_number",
        }
    }

    pub(crate) fn lookup(name: &[u8]) -> Option<Function> {
        Function::ALL.into_iter().find(|f| f.name().as_bytes().eq_ignore_ascii_case(name))
    }

    fn signatures(self) -> &'static [&'static [ParamKind]] {
        use ParamKind as K;
        match self {
            Function::SkipWhiteSpaces | Function::WhiteSpacesAndLineEnds | Function::SkipToNumber => &[&[]],
            Function::WhiteSpaces => &[&[], &[K::Number]],
            Function::RestOfLine | Function::Word => &[&[], &[K::ColumnString]],
            Function::Number | Function::PositiveNumber => &[&[], &[K::ColumnNumber]],
            Function::NumberWithSeparators => &[&[], &[K::ColumnNumber], &[K::ColumnNumber, K::String]],
            Function::Month3 | Function::MonthTxt => &[&[], &[K::ColumnDate], &[K::ColumnDate, K::String]],
            Function::Month | Function::Day | Function::Year => &[&[], &[K::ColumnDate]],
            Function::Time => &[&[], &[K::ColumnTime]],
            Function::YearOrTime => &[&[], &[K::ColumnDate, K::ColumnTime]],
            Function::All => &[&[K::Number], &[K::ColumnString, K::Number]],
            Function::AllTo | Function::AllUpTo => &[&[K::String], &[K::ColumnString, K::String]],
            Function::UnixLink => &[&[K::ColumnBoolean, K::ColumnString, K::ColumnString]],
            Function::UnixDevice => &[&[], &[K::ColumnString]],
            Function::CutWhiteSpacesEnd | Function::CutWhiteSpacesStart | Function::CutWhiteSpaces => {
                &[&[K::ColumnString]]
            }
            Function::Back => &[&[K::Number]],
            Function::CutEndOfString => &[&[K::ColumnString, K::Number]],
            // checked by operand type
            Function::If | Function::Assign | Function::AddStringToColumn => &[],
        }
    }

    /// Validate the parameter list of one step.
    ///
    /// `offsets` holds the source offset of every parameter, `at` the offset of
    /// the function name.
    pub(crate) fn check(
        self,
        params: &[Parameter],
        offsets: &[usize],
        columns: &[Column],
        at: usize,
    ) -> Result<(), CompileError> {
        for (param, offset) in params.iter().zip(offsets) {
            if let Parameter::Column(ColumnRef::Column(i)) = param {
                if param.operand_type(columns).is_none() {
                    tracing::trace!(column = *i, "column used as a step parameter is not assignable");
                    return Err(CompileError::at(Message::ColumnNotAssignable, *offset));
                }
            }
        }

        let invalid = || CompileError::at(Message::InvalidFunctionParameters, at);
        let admissible = match self {
            Function::If => params.len() == 1 && params[0].operand_type(columns) == Some(OperandType::Boolean),
            Function::Assign => {
                params.len() == 2
                    && params[0].column().is_some()
                    && params[0].operand_type(columns) == params[1].operand_type(columns)
            }
            Function::AddStringToColumn => {
                params.len() == 2
                    && params[0].kind(columns) == Some(ParamKind::ColumnString)
                    && params[1].operand_type(columns) == Some(OperandType::String)
            }
            _ => {
                let kinds: Vec<Option<ParamKind>> = params.iter().map(|p| p.kind(columns)).collect();
                self.signatures().iter().any(|signature| {
                    signature.len() == kinds.len() && signature.iter().zip(&kinds).all(|(want, got)| Some(*want) == *got)
                })
            }
        };
        if !admissible {
            return Err(invalid());
        }

        match self {
            Function::WhiteSpaces | Function::All | Function::Back | Function::CutEndOfString => {
                for (param, offset) in params.iter().zip(offsets) {
                    if matches!(param, Parameter::Number(n) if *n < 0) {
                        return Err(CompileError::at(Message::NegativeNumber, *offset));
                    }
                }
            }
            Function::Month3 | Function::MonthTxt if params.len() == 2 => match &params[1] {
                Parameter::String(names) if months::is_valid_month_list(names, self == Function::Month3) => {}
                _ => return Err(CompileError::at(Message::InvalidMonthNames, offsets[1])),
            },
            _ => {}
        }
        Ok(())
    }

    /// Columns this step writes to.
    pub(crate) fn assigned_columns(self, params: &[Parameter]) -> impl Iterator<Item = usize> + '_ {
        let targets = match self {
            Function::SkipWhiteSpaces
            | Function::WhiteSpaces
            | Function::WhiteSpacesAndLineEnds
            | Function::SkipToNumber
            | Function::Back
            | Function::If => 0,
            Function::All | Function::AllTo | Function::AllUpTo => params.len().saturating_sub(1),
            Function::YearOrTime => 2,
            Function::UnixLink => 3,
            _ => 1,
        };
        params.iter().take(targets).filter_map(|p| match p.column() {
            Some(ColumnRef::Column(i)) => Some(i),
            _ => None,
        })
    }
}
