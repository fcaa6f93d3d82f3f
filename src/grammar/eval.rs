//! Operand values of step parameters at the cursor position.

use super::interpreter::{Draft, ListingSession};
use super::params::{BinaryOperator, OperandType, Parameter, StateVar};
use super::months::decode_char;
use crate::columns::ColumnRef;
use crate::record::{FtpDate, FtpTime, Value};

fn is_eol(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

fn fold(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_lowercase()
}

fn fold_eq(a: &[u8], b: &[u8]) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    fold(a) == fold(b)
}

/// `needle` occurs in `hay`, ignoring case.
fn fold_contains(needle: &[u8], hay: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.is_ascii() && hay.is_ascii() {
        return hay.windows(needle.len()).any(|w| w.eq_ignore_ascii_case(needle));
    }
    fold(hay).contains(&fold(needle))
}

fn fold_ends_with(hay: &[u8], suffix: &[u8]) -> bool {
    if hay.is_ascii() && suffix.is_ascii() {
        return hay.len() >= suffix.len() && hay[hay.len() - suffix.len()..].eq_ignore_ascii_case(suffix);
    }
    fold(hay).ends_with(&fold(suffix))
}

impl<'a> ListingSession<'a> {
    pub(super) fn eval_bool(&self, param: &Parameter, draft: &Draft, at: usize) -> bool {
        match param {
            Parameter::Boolean(value) => *value,
            Parameter::Column(column @ (ColumnRef::IsDir | ColumnRef::IsHidden | ColumnRef::IsLink)) => {
                draft.flag(*column)
            }
            Parameter::StateVar(StateVar::FirstNonEmptyLine) => {
                self.first_line.as_ref().is_some_and(|line| line.contains(&at))
            }
            Parameter::StateVar(StateVar::LastNonEmptyLine) => {
                self.last_line.as_ref().is_some_and(|line| line.contains(&at))
            }
            Parameter::Expression { op, operands } => self.eval_expression(*op, &operands[0], &operands[1], draft, at),
            _ => false,
        }
    }

    fn eval_expression(&self, op: BinaryOperator, left: &Parameter, right: &Parameter, draft: &Draft, at: usize) -> bool {
        match op {
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                let columns = self.grammar.columns();
                let equal = match left.operand_type(columns) {
                    Some(OperandType::Boolean) => self.eval_bool(left, draft, at) == self.eval_bool(right, draft, at),
                    Some(OperandType::String) => {
                        self.string_operand(Some(left), draft, at) == self.string_operand(Some(right), draft, at)
                    }
                    Some(OperandType::Number) => self.eval_number(left, draft) == self.eval_number(right, draft),
                    Some(OperandType::Date) => self.eval_date(left, draft) == self.eval_date(right, draft),
                    Some(OperandType::Time) => self.eval_time(left, draft) == self.eval_time(right, draft),
                    None => false,
                };
                equal == (op == BinaryOperator::Equal)
            }
            _ => {
                let l = self.string_operand(Some(left), draft, at);
                let r = self.string_operand(Some(right), draft, at);
                match op {
                    BinaryOperator::StrEqual => fold_eq(l, r),
                    BinaryOperator::StrNotEqual => !fold_eq(l, r),
                    BinaryOperator::SubStrIn => fold_contains(l, r),
                    BinaryOperator::SubStrNotIn => !fold_contains(l, r),
                    BinaryOperator::EndsWith => fold_ends_with(l, r),
                    _ => !fold_ends_with(l, r),
                }
            }
        }
    }

    /// Bytes of a string operand; empty for anything that is not one.
    pub(super) fn string_operand<'s>(&'s self, param: Option<&'s Parameter>, draft: &'s Draft, at: usize) -> &'s [u8] {
        let buf: &'s [u8] = self.listing;
        let len = buf.len();
        match param {
            Some(Parameter::String(text)) => text.as_bytes(),
            Some(Parameter::Column(ColumnRef::Column(i))) => draft.text(*i).as_bytes(),
            Some(Parameter::StateVar(StateVar::NextChar)) => {
                if at < len && !is_eol(buf[at]) {
                    let width = decode_char(&buf[at..]).map_or(1, |(_, width)| width);
                    &buf[at..at + width]
                } else {
                    b""
                }
            }
            Some(Parameter::StateVar(StateVar::NextWord)) => {
                let mut beg = at.min(len);
                while beg < len && buf[beg] <= b' ' && !is_eol(buf[beg]) {
                    beg += 1;
                }
                let mut end = beg;
                while end < len && buf[end] > b' ' {
                    end += 1;
                }
                &buf[beg..end]
            }
            Some(Parameter::StateVar(StateVar::RestOfLine)) => {
                let beg = at.min(len);
                let mut end = beg;
                while end < len && !is_eol(buf[end]) {
                    end += 1;
                }
                &buf[beg..end]
            }
            _ => b"",
        }
    }

    pub(super) fn eval_number(&self, param: &Parameter, draft: &Draft) -> i64 {
        match param {
            Parameter::Number(n) => *n,
            Parameter::Column(ColumnRef::Column(i)) => match draft.values.get(*i) {
                Some(Value::Size(n)) => i64::try_from(*n).unwrap_or(i64::MAX),
                Some(Value::Number(n)) => *n,
                _ => 0,
            },
            _ => 0,
        }
    }

    pub(super) fn eval_date(&self, param: &Parameter, draft: &Draft) -> FtpDate {
        match param {
            Parameter::Column(ColumnRef::Column(i)) => draft.date(*i),
            _ => FtpDate::default(),
        }
    }

    pub(super) fn eval_time(&self, param: &Parameter, draft: &Draft) -> FtpTime {
        match param {
            Parameter::Column(ColumnRef::Column(i)) => draft.time(*i),
            _ => FtpTime::default(),
        }
    }
}
