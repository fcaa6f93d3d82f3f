//! Step parameters and their static types.

use crate::columns::{Column, ColumnKind, ColumnRef};

/// Values computed from the listing at the cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVar {
    FirstNonEmptyLine,
    LastNonEmptyLine,
    NextChar,
    NextWord,
    RestOfLine,
}

impl StateVar {
    pub(crate) const ALL: [StateVar; 5] = [
        StateVar::FirstNonEmptyLine,
        StateVar::LastNonEmptyLine,
        StateVar::NextChar,
        StateVar::NextWord,
        StateVar::RestOfLine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StateVar::FirstNonEmptyLine => "first_nonempty_line",
            StateVar::LastNonEmptyLine => "last_nonempty_line",
            StateVar::NextChar => "next_char",
            StateVar::NextWord => "next_word",
            StateVar::RestOfLine => "rest_of_line",
        }
    }

    fn operand_type(self) -> OperandType {
        match self {
            StateVar::FirstNonEmptyLine | StateVar::LastNonEmptyLine => OperandType::Boolean,
            StateVar::NextChar | StateVar::NextWord | StateVar::RestOfLine => OperandType::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    /// Case-insensitive string equality (`eq`).
    StrEqual,
    StrNotEqual,
    /// Left operand is a substring of the right one (`in`).
    SubStrIn,
    SubStrNotIn,
    /// Left operand ends with the right one (`end_with`).
    EndsWith,
    NotEndsWith,
}

impl BinaryOperator {
    /// Word operators; `==` and `!=` are symbols.
    pub(crate) const WORDS: [(&'static str, BinaryOperator); 6] = [
        ("eq", BinaryOperator::StrEqual),
        ("not_eq", BinaryOperator::StrNotEqual),
        ("in", BinaryOperator::SubStrIn),
        ("not_in", BinaryOperator::SubStrNotIn),
        ("end_with", BinaryOperator::EndsWith),
        ("not_end_with", BinaryOperator::NotEndsWith),
    ];

    /// Whether the operator accepts the operand types.
    pub(crate) fn accepts(self, left: Option<OperandType>, right: Option<OperandType>) -> bool {
        match self {
            BinaryOperator::Equal | BinaryOperator::NotEqual => left.is_some() && left == right,
            _ => left == Some(OperandType::String) && right == Some(OperandType::String),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    Boolean,
    String,
    Number,
    Date,
    Time,
}

/// Kind of a parameter as seen by function signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ParamKind {
    Boolean,
    String,
    Number,
    ColumnBoolean,
    ColumnString,
    ColumnNumber,
    ColumnDate,
    ColumnTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Column(ColumnRef),
    Boolean(bool),
    String(String),
    Number(i64),
    StateVar(StateVar),
    Expression { op: BinaryOperator, operands: Box<[Parameter; 2]> },
}

pub(crate) fn column_operand_type(kind: ColumnKind) -> Option<OperandType> {
    match kind {
        ColumnKind::Name | ColumnKind::Text => Some(OperandType::String),
        ColumnKind::Size | ColumnKind::Number => Some(OperandType::Number),
        ColumnKind::Date | ColumnKind::CustomDate => Some(OperandType::Date),
        ColumnKind::Time | ColumnKind::CustomTime => Some(OperandType::Time),
        ColumnKind::Extension | ColumnKind::FileType => None,
    }
}

impl Parameter {
    /// Type of the parameter used as an expression operand; `None` for columns
    /// that are never readable (extension, file type).
    pub fn operand_type(&self, columns: &[Column]) -> Option<OperandType> {
        match self {
            Parameter::Column(ColumnRef::Column(i)) => columns.get(*i).and_then(|c| column_operand_type(c.kind)),
            Parameter::Column(_) => Some(OperandType::Boolean),
            Parameter::Boolean(_) | Parameter::Expression { .. } => Some(OperandType::Boolean),
            Parameter::String(_) => Some(OperandType::String),
            Parameter::Number(_) => Some(OperandType::Number),
            Parameter::StateVar(var) => Some(var.operand_type()),
        }
    }

    pub(crate) fn kind(&self, columns: &[Column]) -> Option<ParamKind> {
        match self {
            Parameter::Column(ColumnRef::Column(_)) => match self.operand_type(columns)? {
                OperandType::Boolean => Some(ParamKind::ColumnBoolean),
                OperandType::String => Some(ParamKind::ColumnString),
                OperandType::Number => Some(ParamKind::ColumnNumber),
                OperandType::Date => Some(ParamKind::ColumnDate),
                OperandType::Time => Some(ParamKind::ColumnTime),
            },
            Parameter::Column(_) => Some(ParamKind::ColumnBoolean),
            Parameter::Number(_) => Some(ParamKind::Number),
            _ => match self.operand_type(columns)? {
                OperandType::Boolean => Some(ParamKind::Boolean),
                OperandType::String => Some(ParamKind::String),
                _ => None,
            },
        }
    }

    pub(crate) fn column(&self) -> Option<ColumnRef> {
        match self {
            Parameter::Column(col) => Some(*col),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", ColumnKind::Name),
            Column::new("ext", ColumnKind::Extension),
            Column::new("size", ColumnKind::Size),
            Column::new("date", ColumnKind::Date),
            Column::new("time", ColumnKind::CustomTime),
        ]
    }

    #[test]
    fn operand_types() {
        let cols = columns();
        let cases = vec![
            (Some(OperandType::String), Parameter::Column(ColumnRef::Column(0))),
            (None, Parameter::Column(ColumnRef::Column(1))),
            (Some(OperandType::Number), Parameter::Column(ColumnRef::Column(2))),
            (Some(OperandType::Date), Parameter::Column(ColumnRef::Column(3))),
            (Some(OperandType::Time), Parameter::Column(ColumnRef::Column(4))),
            (Some(OperandType::Boolean), Parameter::Column(ColumnRef::IsHidden)),
            (Some(OperandType::Boolean), Parameter::StateVar(StateVar::LastNonEmptyLine)),
            (Some(OperandType::String), Parameter::StateVar(StateVar::NextWord)),
        ];
        for (expected, param) in cases {
            assert_eq!(param.operand_type(&cols), expected, "{param:?}");
        }
    }

    #[test]
    fn operator_typing() {
        use OperandType::*;
        assert!(BinaryOperator::Equal.accepts(Some(Date), Some(Date)));
        assert!(!BinaryOperator::Equal.accepts(Some(Date), Some(Time)));
        assert!(!BinaryOperator::NotEqual.accepts(None, None));
        assert!(BinaryOperator::EndsWith.accepts(Some(String), Some(String)));
        assert!(!BinaryOperator::SubStrIn.accepts(Some(Number), Some(String)));
    }

    #[test]
    fn kinds_separate_columns_from_values() {
        let cols = columns();
        assert_eq!(Parameter::Column(ColumnRef::Column(0)).kind(&cols), Some(ParamKind::ColumnString));
        assert_eq!(Parameter::String("x".into()).kind(&cols), Some(ParamKind::String));
        assert_eq!(Parameter::StateVar(StateVar::NextChar).kind(&cols), Some(ParamKind::String));
        assert_eq!(Parameter::Column(ColumnRef::IsDir).kind(&cols), Some(ParamKind::ColumnBoolean));
        assert_eq!(Parameter::Number(-1).kind(&cols), Some(ParamKind::Number));
        assert_eq!(Parameter::Column(ColumnRef::Column(1)).kind(&cols), None);
    }
}
