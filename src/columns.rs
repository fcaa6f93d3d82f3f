//! Column definitions of a server type.
//!
//! Every parsed listing item carries one value per configured column. Column 0
//! is always the file name; the remaining columns are standard ones (size,
//! date, time, extension, file type) or custom text, number, date and time
//! columns. Rules address columns by identifier (`<size>`); three boolean
//! pseudo-columns (`<is_dir>`, `<is_hidden>`, `<is_link>`) live outside the
//! column array.

use crate::error::{ColumnError, Message};
use crate::record::{FtpDate, FtpTime, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Name,
    Extension,
    FileType,
    Size,
    Date,
    Time,
    Text,
    Number,
    CustomDate,
    CustomTime,
}

impl ColumnKind {
    /// Standard kinds may appear at most once per server type.
    pub fn is_standard(self) -> bool {
        !matches!(self, ColumnKind::Text | ColumnKind::Number | ColumnKind::CustomDate | ColumnKind::CustomTime)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub kind: ColumnKind,
    /// Text of the value used when no rule assigns the column.
    #[serde(default)]
    pub empty_value: String,
}

impl Column {
    pub fn new(id: impl Into<String>, kind: ColumnKind) -> Self {
        Column { id: id.into(), kind, empty_value: String::new() }
    }

    pub fn with_empty_value(mut self, text: impl Into<String>) -> Self {
        self.empty_value = text.into();
        self
    }

    /// The parsed empty value, `None` if the text does not fit the kind.
    pub fn empty(&self) -> Option<Value> {
        let text = self.empty_value.trim();
        match self.kind {
            ColumnKind::Name | ColumnKind::Extension | ColumnKind::FileType | ColumnKind::Text => {
                Some(Value::Text(self.empty_value.clone()))
            }
            ColumnKind::Size if text.is_empty() => Some(Value::Size(0)),
            ColumnKind::Size => text.strip_prefix('+').unwrap_or(text).parse().ok().map(Value::Size),
            ColumnKind::Number if text.is_empty() => Some(Value::Empty),
            ColumnKind::Number => text.strip_prefix('+').unwrap_or(text).parse().ok().map(Value::Number),
            ColumnKind::Date if text.is_empty() => Some(Value::Date(FtpDate::EPOCH)),
            ColumnKind::CustomDate if text.is_empty() => Some(Value::Empty),
            ColumnKind::Date | ColumnKind::CustomDate => parse_date(text).map(Value::Date),
            ColumnKind::Time if text.is_empty() => Some(Value::Time(FtpTime::MIDNIGHT)),
            ColumnKind::CustomTime if text.is_empty() => Some(Value::Empty),
            ColumnKind::Time | ColumnKind::CustomTime => parse_time(text).map(Value::Time),
        }
    }
}

/// `d.m.yyyy`
fn parse_date(text: &str) -> Option<FtpDate> {
    let mut parts = text.split('.');
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let date = FtpDate { year, month, day };
    date.to_naive().map(|_| date)
}

/// `h:mm` or `h:mm:ss`
fn parse_time(text: &str) -> Option<FtpTime> {
    let mut parts = text.split(':');
    let hour: u8 = parts.next()?.parse().ok()?;
    let minute: u8 = parts.next()?.parse().ok()?;
    let second: u8 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some(FtpTime { hour, minute, second, millisecond: 0 })
}

/// Target of an assignment: a configured column or one of the boolean
/// pseudo-columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    Column(usize),
    IsDir,
    IsHidden,
    IsLink,
}

pub(crate) const PSEUDO_COLUMNS: [(&str, ColumnRef); 3] =
    [("is_dir", ColumnRef::IsDir), ("is_hidden", ColumnRef::IsHidden), ("is_link", ColumnRef::IsLink)];

/// Resolve a column identifier, case-insensitively.
pub(crate) fn find_column(columns: &[Column], id: &str) -> Option<ColumnRef> {
    PSEUDO_COLUMNS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(id))
        .map(|(_, pseudo)| *pseudo)
        .or_else(|| columns.iter().position(|c| c.id.eq_ignore_ascii_case(id)).map(ColumnRef::Column))
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Check a column list before it is used by a grammar.
pub fn validate_columns(columns: &[Column]) -> Result<(), ColumnError> {
    let fail = |index, message| Err(ColumnError { index, message });

    match columns.first() {
        Some(first) if first.kind == ColumnKind::Name => {}
        _ => return fail(0, Message::FirstColumnNotName),
    }

    for (index, column) in columns.iter().enumerate() {
        if column.kind == ColumnKind::Extension && index != 1 {
            return fail(index, Message::ExtensionColumnMisplaced);
        }
        if column.kind.is_standard() && columns[..index].iter().any(|c| c.kind == column.kind) {
            return fail(index, Message::DuplicateColumnKind);
        }
        if !is_valid_id(&column.id) {
            return fail(index, Message::InvalidColumnId);
        }
        if PSEUDO_COLUMNS.iter().any(|(name, _)| name.eq_ignore_ascii_case(&column.id)) {
            return fail(index, Message::ReservedColumnId);
        }
        if columns[..index].iter().any(|c| c.id.eq_ignore_ascii_case(&column.id)) {
            return fail(index, Message::DuplicateColumnId);
        }
        if column.empty().is_none() {
            return fail(index, Message::InvalidEmptyValue);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unix_columns() -> Vec<Column> {
        vec![
            Column::new("name", ColumnKind::Name),
            Column::new("ext", ColumnKind::Extension),
            Column::new("size", ColumnKind::Size),
            Column::new("date", ColumnKind::Date),
            Column::new("time", ColumnKind::Time),
            Column::new("rights", ColumnKind::Text),
            Column::new("links", ColumnKind::Number),
        ]
    }

    #[test]
    fn valid_columns_pass() {
        assert_eq!(validate_columns(&unix_columns()), Ok(()));
    }

    #[test]
    fn column_rules_are_enforced() {
        let cases = vec![
            (ColumnError { index: 0, message: Message::FirstColumnNotName }, {
                let mut c = unix_columns();
                c.swap(0, 2);
                c
            }),
            (ColumnError { index: 2, message: Message::ExtensionColumnMisplaced }, {
                let mut c = unix_columns();
                c.swap(1, 2);
                c
            }),
            (ColumnError { index: 7, message: Message::DuplicateColumnKind }, {
                let mut c = unix_columns();
                c.push(Column::new("size2", ColumnKind::Size));
                c
            }),
            (ColumnError { index: 7, message: Message::InvalidColumnId }, {
                let mut c = unix_columns();
                c.push(Column::new("owner name", ColumnKind::Text));
                c
            }),
            (ColumnError { index: 7, message: Message::DuplicateColumnId }, {
                let mut c = unix_columns();
                c.push(Column::new("RIGHTS", ColumnKind::Text));
                c
            }),
            (ColumnError { index: 7, message: Message::ReservedColumnId }, {
                let mut c = unix_columns();
                c.push(Column::new("Is_Dir", ColumnKind::Text));
                c
            }),
            (ColumnError { index: 7, message: Message::InvalidEmptyValue }, {
                let mut c = unix_columns();
                c.push(Column::new("created", ColumnKind::CustomDate).with_empty_value("31.2.2020"));
                c
            }),
        ];
        for (expected, columns) in cases {
            assert_eq!(validate_columns(&columns), Err(expected));
        }
    }

    #[test]
    fn empty_values_by_kind() {
        assert_eq!(Column::new("s", ColumnKind::Size).empty(), Some(Value::Size(0)));
        assert_eq!(Column::new("s", ColumnKind::Size).with_empty_value("+17").empty(), Some(Value::Size(17)));
        assert_eq!(Column::new("n", ColumnKind::Number).empty(), Some(Value::Empty));
        assert_eq!(Column::new("n", ColumnKind::Number).with_empty_value("-3").empty(), Some(Value::Number(-3)));
        assert_eq!(Column::new("d", ColumnKind::Date).empty(), Some(Value::Date(FtpDate::EPOCH)));
        assert_eq!(Column::new("d", ColumnKind::CustomDate).empty(), Some(Value::Empty));
        assert_eq!(
            Column::new("d", ColumnKind::CustomDate).with_empty_value("24.12.1999").empty(),
            Some(Value::Date(FtpDate { year: 1999, month: 12, day: 24 }))
        );
        assert_eq!(
            Column::new("t", ColumnKind::Time).with_empty_value("7:05").empty(),
            Some(Value::Time(FtpTime { hour: 7, minute: 5, second: 0, millisecond: 0 }))
        );
        assert_eq!(Column::new("t", ColumnKind::Time).with_empty_value("25:00").empty(), None);
        assert_eq!(Column::new("x", ColumnKind::Text).with_empty_value("n/a").empty(), Some(Value::Text("n/a".into())));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let columns = unix_columns();
        assert_eq!(find_column(&columns, "SIZE"), Some(ColumnRef::Column(2)));
        assert_eq!(find_column(&columns, "is_link"), Some(ColumnRef::IsLink));
        assert_eq!(find_column(&columns, "owner"), None);
    }
}
