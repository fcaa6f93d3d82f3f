//! Parsed listing items and the per-item field-set bitmap.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FtpDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl FtpDate {
    /// 1.1.1602, the value of dates that could not be determined.
    pub const EPOCH: FtpDate = FtpDate { year: 1602, month: 1, day: 1 };

    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }
}

impl fmt::Display for FtpDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FtpTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl FtpTime {
    pub const MIDNIGHT: FtpTime = FtpTime { hour: 0, minute: 0, second: 0, millisecond: 0 };

    pub fn to_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_milli_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
            u32::from(self.millisecond),
        )
    }
}

impl fmt::Display for FtpTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.millisecond != 0 {
            write!(f, ".{:03}", self.millisecond)?;
        }
        Ok(())
    }
}

/// Value of one column of a parsed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Shown as an empty cell (custom number, date and time columns).
    Empty,
    Text(String),
    Size(u64),
    Number(i64),
    Date(FtpDate),
    Time(FtpTime),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => f.write_str(text),
            Value::Size(n) => write!(f, "{n}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
        }
    }
}

/// One file or directory of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingItem {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    pub is_hidden: bool,
    pub is_link: bool,
    /// Local time combined from the date and time columns, if the server type
    /// has either of them.
    pub last_write: Option<NaiveDateTime>,
    /// One value per configured column; index 0 is the name.
    pub values: Vec<Value>,
}

impl ListingItem {
    /// Text after the last `.` of the name; directories have no extension.
    pub fn extension(&self) -> Option<&str> {
        if self.is_dir {
            return None;
        }
        self.name.rfind('.').map(|dot| &self.name[dot + 1..])
    }
}

bitflags::bitflags! {
    /// State of one column while an item is being parsed.
    ///
    /// `UNSET` stays on for date and time columns; their parts are tracked by
    /// the remaining bits and completed by the defaulter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u16 {
        const UNSET        = 0x01;
        const DAY          = 0x02;
        const MONTH        = 0x04;
        const YEAR         = 0x08;
        const DATE         = Self::DAY.bits() | Self::MONTH.bits() | Self::YEAR.bits();
        const YEAR_GUESSED = 0x10;
        const TIME         = 0x100;
    }
}

/// Caller-allocated "which columns were set" bitmap, one slot per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    flags: Vec<FieldFlags>,
}

impl FieldSet {
    pub fn new(columns: usize) -> Self {
        FieldSet { flags: vec![FieldFlags::UNSET; columns] }
    }

    /// Mark every column as not set, resizing to `columns` slots.
    pub fn reset(&mut self, columns: usize) {
        self.flags.clear();
        self.flags.resize(columns, FieldFlags::UNSET);
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn get(&self, column: usize) -> FieldFlags {
        self.flags.get(column).copied().unwrap_or(FieldFlags::UNSET)
    }

    pub fn is_unset(&self, column: usize) -> bool {
        self.get(column).contains(FieldFlags::UNSET)
    }

    pub(crate) fn mark_assigned(&mut self, column: usize) {
        if let Some(slot) = self.flags.get_mut(column) {
            *slot = FieldFlags::empty();
        }
    }

    pub(crate) fn insert(&mut self, column: usize, bits: FieldFlags) {
        if let Some(slot) = self.flags.get_mut(column) {
            *slot |= bits;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_the_last_dot() {
        let mut item = ListingItem {
            name: "archive.tar.gz".into(),
            size: 0,
            is_dir: false,
            is_hidden: false,
            is_link: false,
            last_write: None,
            values: Vec::new(),
        };
        assert_eq!(item.extension(), Some("gz"));
        item.name = ".profile".into();
        assert_eq!(item.extension(), Some("profile"));
        item.name = "Makefile".into();
        assert_eq!(item.extension(), None);
        item.name = "src.d".into();
        item.is_dir = true;
        assert_eq!(item.extension(), None);
    }

    #[test]
    fn field_set_tracks_date_parts() {
        let mut fields = FieldSet::new(3);
        fields.insert(1, FieldFlags::DAY | FieldFlags::MONTH);
        fields.mark_assigned(2);
        assert!(fields.is_unset(0));
        assert!(fields.is_unset(1));
        assert!(!fields.get(1).contains(FieldFlags::DATE));
        fields.insert(1, FieldFlags::YEAR);
        assert!(fields.get(1).contains(FieldFlags::DATE));
        assert!(!fields.is_unset(2));

        fields.reset(2);
        assert_eq!(fields.len(), 2);
        assert!(fields.is_unset(1));
    }

    #[test]
    fn display_forms() {
        assert_eq!(FtpDate::EPOCH.to_string(), "1602-01-01");
        assert_eq!(FtpTime { hour: 9, minute: 5, second: 0, millisecond: 0 }.to_string(), "9:05:00");
        assert_eq!(Value::Empty.to_string(), "");
        assert!(FtpDate { year: 2023, month: 2, day: 30 }.to_naive().is_none());
    }
}
