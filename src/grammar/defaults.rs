//! Completing a parsed item: values for unset columns and the combined
//! last-write timestamp.

use super::interpreter::Draft;
use crate::columns::{Column, ColumnKind};
use crate::error::LowMemory;
use crate::record::{FieldFlags, FieldSet, FtpDate, FtpTime, ListingItem, Value};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// A year taken from today's date is one too high for a month/day still
/// ahead of today.
fn correct_guessed_year(mut date: FtpDate, flags: FieldFlags, today: NaiveDate) -> FtpDate {
    if flags.contains(FieldFlags::YEAR_GUESSED) {
        let (month, day) = (u32::from(date.month), u32::from(date.day));
        if month > today.month() || (month == today.month() && day > today.day()) {
            date.year = date.year.saturating_sub(1);
        }
    }
    date
}

fn copy_text(text: &str) -> Result<String, LowMemory> {
    let mut owned = String::new();
    owned.try_reserve_exact(text.len()).map_err(|_| LowMemory)?;
    owned.push_str(text);
    Ok(owned)
}

pub(super) fn fill_empty_values(
    columns: &[Column],
    draft: Draft,
    fields: &FieldSet,
    today: NaiveDate,
) -> Result<ListingItem, LowMemory> {
    let Draft { mut values, is_dir, is_hidden, is_link } = draft;
    let name = copy_text(values.first().and_then(Value::as_text).unwrap_or(""))?;

    let mut has_last_write = false;
    let mut date = FtpDate::EPOCH;
    let mut time = FtpTime::MIDNIGHT;
    let mut size = 0;

    for (i, column) in columns.iter().enumerate().skip(1) {
        let flags = fields.get(i);
        let empty = || column.empty().unwrap_or(Value::Empty);
        if !flags.contains(FieldFlags::UNSET) {
            if let (ColumnKind::Size, Value::Size(n)) = (column.kind, &values[i]) {
                size = *n;
            }
            continue;
        }
        let parsed_date = |values: &[Value]| match values[i] {
            Value::Date(d) => correct_guessed_year(d, flags, today),
            _ => FtpDate::default(),
        };
        values[i] = match column.kind {
            ColumnKind::Name => continue,
            ColumnKind::Text | ColumnKind::FileType | ColumnKind::Number => empty(),
            ColumnKind::Extension => {
                let extension = match name.rfind('.') {
                    Some(dot) if !is_dir => &name[dot + 1..],
                    _ => "",
                };
                Value::Text(copy_text(extension)?)
            }
            ColumnKind::Size if is_dir => Value::Size(0),
            ColumnKind::Size => {
                let value = empty();
                if let Value::Size(n) = value {
                    size = n;
                }
                value
            }
            ColumnKind::Date => {
                has_last_write = true;
                date = if flags.contains(FieldFlags::DATE) {
                    parsed_date(&values)
                } else {
                    match empty() {
                        Value::Date(d) => d,
                        _ => FtpDate::EPOCH,
                    }
                };
                Value::Date(date)
            }
            ColumnKind::Time => {
                has_last_write = true;
                time = if flags.contains(FieldFlags::TIME) {
                    match values[i] {
                        Value::Time(t) => t,
                        _ => FtpTime::MIDNIGHT,
                    }
                } else {
                    match empty() {
                        Value::Time(t) => t,
                        _ => FtpTime::MIDNIGHT,
                    }
                };
                Value::Time(time)
            }
            ColumnKind::CustomDate if flags.contains(FieldFlags::DATE) => {
                let d = parsed_date(&values);
                Value::Date(if d.to_naive().is_some() { d } else { FtpDate::EPOCH })
            }
            ColumnKind::CustomDate => empty(),
            ColumnKind::CustomTime if flags.contains(FieldFlags::TIME) => continue,
            ColumnKind::CustomTime => empty(),
        };
    }

    let last_write = has_last_write.then(|| combine(date, time));
    Ok(ListingItem { name, size, is_dir, is_hidden, is_link, last_write, values })
}

/// Invalid dates collapse to 1.1.1602.
fn combine(date: FtpDate, time: FtpTime) -> NaiveDateTime {
    let date = date.to_naive().or(FtpDate::EPOCH.to_naive()).unwrap_or(NaiveDate::MIN);
    let time = time.to_naive().unwrap_or(chrono::NaiveTime::MIN);
    date.and_time(time)
}
