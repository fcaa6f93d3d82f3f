//! Runs compiled rules over a listing buffer, one item per call.
//!
//! ```text
//! next_item
//!   └─ for each line start
//!        └─ for each rule (top to bottom)
//!             └─ use_rule ── step by step (use_step) ── line end check
//!                  ├─ name assigned  → item, via fill_empty_values
//!                  ├─ no name        → line consumed, continue
//!                  └─ failed         → reset draft, next rule
//! ```

use super::defaults::fill_empty_values;
use super::functions::Function;
use super::months::{self, Languages, decode_char};
use super::params::Parameter;
use super::{Grammar, Rule, Step};
use crate::columns::{Column, ColumnKind, ColumnRef};
use crate::error::LowMemory;
use crate::record::{FieldFlags, FieldSet, FtpDate, FtpTime, ListingItem, Value};
use chrono::{Datelike, NaiveDate};
use std::ops::Range;

/// Result of one [`ListingSession::next_item`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextItem {
    /// An item, parsed from the line(s) starting at `start`.
    Item { item: ListingItem, start: usize },
    /// The listing is exhausted.
    End,
    /// No rule matches the line at `offset`; the session stays there.
    NoMatch { offset: usize },
}

/// Values of the item being parsed, before defaults are applied.
#[derive(Debug, Clone)]
pub(super) struct Draft {
    pub(super) values: Vec<Value>,
    pub(super) is_dir: bool,
    pub(super) is_hidden: bool,
    pub(super) is_link: bool,
}

impl Draft {
    fn new(columns: usize) -> Result<Self, LowMemory> {
        let mut values = Vec::new();
        values.try_reserve_exact(columns).map_err(|_| LowMemory)?;
        values.resize(columns, Value::Empty);
        Ok(Draft { values, is_dir: false, is_hidden: false, is_link: false })
    }

    fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = Value::Empty);
        self.is_dir = false;
        self.is_hidden = false;
        self.is_link = false;
    }

    pub(super) fn flag(&self, column: ColumnRef) -> bool {
        match column {
            ColumnRef::IsDir => self.is_dir,
            ColumnRef::IsHidden => self.is_hidden,
            ColumnRef::IsLink => self.is_link,
            ColumnRef::Column(_) => false,
        }
    }

    fn set_flag(&mut self, column: ColumnRef, value: bool) {
        match column {
            ColumnRef::IsDir => self.is_dir = value,
            ColumnRef::IsHidden => self.is_hidden = value,
            ColumnRef::IsLink => self.is_link = value,
            ColumnRef::Column(_) => {}
        }
    }

    pub(super) fn text(&self, column: usize) -> &str {
        self.values.get(column).and_then(Value::as_text).unwrap_or("")
    }

    pub(super) fn date(&self, column: usize) -> FtpDate {
        match self.values.get(column) {
            Some(Value::Date(date)) => *date,
            _ => FtpDate::default(),
        }
    }

    pub(super) fn time(&self, column: usize) -> FtpTime {
        match self.values.get(column) {
            Some(Value::Time(time)) => *time,
            _ => FtpTime::default(),
        }
    }

    fn date_mut(&mut self, column: usize) -> Option<&mut FtpDate> {
        let slot = self.values.get_mut(column)?;
        if !matches!(slot, Value::Date(_)) {
            *slot = Value::Date(FtpDate::default());
        }
        match slot {
            Value::Date(date) => Some(date),
            _ => None,
        }
    }
}

fn is_eol(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

fn is_blank(b: u8) -> bool {
    b <= b' ' && !is_eol(b)
}

fn starts_with_letter(bytes: &[u8]) -> bool {
    decode_char(bytes).is_some_and(|(c, _)| c.is_alphabetic())
}

fn starts_with_alphanumeric(bytes: &[u8]) -> bool {
    decode_char(bytes).is_some_and(|(c, _)| c.is_alphanumeric())
}

/// Owned copy of listing bytes, as text.
fn to_text(bytes: &[u8]) -> Result<String, LowMemory> {
    let text = String::from_utf8_lossy(bytes);
    let mut owned = String::new();
    owned.try_reserve_exact(text.len()).map_err(|_| LowMemory)?;
    owned.push_str(&text);
    Ok(owned)
}

fn column_of(param: Option<&Parameter>) -> Option<usize> {
    match param {
        Some(Parameter::Column(ColumnRef::Column(i))) => Some(*i),
        _ => None,
    }
}

fn count_of(param: Option<&Parameter>) -> usize {
    match param {
        Some(Parameter::Number(n)) => usize::try_from(*n).unwrap_or(0),
        _ => 0,
    }
}

/// Range of the first line holding a non-blank byte, line break included.
/// An unterminated last line extends one past the buffer end.
fn first_nonempty_line(buf: &[u8]) -> Option<Range<usize>> {
    let mut beg = 0;
    let mut non_empty = false;
    let mut s = 0;
    while s < buf.len() {
        match buf[s] {
            b'\r' | b'\n' => {
                if buf[s] == b'\r' && buf.get(s + 1) == Some(&b'\n') {
                    s += 1;
                }
                if non_empty {
                    return Some(beg..s + 1);
                }
                beg = s + 1;
            }
            b if b > b' ' => non_empty = true,
            _ => {}
        }
        s += 1;
    }
    non_empty.then_some(beg..buf.len() + 1)
}

fn last_nonempty_line(buf: &[u8]) -> Option<Range<usize>> {
    let len = buf.len();
    let mut end = len;
    let mut has_eol = false;
    let mut non_empty = false;
    let mut s = len;
    while s > 0 {
        s -= 1;
        match buf[s] {
            b'\r' | b'\n' => {
                if non_empty {
                    let end = if !has_eol && end == len { end + 1 } else { end };
                    return Some(s + 1..end);
                }
                end = s + 1;
                has_eol = true;
                if buf[s] == b'\n' && s > 0 && buf[s - 1] == b'\r' {
                    s -= 1;
                }
            }
            b if b > b' ' => non_empty = true,
            _ => {}
        }
    }
    let end = if !has_eol && end == len { end + 1 } else { end };
    non_empty.then_some(0..end)
}

/// Interpretation state of one listing buffer.
///
/// Created by [`Grammar::before_parsing`]; each [`next_item`] call resumes
/// where the previous one stopped.
///
/// [`next_item`]: ListingSession::next_item
#[derive(Debug)]
pub struct ListingSession<'a> {
    pub(super) grammar: &'a Grammar,
    pub(super) listing: &'a [u8],
    pos: usize,
    today: NaiveDate,
    incomplete: bool,
    skip_incomplete: bool,
    languages: Languages,
    pub(super) first_line: Option<Range<usize>>,
    pub(super) last_line: Option<Range<usize>>,
}

impl<'a> ListingSession<'a> {
    pub(super) fn new(grammar: &'a Grammar, listing: &'a [u8], today: NaiveDate, incomplete: bool) -> Self {
        ListingSession {
            grammar,
            listing,
            pos: 0,
            today,
            incomplete,
            skip_incomplete: false,
            languages: Languages::all(),
            first_line: first_nonempty_line(listing),
            last_line: last_nonempty_line(listing),
        }
    }

    /// Byte offset of the next unread line.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Languages still possible for month names of this listing.
    pub fn languages(&self) -> Languages {
        self.languages
    }

    /// Parse the next item.
    ///
    /// `fields` is reset to the grammar's column count and reports which
    /// columns the matching rule assigned.
    pub fn next_item(&mut self, fields: &mut FieldSet) -> Result<NextItem, LowMemory> {
        let grammar = self.grammar;
        let columns = grammar.columns();
        fields.reset(columns.len());
        let mut draft = Draft::new(columns.len())?;

        let mut found = None;
        while self.pos < self.listing.len() {
            let restart = self.pos;
            let mut matched = false;
            for (index, rule) in grammar.rules.iter().enumerate() {
                let mut cursor = restart;
                if self.use_rule(rule, &mut cursor, &mut draft, fields)? {
                    self.pos = cursor;
                    matched = true;
                    if self.skip_incomplete || !fields.is_unset(0) {
                        tracing::trace!(rule = index, offset = restart, "rule produced an item");
                        found = Some(restart);
                        break;
                    }
                    tracing::trace!(rule = index, offset = restart, "rule consumed lines without an item");
                }
                draft.clear();
                fields.reset(columns.len());
                if matched {
                    break;
                }
            }
            if !matched {
                self.pos = restart;
                tracing::debug!(offset = restart, "no rule matches the listing");
                return Ok(NextItem::NoMatch { offset: restart });
            }
            if found.is_some() {
                break;
            }
        }

        if self.skip_incomplete {
            tracing::debug!(offset = self.pos, "skipping the incomplete end of the listing");
            self.pos = self.listing.len();
            return Ok(NextItem::End);
        }
        match found {
            Some(start) => {
                let item = fill_empty_values(columns, draft, fields, self.today)?;
                Ok(NextItem::Item { item, start })
            }
            None => Ok(NextItem::End),
        }
    }

    fn use_rule(
        &mut self,
        rule: &Rule,
        cursor: &mut usize,
        draft: &mut Draft,
        fields: &mut FieldSet,
    ) -> Result<bool, LowMemory> {
        let mut completed = true;
        for step in &rule.steps {
            if self.skip_incomplete {
                break;
            }
            if !self.use_step(step, cursor, draft, fields)? {
                completed = false;
                break;
            }
        }

        if !fields.is_unset(0) && draft.text(0).is_empty() {
            self.skip_incomplete = false;
            return Ok(false);
        }
        if self.skip_incomplete {
            return Ok(true);
        }
        let buf = self.listing;
        let at_line_end = *cursor >= buf.len() || is_eol(buf[*cursor]);
        if !completed || !at_line_end {
            return Ok(false);
        }
        if buf.get(*cursor) == Some(&b'\r') {
            *cursor += 1;
        }
        if buf.get(*cursor) == Some(&b'\n') {
            *cursor += 1;
        }
        Ok(true)
    }

    fn use_step(
        &mut self,
        step: &Step,
        cursor: &mut usize,
        draft: &mut Draft,
        fields: &mut FieldSet,
    ) -> Result<bool, LowMemory> {
        let grammar = self.grammar;
        let columns = grammar.columns();
        let buf = self.listing;
        let len = buf.len();
        let params = step.params.as_slice();
        let start = *cursor;
        let mut s = start;

        let ok = match step.function {
            Function::SkipWhiteSpaces => {
                while s < len && is_blank(buf[s]) {
                    s += 1;
                }
                true
            }

            Function::SkipToNumber => {
                while s < len && !buf[s].is_ascii_digit() && !is_eol(buf[s]) {
                    s += 1;
                }
                true
            }

            Function::WhiteSpaces => match params.first() {
                Some(param) => {
                    let mut n = count_of(Some(param));
                    while n > 0 && s < len && is_blank(buf[s]) {
                        s += 1;
                        n -= 1;
                    }
                    n == 0
                }
                None => {
                    while s < len && is_blank(buf[s]) {
                        s += 1;
                    }
                    s != start
                }
            },

            Function::WhiteSpacesAndLineEnds => {
                while s < len && buf[s] <= b' ' {
                    s += 1;
                }
                if s == start {
                    false
                } else if s == len {
                    if self.incomplete {
                        self.skip_incomplete = true;
                    }
                    self.incomplete
                } else {
                    true
                }
            }

            Function::RestOfLine | Function::Word => {
                if step.function == Function::Word {
                    while s < len && buf[s] > b' ' {
                        s += 1;
                    }
                } else {
                    while s < len && !is_eol(buf[s]) {
                        s += 1;
                    }
                }
                s != start && self.assign_text(column_of(params.first()), &buf[start..s], columns, draft, fields)?
            }

            Function::Number | Function::PositiveNumber => {
                let negative = buf.get(s) == Some(&b'-');
                if matches!(buf.get(s), Some(b'+' | b'-')) {
                    s += 1;
                }
                let digits = s;
                let mut value: i64 = 0;
                let mut overflow = false;
                while s < len && buf[s].is_ascii_digit() {
                    match value.checked_mul(10).and_then(|v| v.checked_add(i64::from(buf[s] - b'0'))) {
                        Some(v) => value = v,
                        None => overflow = true,
                    }
                    s += 1;
                }
                if s == digits || overflow || starts_with_letter(&buf[s..]) {
                    false
                } else {
                    let only_positive = step.function == Function::PositiveNumber;
                    let value = if negative { -value } else { value };
                    assign_number(column_of(params.first()), value, negative, only_positive, columns, draft, fields)
                }
            }

            Function::NumberWithSeparators => {
                let separators: &[u8] = match params.get(1) {
                    Some(Parameter::String(text)) => text.as_bytes(),
                    _ => b"",
                };
                let is_separator = |b: u8| !matches!(b, b'+' | b'-' | b'0'..=b'9') && separators.contains(&b);
                while s < len && is_separator(buf[s]) {
                    s += 1;
                }
                let negative = buf.get(s) == Some(&b'-');
                if matches!(buf.get(s), Some(b'+' | b'-')) {
                    s += 1;
                }
                let mut value: i64 = 0;
                let mut overflow = false;
                while s < len && (buf[s].is_ascii_digit() || is_separator(buf[s])) {
                    if buf[s].is_ascii_digit() {
                        match value.checked_mul(10).and_then(|v| v.checked_add(i64::from(buf[s] - b'0'))) {
                            Some(v) => value = v,
                            None => overflow = true,
                        }
                    }
                    s += 1;
                }
                if s == start || overflow || starts_with_letter(&buf[s..]) {
                    false
                } else {
                    let value = if negative { -value } else { value };
                    assign_number(column_of(params.first()), value, negative, false, columns, draft, fields)
                }
            }

            Function::Month3 => {
                let mut end = s;
                let mut chars = 0;
                while chars < 3 {
                    match decode_char(&buf[end..]) {
                        Some((_, width)) => end += width,
                        None => break,
                    }
                    chars += 1;
                }
                if chars < 3 {
                    false
                } else {
                    let name = &buf[s..end];
                    let month = match params.get(1) {
                        Some(Parameter::String(names)) => months::month_3_custom(name, names),
                        _ => months::month_3_builtin(name, &mut self.languages),
                    };
                    s = end;
                    match month {
                        Some(month) if !starts_with_letter(&buf[s..]) => {
                            assign_date_part(column_of(params.first()), DatePart::Month(month), draft, fields)
                        }
                        _ => false,
                    }
                }
            }

            Function::MonthTxt => {
                let mut end = s;
                while end < len && buf[end] > b' ' {
                    end += 1;
                }
                let word = &buf[s..end];
                let month = match params.get(1) {
                    Some(Parameter::String(names)) => months::month_txt_custom(word, names),
                    _ if word.is_empty() => None,
                    _ => months::month_txt_builtin(word, &mut self.languages),
                };
                match month {
                    Some((month, width)) => {
                        s += width;
                        !starts_with_letter(&buf[s..])
                            && assign_date_part(column_of(params.first()), DatePart::Month(month), draft, fields)
                    }
                    None => false,
                }
            }

            Function::Month | Function::Day | Function::Year => match read_unsigned(buf, &mut s) {
                Some(value) if !starts_with_letter(&buf[s..]) => match column_of(params.first()) {
                    None => true,
                    Some(col) => match step.function {
                        Function::Month => {
                            (1..=12).contains(&value)
                                && assign_date_part(Some(col), DatePart::Month(value as u8), draft, fields)
                        }
                        Function::Day => {
                            (1..=31).contains(&value)
                                && assign_date_part(Some(col), DatePart::Day(value as u8), draft, fields)
                        }
                        _ => match expand_year(value) {
                            Some(year) => assign_date_part(Some(col), DatePart::Year(year, false), draft, fields),
                            None => false,
                        },
                    },
                },
                _ => false,
            },

            Function::Time => match read_time(buf, &mut s) {
                Some(time) if !starts_with_alphanumeric(&buf[s..]) => {
                    if let Some(col) = column_of(params.first()) {
                        set_time(col, time, draft, fields);
                    }
                    true
                }
                _ => false,
            },

            Function::YearOrTime => {
                let mut year = u16::try_from(self.today.year()).unwrap_or(FtpDate::EPOCH.year);
                let mut time = None;
                let mut ok = false;
                if let Some(first) = read_unsigned(buf, &mut s) {
                    if first < 24 && buf.get(s) == Some(&b':') {
                        s += 1;
                        if let Some(minute) = read_unsigned(buf, &mut s).filter(|m| *m < 60) {
                            time = Some(FtpTime { hour: first as u8, minute: minute as u8, ..FtpTime::MIDNIGHT });
                            ok = true;
                        }
                    } else if (1601..10000).contains(&first) {
                        year = if first == 1601 { 1602 } else { first as u16 };
                        ok = true;
                    }
                }
                if !ok || starts_with_letter(&buf[s..]) {
                    false
                } else {
                    if let (Some(date_col), Some(time_col)) = (column_of(params.first()), column_of(params.get(1))) {
                        let guessed = time.is_some();
                        assign_date_part(Some(date_col), DatePart::Year(year, guessed), draft, fields);
                        if let Some(time) = time {
                            set_time(time_col, time, draft, fields);
                        }
                    }
                    true
                }
            }

            Function::All => {
                let mut n = count_of(params.last());
                while n > 0 && s < len && !is_eol(buf[s]) {
                    s += decode_char(&buf[s..]).map_or(1, |(_, width)| width);
                    n -= 1;
                }
                let column = if params.len() == 2 { column_of(params.first()) } else { None };
                n == 0 && self.assign_text(column, &buf[start..s], columns, draft, fields)?
            }

            Function::AllTo | Function::AllUpTo => {
                let pattern = to_text(self.string_operand(params.last(), draft, s))?;
                let mut line_end = s;
                while line_end < len && !is_eol(buf[line_end]) {
                    line_end += 1;
                }
                let mut found = None;
                if pattern.is_empty() {
                    found = Some((s, s));
                } else {
                    let mut i = s;
                    while i < line_end {
                        if let Some(width) = months::prefix_fold(&buf[i..line_end], &pattern) {
                            found = Some((i, i + width));
                            break;
                        }
                        i += 1;
                    }
                }
                match found {
                    Some((match_beg, match_end)) => {
                        s = match_end;
                        let value_end = if step.function == Function::AllTo { match_end } else { match_beg };
                        params.len() < 2
                            || self.assign_text(column_of(params.first()), &buf[start..value_end], columns, draft, fields)?
                    }
                    None => {
                        s = line_end;
                        false
                    }
                }
            }

            Function::UnixLink => {
                let link = scan_unix_link(buf, &mut s);
                match link {
                    Some(UnixLink { is_file, name_end, target }) => {
                        if let Some(Parameter::Column(flag)) = params.first() {
                            draft.set_flag(*flag, !is_file);
                        }
                        let mut ok = self.assign_text(column_of(params.get(1)), &buf[start..name_end], columns, draft, fields)?;
                        if let Some(target) = target {
                            ok = ok && self.assign_text(column_of(params.get(2)), &buf[target], columns, draft, fields)?;
                        }
                        ok
                    }
                    None => false,
                }
            }

            Function::UnixDevice => {
                scan_unix_device(buf, &mut s)
                    && self.assign_text(column_of(params.first()), &buf[start..s], columns, draft, fields)?
            }

            Function::If => params.first().is_some_and(|cond| self.eval_bool(cond, draft, s)),

            Function::Assign => self.assign(params, columns, draft, fields, s)?,

            Function::CutWhiteSpacesEnd | Function::CutWhiteSpacesStart | Function::CutWhiteSpaces => {
                let col = column_of(params.first());
                let text = col.map(|c| draft.text(c)).unwrap_or("");
                let blank = |c: char| c <= ' ';
                let trimmed = match step.function {
                    Function::CutWhiteSpacesEnd => text.trim_end_matches(blank),
                    Function::CutWhiteSpacesStart => text.trim_start_matches(blank),
                    _ => text.trim_matches(blank),
                };
                if trimmed.len() != text.len() {
                    let trimmed = to_text(trimmed.as_bytes())?;
                    self.assign_text(col, trimmed.as_bytes(), columns, draft, fields)?
                } else {
                    true
                }
            }

            Function::Back => {
                let mut n = count_of(params.first());
                while n > 0 && s > 0 && !is_eol(buf[s - 1]) {
                    s -= 1;
                    n -= 1;
                }
                n == 0
            }

            Function::AddStringToColumn => {
                let col = column_of(params.first());
                let addition = self.string_operand(params.get(1), draft, s);
                if addition.is_empty() {
                    true
                } else {
                    let current = col.map(|c| draft.text(c)).unwrap_or("");
                    let mut joined = Vec::new();
                    joined.try_reserve_exact(current.len() + addition.len()).map_err(|_| LowMemory)?;
                    joined.extend_from_slice(current.as_bytes());
                    joined.extend_from_slice(addition);
                    self.assign_text(col, &joined, columns, draft, fields)?
                }
            }

            Function::CutEndOfString => {
                let col = column_of(params.first());
                let n = count_of(params.get(1));
                let text = col.map(|c| draft.text(c)).unwrap_or("");
                let chars = text.chars().count();
                if n > chars {
                    false
                } else {
                    let keep = text.char_indices().nth(chars - n).map_or(text.len(), |(at, _)| at);
                    let cut = to_text(&text.as_bytes()[..keep])?;
                    self.assign_text(col, cut.as_bytes(), columns, draft, fields)?
                }
            }
        };

        *cursor = s;
        Ok(ok)
    }

    fn assign_text(
        &self,
        column: Option<usize>,
        bytes: &[u8],
        columns: &[Column],
        draft: &mut Draft,
        fields: &mut FieldSet,
    ) -> Result<bool, LowMemory> {
        let Some(col) = column else {
            return Ok(true);
        };
        match columns.get(col).map(|c| c.kind) {
            Some(ColumnKind::Name | ColumnKind::Text) => {
                draft.values[col] = Value::Text(to_text(bytes)?);
                fields.mark_assigned(col);
                Ok(true)
            }
            kind => {
                tracing::error!(column = col, ?kind, "text assigned to a column of another type");
                Ok(false)
            }
        }
    }

    fn assign(
        &self,
        params: &[Parameter],
        columns: &[Column],
        draft: &mut Draft,
        fields: &mut FieldSet,
        at: usize,
    ) -> Result<bool, LowMemory> {
        let (Some(Parameter::Column(target)), Some(value)) = (params.first(), params.get(1)) else {
            return Ok(false);
        };
        let col = match target {
            ColumnRef::Column(col) => *col,
            pseudo => {
                let flag = self.eval_bool(value, draft, at);
                draft.set_flag(*pseudo, flag);
                return Ok(true);
            }
        };
        let Some(kind) = columns.get(col).map(|c| c.kind) else {
            return Ok(false);
        };
        Ok(match kind {
            ColumnKind::Name | ColumnKind::Text => {
                let text = to_text(self.string_operand(Some(value), draft, at))?;
                self.assign_text(Some(col), text.as_bytes(), columns, draft, fields)?
            }
            ColumnKind::Size | ColumnKind::Number => {
                let number = self.eval_number(value, draft);
                assign_number(Some(col), number, number < 0, false, columns, draft, fields)
            }
            ColumnKind::Date | ColumnKind::CustomDate => {
                let date = self.eval_date(value, draft);
                draft.values[col] = Value::Date(date);
                fields.insert(col, FieldFlags::DATE);
                true
            }
            ColumnKind::Time | ColumnKind::CustomTime => {
                set_time(col, self.eval_time(value, draft), draft, fields);
                true
            }
            ColumnKind::Extension | ColumnKind::FileType => false,
        })
    }
}

/// `negative` is the parsed sign, so `-0` counts as negative.
fn assign_number(
    column: Option<usize>,
    value: i64,
    negative: bool,
    only_positive: bool,
    columns: &[Column],
    draft: &mut Draft,
    fields: &mut FieldSet,
) -> bool {
    let Some(col) = column else {
        return true;
    };
    let Some(target) = columns.get(col) else {
        return false;
    };
    let stored = match target.kind {
        ColumnKind::Size | ColumnKind::Number if negative && only_positive => target.empty().unwrap_or(Value::Empty),
        ColumnKind::Size if negative => return false,
        ColumnKind::Size => Value::Size(value.unsigned_abs()),
        ColumnKind::Number => Value::Number(value),
        kind => {
            tracing::error!(column = col, ?kind, "number assigned to a column of another type");
            return false;
        }
    };
    draft.values[col] = stored;
    fields.mark_assigned(col);
    true
}

enum DatePart {
    Day(u8),
    Month(u8),
    /// Year, and whether it was guessed from today's date.
    Year(u16, bool),
}

fn assign_date_part(column: Option<usize>, part: DatePart, draft: &mut Draft, fields: &mut FieldSet) -> bool {
    let Some(col) = column else {
        return true;
    };
    let Some(date) = draft.date_mut(col) else {
        return false;
    };
    let bits = match part {
        DatePart::Day(day) => {
            date.day = day;
            FieldFlags::DAY
        }
        DatePart::Month(month) => {
            date.month = month;
            FieldFlags::MONTH
        }
        DatePart::Year(year, false) => {
            date.year = year;
            FieldFlags::YEAR
        }
        DatePart::Year(year, true) => {
            date.year = year;
            FieldFlags::YEAR | FieldFlags::YEAR_GUESSED
        }
    };
    fields.insert(col, bits);
    true
}

fn set_time(col: usize, time: FtpTime, draft: &mut Draft, fields: &mut FieldSet) {
    if let Some(slot) = draft.values.get_mut(col) {
        *slot = Value::Time(time);
        fields.insert(col, FieldFlags::TIME);
    }
}

/// Two-digit years below 80 are 20xx, other short years 19xx.
fn expand_year(value: u32) -> Option<u16> {
    let year = match value {
        0..=79 => value + 2000,
        80..=999 => value + 1900,
        1601 => 1602,
        _ => value,
    };
    (1602..=9999).contains(&year).then_some(year as u16)
}

fn read_unsigned(buf: &[u8], s: &mut usize) -> Option<u32> {
    let beg = *s;
    let mut value: u32 = 0;
    while let Some(d) = buf.get(*s).filter(|b| b.is_ascii_digit()) {
        value = value.checked_mul(10)?.checked_add(u32::from(d - b'0'))?;
        *s += 1;
    }
    (*s != beg).then_some(value)
}

/// `hh:mm[:ss[.ms]]` with an optional `a`/`am`/`p`/`pm` suffix.
fn read_time(buf: &[u8], s: &mut usize) -> Option<FtpTime> {
    let mut hour = read_unsigned(buf, s).filter(|h| *h < 24)?;
    if buf.get(*s) != Some(&b':') {
        return None;
    }
    *s += 1;
    let minute = read_unsigned(buf, s).filter(|m| *m < 60)?;
    let mut second = 0;
    let mut millisecond = 0;
    if buf.get(*s) == Some(&b':') {
        *s += 1;
        second = read_unsigned(buf, s).filter(|sec| *sec < 60)?;
        if buf.get(*s) == Some(&b'.') {
            *s += 1;
            millisecond = read_unsigned(buf, s).filter(|ms| *ms < 1000)?;
        }
    }
    match buf.get(*s).map(u8::to_ascii_lowercase) {
        Some(b'a') => *s += 1,
        Some(b'p') => {
            *s += 1;
            if hour < 12 {
                hour += 12;
            }
        }
        _ => return Some(FtpTime { hour: hour as u8, minute: minute as u8, second: second as u8, millisecond: millisecond as u16 }),
    }
    if buf.get(*s).is_some_and(|b| b.eq_ignore_ascii_case(&b'm')) {
        *s += 1;
    }
    Some(FtpTime { hour: hour as u8, minute: minute as u8, second: second as u8, millisecond: millisecond as u16 })
}

struct UnixLink {
    is_file: bool,
    name_end: usize,
    target: Option<Range<usize>>,
}

/// `name -> target`; a dotted last path segment of the target marks a file.
fn scan_unix_link(buf: &[u8], cursor: &mut usize) -> Option<UnixLink> {
    let len = buf.len();
    let mut s = *cursor;
    let mut state = 0;
    let mut is_file = false;
    let mut target_is_file = false;
    let mut has_point = false;
    let mut segment_start = false;
    let mut name_end = s;
    let mut target_beg = s;
    if s < len && buf[s] > b' ' {
        while s < len && !is_eol(buf[s]) {
            match state {
                0 => state = 1,
                1 => {
                    if buf[s] == b'.' {
                        has_point = true;
                    } else if buf[s] == b'-' && buf.get(s + 1) == Some(&b'>') {
                        name_end = if buf[s - 1] == b' ' { s - 1 } else { s };
                        s += 1;
                        if buf.get(s + 1) == Some(&b' ') {
                            s += 1;
                        }
                        target_beg = s + 1;
                        state = 2;
                        has_point = false;
                    } else if buf[s] > b' ' && has_point {
                        is_file = true;
                    }
                }
                2 => state = 3,
                _ => {
                    if buf[s] == b'.' {
                        has_point = !segment_start;
                        segment_start = false;
                    } else if buf[s] == b'/' {
                        has_point = false;
                        target_is_file = false;
                        segment_start = true;
                    } else {
                        segment_start = false;
                        if buf[s] > b' ' && has_point {
                            target_is_file = true;
                        }
                    }
                }
            }
            s += 1;
        }
        if target_is_file {
            is_file = true;
        }
    }
    *cursor = s;
    match state {
        1 => Some(UnixLink { is_file, name_end: s, target: None }),
        3 => Some(UnixLink { is_file, name_end, target: Some(target_beg..s) }),
        _ => None,
    }
}

/// `major, minor` of a device entry.
fn scan_unix_device(buf: &[u8], cursor: &mut usize) -> bool {
    let len = buf.len();
    let mut s = *cursor;
    let mut state = 0;
    if s < len && buf[s].is_ascii_digit() {
        while s < len && !is_eol(buf[s]) {
            let b = buf[s];
            match state {
                0 if !b.is_ascii_digit() => {
                    state = if b <= b' ' {
                        1
                    } else if b == b',' {
                        2
                    } else {
                        100
                    }
                }
                1 if b > b' ' => state = if b == b',' { 2 } else { 100 },
                2 if b > b' ' => state = if b.is_ascii_digit() { 3 } else { 100 },
                3 if !b.is_ascii_digit() => state = if starts_with_letter(&buf[s..]) { 100 } else { 4 },
                _ => {}
            }
            if state > 3 {
                break;
            }
            s += 1;
        }
    }
    *cursor = s;
    state == 3 || state == 4
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
            Column::new("time", ColumnKind::Time),
            Column::new("target", ColumnKind::Text),
        ]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn parse_all(rules: &str, listing: &str) -> Vec<NextItem> {
        let grammar = Grammar::compile(rules, &columns()).unwrap();
        let mut session = grammar.before_parsing(listing.as_bytes(), today(), false);
        let mut fields = FieldSet::default();
        let mut out = Vec::new();
        loop {
            let next = session.next_item(&mut fields).unwrap();
            let stop = !matches!(next, NextItem::Item { .. });
            out.push(next);
            if stop {
                return out;
            }
        }
    }

    fn names(items: &[NextItem]) -> Vec<&str> {
        items
            .iter()
            .filter_map(|next| match next {
                NextItem::Item { item, .. } => Some(item.name.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn word_after_leading_blanks() {
        let items = parse_all("*skip_white_spaces(), word(<name>), rest_of_line();", "  hello   world");
        assert_eq!(names(&items), vec!["hello"]);
        assert_eq!(items.last(), Some(&NextItem::End));
    }

    fn summaries(rules: &str, listing: &str) -> Vec<String> {
        parse_all(rules, listing)
            .iter()
            .map(|next| match next {
                NextItem::Item { item, .. } => {
                    format!("{}|{}|{}", item.name, item.values[5].as_text().unwrap_or(""), item.size)
                }
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn text_editing_functions() {
        // Array of (expected "name|target|size" per outcome, rules, listing)
        let cases: Vec<(Vec<&str>, &str, &str)> = vec![
            (
                vec!["hello||0", "End"],
                "*skip_white_spaces(), all_up_to(<name>, \"|\"), cut_white_spaces_end(<name>), rest_of_line();",
                "  hello   |x",
            ),
            (vec!["ab||0", "End"], "*all(<name>, 6), cut_white_spaces_end(<name>), rest_of_line();", "ab    rest\n"),
            (
                vec!["ä|x|0", "End"],
                "*word(<name>), cut_end_of_string(<name>, 2), cut_white_spaces_start(<target>), \
                 rest_of_line(<target>), cut_white_spaces(<target>);",
                "äöü  x \n",
            ),
            (
                vec!["  x|x  |0", "End"],
                "*all_up_to(<name>, \"|\"), cut_white_spaces_end(<name>), rest_of_line(<target>), \
                 cut_white_spaces_start(<target>);",
                "  x  |   x  \n",
            ),
            (
                vec!["a~|b/x|0", "End"],
                "*word(<name>), white_spaces(), word(<target>), add_string_to_column(<target>, \"/x\"), \
                 add_string_to_column(<name>, \"~\");",
                "a b\n",
            ),
            (vec!["a|b-c|0", "End"], "*all_up_to(<name>, \"-\"), rest_of_line(<target>);", "a-b-c\n"),
            (vec!["a-|b-c|0", "End"], "*all_to(<name>, \"-\"), rest_of_line(<target>);", "a-b-c\n"),
            (vec!["NoMatch { offset: 0 }"], "*cut_end_of_string(<name>, 4), word(<name>);", "abc\n"),
            (vec!["file42||42", "End"], "*word(<name>), back(3), skip_to_number(), number(<size>);", "file42\n"),
            (vec!["NoMatch { offset: 0 }"], "*word(<name>), back(7), rest_of_line();", "file42\n"),
        ];

        for (expected, rules, listing) in cases {
            assert_eq!(summaries(rules, listing), expected, "{rules}");
        }
    }

    #[test]
    fn negative_numbers_by_function() {
        // Array of (expected "name|target|size" per outcome, rules, listing)
        let cases: Vec<(Vec<&str>, &str, &str)> = vec![
            (
                vec!["a||0", "b||7", "c||0", "End"],
                "*positive_number(<size>), white_spaces(), rest_of_line(<name>);",
                "-5 a\n7 b\n-0 c\n",
            ),
            (
                vec!["NoMatch { offset: 0 }"],
                "*number(<size>), white_spaces(), rest_of_line(<name>);",
                "-5 a\n",
            ),
            (
                vec!["NoMatch { offset: 0 }"],
                "*number(<size>), white_spaces(), rest_of_line(<name>);",
                "-0 a\n",
            ),
            (
                vec!["a||3", "NoMatch { offset: 5 }"],
                "*number(<size>), white_spaces(), rest_of_line(<name>);",
                "+3 a\n-0 b\n",
            ),
        ];

        for (expected, rules, listing) in cases {
            assert_eq!(summaries(rules, listing), expected, "{listing:?}");
        }
    }

    #[test]
    fn empty_listing_ends_immediately() {
        let grammar = Grammar::compile("*rest_of_line(<name>);", &columns()).unwrap();
        let mut session = grammar.before_parsing(b"", today(), false);
        let mut fields = FieldSet::default();
        assert_eq!(session.next_item(&mut fields).unwrap(), NextItem::End);
        assert_eq!(session.position(), 0);
    }

    #[test]
    fn rules_without_name_skip_lines() {
        let rules = "*all_to(\"total \"), number();\n\
                     *skip_white_spaces();\n\
                     *number(<size>), white_spaces(), rest_of_line(<name>);";
        let items = parse_all(rules, "total 12\r\n\r\n10 a.txt\r\n20 b\r\n");
        assert_eq!(names(&items), vec!["a.txt", "b"]);
        let NextItem::Item { item, start } = &items[0] else {
            panic!("expected an item");
        };
        assert_eq!(*start, 12);
        assert_eq!(item.size, 10);
        assert_eq!(item.values[1], Value::Text("txt".into()));
    }

    #[test]
    fn unmatched_line_reports_offset() {
        let items = parse_all("*number(<size>), white_spaces(), rest_of_line(<name>);", "1 a\nxx b\n");
        assert_eq!(names(&items), vec!["a"]);
        assert_eq!(items.last(), Some(&NextItem::NoMatch { offset: 4 }));
    }

    #[test]
    fn year_or_time_guesses_last_year() {
        let rules = "*month_3(<date>), white_spaces(), day(<date>), white_spaces(), \
                     year_or_time(<date>, <time>), white_spaces(), rest_of_line(<name>);";
        let items = parse_all(rules, "Dec 31 23:59 late\nJan 10 09:05 early\nMar 3 2019 old\n");
        let dates: Vec<(FtpDate, Value)> = items
            .iter()
            .filter_map(|next| match next {
                NextItem::Item { item, .. } => Some((
                    match item.values[3] {
                        Value::Date(d) => d,
                        _ => FtpDate::default(),
                    },
                    item.values[4].clone(),
                )),
                _ => None,
            })
            .collect();
        assert_eq!(
            dates,
            vec![
                (
                    FtpDate { year: 2023, month: 12, day: 31 },
                    Value::Time(FtpTime { hour: 23, minute: 59, second: 0, millisecond: 0 })
                ),
                (
                    FtpDate { year: 2024, month: 1, day: 10 },
                    Value::Time(FtpTime { hour: 9, minute: 5, second: 0, millisecond: 0 })
                ),
                (FtpDate { year: 2019, month: 3, day: 3 }, Value::Time(FtpTime::MIDNIGHT)),
            ]
        );
    }

    #[test]
    fn unix_links_split_name_and_target() {
        let rules = "*unix_link(<is_dir>, <name>, <target>);";
        let items = parse_all(rules, "lib -> usr/lib\nreadme -> doc/README.txt\nplain\n");
        let got: Vec<(String, bool, String)> = items
            .iter()
            .filter_map(|next| match next {
                NextItem::Item { item, .. } => {
                    Some((item.name.clone(), item.is_dir, item.values[5].as_text().unwrap_or("").to_string()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            got,
            vec![
                ("lib".to_string(), true, "usr/lib".to_string()),
                ("readme".to_string(), false, "doc/README.txt".to_string()),
                ("plain".to_string(), true, String::new()),
            ]
        );
    }

    #[test]
    fn incomplete_listing_drops_the_partial_tail() {
        let grammar = Grammar::compile(
            "*word(<name>), white_spaces_and_line_ends(), number(<size>);",
            &columns(),
        )
        .unwrap();
        let listing = b"a\n1\nb\n";
        let mut session = grammar.before_parsing(listing, today(), true);
        let mut fields = FieldSet::default();
        assert!(matches!(session.next_item(&mut fields).unwrap(), NextItem::Item { .. }));
        assert_eq!(session.next_item(&mut fields).unwrap(), NextItem::End);
        assert_eq!(session.position(), listing.len());
    }

    #[test]
    fn nonempty_line_ranges() {
        assert_eq!(first_nonempty_line(b"\r\n  \nab\ncd"), Some(5..8));
        assert_eq!(last_nonempty_line(b"\r\n  \nab\ncd"), Some(8..11));
        assert_eq!(last_nonempty_line(b"ab\r\n\r\n"), Some(0..4));
        assert_eq!(first_nonempty_line(b" \n\t"), None);
    }

    #[test]
    fn time_forms() {
        let cases = vec![
            (Some(FtpTime { hour: 13, minute: 5, second: 0, millisecond: 0 }), "1:05PM"),
            (Some(FtpTime { hour: 12, minute: 0, second: 0, millisecond: 0 }), "12:00p"),
            (Some(FtpTime { hour: 8, minute: 1, second: 2, millisecond: 30 }), "08:01:02.30"),
            (None, "24:00"),
            (None, "9:60"),
        ];
        for (expected, text) in cases {
            let mut s = 0;
            assert_eq!(read_time(text.as_bytes(), &mut s), expected, "{text}");
        }
    }

    #[test]
    fn devices_and_years() {
        let mut s = 0;
        assert!(scan_unix_device(b"4, 64 Jan", &mut s));
        assert_eq!(s, 5);
        let mut s = 0;
        assert!(!scan_unix_device(b"4 x", &mut s));
        assert_eq!(expand_year(79), Some(2079));
        assert_eq!(expand_year(80), Some(1980));
        assert_eq!(expand_year(1601), Some(1602));
        assert_eq!(expand_year(1500), None);
    }
}
