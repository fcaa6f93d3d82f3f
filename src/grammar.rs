//! Listing grammars: compiled line rules and their interpreter.
//!
//! A grammar is the "how to read a listing" half of a server type. Its source
//! is a list of rules; each rule is a sequence of steps run against the
//! listing at the current position:
//!
//! ```text
//! # skip the "total 12" header
//! * all_to("total "), number();
//! # drwxr-xr-x   2 root  root   4096 Jan 31 12:00 src
//! * assign(<is_dir>, next_char eq "d"), all(<rights>, 10), white_spaces(),
//!   number(), white_spaces(), word(<user>), white_spaces(), word(<group>),
//!   white_spaces(), number(<size>), white_spaces(), month_3(<date>),
//!   white_spaces(), day(<date>), white_spaces(), year_or_time(<date>, <time>),
//!   white_spaces(), rest_of_line(<name>);
//! ```
//!
//! ## How the parts work together
//!
//! ```text
//! rule text ──▶ compile_rules (compiler.rs)
//!                  │  Function catalogue + signatures (functions.rs)
//!                  │  Parameter / operand typing      (params.rs)
//!                  ▼
//!               Grammar { rules } ── shared, read-only
//!                  │
//!      before_parsing(buffer, today, incomplete)
//!                  ▼
//!               ListingSession (interpreter.rs)
//!                  │  runs steps, reads operands (eval.rs),
//!                  │  recognizes month names (months.rs)
//!                  ▼
//!               next_item ──▶ fill_empty_values (defaults.rs) ──▶ ListingItem
//! ```
//!
//! Rules are tried top to bottom at the start of each line; the first rule
//! whose steps all succeed and which ends at a line break wins. A rule that
//! never assigns the name column consumes its lines without producing an item
//! (headers, totals, blank lines).

#[path = "grammar/compiler.rs"]
mod compiler;
#[path = "grammar/defaults.rs"]
mod defaults;
#[path = "grammar/eval.rs"]
mod eval;
#[path = "grammar/functions.rs"]
mod functions;
#[path = "grammar/interpreter.rs"]
mod interpreter;
#[path = "grammar/months.rs"]
mod months;
#[path = "grammar/params.rs"]
mod params;

pub use functions::Function;
pub use interpreter::{ListingSession, NextItem};
pub use months::Languages;
pub use params::{BinaryOperator, OperandType, Parameter, StateVar};

use crate::columns::{Column, ColumnKind};
use crate::error::CompileError;
use chrono::NaiveDate;

/// One function invocation of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    function: Function,
    params: Vec<Parameter>,
}

impl Step {
    pub fn function(&self) -> Function {
        self.function
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }
}

/// One candidate line layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    steps: Vec<Step>,
}

impl Rule {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// The compiled rules of one server type.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<Rule>,
    columns: Vec<Column>,
    unassigned: Vec<usize>,
}

impl Grammar {
    /// Compile rule text against `columns`.
    ///
    /// The columns are expected to be valid (see
    /// [`validate_columns`](crate::columns::validate_columns)).
    pub fn compile(source: &str, columns: &[Column]) -> Result<Self, CompileError> {
        let rules = compiler::compile_rules(source, columns)?;

        let mut assigned = vec![false; columns.len()];
        for step in rules.iter().flat_map(|rule| &rule.steps) {
            for col in step.function.assigned_columns(&step.params) {
                if let Some(slot) = assigned.get_mut(col) {
                    *slot = true;
                }
            }
        }
        let unassigned: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(i, c)| !assigned[*i] && !matches!(c.kind, ColumnKind::Extension | ColumnKind::FileType))
            .map(|(i, _)| i)
            .collect();
        for &i in &unassigned {
            tracing::warn!(column = %columns[i].id, "no rule assigns a value to this column");
        }

        let mut owned = Vec::new();
        owned.try_reserve_exact(columns.len()).map_err(|_| CompileError::LowMemory)?;
        owned.extend_from_slice(columns);

        tracing::debug!(rules = rules.len(), columns = columns.len(), "compiled listing grammar");
        Ok(Grammar { rules, columns: owned, unassigned })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns (other than extension and file type) that no rule assigns.
    pub fn unassigned_columns(&self) -> &[usize] {
        &self.unassigned
    }

    /// Start interpreting `listing`.
    ///
    /// `today` resolves years of entries that only carry a time;
    /// `incomplete` marks a listing that was cut off (e.g. an aborted
    /// transfer), which lets a trailing partial entry be skipped silently.
    pub fn before_parsing<'a>(&'a self, listing: &'a [u8], today: NaiveDate, incomplete: bool) -> ListingSession<'a> {
        ListingSession::new(self, listing, today, incomplete)
    }
}
