//! Rule text to [`Rule`]s.
//!
//! ```text
//! # comment up to the end of the line
//! * skip_white_spaces(), word(<name>), if(next_char == "/"), rest_of_line();
//! ```
//!
//! Every step is type-checked as soon as its closing `)` is read; the first
//! failure aborts compilation with the offset of the offending token.

use super::functions::Function;
use super::params::{BinaryOperator, Parameter, StateVar};
use super::{Rule, Step};
use crate::columns::{Column, find_column};
use crate::condition::{is_ident_byte, read_string_literal};
use crate::error::{CompileError, Message};

pub(super) fn compile_rules(source: &str, columns: &[Column]) -> Result<Vec<Rule>, CompileError> {
    let mut compiler = Compiler { src: source.as_bytes(), pos: 0, columns };
    compiler.rules()
}

fn push<T>(items: &mut Vec<T>, item: T) -> Result<(), CompileError> {
    items.try_reserve(1).map_err(|_| CompileError::LowMemory)?;
    items.push(item);
    Ok(())
}

struct Compiler<'a> {
    src: &'a [u8],
    pos: usize,
    columns: &'a [Column],
}

impl<'a> Compiler<'a> {
    fn skip_trivia(&mut self) {
        loop {
            while self.pos < self.src.len() && self.src[self.pos] <= b' ' {
                self.pos += 1;
            }
            if self.src.get(self.pos) != Some(&b'#') {
                return;
            }
            while self.pos < self.src.len() && !matches!(self.src[self.pos], b'\r' | b'\n') {
                self.pos += 1;
            }
        }
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.skip_trivia();
        self.src.get(self.pos).copied()
    }

    fn identifier(&mut self) -> &'a [u8] {
        let beg = self.pos;
        while self.pos < self.src.len() && is_ident_byte(self.src[self.pos]) {
            self.pos += 1;
        }
        &self.src[beg..self.pos]
    }

    fn fail(&self, message: Message) -> CompileError {
        CompileError::at(message, self.pos)
    }

    fn rules(&mut self) -> Result<Vec<Rule>, CompileError> {
        let mut rules = Vec::new();
        while let Some(b) = self.peek_byte() {
            if b != b'*' {
                return Err(self.fail(Message::RuleStartExpected));
            }
            self.pos += 1;
            let rule = self.rule()?;
            push(&mut rules, rule)?;
        }
        Ok(rules)
    }

    fn rule(&mut self) -> Result<Rule, CompileError> {
        if self.peek_byte() == Some(b';') {
            return Err(self.fail(Message::EmptyRule));
        }
        let mut steps = Vec::new();
        loop {
            let step = self.step()?;
            push(&mut steps, step)?;
            match self.peek_byte() {
                Some(b',') => self.pos += 1,
                Some(b';') => {
                    self.pos += 1;
                    return Ok(Rule { steps });
                }
                _ => return Err(self.fail(Message::CommaOrSemicolonExpected)),
            }
        }
    }

    fn step(&mut self) -> Result<Step, CompileError> {
        self.skip_trivia();
        let at = self.pos;
        let name = self.identifier();
        if name.is_empty() {
            return Err(self.fail(Message::EmptyIdentifier));
        }
        let function = Function::lookup(name).ok_or(CompileError::at(Message::UnknownFunction, at))?;
        if self.peek_byte() != Some(b'(') {
            return Err(self.fail(Message::MissingFunctionParameters));
        }
        self.pos += 1;

        let mut params = Vec::new();
        let mut offsets = Vec::new();
        if self.peek_byte() == Some(b')') {
            self.pos += 1;
        } else {
            loop {
                self.skip_trivia();
                push(&mut offsets, self.pos)?;
                let param = self.parameter()?;
                push(&mut params, param)?;
                match self.peek_byte() {
                    Some(b',') => self.pos += 1,
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.fail(Message::CommaOrParenthesisExpected)),
                }
            }
        }

        function.check(&params, &offsets, self.columns, at)?;
        Ok(Step { function, params })
    }

    fn parameter(&mut self) -> Result<Parameter, CompileError> {
        let left = self.operand()?;
        let Some((op, op_at)) = self.operator() else {
            return Ok(left);
        };
        let right = self.operand()?;
        if !op.accepts(left.operand_type(self.columns), right.operand_type(self.columns)) {
            return Err(CompileError::at(Message::IncompatibleOperands, op_at));
        }
        Ok(Parameter::Expression { op, operands: Box::new([left, right]) })
    }

    fn operator(&mut self) -> Option<(BinaryOperator, usize)> {
        self.skip_trivia();
        let at = self.pos;
        let src = self.src;
        let rest = &src[at..];
        if rest.starts_with(b"==") || rest.starts_with(b"!=") {
            self.pos += 2;
            let op = if rest[0] == b'=' { BinaryOperator::Equal } else { BinaryOperator::NotEqual };
            return Some((op, at));
        }
        let word = self.identifier();
        match BinaryOperator::WORDS.iter().find(|(name, _)| name.as_bytes().eq_ignore_ascii_case(word)) {
            Some((_, op)) => Some((*op, at)),
            None => {
                self.pos = at;
                None
            }
        }
    }

    fn operand(&mut self) -> Result<Parameter, CompileError> {
        self.skip_trivia();
        let at = self.pos;
        match self.src.get(at).copied() {
            Some(b'<') => {
                self.pos += 1;
                let id_at = self.pos;
                let id = self.identifier();
                if id.is_empty() {
                    return Err(self.fail(Message::EmptyIdentifier));
                }
                if self.src.get(self.pos) != Some(&b'>') {
                    return Err(self.fail(Message::UnexpectedSymbol));
                }
                self.pos += 1;
                std::str::from_utf8(id)
                    .ok()
                    .and_then(|id| find_column(self.columns, id))
                    .map(Parameter::Column)
                    .ok_or(CompileError::at(Message::UnknownColumn, id_at))
            }
            Some(b'"') => {
                let (text, quote) = read_string_literal(self.src, at + 1)?;
                self.pos = quote + 1;
                Ok(Parameter::String(text))
            }
            Some(b'+' | b'-' | b'0'..=b'9') => self.number(),
            Some(b) if is_ident_byte(b) => {
                let id = self.identifier();
                if id.eq_ignore_ascii_case(b"true") {
                    return Ok(Parameter::Boolean(true));
                }
                if id.eq_ignore_ascii_case(b"false") {
                    return Ok(Parameter::Boolean(false));
                }
                StateVar::ALL
                    .into_iter()
                    .find(|var| var.name().as_bytes().eq_ignore_ascii_case(id))
                    .map(Parameter::StateVar)
                    .ok_or(CompileError::at(Message::UnknownIdentifier, at))
            }
            _ => Err(self.fail(Message::UnexpectedSymbol)),
        }
    }

    fn number(&mut self) -> Result<Parameter, CompileError> {
        let at = self.pos;
        let negative = self.src[at] == b'-';
        if matches!(self.src[at], b'+' | b'-') {
            self.pos += 1;
        }
        let digits = self.pos;
        let mut value: i64 = 0;
        while let Some(d) = self.src.get(self.pos).filter(|b| b.is_ascii_digit()) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(d - b'0')))
                .ok_or(CompileError::at(Message::NumberOverflow, at))?;
            self.pos += 1;
        }
        if self.pos == digits {
            return Err(self.fail(Message::UnexpectedSymbol));
        }
        Ok(Parameter::Number(if negative { -value } else { value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{ColumnKind, ColumnRef};

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", ColumnKind::Name),
            Column::new("size", ColumnKind::Size),
            Column::new("date", ColumnKind::Date),
            Column::new("time", ColumnKind::Time),
            Column::new("rights", ColumnKind::Text),
        ]
    }

    fn compile(source: &str) -> Result<Vec<Rule>, CompileError> {
        compile_rules(source, &columns())
    }

    #[test]
    fn rules_steps_and_comments() {
        let rules = compile(
            "# header lines\n\
             * word(), white_spaces(2) , if(first_nonempty_line), rest_of_line();\n\
             *word(<NAME>),\n  # trailing name\n  assign(<is_dir>, next_char == \"/\");",
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].steps.len(), 4);
        assert_eq!(rules[0].steps[1].params, vec![Parameter::Number(2)]);
        assert_eq!(rules[1].steps[0].params, vec![Parameter::Column(ColumnRef::Column(0))]);
        assert_eq!(
            rules[1].steps[1].params[1],
            Parameter::Expression {
                op: BinaryOperator::Equal,
                operands: Box::new([Parameter::StateVar(StateVar::NextChar), Parameter::String("/".into())]),
            }
        );
    }

    #[test]
    fn word_operators() {
        let rules = compile("*if(rest_of_line NOT_END_WITH \".txt\");").unwrap();
        let Parameter::Expression { op, .. } = &rules[0].steps[0].params[0] else {
            panic!("expected an expression");
        };
        assert_eq!(*op, BinaryOperator::NotEndsWith);
    }

    #[test]
    fn empty_source_has_no_rules() {
        assert!(compile("  # nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn diagnostics_with_offsets() {
        let cases = vec![
            (CompileError::at(Message::RuleStartExpected, 0), "word();"),
            (CompileError::at(Message::EmptyRule, 2), "* ;"),
            (CompileError::at(Message::UnknownFunction, 1), "*wordz();"),
            (CompileError::at(Message::MissingFunctionParameters, 6), "*word ;"),
            (CompileError::at(Message::UnknownColumn, 7), "*word(<owner>);"),
            (CompileError::at(Message::UnknownIdentifier, 4), "*if(next_line);"),
            (CompileError::at(Message::CommaOrParenthesisExpected, 13), "*word(<name> ;"),
            (CompileError::at(Message::CommaOrSemicolonExpected, 8), "*word() word();"),
            (CompileError::at(Message::MissingStringTerminator, 11), "*all_to(\"ab\n\");"),
            (CompileError::at(Message::NumberOverflow, 6), "*back(99999999999999999999);"),
            (CompileError::at(Message::IncompatibleOperands, 14), "*if(next_word == 1);"),
            (CompileError::at(Message::InvalidFunctionParameters, 1), "*word(<size>);"),
            (CompileError::at(Message::NegativeNumber, 14), "*white_spaces(-1);"),
            (CompileError::at(Message::EmptyIdentifier, 7), "*word(<>);"),
        ];
        for (expected, source) in cases {
            assert_eq!(compile(source).unwrap_err(), expected, "{source}");
        }
    }
}
