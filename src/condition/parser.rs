//! Recursive descent over the condition token stream.
//!
//! `or` and `and` chains are collected in a loop and folded to the right, so
//! `a or b or c` becomes `Or(a, Or(b, c))`. Only parentheses and `not` recurse;
//! their depth is bounded.

use super::lexer::{Lexer, TokenKind};
use super::tree::Node;
use crate::error::{CompileError, Message};
use crate::matcher::MatcherFactory;

const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    lexer: Lexer<'a>,
    depth: usize,
}

pub(super) fn parse_condition(source: &str, matchers: &dyn MatcherFactory) -> Result<Node, CompileError> {
    let mut parser = Parser { lexer: Lexer::new(source, matchers), depth: 0 };
    if parser.lexer.peek()? == TokenKind::Eos {
        return Ok(Node::AlwaysTrue);
    }
    let root = parser.expr_or()?;
    if parser.lexer.peek()? != TokenKind::Eos {
        return Err(parser.unexpected());
    }
    Ok(root)
}

fn fold_right(mut operands: Vec<Node>, combine: fn(Box<Node>, Box<Node>) -> Node) -> Node {
    let mut node = operands.pop().unwrap_or(Node::AlwaysTrue);
    while let Some(left) = operands.pop() {
        node = combine(Box::new(left), Box::new(node));
    }
    node
}

impl Parser<'_> {
    fn unexpected(&self) -> CompileError {
        CompileError::at(Message::UnexpectedSymbol, self.lexer.position())
    }

    fn enter(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CompileError::at(Message::NestingTooDeep, self.lexer.position()));
        }
        Ok(())
    }

    fn expr_or(&mut self) -> Result<Node, CompileError> {
        let mut operands = vec![self.expr_and()?];
        loop {
            match self.lexer.peek()? {
                TokenKind::Or => {
                    self.lexer.bump();
                    operands.push(self.expr_and()?);
                }
                TokenKind::Eos | TokenKind::RightParen => break,
                _ => return Err(self.unexpected()),
            }
        }
        Ok(fold_right(operands, Node::Or))
    }

    fn expr_and(&mut self) -> Result<Node, CompileError> {
        let mut operands = vec![self.expr_not()?];
        loop {
            match self.lexer.peek()? {
                TokenKind::And => {
                    self.lexer.bump();
                    operands.push(self.expr_not()?);
                }
                TokenKind::Or | TokenKind::Eos | TokenKind::RightParen => break,
                _ => return Err(self.unexpected()),
            }
        }
        Ok(fold_right(operands, Node::And))
    }

    fn expr_not(&mut self) -> Result<Node, CompileError> {
        match self.lexer.peek()? {
            TokenKind::Not => {
                self.lexer.bump();
                self.enter()?;
                let operand = self.term()?;
                self.depth -= 1;
                Ok(Node::Not(Box::new(operand)))
            }
            TokenKind::Function | TokenKind::LeftParen => self.term(),
            _ => Err(self.unexpected()),
        }
    }

    fn term(&mut self) -> Result<Node, CompileError> {
        match self.lexer.peek()? {
            TokenKind::Function => {
                let (function, matcher) = self.lexer.take_function().ok_or_else(|| self.unexpected())?;
                self.lexer.bump();
                Ok(Node::Function { function, matcher })
            }
            TokenKind::LeftParen => {
                self.lexer.bump();
                self.enter()?;
                let inner = self.expr_or()?;
                if self.lexer.peek()? != TokenKind::RightParen {
                    return Err(CompileError::at(Message::MissingRightParenthesis, self.lexer.position()));
                }
                self.lexer.bump();
                self.depth -= 1;
                Ok(inner)
            }
            _ => Err(self.unexpected()),
        }
    }
}
