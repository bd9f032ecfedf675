//! Boolean query language.
//!
//! ```text
//! Expr     := '#' Operator '(' Expr (',' Expr)* ')' | Term
//! Term     := "'" any-char-except-quote* "'"
//! Operator := "not" | "and" | "or"
//! ```
//!
//! Operands may also be separated by whitespace alone. Anything after the
//! first complete expression is ignored. Operators nest at most
//! [`MAX_DEPTH`] levels deep.

use crate::error::SyntaxError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest accepted operator nesting; evaluation recurses once per level.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    And,
    Or,
    Not,
    /// Any other literal after `#`; kept so evaluation can report it.
    Unknown(String),
}

impl Operator {
    fn from_literal(lit: &str) -> Self {
        match lit {
            "and" => Operator::And,
            "or" => Operator::Or,
            "not" => Operator::Not,
            other => Operator::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Unknown(lit) => lit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryNode {
    Term(String),
    Logical { op: Operator, operands: Vec<QueryNode> },
}

impl QueryNode {
    pub fn term(text: impl Into<String>) -> Self { QueryNode::Term(text.into()) }

    pub fn logical(op: Operator, operands: Vec<QueryNode>) -> Self {
        QueryNode::Logical { op, operands }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Term(t) => write!(f, "'{t}'"),
            QueryNode::Logical { op, operands } => {
                write!(f, "#{}(", op.as_str())?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 { f.write_str(",")?; }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Parse one boolean query. Line breaks are removed first; positions in
/// errors are char offsets into that stripped text.
pub fn parse(query: &str) -> Result<QueryNode, SyntaxError> {
    let chars: Vec<char> = query.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let mut parser = Parser { chars, pos: 0, depth: 0 };
    parser.parse_expression()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn parse_expression(&mut self) -> Result<QueryNode, SyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            Some('#') => {
                if self.depth == MAX_DEPTH {
                    return Err(self.error("shallower nesting"));
                }
                self.depth += 1;
                self.pos += 1;
                let op = self.parse_operator();
                self.expect('(')?;
                let mut operands = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        Some(')') => break,
                        None => return Err(self.error("')'")),
                        Some(_) => {}
                    }
                    operands.push(self.parse_expression()?);
                    self.skip_whitespace();
                    if self.peek() == Some(',') {
                        self.pos += 1;
                    }
                }
                self.expect(')')?;
                self.depth -= 1;
                Ok(QueryNode::Logical { op, operands })
            }
            Some('\'') => Ok(QueryNode::Term(self.parse_term()?)),
            Some(_) => Err(self.error("'#' or '''")),
            None => Err(self.error("expression")),
        }
    }

    fn parse_operator(&mut self) -> Operator {
        let start = self.pos;
        while self.peek().is_some_and(char::is_alphabetic) {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        Operator::from_literal(&literal)
    }

    fn parse_term(&mut self) -> Result<String, SyntaxError> {
        self.expect('\'')?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\'' { break; }
            self.pos += 1;
        }
        let term: String = self.chars[start..self.pos].iter().collect();
        self.expect('\'')?;
        Ok(term)
    }

    fn expect(&mut self, expected: char) -> Result<(), SyntaxError> {
        self.skip_whitespace();
        if self.peek() != Some(expected) {
            return Err(self.error(&format!("'{expected}'")));
        }
        self.pos += 1;
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> { self.chars.get(self.pos).copied() }

    fn error(&self, expected: &str) -> SyntaxError {
        SyntaxError { position: self.pos, expected: expected.to_string() }
    }
}
