// SPDX-License-Identifier: MIT

//! Token and value types for condition expressions

use chrono::NaiveDateTime;
use std::fmt;

/// Flat token produced by the observation and comparison tokenizers.
///
/// Operands are generic so the same reducer runs over raw blocks, parsed
/// comparisons and finally booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<T> {
    Operand(T),
    And,
    Or,
    LParen,
    RParen,
}

impl<T> Token<T> {
    /// Convert every operand, keeping the operators in place
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Token<U>, E> {
        Ok(match self {
            Token::Operand(t) => Token::Operand(f(t)?),
            Token::And => Token::And,
            Token::Or => Token::Or,
            Token::LParen => Token::LParen,
            Token::RParen => Token::RParen,
        })
    }
}

/// One operand of an observation expression
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// `true` / `false` written directly in the expression
    Literal(bool),
    /// Content of a `[...]` block, brackets stripped
    Comparison(String),
}

/// A single `variable operator constant` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub variable: String,
    pub op: CompareOp,
    /// Absent only for `EXISTS`
    pub constant: Option<Constant>,
    pub negated: bool,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// =
    Eq,
    /// !=
    NotEq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    In,
    Like,
    Matches,
    IsSubset,
    IsSuperset,
    Exists,
}

impl CompareOp {
    /// Operator literals, multi-character operators before their prefixes
    pub const LITERALS: [(&'static str, CompareOp); 11] = [
        ("!=", CompareOp::NotEq),
        ("<=", CompareOp::Lte),
        (">=", CompareOp::Gte),
        ("=", CompareOp::Eq),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
        ("ISSUBSET", CompareOp::IsSubset),
        ("ISSUPERSET", CompareOp::IsSuperset),
        ("IN", CompareOp::In),
        ("LIKE", CompareOp::Like),
        ("MATCHES", CompareOp::Matches),
    ];

    /// Operators whose constant is a parenthesized list
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            CompareOp::In | CompareOp::IsSubset | CompareOp::IsSuperset
        )
    }
}

/// Typed constant coerced from its literal text
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(NaiveDateTime),
    List(Vec<Constant>),
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Lte => "<=",
            CompareOp::Gte => ">=",
            CompareOp::In => "IN",
            CompareOp::Like => "LIKE",
            CompareOp::Matches => "MATCHES",
            CompareOp::IsSubset => "ISSUBSET",
            CompareOp::IsSuperset => "ISSUPERSET",
            CompareOp::Exists => "EXISTS",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "NOT ")?;
        }
        match &self.constant {
            None => write!(f, "{} {}", self.op, self.variable),
            Some(c) => write!(f, "{} {} {:?}", self.variable, self.op, c),
        }
    }
}
