// SPDX-License-Identifier: MIT

//! Boolean reduction shared by observation and comparison expressions
//!
//! Grammar, AND binding tighter than OR:
//!
//! ```text
//! expr   := term ("OR" term)*
//! term   := factor ("AND" factor)*
//! factor := operand | "(" expr ")"
//! ```
//!
//! Every operand is already evaluated when reduction starts, so an error in
//! any block surfaces even when the result would be decided without it.

use super::ast::Token;
use crate::error::{Result, SyntaxError};

/// Reduce a flat token list to a single boolean
pub fn reduce(tokens: &[Token<bool>]) -> Result<bool> {
    if tokens.is_empty() {
        return Err(SyntaxError::UnbalancedTokens("empty expression".to_string()).into());
    }

    let mut reducer = Reducer { tokens, pos: 0 };
    let value = reducer.expr()?;
    if reducer.pos != tokens.len() {
        return Err(reducer.unexpected());
    }
    Ok(value)
}

struct Reducer<'a> {
    tokens: &'a [Token<bool>],
    pos: usize,
}

impl Reducer<'_> {
    fn expr(&mut self) -> Result<bool> {
        let mut value = self.term()?;
        while self.eat(&Token::Or) {
            let rhs = self.term()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<bool> {
        let mut value = self.factor()?;
        while self.eat(&Token::And) {
            let rhs = self.factor()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<bool> {
        match self.tokens.get(self.pos) {
            Some(Token::Operand(b)) => {
                self.pos += 1;
                Ok(*b)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let value = self.expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(SyntaxError::UnbalancedTokens(format!(
                        "missing ')' at token {}",
                        self.pos
                    ))
                    .into());
                }
                Ok(value)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn eat(&mut self, token: &Token<bool>) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> crate::error::ConditionError {
        let found = match self.tokens.get(self.pos) {
            None => "end of expression".to_string(),
            Some(Token::Operand(b)) => format!("operand {}", b),
            Some(Token::And) => "AND".to_string(),
            Some(Token::Or) => "OR".to_string(),
            Some(Token::LParen) => "'('".to_string(),
            Some(Token::RParen) => "')'".to_string(),
        };
        SyntaxError::UnbalancedTokens(format!("unexpected {} at token {}", found, self.pos)).into()
    }
}
