// SPDX-License-Identifier: MIT

//! Comparison expressions: the content of one `[...]` block
//!
//! ```text
//! $$score$$ > 5 AND (hive-case-field:tlp IN (2, 3) OR NOT EXISTS $$override$$:)
//! ```

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

use super::ast::{CompareOp, Comparison, Constant, Token};
use super::constant::{coerce_constant, coerce_list};
use super::reduce::reduce;
use super::resolver::Resolver;
use crate::case::CaseAccessor;
use crate::context::Context;
use crate::error::{ConditionError, Result, SyntaxError};

/// Evaluate the content of one bracketed comparison block
pub fn evaluate_comparison(
    expr: &str,
    context: &Context,
    case_id: Option<&str>,
    accessor: Option<&dyn CaseAccessor>,
) -> Result<bool> {
    evaluate_with(expr, &Resolver::new(context, case_id, accessor))
}

pub(crate) fn evaluate_with(expr: &str, resolver: &Resolver<'_>) -> Result<bool> {
    let results = parse_comparison(expr)?
        .into_iter()
        .map(|token| token.try_map(|cmp| evaluate_one(&cmp, resolver)))
        .collect::<Result<Vec<_>>>()?;
    reduce(&results)
}

/// Split a comparison block into clauses and AND/OR/parenthesis tokens
pub fn parse_comparison(expr: &str) -> Result<Vec<Token<Comparison>>> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();

    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix('(') {
            tokens.push(Token::LParen);
            rest = r;
        } else if let Some(r) = rest.strip_prefix(')') {
            tokens.push(Token::RParen);
            rest = r;
        } else if let Some(r) = keyword(rest, "AND") {
            tokens.push(Token::And);
            rest = r;
        } else if let Some(r) = keyword(rest, "OR") {
            tokens.push(Token::Or);
            rest = r;
        } else {
            let (cmp, r) = parse_clause(rest)?;
            tokens.push(Token::Operand(cmp));
            rest = r;
        }
        rest = rest.trim_start();
    }

    Ok(tokens)
}

/// Strip `word` when it stands alone (followed by whitespace, a parenthesis or the end)
fn keyword<'a>(input: &'a str, word: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(word)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == '(' || c == ')' => Some(rest),
        _ => None,
    }
}

fn invalid(input: &str) -> ConditionError {
    SyntaxError::InvalidComparison(input.trim().to_string()).into()
}

/// Parse one `[NOT] variable [NOT] op constant` or `[NOT] EXISTS variable` clause
fn parse_clause(input: &str) -> Result<(Comparison, &str)> {
    let mut negated = false;
    let mut rest = input;

    if let Some(r) = keyword(rest, "NOT") {
        negated = true;
        rest = r.trim_start();
    }

    if let Some(r) = keyword(rest, "EXISTS") {
        let (variable, r) = take_bare(r.trim_start());
        // Only namespaced references are accepted here, `$$name$$:` included
        if variable.is_empty() || !variable.contains(':') {
            return Err(invalid(input));
        }
        let cmp = Comparison {
            variable: variable.to_string(),
            op: CompareOp::Exists,
            constant: None,
            negated,
        };
        return Ok((cmp, r));
    }

    let end = rest.find(char::is_whitespace).ok_or_else(|| invalid(input))?;
    let variable = &rest[..end];
    rest = rest[end..].trim_start();

    if let Some(r) = keyword(rest, "NOT") {
        negated = true;
        rest = r.trim_start();
    }

    let (op, r) = parse_operator(rest).ok_or_else(|| invalid(input))?;
    rest = r.trim_start();

    let (text, r) = if op.takes_list() {
        take_list(rest)
    } else {
        take_constant(rest)
    }
    .ok_or_else(|| invalid(input))?;

    let constant = if op.takes_list() {
        coerce_list(text)?
    } else {
        coerce_constant(text)?
    };

    let cmp = Comparison {
        variable: variable.to_string(),
        op,
        constant: Some(constant),
        negated,
    };
    Ok((cmp, r))
}

fn parse_operator(input: &str) -> Option<(CompareOp, &str)> {
    CompareOp::LITERALS.iter().find_map(|(literal, op)| {
        let rest = input.strip_prefix(literal)?;
        let is_word = literal.chars().all(|c| c.is_ascii_alphabetic());
        if is_word {
            match rest.chars().next() {
                Some(c) if c.is_whitespace() || c == '(' => Some((*op, rest)),
                _ => None,
            }
        } else {
            Some((*op, rest))
        }
    })
}

/// Token up to whitespace, `)` or the end
fn take_bare(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| c.is_whitespace() || c == ')')
        .unwrap_or(input.len());
    input.split_at(end)
}

/// Position just past the `'` closing a string that opens at `open`
fn close_quote(input: &str, open: usize) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in input[open + 1..].char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '\'' {
            return Some(open + 1 + i + 1);
        }
    }
    None
}

/// Literal text of a scalar constant
fn take_constant(input: &str) -> Option<(&str, &str)> {
    let quote = match input.as_bytes() {
        [b'\'', ..] => Some(0),
        [b'b' | b'h' | b't', b'\'', ..] => Some(1),
        _ => None,
    };

    let end = match quote {
        Some(open) => close_quote(input, open)?,
        None => take_bare(input).0.len(),
    };
    if end == 0 {
        return None;
    }
    Some(input.split_at(end))
}

/// Literal text of a `( ... )` list, up to its matching `)`
fn take_list(input: &str) -> Option<(&str, &str)> {
    if !input.starts_with('(') {
        return None;
    }

    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '\'' => in_string = !in_string,
            ')' if !in_string => return Some(input.split_at(i + 1)),
            _ => {}
        }
    }
    None
}

fn evaluate_one(cmp: &Comparison, resolver: &Resolver<'_>) -> Result<bool> {
    let values = resolver.resolve(&cmp.variable)?;

    let result = match (cmp.op, &cmp.constant) {
        (CompareOp::Exists, _) => values.iter().any(|v| !v.is_null()),
        (CompareOp::Eq, Some(c)) => values.iter().any(|v| equals(v, c)),
        (CompareOp::NotEq, Some(c)) => values.iter().any(|v| !equals(v, c)),
        (CompareOp::Lt, Some(c)) => any_ordering(&values, c, |o| o == Ordering::Less),
        (CompareOp::Gt, Some(c)) => any_ordering(&values, c, |o| o == Ordering::Greater),
        (CompareOp::Lte, Some(c)) => any_ordering(&values, c, |o| o != Ordering::Greater),
        (CompareOp::Gte, Some(c)) => any_ordering(&values, c, |o| o != Ordering::Less),
        (CompareOp::In, Some(Constant::List(items))) => values
            .iter()
            .any(|v| items.iter().any(|item| equals(v, item))),
        (CompareOp::Like, Some(c)) => {
            let re = anchored(&like_to_regex(pattern_text(c)?))?;
            any_match(&values, &re)
        }
        (CompareOp::Matches, Some(c)) => {
            let re = anchored_backtracking(pattern_text(c)?)?;
            any_backtracking_match(&values, &re)?
        }
        (CompareOp::IsSubset, Some(Constant::List(items))) => values
            .iter()
            .any(|v| set_elements(v).is_some_and(|set| is_subset(&set, items))),
        (CompareOp::IsSuperset, Some(Constant::List(items))) => values
            .iter()
            .any(|v| set_elements(v).is_some_and(|set| is_superset(&set, items))),
        (op, _) => return Err(ConditionError::UnsupportedOperator(op.to_string())),
    };

    let result = result != cmp.negated;
    log::debug!("Comparison '{}' evaluated to {}", cmp, result);
    Ok(result)
}

/// Equality with the rules of the constant's type; mismatched types are unequal.
///
/// Bools count as the numbers 0 and 1.
fn equals(value: &Value, constant: &Constant) -> bool {
    match (value, constant) {
        (Value::Bool(a), Constant::Bool(b)) => a == b,
        (Value::Bool(a), Constant::Int(i)) => i64::from(*a) == *i,
        (Value::Bool(a), Constant::Float(f)) => f64::from(u8::from(*a)) == *f,
        (Value::Number(n), Constant::Bool(b)) => n.as_f64() == Some(f64::from(u8::from(*b))),
        (Value::String(a), Constant::String(b)) => a == b,
        (Value::Number(n), Constant::Int(i)) => match n.as_i64() {
            Some(a) => a == *i,
            None => n.as_f64() == Some(*i as f64),
        },
        (Value::Number(n), Constant::Float(f)) => n.as_f64() == Some(*f),
        (Value::String(s), Constant::Timestamp(t)) => parse_timestamp(s) == Some(*t),
        _ => false,
    }
}

/// Ordering of `value` relative to `constant`, `None` when they do not compare
fn ordering(value: &Value, constant: &Constant) -> Option<Ordering> {
    match (value, constant) {
        (Value::Bool(a), Constant::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Constant::Int(i)) => Some(i64::from(*a).cmp(i)),
        (Value::Bool(a), Constant::Float(f)) => f64::from(u8::from(*a)).partial_cmp(f),
        (Value::Number(n), Constant::Bool(b)) => n.as_f64()?.partial_cmp(&f64::from(u8::from(*b))),
        (Value::String(a), Constant::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Number(n), Constant::Int(i)) => match n.as_i64() {
            Some(a) => Some(a.cmp(i)),
            None => n.as_f64()?.partial_cmp(&(*i as f64)),
        },
        (Value::Number(n), Constant::Float(f)) => n.as_f64()?.partial_cmp(f),
        (Value::String(s), Constant::Timestamp(t)) => Some(parse_timestamp(s)?.cmp(t)),
        _ => None,
    }
}

fn any_ordering(values: &[Value], constant: &Constant, accept: impl Fn(Ordering) -> bool) -> bool {
    values
        .iter()
        .any(|v| ordering(v, constant).is_some_and(&accept))
}

/// RFC 3339 strings as naive UTC
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc())
}

fn pattern_text(constant: &Constant) -> Result<&str> {
    match constant {
        Constant::String(s) => Ok(s.as_str()),
        other => Err(SyntaxError::InvalidPattern {
            pattern: format!("{:?}", other),
            reason: "pattern must be a quoted string".to_string(),
        }
        .into()),
    }
}

/// SQL `LIKE` pattern to regex: `_` is any char, `%` any run
fn like_to_regex(pattern: &str) -> String {
    regex::escape(pattern).replace('_', ".").replace('%', ".*")
}

/// Regex matching at the start of the input only
fn anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
        SyntaxError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn any_match(values: &[Value], re: &Regex) -> bool {
    values
        .iter()
        .filter_map(Value::as_str)
        .any(|s| re.is_match(s))
}

/// `MATCHES` patterns may use look-around and backreferences
fn anchored_backtracking(pattern: &str) -> Result<fancy_regex::Regex> {
    fancy_regex::Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
        SyntaxError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn any_backtracking_match(values: &[Value], re: &fancy_regex::Regex) -> Result<bool> {
    for s in values.iter().filter_map(Value::as_str) {
        let matched = re.is_match(s).map_err(|e| SyntaxError::InvalidPattern {
            pattern: re.as_str().to_string(),
            reason: e.to_string(),
        })?;
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Members of a value viewed as a set; strings are sets of characters.
///
/// Objects and nested arrays cannot be set members, so such values are not sets.
fn set_elements(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => {
            if items.iter().any(|i| i.is_array() || i.is_object()) {
                None
            } else {
                Some(items.clone())
            }
        }
        Value::String(s) => Some(s.chars().map(|c| Value::String(c.to_string())).collect()),
        _ => None,
    }
}

fn is_subset(set: &[Value], items: &[Constant]) -> bool {
    set.iter().all(|v| items.iter().any(|c| equals(v, c)))
}

fn is_superset(set: &[Value], items: &[Constant]) -> bool {
    items.iter().all(|c| set.iter().any(|v| equals(v, c)))
}
