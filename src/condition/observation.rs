// SPDX-License-Identifier: MIT

//! Observation expressions and the root condition entry point
//!
//! An observation expression joins bracketed comparison blocks with
//! `AND`, `OR` and parentheses:
//!
//! ```text
//! [$$count$$ > 2] AND ([hive-case-field:tlp = 2] OR [$$force$$ = true])
//! ```

use super::ast::{Observation, Token};
use super::comparison;
use super::reduce::reduce;
use super::resolver::Resolver;
use crate::case::CaseAccessor;
use crate::context::Context;
use crate::error::{ConditionError, Result, SyntaxError};

/// STIX pattern keywords that are recognised and always refused
const UNSUPPORTED: [&str; 5] = ["FOLLOWEDBY", "REPEATS", "WITHIN", "START", "STOP"];

/// Evaluate a full condition, `"[" observation-expression "]"`
pub fn evaluate(
    condition: &str,
    context: &Context,
    case_id: Option<&str>,
    accessor: Option<&dyn CaseAccessor>,
) -> Result<bool> {
    let resolver = Resolver::new(context, case_id, accessor);
    let result = evaluate_observation_with(unwrap_condition(condition), &resolver)?;
    log::debug!("Condition '{}' evaluated to {}", condition.trim(), result);
    Ok(result)
}

/// Evaluate an observation expression
pub fn evaluate_observation(
    expr: &str,
    context: &Context,
    case_id: Option<&str>,
    accessor: Option<&dyn CaseAccessor>,
) -> Result<bool> {
    evaluate_observation_with(expr, &Resolver::new(context, case_id, accessor))
}

fn evaluate_observation_with(expr: &str, resolver: &Resolver<'_>) -> Result<bool> {
    // Every block is evaluated before reduction so errors are never masked
    let results = parse_observation(expr)?
        .into_iter()
        .map(|token| {
            token.try_map(|obs| match obs {
                Observation::Literal(b) => Ok(b),
                Observation::Comparison(block) => comparison::evaluate_with(&block, resolver),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    reduce(&results)
}

/// Strip the outer `[...]` of a condition when it wraps an observation expression.
///
/// A lone comparison block such as `[$$x$$ = 1]` or `[($$x$$ = 1 OR ...)]` is
/// left as is and evaluated as a one-block observation.
fn unwrap_condition(condition: &str) -> &str {
    let trimmed = condition.trim();
    let Some(inner) = trimmed.strip_prefix('[') else {
        return trimmed;
    };
    if block_end(trimmed) != Some(trimmed.len()) {
        return trimmed;
    }

    let inner = inner[..inner.len() - 1].trim();
    let head = inner.trim_start_matches(|c: char| c == '(' || c.is_whitespace());
    let wraps_observation = head.starts_with('[')
        || literal(head, "true").is_some()
        || literal(head, "false").is_some();
    if wraps_observation {
        inner
    } else {
        trimmed
    }
}

/// Split an observation expression into blocks, literals and connectives
pub fn parse_observation(expr: &str) -> Result<Vec<Token<Observation>>> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim();

    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix('(') {
            tokens.push(Token::LParen);
            rest = r;
        } else if let Some(r) = rest.strip_prefix(')') {
            tokens.push(Token::RParen);
            rest = r;
        } else if let Some(r) = literal(rest, "AND") {
            tokens.push(Token::And);
            rest = r;
        } else if let Some(r) = literal(rest, "OR") {
            tokens.push(Token::Or);
            rest = r;
        } else if let Some(r) = literal(rest, "true") {
            tokens.push(Token::Operand(Observation::Literal(true)));
            rest = r;
        } else if let Some(r) = literal(rest, "false") {
            tokens.push(Token::Operand(Observation::Literal(false)));
            rest = r;
        } else if rest.starts_with('[') {
            let end = block_end(rest)
                .ok_or_else(|| SyntaxError::InvalidObservation(rest.to_string()))?;
            let block = &rest[1..end - 1];
            tokens.push(Token::Operand(Observation::Comparison(block.to_string())));
            rest = &rest[end..];
        } else if let Some(keyword) = UNSUPPORTED.iter().find(|k| literal(rest, k).is_some()) {
            return Err(SyntaxError::UnsupportedConstruct(keyword.to_string()).into());
        } else {
            return Err(invalid_observation(rest));
        }
        rest = rest.trim_start();
    }

    Ok(tokens)
}

fn invalid_observation(rest: &str) -> ConditionError {
    SyntaxError::InvalidObservation(rest.to_string()).into()
}

/// Strip `word` when it is not glued to a following identifier
fn literal<'a>(input: &'a str, word: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

/// Byte position just past the `]` matching the `[` at the start of `input`.
///
/// Brackets inside single-quoted strings do not count.
fn block_end(input: &str) -> Option<usize> {
    let mut depth = 0usize;
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
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
