//! Structural check of a condition string
//!
//! This is a cheap linter for input forms, not a grammar check: it accepts
//! `[[...] AND ([...] OR true)]` shapes, where operands are blocks or the
//! `true`/`false` literals and parentheses must balance. Brackets inside
//! quoted strings are counted like any other. A condition that passes can
//! still fail evaluation.

use crate::error::{Result, SyntaxError};

const PLACEHOLDER: &str = "OBSERVATION_EXPRESSION";

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Expression,
    SpaceBeforeOperator,
    Operator,
    SpaceAfterOperator,
}

/// Check the overall shape of a condition, failing on malformed input
pub fn validate_condition(condition: &str) -> Result<()> {
    let inner = condition
        .strip_prefix('[')
        .and_then(|c| c.strip_suffix(']'))
        .ok_or_else(|| invalid(condition, "must be wrapped in [...]"))?;

    let shape = substitute_blocks(inner).ok_or_else(|| invalid(condition, "unbalanced brackets"))?;

    let mut state = State::Expression;
    let mut depth = 0usize;
    let mut rest = shape.as_str();
    while !rest.is_empty() {
        let (next, r) = match state {
            State::Expression => {
                let opened = rest.trim_start_matches('(');
                depth += rest.len() - opened.len();
                rest = opened;
                (State::SpaceBeforeOperator, operand(rest))
            }
            State::SpaceBeforeOperator => {
                let closed = rest.trim_start_matches(')');
                depth = depth
                    .checked_sub(rest.len() - closed.len())
                    .ok_or_else(|| invalid(condition, "unbalanced parentheses"))?;
                rest = closed;
                if rest.is_empty() {
                    break;
                }
                (State::Operator, rest.strip_prefix(' '))
            }
            State::Operator => (
                State::SpaceAfterOperator,
                rest.strip_prefix("AND").or_else(|| rest.strip_prefix("OR")),
            ),
            State::SpaceAfterOperator => (State::Expression, rest.strip_prefix(' ')),
        };
        rest = r.ok_or_else(|| invalid(condition, &format!("unexpected '{}'", rest)))?;
        state = next;
    }

    if state != State::SpaceBeforeOperator {
        return Err(invalid(condition, "must end with a bracketed expression"));
    }
    if depth != 0 {
        return Err(invalid(condition, "unbalanced parentheses"));
    }
    Ok(())
}

/// Strip one placeholder or boolean literal
fn operand(input: &str) -> Option<&str> {
    [PLACEHOLDER, "true", "false"]
        .iter()
        .find_map(|word| input.strip_prefix(word))
}

/// Replace every top-level `[...]` span with the placeholder
fn substitute_blocks(inner: &str) -> Option<String> {
    let mut out = String::with_capacity(inner.len());
    let mut depth = 0usize;

    for c in inner.chars() {
        match c {
            '[' => {
                if depth == 0 {
                    out.push_str(PLACEHOLDER);
                }
                depth += 1;
            }
            ']' => depth = depth.checked_sub(1)?,
            other if depth == 0 => out.push(other),
            _ => {}
        }
    }

    (depth == 0).then_some(out)
}

fn invalid(condition: &str, reason: &str) -> crate::error::ConditionError {
    SyntaxError::InvalidCondition(format!("{} ({})", condition, reason)).into()
}
