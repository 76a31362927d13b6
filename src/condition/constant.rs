// SPDX-License-Identifier: MIT

//! Typed constant coercion
//!
//! Constants are tried against each literal form in a fixed order and the
//! first form that matches decides the type:
//! `true`/`false`, `b'base64'`, `h'hex'`, integer, float, `'string'`,
//! `t'timestamp'`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::Constant;
use crate::error::{ConditionError, Result};

static FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("valid regex"));

/// Timestamp layout used by `t'...'` literals
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Coerce the literal text of a constant to its typed value
pub fn coerce_constant(text: &str) -> Result<Constant> {
    if text.eq_ignore_ascii_case("true") {
        return Ok(Constant::Bool(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(Constant::Bool(false));
    }

    if let Some(encoded) = quoted(text, "b'") {
        return BASE64
            .decode(encoded)
            .map(Constant::Bytes)
            .map_err(|e| ConditionError::invalid_constant(text, e.to_string()));
    }

    if let Some(encoded) = quoted(text, "h'") {
        return hex::decode(encoded)
            .map(Constant::Bytes)
            .map_err(|e| ConditionError::invalid_constant(text, e.to_string()));
    }

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        // Out of range integers fall through to the remaining forms
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Constant::Int(n));
        }
    }

    if FLOAT.is_match(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Ok(Constant::Float(f));
        }
    }

    if let Some(body) = quoted(text, "'") {
        return Ok(Constant::String(unescape(body)));
    }

    if let Some(stamp) = quoted(text, "t'") {
        return NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .map(Constant::Timestamp)
            .map_err(|e| ConditionError::invalid_constant(text, e.to_string()));
    }

    Err(ConditionError::invalid_constant(
        text,
        "not a boolean, bytes, number, string or timestamp literal",
    ))
}

/// Coerce each element of a parenthesized `(a, b, c)` list
pub fn coerce_list(text: &str) -> Result<Constant> {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| ConditionError::invalid_constant(text, "expected a parenthesized list"))?;

    if inner.trim().is_empty() {
        return Ok(Constant::List(Vec::new()));
    }

    split_list(inner)
        .into_iter()
        .map(|item| coerce_constant(item.trim()))
        .collect::<Result<Vec<_>>>()
        .map(Constant::List)
}

/// Body of `prefix...'`, if `text` has that shape
fn quoted<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)?.strip_suffix('\'')
}

/// `\\` becomes `\`, then `\'` becomes `'`
fn unescape(body: &str) -> String {
    body.replace("\\\\", "\\").replace("\\'", "'")
}

/// Split on commas that sit outside single-quoted strings
fn split_list(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '\'' => in_string = !in_string,
            ',' if !in_string => {
                items.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&inner[start..]);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_booleans_case_insensitive() {
        assert_eq!(coerce_constant("true").unwrap(), Constant::Bool(true));
        assert_eq!(coerce_constant("FALSE").unwrap(), Constant::Bool(false));
        assert_eq!(coerce_constant("True").unwrap(), Constant::Bool(true));
    }

    #[test]
    fn test_bytes() {
        assert_eq!(
            coerce_constant("b'aGVsbG8='").unwrap(),
            Constant::Bytes(b"hello".to_vec())
        );
        assert_eq!(
            coerce_constant("h'deadbeef'").unwrap(),
            Constant::Bytes(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert!(coerce_constant("h'xyz'").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce_constant("42").unwrap(), Constant::Int(42));
        assert_eq!(coerce_constant("4.25").unwrap(), Constant::Float(4.25));
        assert!(coerce_constant("-1").is_err());
        assert!(coerce_constant("1e5").is_err());
    }

    #[test]
    fn test_huge_integer_falls_through() {
        let err = coerce_constant("99999999999999999999999").unwrap_err();
        assert!(matches!(err, ConditionError::InvalidConstant { .. }));
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            coerce_constant("'5'").unwrap(),
            Constant::String("5".to_string())
        );
        assert_eq!(
            coerce_constant(r"'it\'s'").unwrap(),
            Constant::String("it's".to_string())
        );
        assert_eq!(
            coerce_constant(r"'C:\\temp'").unwrap(),
            Constant::String(r"C:\temp".to_string())
        );
        assert_eq!(coerce_constant("''").unwrap(), Constant::String(String::new()));
        assert!(coerce_constant("'").is_err());
    }

    #[test]
    fn test_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 0, 250)
            .unwrap();
        assert_eq!(
            coerce_constant("t'2023-05-01T12:30:00.250Z'").unwrap(),
            Constant::Timestamp(expected)
        );
        assert!(coerce_constant("t'yesterday'").is_err());
    }

    #[test]
    fn test_unknown_form() {
        assert!(matches!(
            coerce_constant("bare_word"),
            Err(ConditionError::InvalidConstant { .. })
        ));
    }

    #[test]
    fn test_list() {
        assert_eq!(
            coerce_list("(1, 'a,b', true)").unwrap(),
            Constant::List(vec![
                Constant::Int(1),
                Constant::String("a,b".to_string()),
                Constant::Bool(true),
            ])
        );
        assert_eq!(coerce_list("()").unwrap(), Constant::List(vec![]));
        assert!(coerce_list("(1, nope)").is_err());
        assert!(coerce_list("1, 2").is_err());
    }
}
