// SPDX-License-Identifier: MIT

//! Variable resolution
//!
//! A variable reference names a namespace and a path inside it:
//! - `$$name$$` / `$$name$$:field.path` - playbook context variables
//! - `hive-case-field:path` - fields of the current case
//! - `hive-case-observable:label.path` - newest observable tagged `auto_label_<label>`
//! - `hive-analyzer-result:analyzer.target.path` - analyzer report for an observable
//!
//! Resolution always yields a list of values; comparisons hold when any of
//! them matches.

use serde_json::Value;

use super::path::navigate;
use crate::case::CaseAccessor;
use crate::context::{Context, VariableType};
use crate::error::{ConditionError, ResolutionError, Result};

/// Tag prefix identifying observables created for a playbook label
pub const AUTO_LABEL_PREFIX: &str = "auto_label_";

/// Resolves variable references against a context and an optional case
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    context: &'a Context,
    case_id: Option<&'a str>,
    accessor: Option<&'a dyn CaseAccessor>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        context: &'a Context,
        case_id: Option<&'a str>,
        accessor: Option<&'a dyn CaseAccessor>,
    ) -> Self {
        Self {
            context,
            case_id,
            accessor,
        }
    }

    /// Resolve a variable reference to the values it designates
    pub fn resolve(&self, variable: &str) -> Result<Vec<Value>> {
        let values = if variable.starts_with("$$") {
            self.resolve_context(variable)?
        } else {
            let (namespace, rest) = variable
                .split_once(':')
                .ok_or_else(|| ResolutionError::InvalidVariable(variable.to_string()))?;

            match namespace {
                "hive-case-field" => self.resolve_case_field(variable, rest)?,
                "hive-case-observable" => self.resolve_observable(variable, rest)?,
                "hive-analyzer-result" => self.resolve_analyzer_result(variable, rest)?,
                "cortex-responder-result" => {
                    return Err(ResolutionError::Unsupported(variable.to_string()).into())
                }
                _ => return Err(ResolutionError::InvalidVariable(variable.to_string()).into()),
            }
        };

        log::debug!("Resolved '{}' to {} value(s)", variable, values.len());
        Ok(values)
    }

    fn resolve_context(&self, variable: &str) -> Result<Vec<Value>> {
        let end = variable[2..]
            .find("$$")
            .map(|pos| pos + 4)
            .ok_or_else(|| ResolutionError::InvalidVariable(variable.to_string()))?;
        let (name, rest) = variable.split_at(end);

        let field = match rest {
            "" => None,
            r => Some(
                r.strip_prefix(':')
                    .ok_or_else(|| ResolutionError::InvalidVariable(variable.to_string()))?,
            ),
        };

        let Some(var) = self.context.get(name) else {
            return Ok(Vec::new());
        };

        match (var.var_type, field) {
            (VariableType::Dictionary, Some(path)) => Ok(navigate(&var.var_value, path)),
            _ => Ok(vec![var.var_value.clone()]),
        }
    }

    fn case(&self, variable: &str) -> Result<(&'a str, &'a dyn CaseAccessor)> {
        match (self.case_id, self.accessor) {
            (Some(id), Some(accessor)) => Ok((id, accessor)),
            _ => Err(ConditionError::missing_context(variable)),
        }
    }

    fn resolve_case_field(&self, variable: &str, path: &str) -> Result<Vec<Value>> {
        let (case_id, accessor) = self.case(variable)?;
        let case = accessor.get_case(case_id)?;
        Ok(navigate(&case, path))
    }

    fn resolve_observable(&self, variable: &str, rest: &str) -> Result<Vec<Value>> {
        let (case_id, accessor) = self.case(variable)?;
        let (label, path) = rest.split_once('.').unwrap_or((rest, ""));
        let observable = latest_observable(accessor, case_id, label)?;
        Ok(navigate(&observable, path))
    }

    fn resolve_analyzer_result(&self, variable: &str, rest: &str) -> Result<Vec<Value>> {
        let (case_id, accessor) = self.case(variable)?;

        let (analyzer, target, path) = split_analyzer_reference(rest)
            .ok_or_else(|| ResolutionError::InvalidAnalyzerReference(variable.to_string()))?;
        let analyzer = unescape_token(analyzer);
        let target = unescape_token(target);

        let observable_id = match latest_observable(accessor, case_id, &target) {
            Ok(observable) => observable
                .get("_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| target.clone()),
            Err(e) => {
                log::warn!(
                    "No observable for analyzer target '{}', using it as an id: {}",
                    target,
                    e
                );
                target.clone()
            }
        };

        let report = accessor.get_case_analyzer_result(case_id, &analyzer, &observable_id)?;
        Ok(navigate(&report, path))
    }
}

/// Resolve a variable reference to the values it designates
pub fn resolve_variable(
    variable: &str,
    context: &Context,
    case_id: Option<&str>,
    accessor: Option<&dyn CaseAccessor>,
) -> Result<Vec<Value>> {
    Resolver::new(context, case_id, accessor).resolve(variable)
}

/// Most recently created observable tagged with the auto label for `label`
fn latest_observable(accessor: &dyn CaseAccessor, case_id: &str, label: &str) -> Result<Value> {
    let tag = format!("{}{}", AUTO_LABEL_PREFIX, label);
    let observables = accessor.get_observable_by_case_and_artifact(case_id, &tag)?;

    observables
        .into_iter()
        .max_by(|a, b| created_at(a).total_cmp(&created_at(b)))
        .ok_or_else(|| {
            ResolutionError::ObservableNotFound {
                case_id: case_id.to_string(),
                label: tag,
            }
            .into()
        })
}

fn created_at(observable: &Value) -> f64 {
    observable
        .get("_createdAt")
        .and_then(Value::as_f64)
        .unwrap_or(f64::NEG_INFINITY)
}

/// Split `analyzer.target[.path]` on the first two unescaped dots
fn split_analyzer_reference(rest: &str) -> Option<(&str, &str, &str)> {
    let mut dots = Vec::with_capacity(2);
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '.' {
            dots.push(i);
            if dots.len() == 2 {
                break;
            }
        }
    }

    match dots.as_slice() {
        [first] => Some((&rest[..*first], &rest[first + 1..], "")),
        [first, second] => Some((
            &rest[..*first],
            &rest[first + 1..*second],
            &rest[second + 1..],
        )),
        _ => None,
    }
}

/// `_` stands for a space and `\x` for a literal `x`
fn unescape_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '_' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}
