// SPDX-License-Identifier: MIT

//! Field-path navigation over JSON values
//!
//! Paths look like `artifacts[*].tags[0]`. Navigation is a best-effort
//! projection: a step that does not apply to a value (missing key, index out
//! of range, wrong type) drops that value instead of failing, so a missing
//! field yields an empty result.

use serde_json::Value;

/// One `name[idx]...` segment of a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Key to look up; empty means the value itself
    pub name: String,
    pub indices: Vec<Index>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Index {
    /// `[*]`
    All,
    /// `[n]`, negative counts from the end
    At(i64),
}

/// Parse a dotted path into steps, `None` when the syntax is malformed
pub fn parse_path(path: &str) -> Option<Vec<Step>> {
    path.split('.').map(parse_step).collect()
}

fn parse_step(step: &str) -> Option<Step> {
    let (name, mut rest) = match step.find('[') {
        Some(pos) => step.split_at(pos),
        None => (step, ""),
    };
    if name.contains(']') {
        return None;
    }

    let mut indices = Vec::new();
    while !rest.is_empty() {
        let close = rest.find(']')?;
        let inner = rest.get(1..close)?.trim();
        indices.push(match inner {
            "*" => Index::All,
            n => Index::At(n.parse().ok()?),
        });
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return None;
        }
    }

    Some(Step {
        name: name.to_string(),
        indices,
    })
}

/// Project `value` through `path`, returning every value reached
pub fn navigate(value: &Value, path: &str) -> Vec<Value> {
    if path.is_empty() {
        return vec![value.clone()];
    }

    let Some(steps) = parse_path(path) else {
        log::debug!("Dropping malformed field path '{}'", path);
        return Vec::new();
    };

    let mut active: Vec<&Value> = vec![value];
    for step in &steps {
        if !step.name.is_empty() {
            active = active
                .into_iter()
                .filter_map(|v| v.as_object().and_then(|o| o.get(&step.name)))
                .collect();
        }
        for index in &step.indices {
            active = apply_index(active, *index);
        }
    }

    active.into_iter().cloned().collect()
}

fn apply_index(active: Vec<&Value>, index: Index) -> Vec<&Value> {
    let arrays = active.into_iter().filter_map(Value::as_array);
    match index {
        Index::All => arrays.flatten().collect(),
        Index::At(n) => arrays
            .filter_map(|items| {
                let len = items.len() as i64;
                let pos = if n < 0 { len + n } else { n };
                if (0..len).contains(&pos) {
                    items.get(pos as usize)
                } else {
                    None
                }
            })
            .collect(),
    }
}
