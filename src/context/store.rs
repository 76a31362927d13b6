// SPDX-License-Identifier: MIT

//! Variable storage handed to the evaluator

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::schema::{Variable, VariableType};
use crate::error::ContextError;

/// Mapping from `$$name$$` to a typed variable record
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Context {
    variables: HashMap<String, Variable>,
}

impl Context {
    /// Create an empty Context
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a context from a YAML or JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ContextError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a context from a YAML string (JSON is accepted as well)
    pub fn parse_yaml(content: &str) -> Result<Self, ContextError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build a context from a JSON value
    pub fn from_json(value: Value) -> Result<Self, ContextError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Insert or replace a variable
    pub fn insert(&mut self, name: impl Into<String>, var_type: VariableType, value: Value) {
        self.variables
            .insert(name.into(), Variable::new(var_type, value));
    }

    /// Chained form of [`Context::insert`]
    pub fn with(mut self, name: impl Into<String>, var_type: VariableType, value: Value) -> Self {
        self.insert(name, var_type, value);
        self
    }

    /// Look up a variable by its full `$$name$$` key
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Verify names and that every value fits its declared type
    pub fn check(&self) -> Result<(), ContextError> {
        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();

        for name in names {
            if !is_variable_name(name) {
                return Err(ContextError::InvalidName(name.clone()));
            }
            let var = &self.variables[name];
            if !var.var_type.accepts(&var.var_value) {
                return Err(ContextError::TypeMismatch {
                    name: name.clone(),
                    var_type: var.var_type.to_string(),
                    value: var.var_value.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn is_variable_name(name: &str) -> bool {
    name.len() > 4 && name.starts_with("$$") && name.ends_with("$$")
}
