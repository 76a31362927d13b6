// SPDX-License-Identifier: MIT

//! Typed error handling for cacao-conditions
//!
//! Every failure the evaluator can report is a variant of [`ConditionError`].
//! The nested enums group failures by the stage that produced them so callers
//! can match on a whole family (`ConditionError::Syntax(_)`) or a single case.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = ConditionError> = std::result::Result<T, E>;

/// Top-level error type for condition evaluation
#[derive(Debug, Error)]
pub enum ConditionError {
    /// A case-scoped variable was used without a case id or case accessor
    #[error("Variable '{variable}' needs a case id and a case accessor")]
    MissingContext { variable: String },

    /// Variable could not be resolved
    #[error("Variable resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Malformed condition, observation or comparison expression
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// A constant matches none of the typed literal forms
    #[error("Invalid constant '{constant}': {reason}")]
    InvalidConstant { constant: String, reason: String },

    /// Operator outside the supported set
    #[error("Invalid comparison operator: {0}")]
    UnsupportedOperator(String),

    /// Failure reported by the case accessor
    #[error(transparent)]
    CaseAccess(#[from] CaseAccessError),

    /// Context loading or type checking failure
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

/// Variable resolution errors
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Unknown variable namespace or malformed reference
    #[error("invalid variable: {0}")]
    InvalidVariable(String),

    /// No observable carries the auto label
    #[error("observable with label '{label}' not found in case '{case_id}'")]
    ObservableNotFound { case_id: String, label: String },

    /// Namespace is recognised but never supported
    #[error("unsupported variable namespace: {0}")]
    Unsupported(String),

    /// `hive-analyzer-result` reference without analyzer and target tokens
    #[error("invalid analyzer result reference: {0}")]
    InvalidAnalyzerReference(String),
}

/// Expression syntax errors
#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("invalid comparison expression: {0}")]
    InvalidComparison(String),

    #[error("invalid observation expression: {0}")]
    InvalidObservation(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// STIX constructs that are never evaluated (FOLLOWEDBY, REPEATS, ...)
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// Operators and operands that do not form a boolean expression
    #[error("unbalanced expression: {0}")]
    UnbalancedTokens(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors raised by a [`CaseAccessor`](crate::case::CaseAccessor)
#[derive(Debug, Error)]
pub enum CaseAccessError {
    /// Requested entity does not exist
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// Backend failure (transport, decoding, permissions)
    #[error("Case backend error: {0}")]
    Backend(String),
}

/// Context loading and type checking errors
#[derive(Debug, Error)]
pub enum ContextError {
    /// Variable names must look like `$$name$$`
    #[error("invalid variable name '{0}', expected $$name$$")]
    InvalidName(String),

    /// Value does not fit the declared `var_type`
    #[error("variable '{name}' is declared as {var_type} but holds {value}")]
    TypeMismatch {
        name: String,
        var_type: String,
        value: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ConditionError {
    /// Create a missing context error
    pub fn missing_context(variable: impl Into<String>) -> Self {
        Self::MissingContext {
            variable: variable.into(),
        }
    }

    /// Create an invalid constant error
    pub fn invalid_constant(constant: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConstant {
            constant: constant.into(),
            reason: reason.into(),
        }
    }
}

impl CaseAccessError {
    /// Create a not found error
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}
