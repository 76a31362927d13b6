// SPDX-License-Identifier: MIT

//! Evaluation of CACAO/STIX playbook conditions.
//!
//! A condition is checked against a [`Context`] of playbook variables and,
//! optionally, a case from a case management system reached through a
//! [`CaseAccessor`].

pub mod case;
pub mod condition;
pub mod context;
pub mod error;

pub use case::{CaseAccessor, FixtureCaseAccessor};
pub use condition::{
    evaluate, evaluate_comparison, evaluate_observation, navigate, resolve_variable,
    validate_condition,
};
pub use context::{Context, Variable, VariableType};
pub use error::{ConditionError, Result};
