// SPDX-License-Identifier: MIT

//! Condition evaluation for playbook steps
//!
//! This module provides validation and evaluation of CACAO/STIX-style
//! conditions. Conditions are observation expressions like:
//! - `[[$$count$$ > 2] AND [$$count$$ < 10]]`
//! - `[[hive-case-field:severity >= 3] OR [hive-case-observable:src_ip.data LIKE '10.%']]`
//! - `[[NOT EXISTS $$override$$:] AND ([$$tlp$$ IN (2, 3)] OR true)]`

mod ast;
mod comparison;
mod constant;
mod observation;
mod path;
mod reduce;
mod resolver;
mod validator;

pub use ast::{CompareOp, Comparison, Constant, Observation, Token};
pub use comparison::{evaluate_comparison, parse_comparison};
pub use constant::{coerce_constant, coerce_list, TIMESTAMP_FORMAT};
pub use observation::{evaluate, evaluate_observation, parse_observation};
pub use path::{navigate, parse_path, Index, Step};
pub use reduce::reduce;
pub use resolver::{resolve_variable, Resolver, AUTO_LABEL_PREFIX};
pub use validator::validate_condition;
