// SPDX-License-Identifier: MIT

//! Playbook variable context
//!
//! This module provides:
//! - `VariableType` - the CACAO variable types a context may declare
//! - `Variable` - one typed variable record
//! - `Context` - the read-only variable map handed to the evaluator

mod schema;
mod store;

pub use schema::{Variable, VariableType};
pub use store::Context;
