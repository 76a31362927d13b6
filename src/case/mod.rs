// SPDX-License-Identifier: MIT

//! Case management access
//!
//! The evaluator never talks to a case management system directly. Anything
//! that can hand back cases, observables and analyzer reports as JSON can be
//! plugged in through [`CaseAccessor`].

mod fixture;

pub use fixture::{AnalyzerResultFixture, CaseFixture, FixtureCaseAccessor};

use crate::error::CaseAccessError;
use serde_json::Value;

/// Read access to cases, observables and analyzer results.
///
/// Calls are blocking from the evaluator's point of view. Errors are passed
/// through to the caller of `evaluate` unchanged.
pub trait CaseAccessor: Send + Sync {
    /// Returns the case document
    fn get_case(&self, case_id: &str) -> Result<Value, CaseAccessError>;

    /// Returns every observable of the case carrying `artifact_label` as a tag.
    ///
    /// Each observable has at least `_id`, `_createdAt` and `tags`.
    fn get_observable_by_case_and_artifact(
        &self,
        case_id: &str,
        artifact_label: &str,
    ) -> Result<Vec<Value>, CaseAccessError>;

    /// Returns the report of an analyzer run on an observable
    fn get_case_analyzer_result(
        &self,
        case_id: &str,
        analyzer: &str,
        observable: &str,
    ) -> Result<Value, CaseAccessError>;
}
