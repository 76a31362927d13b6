//! In-memory case accessor backed by a YAML/JSON document
//!
//! ```yaml
//! cases:
//!   "~4096":
//!     case: { title: "Phishing", severity: 2 }
//!     observables:
//!       - { _id: "~8192", _createdAt: 1700000000000, tags: [auto_label_sender], data: "a@b.c" }
//!     analyzer_results:
//!       - analyzer: "MaxMind GeoIP"
//!         observable: "~8192"
//!         report: { full: { country: "FR" } }
//! ```

use super::CaseAccessor;
use crate::error::{CaseAccessError, ContextError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One case with its observables and analyzer reports
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CaseFixture {
    #[serde(default)]
    pub case: Value,
    #[serde(default)]
    pub observables: Vec<Value>,
    #[serde(default)]
    pub analyzer_results: Vec<AnalyzerResultFixture>,
}

/// Analyzer report attached to one observable
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzerResultFixture {
    /// Analyzer display name
    pub analyzer: String,
    pub analyzer_id: Option<String>,
    /// Observable `_id` or `data`
    pub observable: String,
    pub report: Value,
}

/// Case accessor serving cases from memory
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FixtureCaseAccessor {
    #[serde(default)]
    cases: HashMap<String, CaseFixture>,
}

impl FixtureCaseAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fixtures from a YAML or JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ContextError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse fixtures from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self, ContextError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Add or replace a case
    pub fn with_case(mut self, case_id: impl Into<String>, fixture: CaseFixture) -> Self {
        self.cases.insert(case_id.into(), fixture);
        self
    }

    fn fixture(&self, case_id: &str) -> Result<&CaseFixture, CaseAccessError> {
        self.cases
            .get(case_id)
            .ok_or_else(|| CaseAccessError::not_found("case", case_id))
    }
}

fn has_tag(observable: &Value, label: &str) -> bool {
    observable
        .get("tags")
        .and_then(Value::as_array)
        .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(label)))
}

fn observable_matches(observable: &Value, key: &str) -> bool {
    ["_id", "data"]
        .iter()
        .any(|field| observable.get(*field).and_then(Value::as_str) == Some(key))
}

impl CaseAccessor for FixtureCaseAccessor {
    fn get_case(&self, case_id: &str) -> Result<Value, CaseAccessError> {
        Ok(self.fixture(case_id)?.case.clone())
    }

    fn get_observable_by_case_and_artifact(
        &self,
        case_id: &str,
        artifact_label: &str,
    ) -> Result<Vec<Value>, CaseAccessError> {
        Ok(self
            .fixture(case_id)?
            .observables
            .iter()
            .filter(|o| has_tag(o, artifact_label))
            .cloned()
            .collect())
    }

    fn get_case_analyzer_result(
        &self,
        case_id: &str,
        analyzer: &str,
        observable: &str,
    ) -> Result<Value, CaseAccessError> {
        let fixture = self.fixture(case_id)?;

        // An observable may be named by its data as well as by its id
        let ids: Vec<&str> = fixture
            .observables
            .iter()
            .filter(|o| observable_matches(o, observable))
            .filter_map(|o| o.get("_id").and_then(Value::as_str))
            .collect();

        fixture
            .analyzer_results
            .iter()
            .find(|r| {
                (r.analyzer == analyzer || r.analyzer_id.as_deref() == Some(analyzer))
                    && (r.observable == observable || ids.contains(&r.observable.as_str()))
            })
            .map(|r| r.report.clone())
            .ok_or_else(|| {
                CaseAccessError::not_found("analyzer result", format!("{}/{}", analyzer, observable))
            })
    }
}
