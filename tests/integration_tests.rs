//! Integration tests for condition evaluation
//!
//! These tests exercise the public API end to end using mock case accessors.

use cacao_conditions::case::CaseAccessor;
use cacao_conditions::condition::{evaluate, resolve_variable, validate_condition};
use cacao_conditions::error::{CaseAccessError, ConditionError, ResolutionError, SyntaxError};
use cacao_conditions::{Context, FixtureCaseAccessor, VariableType};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Mock Components
// ============================================================================

/// Mock accessor serving one case and counting backend calls
struct MockAccessor {
    case: Value,
    observables: Vec<Value>,
    report: Value,
    calls: AtomicUsize,
}

impl MockAccessor {
    fn new() -> Self {
        Self {
            case: json!({
                "title": "Suspicious login",
                "severity": 3,
                "tags": ["login", "vpn"],
                "customFields": {"country": {"string": "FR"}}
            }),
            observables: vec![
                json!({"_id": "~100", "_createdAt": 1000, "data": "10.1.1.1", "tags": ["auto_label_src"]}),
                json!({"_id": "~101", "_createdAt": 2000, "data": "10.2.2.2", "tags": ["auto_label_src"]}),
            ],
            report: json!({"summary": {"taxonomies": [{"level": "malicious"}, {"level": "info"}]}}),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CaseAccessor for MockAccessor {
    fn get_case(&self, case_id: &str) -> Result<Value, CaseAccessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if case_id == "~1" {
            Ok(self.case.clone())
        } else {
            Err(CaseAccessError::not_found("case", case_id))
        }
    }

    fn get_observable_by_case_and_artifact(
        &self,
        _case_id: &str,
        artifact_label: &str,
    ) -> Result<Vec<Value>, CaseAccessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .observables
            .iter()
            .filter(|o| o["tags"].as_array().unwrap().contains(&json!(artifact_label)))
            .cloned()
            .collect())
    }

    fn get_case_analyzer_result(
        &self,
        _case_id: &str,
        analyzer: &str,
        observable: &str,
    ) -> Result<Value, CaseAccessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if analyzer == "VirusTotal GetReport" && observable == "~101" {
            Ok(self.report.clone())
        } else {
            Err(CaseAccessError::not_found("analyzer result", analyzer))
        }
    }
}

/// Accessor whose backend is always down
struct FailingAccessor;

impl CaseAccessor for FailingAccessor {
    fn get_case(&self, _case_id: &str) -> Result<Value, CaseAccessError> {
        Err(CaseAccessError::Backend("connection refused".to_string()))
    }

    fn get_observable_by_case_and_artifact(
        &self,
        _case_id: &str,
        _artifact_label: &str,
    ) -> Result<Vec<Value>, CaseAccessError> {
        Err(CaseAccessError::Backend("connection refused".to_string()))
    }

    fn get_case_analyzer_result(
        &self,
        _case_id: &str,
        _analyzer: &str,
        _observable: &str,
    ) -> Result<Value, CaseAccessError> {
        Err(CaseAccessError::Backend("connection refused".to_string()))
    }
}

fn context() -> Context {
    Context::new()
        .with("$$count$$", VariableType::Integer, json!(3))
        .with("$$name$$", VariableType::String, json!("5"))
        .with(
            "$$host$$",
            VariableType::Dictionary,
            json!({"a": [{"b": 1}, {"b": 2}], "ip": "50.2.3"}),
        )
}

// ============================================================================
// Context Variable Tests
// ============================================================================

#[test]
fn test_resolve_context_variable() {
    let ctx = Context::new().with("$$x$$", VariableType::Integer, json!(5));
    assert_eq!(resolve_variable("$$x$$", &ctx, None, None).unwrap(), vec![json!(5)]);
    assert!(resolve_variable("$$x$$", &Context::new(), None, None)
        .unwrap()
        .is_empty());
}

#[test]
fn test_field_path_projection() {
    let ctx = context();
    assert_eq!(
        resolve_variable("$$host$$:a[*].b", &ctx, None, None).unwrap(),
        vec![json!(1), json!(2)]
    );
    assert_eq!(
        resolve_variable("$$host$$:a[0].b", &ctx, None, None).unwrap(),
        vec![json!(1)]
    );
    assert!(resolve_variable("$$host$$:a[5].b", &ctx, None, None)
        .unwrap()
        .is_empty());
}

#[test]
fn test_count_bounds_scenario() {
    let ctx = context();
    assert!(evaluate("[[$$count$$:. > 2] AND [$$count$$:. < 10]]", &ctx, None, None).unwrap());
    assert!(!evaluate("[[$$count$$:. > 5] AND [$$count$$:. < 10]]", &ctx, None, None).unwrap());
    assert!(!evaluate("[[$$count$$:. > 2] AND [$$count$$:. < 1]]", &ctx, None, None).unwrap());
}

#[test]
fn test_type_sensitive_coercion() {
    let ctx = context();
    assert!(evaluate("[[$$count$$ = 3]]", &ctx, None, None).unwrap());
    assert!(!evaluate("[[$$name$$ = 5]]", &ctx, None, None).unwrap());
    assert!(evaluate("[[$$name$$ = '5']]", &ctx, None, None).unwrap());
}

#[test]
fn test_not_exists_absent_variable() {
    let ctx = context();
    assert!(evaluate("[[NOT EXISTS $$y$$:]]", &ctx, None, None).unwrap());
    assert!(evaluate("[[EXISTS $$host$$:ip]]", &ctx, None, None).unwrap());
}

#[test]
fn test_exists_on_bare_context_variable_is_refused() {
    let ctx = context();
    let result = evaluate("[[EXISTS $$count$$]]", &ctx, None, None);
    assert!(matches!(
        result,
        Err(ConditionError::Syntax(SyntaxError::InvalidComparison(_)))
    ));
}

#[test]
fn test_context_from_json() {
    let ctx = Context::from_json(json!({
        "$$user$$": {"type": "dictionary", "value": {"login": "admin", "mfa": true}},
        "$$attempts$$": {"type": "integer", "value": 7}
    }))
    .unwrap();
    ctx.check().unwrap();

    assert!(evaluate(
        "[[$$user$$:login MATCHES 'adm(?=in)'] AND [$$user$$:mfa = 1] AND [$$attempts$$ >= 5]]",
        &ctx,
        None,
        None
    )
    .unwrap());
    assert!(!evaluate("[[$$user$$:login MATCHES 'adm(?!in)']]", &ctx, None, None).unwrap());
}

#[test]
fn test_single_block_with_grouped_comparison() {
    let ctx = context();
    for condition in [
        "[($$count$$ = 1 OR $$count$$ = 3)]",
        "[$$count$$ = 1 OR $$count$$ = 3]",
        "[[($$count$$ = 1 OR $$count$$ = 3)]]",
    ] {
        assert!(evaluate(condition, &ctx, None, None).unwrap(), "{}", condition);
    }
}

#[test]
fn test_like_anchoring() {
    let ctx = context();
    assert!(evaluate("[[$$host$$:ip LIKE '50%']]", &ctx, None, None).unwrap());
    let ctx = ctx.with(
        "$$host$$",
        VariableType::Dictionary,
        json!({"ip": "150.2.3"}),
    );
    assert!(!evaluate("[[$$host$$:ip LIKE '50%']]", &ctx, None, None).unwrap());
}

#[test]
fn test_boolean_precedence() {
    let ctx = context();
    // a=T, b=F, c=T: (a AND b) OR c
    assert!(evaluate(
        "[[$$count$$ = 3] AND [$$count$$ = 0] OR [$$count$$ > 0]]",
        &ctx,
        None,
        None
    )
    .unwrap());
    // a=F, b=T, c=T: a OR (b AND c)
    assert!(evaluate(
        "[[$$count$$ = 0] OR ([$$count$$ = 3] AND [$$count$$ > 0])]",
        &ctx,
        None,
        None
    )
    .unwrap());
    // a=F, b=F, c=T
    assert!(!evaluate(
        "[[$$count$$ = 0] OR ([$$count$$ = 1] AND [$$count$$ > 0])]",
        &ctx,
        None,
        None
    )
    .unwrap());
}

#[test]
fn test_comparison_level_connectives() {
    let ctx = context();
    assert!(evaluate(
        "[[$$count$$ = 1 OR ($$count$$ = 3 AND $$name$$ IN ('4', '5'))]]",
        &ctx,
        None,
        None
    )
    .unwrap());
}

// ============================================================================
// Case Accessor Tests
// ============================================================================

#[test]
fn test_case_fields() {
    let ctx = context();
    let acc = MockAccessor::new();
    assert!(evaluate(
        "[[hive-case-field:severity >= 3] AND [hive-case-field:tags[*] = 'vpn']]",
        &ctx,
        Some("~1"),
        Some(&acc)
    )
    .unwrap());
    assert!(evaluate(
        "[[hive-case-field:customFields.country.string = 'FR']]",
        &ctx,
        Some("~1"),
        Some(&acc)
    )
    .unwrap());
    assert_eq!(acc.calls(), 3);
}

#[test]
fn test_case_accessor_errors_propagate() {
    let ctx = context();
    let acc = MockAccessor::new();
    assert!(matches!(
        evaluate("[[hive-case-field:title = 'x']]", &ctx, Some("~2"), Some(&acc)),
        Err(ConditionError::CaseAccess(CaseAccessError::NotFound { .. }))
    ));

    assert!(matches!(
        evaluate(
            "[[hive-case-field:title = 'x']]",
            &ctx,
            Some("~1"),
            Some(&FailingAccessor)
        ),
        Err(ConditionError::CaseAccess(CaseAccessError::Backend(_)))
    ));
}

#[test]
fn test_missing_case_context() {
    let ctx = context();
    assert!(matches!(
        evaluate("[[hive-case-field:title = 'x']]", &ctx, None, None),
        Err(ConditionError::MissingContext { .. })
    ));
}

#[test]
fn test_newest_observable() {
    let ctx = context();
    let acc = MockAccessor::new();
    assert!(evaluate(
        "[[hive-case-observable:src.data = '10.2.2.2']]",
        &ctx,
        Some("~1"),
        Some(&acc)
    )
    .unwrap());
    assert!(matches!(
        evaluate(
            "[[hive-case-observable:dst.data = '10.2.2.2']]",
            &ctx,
            Some("~1"),
            Some(&acc)
        ),
        Err(ConditionError::Resolution(
            ResolutionError::ObservableNotFound { .. }
        ))
    ));
}

#[test]
fn test_analyzer_result() {
    let ctx = context();
    let acc = MockAccessor::new();
    assert!(evaluate(
        "[[hive-analyzer-result:VirusTotal_GetReport.src.summary.taxonomies[*].level = 'malicious']]",
        &ctx,
        Some("~1"),
        Some(&acc)
    )
    .unwrap());
}

#[test]
fn test_analyzer_target_lookup_failure_is_swallowed() {
    let ctx = context();
    let acc = MockAccessor::new();
    // Target `~101` has no auto label, so it is used as the observable id
    assert!(evaluate(
        "[[hive-analyzer-result:VirusTotal_GetReport.~101.summary.taxonomies[0].level = 'malicious']]",
        &ctx,
        Some("~1"),
        Some(&acc)
    )
    .unwrap());
}

#[test]
fn test_fixture_accessor_end_to_end() {
    let acc = FixtureCaseAccessor::parse_yaml(
        r#"
cases:
  "~7":
    case:
      status: Open
    observables:
      - _id: "~70"
        _createdAt: 5
        data: evil.example
        tags: [auto_label_domain]
"#,
    )
    .unwrap();
    let ctx = Context::new();
    assert!(evaluate(
        "[[hive-case-field:status = 'Open'] AND [hive-case-observable:domain.data MATCHES '.*\\.example']]",
        &ctx,
        Some("~7"),
        Some(&acc)
    )
    .unwrap());
}

#[test]
fn test_shared_across_threads() {
    let ctx = Arc::new(context());
    let acc = Arc::new(MockAccessor::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let acc = Arc::clone(&acc);
            std::thread::spawn(move || {
                evaluate(
                    "[[hive-case-field:severity = 3] AND [$$count$$ = 3]]",
                    &ctx,
                    Some("~1"),
                    Some(acc.as_ref()),
                )
                .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(acc.calls(), 4);
}

// ============================================================================
// Unsupported Constructs and Validation
// ============================================================================

#[test]
fn test_unsupported_constructs_raise() {
    let ctx = context();
    assert!(matches!(
        evaluate("[[$$count$$ = 3] FOLLOWEDBY [$$count$$ = 4]]", &ctx, None, None),
        Err(ConditionError::Syntax(SyntaxError::UnsupportedConstruct(_)))
    ));
    assert!(matches!(
        evaluate("[[cortex-responder-result:x = 1]]", &ctx, None, None),
        Err(ConditionError::Resolution(ResolutionError::Unsupported(_)))
    ));
}

#[test]
fn test_validator_accepts_what_evaluator_accepts() {
    let ctx = context();
    for condition in [
        "[[$$count$$ > 2]]",
        "[[$$count$$ > 2] AND [$$name$$ = '5']]",
        "[[$$count$$ > 2] OR [$$name$$ = '4'] AND [$$host$$:a[*].b IN (1, 2)]]",
        "[[$$count$$ = 1] OR ([$$count$$ = 2] AND [$$count$$ = 3])]",
        "[(([$$count$$ = 3]) OR [$$name$$ = '4']) AND true]",
        "[false OR [$$count$$ = 3]]",
    ] {
        validate_condition(condition).unwrap();
        assert!(evaluate(condition, &ctx, None, None).is_ok());
    }
}

#[test]
fn test_validator_rejects_malformed() {
    let ctx = context();
    for condition in ["[[$$count$$ > 2] AND]", "[[$$count$$ > 2]", "[$$count$$ > 2] AND [x]"] {
        assert!(validate_condition(condition).is_err(), "{}", condition);
        assert!(evaluate(condition, &ctx, None, None).is_err(), "{}", condition);
    }
}
