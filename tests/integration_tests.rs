//! Integration tests for rule loading, graph compilation and key resolution
//!
//! These tests drive the public API end to end from YAML/JSON fixtures.

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use steprule::flow::condition::{Comparator, Condition, Predicate};
use steprule::flow::graph::{compile, compile_value, Diagnostic, Discriminator, Graph, NextRule, Step, StepMap};
use steprule::flow::loader::RuleLoader;
use steprule::flow::registry::PredicateRegistry;
use steprule::flow::selector::{configure_content_keys, resolve, FieldSet, KeyFn, Selector, SelectorEntry};
use steprule::flow::state::FieldValues;
use steprule::FlowError;

// ============================================================================
// Fixtures
// ============================================================================

static LINEAR_STEPS: &str = r#"
/start:
  next: step1
/step1:
  next: step2
/step2:
  next: step3
/step3:
  next: step4
/step4: {}
"#;

static BRANCHING_STEPS: &str = r#"
/start:
  next: step1
/step1:
  next:
    - - field: foo
        op: "=="
        value: bar
        next: step2
      - fn: isAdult
        next: step3
      - step4
/step2: {}
/step3: {}
/step4: {}
"#;

static REGISTRY: Lazy<PredicateRegistry> = Lazy::new(|| {
    let mut registry: PredicateRegistry = PredicateRegistry::new();
    registry.register_predicate("isAdult", |current, _, _| {
        current.and_then(Value::as_f64).is_some_and(|n| n >= 18.0)
    });
    registry.register_predicate("isBar", |current, _, _| current == Some(&json!("bar")));
    registry.register_key_function("defaultTemplate", |_| Some("template".to_string()));
    registry
});

fn edges(graph: &Graph) -> Vec<(String, String, Option<String>)> {
    graph
        .edges()
        .iter()
        .map(|e| (e.source.clone(), e.target.clone(), e.label.clone()))
        .collect()
}

fn edge(source: &str, target: &str, label: Option<&str>) -> (String, String, Option<String>) {
    (source.to_string(), target.to_string(), label.map(str::to_string))
}

fn values(value: Value) -> FieldValues {
    FieldValues::from_json(value)
}

// ============================================================================
// Graph compilation
// ============================================================================

#[test]
fn test_linear_chain() {
    let steps = RuleLoader::parse_steps(LINEAR_STEPS).unwrap();
    let out = compile(&steps);

    assert_eq!(
        out.graph.nodes(),
        &["/start", "/step1", "/step2", "/step3", "/step4"].map(String::from)
    );
    assert_eq!(
        edges(&out.graph),
        vec![
            edge("/start", "/step1", None),
            edge("/step1", "/step2", None),
            edge("/step2", "/step3", None),
            edge("/step3", "/step4", None),
        ]
    );
    assert_eq!(out.graph.sinks(), vec!["/step4"]);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_branching_labels() {
    let mut steps = RuleLoader::parse_steps(BRANCHING_STEPS).unwrap();
    REGISTRY.bind_step_map(&mut steps).unwrap();
    let out = compile(&steps);

    assert_eq!(
        edges(&out.graph),
        vec![
            edge("/start", "/step1", None),
            edge("/step1", "/step2", Some("foo == bar")),
            edge("/step1", "/step3", Some("isAdult")),
            edge("/step1", "/step4", None),
        ]
    );
    assert_eq!(out.graph.successors("/step1"), vec!["/step2", "/step3", "/step4"]);
}

#[test]
fn test_custom_operator_label() {
    let steps = RuleLoader::parse_steps(
        r#"
/start:
  next:
    field: foo
    op: isBar
    next: bar
/bar: {}
"#,
    )
    .unwrap();
    let out = compile(&steps);
    assert_eq!(edges(&out.graph), vec![edge("/start", "/bar", Some("isBar"))]);
}

#[test]
fn test_simple_edge() {
    let steps: StepMap = StepMap::new()
        .step("A", Step::with_next("B"))
        .step("B", Step::terminal());
    let out = compile(&steps);

    assert_eq!(out.graph.nodes(), &["A".to_string(), "B".to_string()]);
    assert_eq!(edges(&out.graph), vec![edge("A", "B", None)]);
}

#[test]
fn test_condition_edge() {
    let out = compile_value(&json!({
        "A": {"next": {"field": "age", "op": ">=", "value": 18, "next": "adult"}}
    }))
    .unwrap();

    assert_eq!(edges(&out.graph), vec![edge("A", "adult", Some("age >= 18"))]);
    assert!(out.graph.has_node("adult"));
}

#[test]
fn test_unnamed_predicates_are_reported() {
    let steps: StepMap = StepMap::new()
        .step(
            "/start",
            Step::with_next(NextRule::any(vec![NextRule::any(vec![
                NextRule::when(Condition::predicate(Predicate::anonymous(|_, _, _| true)).then("a")),
                NextRule::when(
                    Condition::new("x", Predicate::anonymous(|_, _, _| true), Value::Null).then("b"),
                ),
                NextRule::when(Condition::equals("y", 1)),
                NextRule::to("c"),
            ])])),
        )
        .step("/c", Step::terminal());
    let out = compile(&steps);

    assert_eq!(edges(&out.graph), vec![edge("/start", "/c", None)]);
    assert_eq!(
        out.diagnostics,
        vec![
            Diagnostic::UnlabelableBranch {
                step: "/start".to_string(),
                discriminator: Discriminator::Function,
            },
            Diagnostic::UnlabelableBranch {
                step: "/start".to_string(),
                discriminator: Discriminator::Operator,
            },
            Diagnostic::MissingTarget {
                step: "/start".to_string(),
            },
        ]
    );
}

#[test]
fn test_bare_entries_of_top_level_sequence() {
    let steps = RuleLoader::parse_steps("/start:\n  next: [a, b]\n/a: {}\n/b: {}\n").unwrap();
    let out = compile(&steps);
    assert!(out.graph.edges().is_empty());
    assert_eq!(out.graph.nodes().len(), 3);
}

#[test]
fn test_compilation_is_deterministic() {
    let steps = RuleLoader::parse_steps(BRANCHING_STEPS).unwrap();
    let first = serde_json::to_value(&compile(&steps).graph).unwrap();
    for _ in 0..5 {
        assert_eq!(serde_json::to_value(&compile(&steps).graph).unwrap(), first);
    }
}

#[test]
fn test_graph_json_layout() {
    let steps = RuleLoader::parse_steps("/start:\n  next: end\n/end: {}\n").unwrap();
    let json = serde_json::to_value(&compile(&steps).graph).unwrap();
    assert_eq!(
        json,
        json!({
            "nodes": [{"v": "/start"}, {"v": "/end"}],
            "edges": [{"v": "/start", "w": "/end"}]
        })
    );
}

#[test]
fn test_invalid_definitions() {
    for value in [Value::Null, json!("form"), json!(42), json!(["/start"])] {
        let err = compile_value(&value).unwrap_err();
        assert!(matches!(err, FlowError::InvalidDefinition), "accepted {}", value);
    }
}

// ============================================================================
// Key resolution
// ============================================================================

#[test]
fn test_range_fallback() {
    let selector = RuleLoader::parse_selector(
        r#"
- field: age
  op: ">"
  value: 15
  key: old
- field: age
  op: "<"
  value: 10
  key: young
- default
"#,
    )
    .unwrap();

    assert_eq!(resolve(&selector, &values(json!({"age": 12})), &()), Some("default".to_string()));
    assert_eq!(resolve(&selector, &values(json!({"age": 16})), &()), Some("old".to_string()));
    assert_eq!(resolve(&selector, &values(json!({"age": 9})), &()), Some("young".to_string()));
}

#[test]
fn test_fixed_key_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let spy: Predicate = Predicate::named("spy", move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });
    let selector: Selector = Selector::first(vec![
        "fixedKey".into(),
        SelectorEntry::Condition(Condition::new("x", Comparator::Eq, 1).then("never")),
        SelectorEntry::Condition(Condition::predicate(spy).then("spied")),
    ]);

    for x in [json!(1), json!(2), Value::Null] {
        let fields = values(json!({ "x": x }));
        assert_eq!(resolve(&selector, &fields, &()), Some("fixedKey".to_string()));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_resolve_with_registry() {
    let mut selector = RuleLoader::parse_selector(
        r#"
- fn: isAdult
  field: age
  key: adult
- field: role
  op: isBar
  key:
    - field: country
      op: in
      value: [NL, BE]
      key: benelux
    - call: defaultTemplate
"#,
    )
    .unwrap();
    REGISTRY.bind_selector(&mut selector).unwrap();

    let cases = [
        (json!({"age": 40}), Some("adult")),
        (json!({"age": 4, "role": "bar", "country": "BE"}), Some("benelux")),
        (json!({"age": 4, "role": "bar", "country": "DE"}), Some("template")),
        (json!({"age": 4, "role": "baz"}), None),
    ];
    for (fields, expected) in cases {
        assert_eq!(
            resolve(&selector, &values(fields.clone()), &()),
            expected.map(str::to_string),
            "fields: {}",
            fields
        );
    }
}

#[test]
fn test_unbound_references_do_not_match() {
    let selector = RuleLoader::parse_selector("- fn: notRegistered\n  key: hit\n- call: alsoMissing\n")
        .unwrap();
    assert_eq!(resolve(&selector, &FieldValues::new(), &()), None);
}

// ============================================================================
// Content keys
// ============================================================================

#[test]
fn test_content_keys() {
    let mut fields: FieldSet = RuleLoader::parse_fields(
        r#"
name:
  contentKey: nameHelp
age:
  contentKey:
    - field: age
      op: "<"
      value: 18
      key: minorAge
    - field: age
      op: ">="
      value: 65
      key: seniorAge
postcode:
  contentKey:
    - field: address.country
      value: NL
      key: dutchPostcode
template:
  contentKey:
    call: defaultTemplate
plain:
  label: No content key here
"#,
    )
    .unwrap();
    REGISTRY.bind_field_set(&mut fields).unwrap();

    let current = values(json!({"age": 12, "address": {"country": "BE"}}));
    let keys = configure_content_keys(&fields, &current, &());

    assert_eq!(keys.get("name").map(String::as_str), Some("nameHelp"));
    assert_eq!(keys.get("age").map(String::as_str), Some("minorAge"));
    assert_eq!(keys.get("template").map(String::as_str), Some("template"));
    assert!(!keys.contains_key("postcode"));
    assert!(!keys.contains_key("plain"));
}

#[test]
fn test_content_key_from_context() {
    let mut fields: FieldSet<String> = FieldSet::new();
    fields.insert(
        "greeting".to_string(),
        steprule::flow::selector::FieldOptions::with_content_key(KeyFn::named(
            "locale",
            |ctx: &String| Some(format!("greeting.{}", ctx)),
        )),
    );
    let keys = configure_content_keys(&fields, &FieldValues::new(), &"nl".to_string());
    assert_eq!(keys.get("greeting").map(String::as_str), Some("greeting.nl"));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_from_files() {
    let dir = std::env::temp_dir().join(format!("steprule-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let steps_path = dir.join("steps.yaml");
    let values_path = dir.join("values.json");
    std::fs::write(&steps_path, LINEAR_STEPS).unwrap();
    std::fs::write(&values_path, r#"{"age": 21}"#).unwrap();

    let loader = RuleLoader::new();
    let steps = loader.load_steps(&steps_path).unwrap();
    let fields = loader.load_values(&values_path).unwrap();

    assert_eq!(compile(&steps).graph.edges().len(), 4);
    assert_eq!(fields.get("age"), Some(&json!(21)));

    std::fs::remove_dir_all(&dir).unwrap();
}
