mod common;

use std::sync::Arc;

use clocktree_validator::{
    ClockTreeDocument, ClockTreeValidator, CompiledSchema, SchemaLoader, check_graph,
    parse_with_positions,
};
use common::*;
use serde_json::json;

#[test]
fn test_valid_fixture_has_no_errors() {
    let outcome = validator().validate_str(&fixture(VALID));
    assert!(outcome.valid, "{:?}", outcome.errors);
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_valid_fixture_matches_typed_model() {
    let doc = ClockTreeDocument::from_json_str(&fixture(VALID)).unwrap();
    assert_eq!(doc.tree.elements.len(), 5);
    assert_eq!(doc.tree.transitions.len(), 2);
}

#[test]
fn test_malformed_json_yields_single_parse_error() {
    let outcome = validator().validate_str(&fixture(MALFORMED));
    assert!(!outcome.valid);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("error reading or parsing the JSON file:"));
    assert!(outcome.errors[0].contains("line 5"));
}

#[test]
fn test_missing_transitions_reported_once() {
    let outcome = validator().validate_str(&fixture(MISSING_TRANSITIONS));
    assert_eq!(
        outcome.errors,
        vec!["the 'transitions' section is missing from the JSON.".to_string()]
    );
}

#[test]
fn test_bad_multiplexor_messages_in_order() {
    let outcome = validator().validate_str(&fixture(BAD_MULTIPLEXOR));
    assert_eq!(
        outcome.errors,
        vec![
            "transition 't_sys' targetTaskId index 1 does not match any input_Id/from pair of multiplexor 'sysclk_mux'.",
            "transition 't_sys' targetTaskId index 2 does not have the format '<input_Id>__<from>_input'.",
            "missing outgoing transition: multiplexor 'sysclk_mux' expects a transition to 'IN2__pll_input'.",
            "unexpected outgoing transition: multiplexor 'sysclk_mux' has a transition to 'IN3__lse_input'.",
            "unexpected outgoing transition: multiplexor 'sysclk_mux' has a transition to 'pll'.",
        ]
    );
}

#[test]
fn test_schema_errors_carry_positions_and_precede_graph_errors() {
    let outcome = validator().validate_str(&fixture(SCHEMA_ERRORS));
    assert!(!outcome.valid);
    assert_eq!(outcome.errors.len(), 4, "{:#?}", outcome.errors);

    let schema_part = &outcome.errors[..3];
    assert!(schema_part.contains(
        &"'/tree/elements/0/unit/text' has invalid value 'GHz'. Use 'MHz' or 'KHz'. (line 14, column 19)"
            .to_string()
    ));
    assert!(schema_part.iter().any(|e| e.contains("'colour'") && e.contains("(line 6, column 7)")));
    assert!(schema_part.iter().any(|e| e.contains("'name'")));

    assert_eq!(outcome.errors[3], "duplicate element id found: 'hse'.");
}

#[test]
fn test_every_message_ends_with_period_or_position() {
    for name in [SCHEMA_ERRORS, BAD_MULTIPLEXOR, MISSING_TRANSITIONS] {
        for message in validator().validate_str(&fixture(name)).errors {
            assert!(
                message.ends_with('.') || message.ends_with(')'),
                "{name}: {message}"
            );
        }
    }
}

#[test]
fn test_validation_is_deterministic() {
    let v = validator();
    for name in [VALID, SCHEMA_ERRORS, BAD_MULTIPLEXOR, MALFORMED] {
        let text = fixture(name);
        assert_eq!(v.validate_str(&text), v.validate_str(&text), "{name}");
    }
}

#[test]
fn test_graph_checker_runs_on_schema_invalid_documents() {
    let doc = json!({
        "tree": {
            "elements": [{ "id": "m", "type": "multiplexor", "possible_Input": [
                { "input_Id": "A", "from": "x" }
            ] }],
            "transitions": [{ "id": "t", "sourceTaskId": "m", "targetTaskId": 42 }]
        }
    });
    let report = check_graph(&doc);
    assert_eq!(
        report.errors,
        vec!["missing outgoing transition: multiplexor 'm' expects a transition to 'A__x_input'."]
    );
}

#[test]
fn test_positions_for_fixture() {
    let parsed = parse_with_positions(&fixture(VALID)).unwrap();
    let location = parsed.pointers.get("/tree/elements/2/possible_Input/1/from").unwrap();
    assert_eq!(location.value.line, 48);
}

#[tokio::test]
async fn test_schema_override_changes_rules() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let schema_path = temp_dir.path().join("strict.json");
    tokio::fs::write(
        &schema_path,
        serde_json::to_string(&json!({
            "type": "object",
            "required": ["tree", "owner"]
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    let schema = SchemaLoader::load(Some(&schema_path)).await.unwrap();
    let validator = ClockTreeValidator::new(Arc::new(schema));
    let outcome = validator.validate_str(&fixture(VALID));

    assert_eq!(
        outcome.errors,
        vec!["required property 'owner' missing at 'root'.".to_string()]
    );
}

#[test]
fn test_shared_validator_across_threads() {
    let schema = Arc::new(CompiledSchema::embedded().unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let validator = ClockTreeValidator::new(Arc::clone(&schema));
            std::thread::spawn(move || validator.validate_str(&fixture(BAD_MULTIPLEXOR)).errors.len())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5);
    }
}
