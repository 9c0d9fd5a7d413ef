use tessera_ir::parse::{parse_model, parse_result};
use tessera_ir::types::{Combination, TestResult};

#[test]
fn test_parse_unconstrained_model() {
    let model = parse_model(r#"{ "strength": 2, "parameter_sizes": [2, 3, 4] }"#).unwrap();
    assert_eq!(model.strength(), 2);
    assert_eq!(model.parameter_sizes(), &[2, 3, 4]);
    assert!(!model.has_constraints());
}

#[test]
fn test_parse_model_with_tuple_lists() {
    let json = serde_json::json!({
        "strength": 2,
        "parameter_sizes": [2, 2, 2],
        "forbidden_tuple_lists": [
            { "id": 1, "involved_parameters": [0, 1], "tuples": [[0, 0], [1, 1]] }
        ],
        "error_tuple_lists": [
            { "id": 2, "involved_parameters": [2], "tuples": [[1]] }
        ]
    });
    let model = parse_model(&json.to_string()).unwrap();
    assert!(model.has_constraints());

    let forbidden = model.hard_constraint_combinations();
    assert_eq!(forbidden.len(), 3);
    assert!(forbidden.contains(&Combination::from_values(vec![0, 0, -1])));
    assert!(forbidden.contains(&Combination::from_values(vec![-1, -1, 1])));
}

#[test]
fn test_parse_rejects_invalid_strength() {
    let err = parse_model(r#"{ "strength": 3, "parameter_sizes": [2, 2] }"#).unwrap_err();
    assert!(err.to_string().contains("strength 3 exceeds"), "{err}");
}

#[test]
fn test_parse_rejects_unknown_parameter() {
    let json = r#"{
        "strength": 1,
        "parameter_sizes": [2],
        "forbidden_tuple_lists": [{ "id": 4, "involved_parameters": [3], "tuples": [[0]] }]
    }"#;
    assert!(parse_model(json).is_err());
}

#[test]
fn test_parse_results() {
    assert_eq!(parse_result(r#"{ "outcome": "success" }"#).unwrap(), TestResult::Success);
    let failure = parse_result(r#"{ "outcome": "failure", "cause": "boom" }"#).unwrap();
    assert!(failure.is_failure());
    let bare = parse_result(r#"{ "outcome": "failure" }"#).unwrap();
    assert_eq!(bare, TestResult::Failure { cause: None });
}
