use qr_spec::{FormEngine, Questionnaire, ResponseDocument, validate};
use serde_json::json;

fn questionnaire(name: &str) -> Questionnaire {
    let raw = match name {
        "groups" => include_str!("../tests/fixtures/groups.json"),
        "conditional" => include_str!("../tests/fixtures/conditional.json"),
        "choice" => include_str!("../tests/fixtures/choice.json"),
        _ => panic!("unknown fixture {}", name),
    };
    serde_json::from_str(raw).expect("deserialize questionnaire")
}

fn response(value: serde_json::Value) -> ResponseDocument {
    serde_json::from_value(value).expect("deserialize response")
}

fn codes(result: &qr_spec::ValidationResult) -> Vec<&str> {
    result
        .errors
        .iter()
        .filter_map(|error| error.code.as_deref())
        .collect()
}

#[test]
fn engine_output_validates() {
    let mut engine = FormEngine::new(questionnaire("conditional"));
    engine.set_checked("smoker", true).unwrap();
    engine.set_answer("packs", "1").unwrap();
    engine.set_answer("age", "66").unwrap();

    let result = validate(engine.questionnaire(), &engine.submit());
    assert!(result.valid, "{result:?}");
}

#[test]
fn missing_required_answers_are_reported_only_when_enabled() {
    let questionnaire = questionnaire("conditional");

    let result = validate(
        &questionnaire,
        &response(json!({ "item": [{ "linkId": "smoker", "answer": [{ "valueBoolean": false }] }] })),
    );
    assert!(result.valid, "{result:?}");

    let result = validate(
        &questionnaire,
        &response(json!({
            "item": [
                { "linkId": "smoker", "answer": [{ "valueBoolean": true }] },
                { "linkId": "smoking", "item": [{ "linkId": "packs" }] }
            ]
        })),
    );
    assert!(!result.valid);
    assert_eq!(result.missing_required, vec!["smoking/packs"]);
}

#[test]
fn disabled_items_with_answers_are_errors() {
    let result = validate(
        &questionnaire("conditional"),
        &response(json!({
            "item": [
                { "linkId": "age", "answer": [{ "valueInteger": 30 }] },
                { "linkId": "retired", "answer": [{ "valueBoolean": true }] }
            ]
        })),
    );
    assert_eq!(codes(&result), vec!["disabled_item"]);
    assert_eq!(result.errors[0].path.as_deref(), Some("/retired"));
    assert_eq!(result.errors[0].link_id.as_deref(), Some("retired"));
}

#[test]
fn unknown_items_are_listed_by_path() {
    let result = validate(
        &questionnaire("groups"),
        &response(json!({
            "item": [
                { "linkId": "group1", "item": [{ "linkId": "bogus", "answer": [{ "valueString": "x" }] }] },
                { "linkId": "nowhere" }
            ]
        })),
    );
    assert!(!result.valid);
    assert_eq!(result.unknown_fields, vec!["group1/bogus", "nowhere"]);
}

#[test]
fn structural_problems_are_flagged() {
    let result = validate(
        &questionnaire("groups"),
        &response(json!({
            "item": [
                { "linkId": "group2", "item": [] },
                {
                    "linkId": "group1",
                    "answer": [{ "valueString": "groups hold no answers" }],
                    "item": [
                        { "linkId": "question1", "answer": [{ "valueString": "a" }, { "valueString": "b" }] },
                        { "linkId": "question1", "answer": [{ "valueString": "c" }] },
                        {
                            "linkId": "question2",
                            "answer": [{ "valueInteger": 2 }],
                            "item": [{ "linkId": "nested" }]
                        }
                    ]
                }
            ]
        })),
    );
    assert_eq!(
        codes(&result),
        vec![
            "out_of_order",
            "group_answer",
            "too_many_answers",
            "duplicate_item",
            "leaf_children",
            "type_mismatch",
        ]
    );
}

#[test]
fn answers_must_match_options() {
    let result = validate(
        &questionnaire("choice"),
        &response(json!({
            "item": [
                { "linkId": "q1", "answer": [{ "valueString": "a3" }] },
                {
                    "linkId": "toppings",
                    "answer": [
                        { "valueCoding": { "system": "urn:toppings", "code": "ham" } },
                        { "valueCoding": { "system": "urn:other", "code": "ham" } }
                    ]
                },
                { "linkId": "colour", "answer": [{ "valueString": "green" }] }
            ]
        })),
    );
    assert_eq!(codes(&result), vec!["not_an_option", "not_an_option"]);
    assert_eq!(result.errors[0].path.as_deref(), Some("/q1"));
    assert_eq!(result.errors[1].path.as_deref(), Some("/toppings"));
}

#[test]
fn malformed_dates_in_documents_are_rejected() {
    let questionnaire: Questionnaire = serde_json::from_value(json!({
        "item": [{ "linkId": "born", "type": "date" }]
    }))
    .unwrap();
    let result = validate(
        &questionnaire,
        &response(json!({ "item": [{ "linkId": "born", "answer": [{ "valueDate": "2023-02-30" }] }] })),
    );
    assert_eq!(codes(&result), vec!["invalid_date"]);
}

#[test]
fn result_serializes_with_stable_keys() {
    let result = validate(
        &questionnaire("groups"),
        &response(json!({ "item": [{ "linkId": "nowhere" }] })),
    );
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "valid": false,
            "errors": [],
            "missing_required": [],
            "unknown_fields": ["nowhere"]
        })
    );
}

fn chain() -> Questionnaire {
    serde_json::from_value(json!({
        "resourceType": "Questionnaire",
        "item": [
            { "linkId": "q1", "type": "boolean" },
            {
                "linkId": "q2",
                "type": "string",
                "enableWhen": [{ "question": "q1", "operator": "=", "answer": { "valueBoolean": true } }]
            },
            {
                "linkId": "q3",
                "type": "string",
                "required": true,
                "enableWhen": [{ "question": "q2", "operator": "exists", "answer": { "valueBoolean": true } }]
            }
        ]
    }))
    .expect("deserialize questionnaire")
}

#[test]
fn answers_of_disabled_questions_do_not_enable_others() {
    let result = validate(
        &chain(),
        &response(json!({
            "item": [
                { "linkId": "q1", "answer": [{ "valueBoolean": false }] },
                { "linkId": "q2", "answer": [{ "valueString": "x" }] },
                { "linkId": "q3", "answer": [{ "valueString": "y" }] }
            ]
        })),
    );
    assert!(!result.valid);
    assert_eq!(codes(&result), vec!["disabled_item", "disabled_item"]);
    assert_eq!(
        result
            .errors
            .iter()
            .filter_map(|error| error.path.as_deref())
            .collect::<Vec<_>>(),
        vec!["/q2", "/q3"]
    );
    assert!(result.missing_required.is_empty());

    let result = validate(
        &chain(),
        &response(json!({ "item": [{ "linkId": "q1", "answer": [{ "valueBoolean": false }] }] })),
    );
    assert!(result.valid, "{result:?}");
}

#[test]
fn chained_engine_output_validates_after_unchecking() {
    let mut engine = FormEngine::new(chain());
    engine.set_checked("q1", true).unwrap();
    engine.set_answer("q2", "x").unwrap();
    engine.set_answer("q3", "y").unwrap();
    engine.set_checked("q1", false).unwrap();

    let submitted = engine.submit();
    assert_eq!(submitted.item.len(), 1);
    let result = validate(engine.questionnaire(), &submitted);
    assert!(result.valid, "{result:?}");
    assert_eq!(engine.validation(), result);
}

#[test]
fn disabled_items_do_not_shadow_same_named_items_elsewhere() {
    let questionnaire: Questionnaire = serde_json::from_value(json!({
        "item": [
            { "linkId": "adult", "type": "boolean" },
            {
                "linkId": "guardian",
                "type": "group",
                "enableWhen": [{ "question": "adult", "operator": "=", "answer": { "valueBoolean": false } }],
                "item": [{ "linkId": "note", "type": "string" }]
            },
            {
                "linkId": "patient",
                "type": "group",
                "item": [{ "linkId": "note", "type": "string", "required": true }]
            }
        ]
    }))
    .expect("deserialize questionnaire");

    let result = validate(
        &questionnaire,
        &response(json!({
            "item": [
                { "linkId": "adult", "answer": [{ "valueBoolean": true }] },
                { "linkId": "patient", "item": [{ "linkId": "note", "answer": [{ "valueString": "ok" }] }] }
            ]
        })),
    );
    assert!(result.valid, "{result:?}");
}
