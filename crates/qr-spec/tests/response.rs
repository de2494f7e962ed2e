use qr_spec::schema::{questionnaire_schema, response_schema, validation_result_schema};
use qr_spec::{
    AnswerValue, FormEngine, Questionnaire, ResponseDocument, ResponseStatus, build_outline,
    render_json, render_text, resolve_enablement,
};

fn engine(raw: &str) -> FormEngine {
    let questionnaire: Questionnaire = serde_json::from_str(raw).expect("deserialize questionnaire");
    FormEngine::new(questionnaire)
}

#[test]
fn cbor_snapshot_round_trips() {
    let mut engine = engine(include_str!("../tests/fixtures/mixed.json"));
    engine.set_answer("q2", "41").unwrap();
    let response = engine.draft();

    let bytes = response.to_cbor().unwrap();
    let restored = ResponseDocument::from_cbor(&bytes).unwrap();
    assert_eq!(restored, response);
    assert_eq!(restored.status, ResponseStatus::InProgress);
}

#[test]
fn drafts_resume_into_a_new_engine() {
    let raw = include_str!("../tests/fixtures/choice.json");
    let mut first = engine(raw);
    first.toggle_option("q1", "a2", true).unwrap();
    first.set_answer("colour", "mauve").unwrap();
    let draft = first.draft();

    let questionnaire: Questionnaire = serde_json::from_str(raw).unwrap();
    let resumed = FormEngine::with_response(questionnaire, &draft);
    assert_eq!(resumed.answer("q1"), Some(&AnswerValue::from("a2")));
    assert_eq!(resumed.answer("colour"), Some(&AnswerValue::from("mauve")));
    assert_eq!(resumed.submit().item, first.submit().item);
}

#[test]
fn response_json_uses_wire_names() {
    let mut engine = engine(include_str!("../tests/fixtures/groups.json"));
    engine.set_answer("question1", "a1").unwrap();
    let pretty = engine.draft().to_json_pretty().unwrap();
    assert!(pretty.contains("\"status\": \"in-progress\""));
    assert!(pretty.contains("\"questionnaire\": \"Questionnaire/groups\""));
    assert!(pretty.contains("\"linkId\": \"question1\""));
    assert!(pretty.contains("\"valueString\": \"a1\""));
}

#[test]
fn schemas_describe_the_documents() {
    let questionnaire = questionnaire_schema().unwrap();
    assert_eq!(questionnaire["title"], "Questionnaire");
    assert!(questionnaire["properties"]["item"].is_object());

    let response = response_schema().unwrap();
    assert_eq!(response["title"], "ResponseDocument");
    assert!(response["properties"]["status"].is_object());

    let result = validation_result_schema().unwrap();
    assert!(result["properties"]["missing_required"].is_object());
}

#[test]
fn enablement_map_covers_every_collectible_item() {
    let mut engine = engine(include_str!("../tests/fixtures/conditional.json"));
    let map = resolve_enablement(&engine);
    assert_eq!(map.get("smoker"), Some(&true));
    assert_eq!(map.get("smoking"), Some(&false));
    assert_eq!(map.get("smoking/packs"), Some(&false));
    assert_eq!(map.get("retired"), Some(&false));

    engine.set_checked("smoker", true).unwrap();
    let map = resolve_enablement(&engine);
    assert_eq!(map.get("smoking/packs"), Some(&true));
}

#[test]
fn outline_shows_progress_and_state() {
    let mut engine = engine(include_str!("../tests/fixtures/conditional.json"));
    engine.set_answer("age", "70").unwrap();
    let _ = engine.set_answer("age", "seventy");

    let outline = build_outline(&engine);
    assert_eq!(outline.questionnaire.as_deref(), Some("Questionnaire/conditional"));
    assert_eq!(outline.entries.len(), 5);
    assert_eq!(outline.total, 2);
    assert_eq!(outline.answered, 0);

    let text = render_text(&outline);
    assert!(text.starts_with("Form: untitled (Questionnaire/conditional)"));
    assert!(text.contains("Answered: 0/2"));
    assert!(text.contains("  - packs [integer] Packs per day * (disabled)"));
    assert!(text.contains("- age [integer] Age = 70 !! 'seventy' is not a whole number"));

    let json = render_json(&outline);
    assert_eq!(json["progress"]["total"], 2);
    assert_eq!(json["items"][1]["enabled"], false);
    assert_eq!(json["items"][3]["answer"][0]["valueInteger"], 70);
}
