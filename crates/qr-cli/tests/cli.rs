use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const INTAKE: &str = include_str!("../tests/fixtures/intake.json");
const GROUPS: &str = include_str!("../tests/fixtures/groups.json");
const CONDITIONAL: &str = include_str!("../tests/fixtures/conditional.json");

fn qr_form() -> Command {
    let mut cmd = Command::cargo_bin("qr-form").expect("qr-form binary");
    cmd.env_remove("RUST_LOG").env_remove("QR_UPLOAD_DIR");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Result<Value, Box<dyn std::error::Error>> {
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

#[test]
fn fill_with_flags_emits_a_response() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("groups.json");
    questionnaire.write_str(GROUPS)?;

    let response = stdout_json(
        qr_form()
            .arg("fill")
            .arg("--questionnaire")
            .arg(questionnaire.path())
            .args(["--set", "question1=a1", "--set", "group2/question4=a4"])
            .args(["--source", "Practitioner/123"]),
    )?;

    assert_eq!(
        response,
        json!({
            "resourceType": "QuestionnaireResponse",
            "questionnaire": "Questionnaire/groups",
            "source": { "reference": "Practitioner/123" },
            "status": "completed",
            "item": [
                {
                    "linkId": "group1",
                    "text": "Group 1",
                    "item": [{ "linkId": "question1", "text": "Question 1", "answer": [{ "valueString": "a1" }] }]
                },
                {
                    "linkId": "group2",
                    "text": "Group 2",
                    "item": [{ "linkId": "question4", "text": "Question 4", "answer": [{ "valueString": "a4" }] }]
                }
            ]
        })
    );
    Ok(())
}

#[test]
fn fill_runs_scripts_with_uploads_and_references() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("intake.json");
    questionnaire.write_str(INTAKE)?;
    let consent = temp.child("consent.txt");
    consent.write_str("signed")?;
    let uploads = temp.child("uploads");
    let script = temp.child("script.json");
    script.write_str(&serde_json::to_string(&json!([
        { "op": "set", "key": "name", "text": "Ann" },
        { "op": "set", "key": "visits", "text": "2" },
        { "op": "toggle", "key": "colour", "option": "red" },
        { "op": "toggle", "key": "colour", "option": "blue" },
        { "op": "attach", "key": "consent", "path": consent.path() },
        { "op": "reference", "key": "doctor", "resource_type": "Practitioner", "id": "9" }
    ]))?)?;

    let response = stdout_json(
        qr_form()
            .arg("fill")
            .arg("--questionnaire")
            .arg(questionnaire.path())
            .arg("--script")
            .arg(script.path())
            .env("QR_UPLOAD_DIR", uploads.path()),
    )?;

    let items = response["item"].as_array().expect("items");
    assert_eq!(items.len(), 5);
    assert_eq!(items[1]["answer"][0]["valueInteger"], 2);
    assert_eq!(items[2]["answer"], json!([{ "valueString": "blue" }]));
    let attachment = &items[3]["answer"][0]["valueAttachment"];
    assert_eq!(attachment["title"], "consent.txt");
    assert_eq!(attachment["contentType"], "text/plain");
    assert!(attachment["url"].as_str().unwrap_or_default().starts_with("file://"));
    assert_eq!(items[4]["answer"][0]["valueReference"]["reference"], "Practitioner/9");
    uploads.child("consent.txt").assert("signed");
    Ok(())
}

#[test]
fn rejected_input_is_reported_but_not_fatal() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("intake.json");
    questionnaire.write_str(INTAKE)?;

    let output = qr_form()
        .arg("fill")
        .arg("--questionnaire")
        .arg(questionnaire.path())
        .args(["--set", "name=Ann", "--set", "visits=lots"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Rejected: answer for 'visits' rejected"), "{stderr}");
    let response: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(response["item"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn strict_fill_blocks_invalid_responses() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("intake.json");
    questionnaire.write_str(INTAKE)?;

    let output = qr_form()
        .arg("fill")
        .arg("--questionnaire")
        .arg(questionnaire.path())
        .args(["--set", "visits=3", "--strict"])
        .assert()
        .failure()
        .get_output()
        .clone();

    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Missing required answers: name"), "{stderr}");
    Ok(())
}

#[test]
fn unknown_keys_fail_the_fill() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("intake.json");
    questionnaire.write_str(INTAKE)?;

    qr_form()
        .arg("fill")
        .arg("--questionnaire")
        .arg(questionnaire.path())
        .args(["--set", "nope=1"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn drafts_resume_through_cbor() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("conditional.json");
    questionnaire.write_str(CONDITIONAL)?;
    let draft = temp.child("draft.cbor");

    qr_form()
        .arg("fill")
        .arg("--questionnaire")
        .arg(questionnaire.path())
        .args(["--check", "smoker=yes", "--set", "packs=2", "--draft"])
        .args(["--format", "cbor", "--out"])
        .arg(draft.path())
        .assert()
        .success();
    assert!(draft.path().exists());

    let response = stdout_json(
        qr_form()
            .arg("fill")
            .arg("--questionnaire")
            .arg(questionnaire.path())
            .arg("--response")
            .arg(draft.path())
            .args(["--set", "age=70"]),
    )?;
    assert_eq!(response["status"], "completed");
    assert_eq!(response["item"][0]["answer"][0]["valueBoolean"], true);
    assert_eq!(response["item"][1]["item"][0]["answer"][0]["valueInteger"], 2);
    assert_eq!(response["item"][2]["answer"][0]["valueInteger"], 70);
    Ok(())
}

#[test]
fn validate_reports_problems() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("conditional.json");
    questionnaire.write_str(CONDITIONAL)?;
    let response = temp.child("response.json");
    response.write_str(&serde_json::to_string(&json!({
        "resourceType": "QuestionnaireResponse",
        "item": [
            { "linkId": "age", "answer": [{ "valueInteger": 30 }] },
            { "linkId": "retired", "answer": [{ "valueBoolean": true }] },
            { "linkId": "hobby", "answer": [{ "valueString": "chess" }] }
        ]
    }))?)?;

    let output = qr_form()
        .arg("validate")
        .arg("--questionnaire")
        .arg(questionnaire.path())
        .arg("--response")
        .arg(response.path())
        .assert()
        .failure()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("Validation result: invalid"), "{stdout}");
    assert!(stdout.contains("/retired - item is disabled"), "{stdout}");
    assert!(stdout.contains("Unknown answer items: hobby"), "{stdout}");
    Ok(())
}

#[test]
fn validate_accepts_filled_output() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("conditional.json");
    questionnaire.write_str(CONDITIONAL)?;
    let response = temp.child("response.json");

    qr_form()
        .arg("fill")
        .arg("--questionnaire")
        .arg(questionnaire.path())
        .args(["--check", "smoker=true", "--set", "packs=1"])
        .arg("--out")
        .arg(response.path())
        .assert()
        .success();

    let result = stdout_json(
        qr_form()
            .arg("validate")
            .arg("--questionnaire")
            .arg(questionnaire.path())
            .arg("--response")
            .arg(response.path())
            .arg("--json"),
    )?;
    assert_eq!(result["valid"], true);
    Ok(())
}

#[test]
fn schema_prints_json_schema() -> TestResult {
    let schema = stdout_json(qr_form().args(["schema", "response"]))?;
    assert_eq!(schema["title"], "ResponseDocument");
    Ok(())
}

#[test]
fn outline_renders_text() -> TestResult {
    let temp = TempDir::new()?;
    let questionnaire = temp.child("groups.json");
    questionnaire.write_str(GROUPS)?;

    let output = qr_form()
        .arg("outline")
        .arg("--questionnaire")
        .arg(questionnaire.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output)?;
    assert!(text.starts_with("Form: Nested groups (Questionnaire/groups)"), "{text}");
    assert!(text.contains("Answered: 0/4"));
    assert!(text.contains("- group1 [group] Group 1"));
    assert!(text.contains("  - question1 [string] Question 1"));
    Ok(())
}
