use schemars::schema_for;
use serde_json::Value;

use crate::answers::ValidationResult;
use crate::response::ResponseDocument;
use crate::spec::Questionnaire;

/// JSON Schema describing questionnaire documents.
pub fn questionnaire_schema() -> Result<Value, serde_json::Error> {
    serde_json::to_value(schema_for!(Questionnaire))
}

/// JSON Schema describing submitted responses.
pub fn response_schema() -> Result<Value, serde_json::Error> {
    serde_json::to_value(schema_for!(ResponseDocument))
}

pub fn validation_result_schema() -> Result<Value, serde_json::Error> {
    serde_json::to_value(schema_for!(ValidationResult))
}
