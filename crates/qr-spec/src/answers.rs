use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One problem found while checking answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValidationError {
    pub fn at(path: &str, message: impl Into<String>, code: &str) -> Self {
        Self {
            link_id: path.rsplit('/').next().map(str::to_string),
            path: Some(format!("/{}", path)),
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    #[serde(default)]
    pub missing_required: Vec<String>,
    #[serde(default)]
    pub unknown_fields: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn finish(
        errors: Vec<ValidationError>,
        missing_required: Vec<String>,
        unknown_fields: Vec<String>,
    ) -> Self {
        Self {
            valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
            errors,
            missing_required,
            unknown_fields,
        }
    }
}
