use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// File metadata plus the locator an upload collaborator resolved for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Opaque reference string such as `Practitioner/123`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Reference {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            display: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quantity {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Coded option value. Two codings are the same option when system and code agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A single typed answer. Serialized as a one-key object, e.g. `{"valueString": "a1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum AnswerValue {
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueInteger")]
    Integer(i64),
    #[serde(rename = "valueDecimal")]
    Decimal(f64),
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueDate")]
    Date(String),
    #[serde(rename = "valueDateTime")]
    DateTime(String),
    #[serde(rename = "valueTime")]
    Time(String),
    #[serde(rename = "valueUri")]
    Url(String),
    #[serde(rename = "valueAttachment")]
    Attachment(Attachment),
    #[serde(rename = "valueReference")]
    Reference(Reference),
    #[serde(rename = "valueQuantity")]
    Quantity(Quantity),
    #[serde(rename = "valueCoding")]
    Coding(Coding),
}

impl AnswerValue {
    /// Variant label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::DateTime(_) => "dateTime",
            Self::Time(_) => "time",
            Self::Url(_) => "url",
            Self::Attachment(_) => "attachment",
            Self::Reference(_) => "reference",
            Self::Quantity(_) => "quantity",
            Self::Coding(_) => "coding",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text)
            | Self::Date(text)
            | Self::DateTime(text)
            | Self::Time(text)
            | Self::Url(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view shared by integer, decimal and quantity answers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Decimal(value) => Some(*value),
            Self::Quantity(quantity) => Some(quantity.value),
            _ => None,
        }
    }

    /// Label a user would see or type for this value when it is offered as an option.
    pub fn label(&self) -> String {
        match self {
            Self::Coding(coding) => coding
                .display
                .clone()
                .unwrap_or_else(|| coding.code.clone()),
            Self::Reference(reference) => reference
                .display
                .clone()
                .unwrap_or_else(|| reference.reference.clone()),
            Self::Attachment(attachment) => attachment
                .title
                .clone()
                .or_else(|| attachment.url.clone())
                .unwrap_or_default(),
            other => other.to_string(),
        }
    }

    /// Option identity: codings match on system + code, everything else on equality.
    pub fn same_option(&self, other: &AnswerValue) -> bool {
        match (self, other) {
            (Self::Coding(left), Self::Coding(right)) => {
                left.code == right.code && left.system == right.system
            }
            (left, right) => left == right,
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(text)
            | Self::Date(text)
            | Self::DateTime(text)
            | Self::Time(text)
            | Self::Url(text) => write!(f, "{}", text),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Decimal(value) => write!(f, "{}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Attachment(attachment) => write!(
                f,
                "{} ({})",
                attachment.title.as_deref().unwrap_or("attachment"),
                attachment.url.as_deref().unwrap_or("<no url>")
            ),
            Self::Reference(reference) => write!(f, "{}", reference.reference),
            Self::Quantity(quantity) => match &quantity.unit {
                Some(unit) => write!(f, "{} {}", quantity.value, unit),
                None => write!(f, "{}", quantity.value),
            },
            Self::Coding(coding) => match &coding.system {
                Some(system) => write!(f, "{}|{}", system, coding.code),
                None => write!(f, "{}", coding.code),
            },
        }
    }
}

impl From<String> for AnswerValue {
    fn from(text: String) -> Self {
        Self::String(text)
    }
}

impl From<&str> for AnswerValue {
    fn from(text: &str) -> Self {
        Self::String(text.to_string())
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Attachment> for AnswerValue {
    fn from(attachment: Attachment) -> Self {
        Self::Attachment(attachment)
    }
}

impl From<Reference> for AnswerValue {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

impl From<Coding> for AnswerValue {
    fn from(coding: Coding) -> Self {
        Self::Coding(coding)
    }
}
