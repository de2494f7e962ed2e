//! Conversion of raw user input into typed answers.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

use crate::spec::{AnswerOption, ItemType};
use crate::value::{AnswerValue, Quantity};

// Shape gates; chrono checks the calendar and clock ranges.
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").expect("time pattern compiles"));

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?)(Z|[+-]\d{2}:\d{2})?$")
        .expect("date-time pattern compiles")
});

/// Raw input reported by the caller for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerInput {
    /// Text typed into a field; coerced according to the item type.
    Text(String),
    /// Checkbox-style interaction for boolean items.
    Checked(bool),
    /// Value that is already typed, e.g. a resolved attachment.
    Value(AnswerValue),
}

impl AnswerInput {
    fn label(&self) -> &'static str {
        match self {
            AnswerInput::Text(_) => "text",
            AnswerInput::Checked(_) => "checkbox",
            AnswerInput::Value(_) => "typed",
        }
    }
}

impl From<&str> for AnswerInput {
    fn from(text: &str) -> Self {
        AnswerInput::Text(text.to_string())
    }
}

impl From<String> for AnswerInput {
    fn from(text: String) -> Self {
        AnswerInput::Text(text)
    }
}

impl From<bool> for AnswerInput {
    fn from(checked: bool) -> Self {
        AnswerInput::Checked(checked)
    }
}

impl From<AnswerValue> for AnswerInput {
    fn from(value: AnswerValue) -> Self {
        AnswerInput::Value(value)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("'{0}' is not a whole number")]
    InvalidInteger(String),
    #[error("'{0}' is not a number")]
    InvalidDecimal(String),
    #[error("'{0}' is not a date (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("'{0}' is not a date-time (expected YYYY-MM-DDTHH:MM:SS)")]
    InvalidDateTime(String),
    #[error("'{0}' is not a time (expected HH:MM:SS)")]
    InvalidTime(String),
    #[error("'{0}' is not one of the offered options")]
    NotAnOption(String),
    #[error("{kind} items do not accept {input} input")]
    UnsupportedInput { kind: ItemType, input: &'static str },
    #[error("{kind} items do not accept {found} values")]
    TypeMismatch { kind: ItemType, found: &'static str },
}

impl CoercionError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CoercionError::InvalidInteger(_) => "invalid_integer",
            CoercionError::InvalidDecimal(_) => "invalid_decimal",
            CoercionError::InvalidDate(_) => "invalid_date",
            CoercionError::InvalidDateTime(_) => "invalid_date_time",
            CoercionError::InvalidTime(_) => "invalid_time",
            CoercionError::NotAnOption(_) => "not_an_option",
            CoercionError::UnsupportedInput { .. } => "unsupported_input",
            CoercionError::TypeMismatch { .. } => "type_mismatch",
        }
    }
}

/// Coerce `input` for an item of `kind`. `Ok(None)` means the answer is cleared.
pub fn coerce(
    kind: ItemType,
    options: &[AnswerOption],
    input: AnswerInput,
) -> Result<Option<AnswerValue>, CoercionError> {
    match input {
        AnswerInput::Checked(checked) if kind == ItemType::Boolean => {
            Ok(Some(AnswerValue::Boolean(checked)))
        }
        AnswerInput::Text(text) if accepts_text(kind) => coerce_text(kind, options, &text),
        AnswerInput::Value(value) if !kind.is_group() => {
            check_value(kind, options, &value)?;
            Ok(Some(value))
        }
        other => Err(CoercionError::UnsupportedInput {
            kind,
            input: other.label(),
        }),
    }
}

fn accepts_text(kind: ItemType) -> bool {
    !matches!(
        kind,
        ItemType::Group | ItemType::Boolean | ItemType::Attachment | ItemType::Reference
    )
}

fn coerce_text(
    kind: ItemType,
    options: &[AnswerOption],
    raw: &str,
) -> Result<Option<AnswerValue>, CoercionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let value = match kind {
        ItemType::String | ItemType::Text => AnswerValue::String(raw.to_string()),
        ItemType::Integer => AnswerValue::Integer(parse_integer(text)?),
        ItemType::Decimal => AnswerValue::Decimal(parse_decimal(text)?),
        ItemType::Quantity => AnswerValue::Quantity(Quantity {
            value: parse_decimal(text)?,
            unit: None,
        }),
        ItemType::Date => {
            check_date(text)?;
            AnswerValue::Date(text.to_string())
        }
        ItemType::DateTime => {
            check_date_time(text)?;
            AnswerValue::DateTime(text.to_string())
        }
        ItemType::Time => {
            check_time(text)?;
            AnswerValue::Time(text.to_string())
        }
        ItemType::Url => AnswerValue::Url(text.to_string()),
        ItemType::Choice => match_option_text(options, text)
            .map(|option| option.value.clone())
            .ok_or_else(|| CoercionError::NotAnOption(text.to_string()))?,
        ItemType::OpenChoice => match_option_text(options, text)
            .map(|option| option.value.clone())
            .unwrap_or_else(|| AnswerValue::String(text.to_string())),
        ItemType::Group | ItemType::Boolean | ItemType::Attachment | ItemType::Reference => {
            return Err(CoercionError::UnsupportedInput {
                kind,
                input: "text",
            });
        }
    };
    Ok(Some(value))
}

/// Check that an already-typed value fits an item of `kind`.
pub fn check_value(
    kind: ItemType,
    options: &[AnswerOption],
    value: &AnswerValue,
) -> Result<(), CoercionError> {
    match (kind, value) {
        (ItemType::String | ItemType::Text, AnswerValue::String(_))
        | (ItemType::Integer, AnswerValue::Integer(_))
        | (ItemType::Boolean, AnswerValue::Boolean(_))
        | (ItemType::Url, AnswerValue::Url(_))
        | (ItemType::Attachment, AnswerValue::Attachment(_))
        | (ItemType::Reference, AnswerValue::Reference(_)) => Ok(()),
        (ItemType::Decimal, AnswerValue::Decimal(number)) => finite(*number),
        (ItemType::Quantity, AnswerValue::Quantity(quantity)) => finite(quantity.value),
        (ItemType::Date, AnswerValue::Date(text)) => check_date(text),
        (ItemType::DateTime, AnswerValue::DateTime(text)) => check_date_time(text),
        (ItemType::Time, AnswerValue::Time(text)) => check_time(text),
        (ItemType::Choice, value) => find_option(options, value)
            .map(|_| ())
            .ok_or_else(|| CoercionError::NotAnOption(value.label())),
        (ItemType::OpenChoice, value) => {
            if find_option(options, value).is_some() || matches!(value, AnswerValue::String(_)) {
                Ok(())
            } else {
                Err(CoercionError::NotAnOption(value.label()))
            }
        }
        (kind, value) => Err(CoercionError::TypeMismatch {
            kind,
            found: value.type_name(),
        }),
    }
}

/// Option whose value is the same option as `value`.
pub fn find_option<'a>(options: &'a [AnswerOption], value: &AnswerValue) -> Option<&'a AnswerOption> {
    options.iter().find(|option| option.value.same_option(value))
}

fn match_option_text<'a>(options: &'a [AnswerOption], text: &str) -> Option<&'a AnswerOption> {
    options.iter().find(|option| {
        option.value.label().eq_ignore_ascii_case(text)
            || matches!(&option.value, AnswerValue::Coding(coding) if coding.code.eq_ignore_ascii_case(text))
    })
}

fn finite(number: f64) -> Result<(), CoercionError> {
    if number.is_finite() {
        Ok(())
    } else {
        Err(CoercionError::InvalidDecimal(number.to_string()))
    }
}

pub fn parse_integer(text: &str) -> Result<i64, CoercionError> {
    text.parse::<i64>()
        .map_err(|_| CoercionError::InvalidInteger(text.to_string()))
}

pub fn parse_decimal(text: &str) -> Result<f64, CoercionError> {
    text.parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| CoercionError::InvalidDecimal(text.to_string()))
}

pub fn check_date(text: &str) -> Result<(), CoercionError> {
    if DATE.is_match(text) && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(CoercionError::InvalidDate(text.to_string()))
    }
}

pub fn check_time(text: &str) -> Result<(), CoercionError> {
    if TIME.is_match(text) && NaiveTime::parse_from_str(text, "%H:%M:%S").is_ok() {
        Ok(())
    } else {
        Err(CoercionError::InvalidTime(text.to_string()))
    }
}

/// Local date-time with optional seconds and fraction, optionally followed
/// by `Z` or a `+HH:MM` offset.
pub fn check_date_time(text: &str) -> Result<(), CoercionError> {
    let valid = DATE_TIME.captures(text).is_some_and(|caps| {
        let local = &caps[1];
        let local_ok = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(local, format).is_ok());
        let offset_ok = caps.get(2).is_none_or(|offset| {
            DateTime::parse_from_rfc3339(&format!("1970-01-01T00:00:00{}", offset.as_str())).is_ok()
        });
        local_ok && offset_ok
    });
    if valid {
        Ok(())
    } else {
        Err(CoercionError::InvalidDateTime(text.to_string()))
    }
}
