use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Declared kind of a questionnaire item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Group,
    String,
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Url,
    Choice,
    OpenChoice,
    Attachment,
    Reference,
    Quantity,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Group => "group",
            ItemType::String => "string",
            ItemType::Text => "text",
            ItemType::Integer => "integer",
            ItemType::Decimal => "decimal",
            ItemType::Boolean => "boolean",
            ItemType::Date => "date",
            ItemType::DateTime => "dateTime",
            ItemType::Time => "time",
            ItemType::Url => "url",
            ItemType::Choice => "choice",
            ItemType::OpenChoice => "openChoice",
            ItemType::Attachment => "attachment",
            ItemType::Reference => "reference",
            ItemType::Quantity => "quantity",
        }
    }

    /// Parses a schema label. Unknown and empty labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let kind = match label {
            "group" => ItemType::Group,
            "string" => ItemType::String,
            "text" => ItemType::Text,
            "integer" => ItemType::Integer,
            "decimal" => ItemType::Decimal,
            "boolean" => ItemType::Boolean,
            "date" => ItemType::Date,
            "dateTime" => ItemType::DateTime,
            "time" => ItemType::Time,
            "url" => ItemType::Url,
            "choice" => ItemType::Choice,
            "openChoice" => ItemType::OpenChoice,
            "attachment" => ItemType::Attachment,
            "reference" => ItemType::Reference,
            "quantity" => ItemType::Quantity,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ItemType::Group)
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, ItemType::Choice | ItemType::OpenChoice)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads `type` without failing on labels the engine does not know.
pub(crate) fn lenient<'de, D>(deserializer: D) -> Result<Option<ItemType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ItemType::from_label))
}
