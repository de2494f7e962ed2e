use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::enable::{EnableBehavior, EnableWhen};
use crate::spec::item_type::{self, ItemType};
use crate::value::AnswerValue;

/// One selectable value of a choice item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    #[serde(flatten)]
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub initial_selected: bool,
}

impl From<AnswerValue> for AnswerOption {
    fn from(value: AnswerValue) -> Self {
        Self {
            value,
            initial_selected: false,
        }
    }
}

/// One node of the questionnaire tree: a group or an answerable leaf.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "item_type::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ItemType>")]
    pub kind: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub repeats: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer_option: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial: Vec<AnswerValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enable_when: Vec<EnableWhen>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_behavior: Option<EnableBehavior>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<Item>,
}

impl Item {
    pub fn new(link_id: impl Into<String>, kind: ItemType) -> Self {
        Self {
            link_id: Some(link_id.into()),
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.item = items;
        self
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = AnswerValue>) -> Self {
        self.answer_option = options.into_iter().map(AnswerOption::from).collect();
        self
    }

    pub fn with_initial(mut self, initial: Vec<AnswerValue>) -> Self {
        self.initial = initial;
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeats = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// linkId, if present and non-empty.
    pub fn link_id(&self) -> Option<&str> {
        self.link_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Items lacking a linkId or a known type are skipped everywhere.
    pub fn is_collectible(&self) -> bool {
        self.link_id().is_some() && self.kind.is_some()
    }

    pub fn is_group(&self) -> bool {
        self.kind.is_some_and(|kind| kind.is_group())
    }

    pub fn enable_behavior(&self) -> EnableBehavior {
        self.enable_behavior.unwrap_or_default()
    }
}

/// Top-level questionnaire definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<Item>,
}

impl Questionnaire {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            resource_type: Some("Questionnaire".into()),
            item: items,
            ..Self::default()
        }
    }

    /// Identity recorded on responses: `Questionnaire/{id}`, else the canonical url.
    pub fn reference(&self) -> Option<String> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("Questionnaire/{}", id))
            .or_else(|| self.url.clone().filter(|url| !url.is_empty()))
    }
}
