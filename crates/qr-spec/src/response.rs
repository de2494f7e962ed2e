use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::value::{AnswerValue, Reference};

pub const RESPONSE_RESOURCE_TYPE: &str = "QuestionnaireResponse";

fn response_resource_type() -> String {
    RESPONSE_RESOURCE_TYPE.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseStatus {
    InProgress,
    #[default]
    Completed,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::InProgress => "in-progress",
            ResponseStatus::Completed => "completed",
        }
    }
}

/// Response node for one collectible item. Leaves carry `answer`, groups carry `item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    pub link_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer: Vec<AnswerValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<ResponseItem>,
}

impl ResponseItem {
    pub fn leaf(link_id: impl Into<String>, text: Option<String>, answer: Vec<AnswerValue>) -> Self {
        Self {
            link_id: link_id.into(),
            text,
            answer,
            item: Vec::new(),
        }
    }

    pub fn group(link_id: impl Into<String>, text: Option<String>, item: Vec<ResponseItem>) -> Self {
        Self {
            link_id: link_id.into(),
            text,
            answer: Vec::new(),
            item,
        }
    }
}

/// Submitted answers, nested the same way as the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    #[serde(default = "response_resource_type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Reference>,
    #[serde(default)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub item: Vec<ResponseItem>,
}

impl Default for ResponseDocument {
    fn default() -> Self {
        Self {
            resource_type: response_resource_type(),
            questionnaire: None,
            source: None,
            status: ResponseStatus::default(),
            item: Vec::new(),
        }
    }
}

impl ResponseDocument {
    /// First answer recorded for `link_id`, searching depth-first.
    pub fn find_answer(&self, link_id: &str) -> Option<&AnswerValue> {
        self.find_item(link_id).and_then(|item| item.answer.first())
    }

    /// First response item carrying `link_id`, searching depth-first.
    pub fn find_item(&self, link_id: &str) -> Option<&ResponseItem> {
        fn search<'a>(items: &'a [ResponseItem], link_id: &str) -> Option<&'a ResponseItem> {
            items.iter().find_map(|item| {
                if item.link_id == link_id {
                    Some(item)
                } else {
                    search(&item.item, link_id)
                }
            })
        }
        search(&self.item, link_id)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}
