use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::value::AnswerValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum EnableOperator {
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

/// How several `enableWhen` conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnableBehavior {
    #[default]
    All,
    Any,
}

/// Condition on another question's answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnableWhen {
    /// linkId of the question the condition reads.
    pub question: String,
    pub operator: EnableOperator,
    /// Value compared against; for `exists` a boolean.
    pub answer: AnswerValue,
}

impl EnableWhen {
    /// Evaluates the condition against the referenced question's answers.
    pub fn evaluate(&self, answers: &[AnswerValue]) -> bool {
        match self.operator {
            EnableOperator::Exists => {
                let expected = self.answer.as_bool().unwrap_or(true);
                !answers.is_empty() == expected
            }
            EnableOperator::Equal => answers.iter().any(|answer| answer.same_option(&self.answer)),
            EnableOperator::NotEqual => {
                !answers.is_empty() && answers.iter().all(|answer| !answer.same_option(&self.answer))
            }
            EnableOperator::Greater => self.any_ordering(answers, |ord| ord == Ordering::Greater),
            EnableOperator::Less => self.any_ordering(answers, |ord| ord == Ordering::Less),
            EnableOperator::GreaterOrEqual => {
                self.any_ordering(answers, |ord| ord != Ordering::Less)
            }
            EnableOperator::LessOrEqual => {
                self.any_ordering(answers, |ord| ord != Ordering::Greater)
            }
        }
    }

    fn any_ordering(&self, answers: &[AnswerValue], accept: impl Fn(Ordering) -> bool) -> bool {
        answers
            .iter()
            .filter_map(|answer| compare(answer, &self.answer))
            .any(accept)
    }
}

/// Orders numbers numerically and same-kind textual values lexically.
fn compare(left: &AnswerValue, right: &AnswerValue) -> Option<Ordering> {
    if let (Some(left), Some(right)) = (left.as_number(), right.as_number()) {
        return left.partial_cmp(&right);
    }
    if std::mem::discriminant(left) != std::mem::discriminant(right) {
        return None;
    }
    match (left.as_str(), right.as_str()) {
        (Some(left), Some(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

/// Combines conditions with their behavior. An empty list always enables.
pub fn conditions_hold<'a>(
    conditions: &[EnableWhen],
    behavior: EnableBehavior,
    answers_for: impl Fn(&str) -> &'a [AnswerValue],
) -> bool {
    if conditions.is_empty() {
        return true;
    }
    let mut results = conditions
        .iter()
        .map(|condition| condition.evaluate(answers_for(&condition.question)));
    match behavior {
        EnableBehavior::All => results.all(|held| held),
        EnableBehavior::Any => results.any(|held| held),
    }
}
