use std::collections::{HashMap, HashSet};

use crate::answers::{ValidationError, ValidationResult};
use crate::coerce::check_value;
use crate::path::ItemPath;
use crate::response::{ResponseDocument, ResponseItem};
use crate::spec::enable::conditions_hold;
use crate::spec::{Item, ItemType, Questionnaire};
use crate::value::AnswerValue;

/// Checks a response document against the questionnaire it claims to answer.
pub fn validate(questionnaire: &Questionnaire, response: &ResponseDocument) -> ValidationResult {
    let mut answers = HashMap::new();
    index_answers(&response.item, &mut answers);
    let disabled = settle(&questionnaire.item, &mut answers);

    let mut checker = Checker {
        disabled,
        errors: Vec::new(),
        missing_required: Vec::new(),
        unknown_fields: Vec::new(),
    };
    checker.check_level(&questionnaire.item, &response.item, &ItemPath::root());

    ValidationResult::finish(
        checker.errors,
        checker.missing_required,
        checker.unknown_fields,
    )
}

fn index_answers<'a>(items: &'a [ResponseItem], answers: &mut HashMap<&'a str, &'a [AnswerValue]>) {
    for item in items {
        answers
            .entry(item.link_id.as_str())
            .or_insert(item.answer.as_slice());
        index_answers(&item.item, answers);
    }
}

/// Drops answers of disabled questions until no further question becomes
/// disabled, so conditions only see answers that could have been submitted.
/// A question disabled in one pass stays disabled. Returns disabled item paths.
fn settle(items: &[Item], answers: &mut HashMap<&str, &[AnswerValue]>) -> HashSet<String> {
    let mut disabled = HashSet::new();
    loop {
        let before = disabled.len();
        let mut first_seen = HashMap::new();
        collect_disabled(
            items,
            &ItemPath::root(),
            answers,
            &mut disabled,
            &mut first_seen,
        );
        if disabled.len() == before {
            return disabled;
        }
        // Conditions read the first item carrying a linkId.
        for (link_id, enabled) in first_seen {
            if !enabled {
                answers.remove(link_id);
            }
        }
    }
}

fn collect_disabled<'q>(
    items: &'q [Item],
    parent: &ItemPath,
    answers: &HashMap<&str, &[AnswerValue]>,
    disabled: &mut HashSet<String>,
    first_seen: &mut HashMap<&'q str, bool>,
) {
    let parent_enabled = parent.is_root() || !disabled.contains(parent.as_str());
    for (link_id, _, item) in collectible(items) {
        let path = parent.child(link_id);
        let enabled = parent_enabled
            && !disabled.contains(path.as_str())
            && conditions_hold(&item.enable_when, item.enable_behavior(), |question| {
                answers.get(question).copied().unwrap_or(&[])
            });
        if !enabled {
            disabled.insert(path.to_string());
        }
        first_seen.entry(link_id).or_insert(enabled);
        collect_disabled(&item.item, &path, answers, disabled, first_seen);
    }
}

struct Checker {
    disabled: HashSet<String>,
    errors: Vec<ValidationError>,
    missing_required: Vec<String>,
    unknown_fields: Vec<String>,
}

impl Checker {
    fn check_level(&mut self, items: &[Item], responses: &[ResponseItem], parent: &ItemPath) {
        let schema = collectible(items);

        let mut last_position: Option<usize> = None;
        for response in responses {
            let path = parent.child(&response.link_id);
            let Some(position) = schema
                .iter()
                .position(|(link_id, _, _)| *link_id == response.link_id)
            else {
                self.unknown_fields.push(path.to_string());
                continue;
            };
            match last_position {
                Some(last) if position == last => self.errors.push(ValidationError::at(
                    path.as_str(),
                    "item appears more than once",
                    "duplicate_item",
                )),
                Some(last) if position < last => self.errors.push(ValidationError::at(
                    path.as_str(),
                    "item is out of questionnaire order",
                    "out_of_order",
                )),
                _ => last_position = Some(position),
            }
            let (_, kind, item) = schema[position];
            self.check_item(item, kind, response, &path);
        }

        for (link_id, kind, item) in &schema {
            if !item.required || !self.enabled(&parent.child(link_id)) {
                continue;
            }
            let answered = responses
                .iter()
                .any(|response| response.link_id == *link_id && (kind.is_group() || !response.answer.is_empty()));
            if !answered {
                self.missing_required.push(parent.child(link_id).to_string());
            }
        }
    }

    fn check_item(&mut self, item: &Item, kind: ItemType, response: &ResponseItem, path: &ItemPath) {
        if !self.enabled(path) {
            self.errors.push(ValidationError::at(
                path.as_str(),
                "item is disabled by its enableWhen conditions",
                "disabled_item",
            ));
        }

        if kind.is_group() {
            if !response.answer.is_empty() {
                self.errors.push(ValidationError::at(
                    path.as_str(),
                    "groups cannot carry answers",
                    "group_answer",
                ));
            }
            self.check_level(&item.item, &response.item, path);
            return;
        }

        if !response.item.is_empty() {
            self.errors.push(ValidationError::at(
                path.as_str(),
                "leaf items cannot contain nested items",
                "leaf_children",
            ));
        }
        if response.answer.len() > 1 && !item.repeats {
            self.errors.push(ValidationError::at(
                path.as_str(),
                "item does not repeat but has several answers",
                "too_many_answers",
            ));
        }
        for answer in &response.answer {
            if let Err(error) = check_value(kind, &item.answer_option, answer) {
                self.errors
                    .push(ValidationError::at(path.as_str(), error.to_string(), error.code()));
            }
        }
    }

    fn enabled(&self, path: &ItemPath) -> bool {
        !self.disabled.contains(path.as_str())
    }
}

/// Collectible items of one level; a repeated linkId keeps its first item.
fn collectible(items: &[Item]) -> Vec<(&str, ItemType, &Item)> {
    let mut schema: Vec<(&str, ItemType, &Item)> = Vec::new();
    for item in items {
        if let (Some(link_id), Some(kind)) = (item.link_id(), item.kind)
            && !schema.iter().any(|(seen, _, _)| *seen == link_id)
        {
            schema.push((link_id, kind, item));
        }
    }
    schema
}
