//! Mutable answer state for one questionnaire session.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::answers::{ValidationError, ValidationResult};
use crate::coerce::{AnswerInput, CoercionError, check_value, coerce, find_option};
use crate::enablement::{EnablementMap, is_enabled, resolve_enablement};
use crate::path::ItemPath;
use crate::resolver::{FileUpload, ReferenceResolver, ResolveError, UploadResolver};
use crate::response::{RESPONSE_RESOURCE_TYPE, ResponseDocument, ResponseItem, ResponseStatus};
use crate::spec::enable::conditions_hold;
use crate::spec::{AnswerOption, EnableBehavior, EnableWhen, Item, ItemType, Questionnaire};
use crate::validate::validate;
use crate::value::{AnswerValue, Reference};

/// Input for one item that could not be coerced. The previous answer is kept.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("answer for '{path}' rejected: {error}")]
pub struct Rejection {
    pub path: ItemPath,
    pub error: CoercionError,
}

impl Rejection {
    pub fn to_validation_error(&self) -> ValidationError {
        ValidationError::at(self.path.as_str(), self.error.to_string(), self.error.code())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no collectible item '{0}'")]
    UnknownItem(String),
    #[error("linkId '{key}' is shared by {count} items; address it by path")]
    AmbiguousLinkId { key: String, count: usize },
    #[error("'{0}' is a group and holds no answers")]
    GroupNotAnswerable(String),
    #[error("'{key}' is a {kind} item, not a choice")]
    NotAChoice { key: String, kind: ItemType },
    #[error("'{key}' is a {kind} item, not {expected}")]
    WrongItemType {
        key: String,
        kind: ItemType,
        expected: ItemType,
    },
    #[error("'{value}' is not an option of '{key}'")]
    UnknownOption { key: String, value: String },
    #[error("answer index {index} is out of range for '{key}' ({len} answers)")]
    IndexOutOfRange {
        key: String,
        index: usize,
        len: usize,
    },
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Resolver(#[from] ResolveError),
}

/// Answer slot of one collectible leaf item.
#[derive(Debug, Clone)]
pub struct Leaf {
    path: ItemPath,
    link_id: String,
    text: Option<String>,
    kind: ItemType,
    required: bool,
    repeats: bool,
    options: Vec<AnswerOption>,
    answers: Vec<AnswerValue>,
    rejection: Option<Rejection>,
}

impl Leaf {
    fn from_item(item: &Item, link_id: &str, kind: ItemType, path: ItemPath) -> Self {
        Self {
            path,
            link_id: link_id.to_string(),
            text: item.text.clone(),
            kind,
            required: item.required,
            repeats: item.repeats,
            options: item.answer_option.clone(),
            answers: Vec::new(),
            rejection: None,
        }
    }

    pub fn path(&self) -> &ItemPath {
        &self.path
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn kind(&self) -> ItemType {
        self.kind
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn repeats(&self) -> bool {
        self.repeats
    }

    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// Stored answers, including ones currently shadowed by a rejection.
    pub fn answers(&self) -> &[AnswerValue] {
        &self.answers
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    /// Answers that count for submission: none while the field is rejected.
    pub fn effective_answers(&self) -> &[AnswerValue] {
        if self.rejection.is_some() {
            &[]
        } else {
            &self.answers
        }
    }

    fn seed_initial(&mut self, item: &Item) {
        // First initial wins, even for repeating items.
        let candidates: Vec<AnswerValue> = match item.initial.first() {
            Some(first) => vec![first.clone()],
            None => item
                .answer_option
                .iter()
                .filter(|option| option.initial_selected)
                .map(|option| option.value.clone())
                .collect(),
        };
        let limit = if self.repeats { candidates.len() } else { 1 };
        self.answers = self.accepted(candidates.iter(), "initial").take(limit).collect();
    }

    fn seed_prior(&mut self, answers: &[AnswerValue]) {
        let limit = if self.repeats { answers.len() } else { 1 };
        self.answers = self.accepted(answers.iter(), "prior").take(limit).collect();
    }

    fn accepted<'a>(
        &'a self,
        values: impl Iterator<Item = &'a AnswerValue> + 'a,
        origin: &'static str,
    ) -> impl Iterator<Item = AnswerValue> + 'a {
        values.filter_map(move |value| match check_value(self.kind, &self.options, value) {
            Ok(()) => Some(value.clone()),
            Err(error) => {
                warn!(path = %self.path, origin, %error, "dropping seed answer");
                None
            }
        })
    }

    fn coerce(&mut self, input: AnswerInput) -> Result<Option<AnswerValue>, Rejection> {
        match coerce(self.kind, &self.options, input) {
            Ok(value) => {
                self.rejection = None;
                Ok(value)
            }
            Err(error) => {
                debug!(path = %self.path, %error, "input rejected");
                let rejection = Rejection {
                    path: self.path.clone(),
                    error,
                };
                self.rejection = Some(rejection.clone());
                Err(rejection)
            }
        }
    }

    fn holds_option(&self, value: &AnswerValue) -> bool {
        self.answers.iter().any(|answer| answer.same_option(value))
    }
}

/// Conditions gating one item.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnableRule {
    conditions: Vec<EnableWhen>,
    behavior: EnableBehavior,
}

impl EnableRule {
    fn of(item: &Item) -> Self {
        Self {
            conditions: item.enable_when.clone(),
            behavior: item.enable_behavior(),
        }
    }

    pub(crate) fn holds<'a>(&self, answers_for: impl Fn(&str) -> &'a [AnswerValue]) -> bool {
        conditions_hold(&self.conditions, self.behavior, answers_for)
    }
}

/// Collectible skeleton of the questionnaire, built once at construction.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Group {
        link_id: String,
        text: Option<String>,
        path: ItemPath,
        required: bool,
        rule: EnableRule,
        children: Vec<Node>,
    },
    Leaf {
        slot: usize,
        rule: EnableRule,
    },
}

impl Node {
    pub(crate) fn path<'a>(&'a self, leaves: &'a [Leaf]) -> &'a ItemPath {
        match self {
            Node::Group { path, .. } => path,
            Node::Leaf { slot, .. } => &leaves[*slot].path,
        }
    }

    pub(crate) fn link_id<'a>(&'a self, leaves: &'a [Leaf]) -> &'a str {
        match self {
            Node::Group { link_id, .. } => link_id,
            Node::Leaf { slot, .. } => &leaves[*slot].link_id,
        }
    }

    pub(crate) fn rule(&self) -> &EnableRule {
        match self {
            Node::Group { rule, .. } | Node::Leaf { rule, .. } => rule,
        }
    }
}

/// Form state engine: one answer slot per collectible leaf, addressed by
/// linkId or by full item path.
#[derive(Debug, Clone)]
pub struct FormEngine {
    questionnaire: Questionnaire,
    nodes: Vec<Node>,
    leaves: Vec<Leaf>,
    by_path: HashMap<String, usize>,
    by_link_id: HashMap<String, Vec<usize>>,
    groups: HashSet<String>,
    paths: HashSet<String>,
    source: Option<Reference>,
}

impl FormEngine {
    /// Engine seeded from each leaf's `initial` values.
    pub fn new(questionnaire: Questionnaire) -> Self {
        Self::build(questionnaire, None)
    }

    /// Engine seeded from a previously submitted response instead of `initial` values.
    pub fn with_response(questionnaire: Questionnaire, prior: &ResponseDocument) -> Self {
        Self::build(questionnaire, Some(prior))
    }

    fn build(questionnaire: Questionnaire, prior: Option<&ResponseDocument>) -> Self {
        let mut engine = Self {
            questionnaire: Questionnaire::default(),
            nodes: Vec::new(),
            leaves: Vec::new(),
            by_path: HashMap::new(),
            by_link_id: HashMap::new(),
            groups: HashSet::new(),
            paths: HashSet::new(),
            source: None,
        };
        let seed_initial = prior.is_none();
        engine.nodes = engine.plan(&questionnaire.item, &ItemPath::root(), seed_initial);
        if let Some(prior) = prior {
            let nodes = std::mem::take(&mut engine.nodes);
            engine.seed_level(&nodes, &prior.item);
            engine.nodes = nodes;
        }
        let reference = questionnaire.reference();
        engine.questionnaire = questionnaire;
        debug!(
            questionnaire = reference.as_deref().unwrap_or("<anonymous>"),
            leaves = engine.leaves.len(),
            seeded_from_prior = !seed_initial,
            "form engine ready"
        );
        engine
    }

    fn plan(&mut self, items: &[Item], parent: &ItemPath, seed_initial: bool) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut seen = HashSet::new();
        for item in items {
            let (Some(link_id), Some(kind)) = (item.link_id(), item.kind) else {
                trace!(%parent, link_id = ?item.link_id, text = ?item.text, "skipping non-collectible item");
                continue;
            };
            if !seen.insert(link_id) {
                warn!(%parent, link_id, "duplicate linkId in scope; later item ignored");
                continue;
            }
            let path = parent.child(link_id);
            // A linkId containing the separator can spell another item's path.
            if !self.paths.insert(path.as_str().to_string()) {
                warn!(%path, link_id, "item path already taken; later item ignored");
                continue;
            }
            let rule = EnableRule::of(item);

            if kind.is_group() {
                let children = self.plan(&item.item, &path, seed_initial);
                self.groups.insert(path.as_str().to_string());
                self.groups.insert(link_id.to_string());
                nodes.push(Node::Group {
                    link_id: link_id.to_string(),
                    text: item.text.clone(),
                    path,
                    required: item.required,
                    rule,
                    children,
                });
                continue;
            }

            if !item.item.is_empty() {
                warn!(%path, "children of a non-group item are ignored");
            }
            let mut leaf = Leaf::from_item(item, link_id, kind, path);
            if seed_initial {
                leaf.seed_initial(item);
            }
            let slot = self.leaves.len();
            self.by_path.insert(leaf.path.as_str().to_string(), slot);
            self.by_link_id
                .entry(link_id.to_string())
                .or_default()
                .push(slot);
            self.leaves.push(leaf);
            nodes.push(Node::Leaf { slot, rule });
        }
        nodes
    }

    fn seed_level(&mut self, nodes: &[Node], prior: &[ResponseItem]) {
        for node in nodes {
            let link_id = node.link_id(&self.leaves);
            let Some(previous) = prior.iter().find(|item| item.link_id == link_id) else {
                continue;
            };
            match node {
                Node::Group { children, .. } => self.seed_level(children, &previous.item),
                Node::Leaf { slot, .. } => self.leaves[*slot].seed_prior(&previous.answer),
            }
        }
    }

    fn locate(&self, key: &str) -> Result<usize, EngineError> {
        if let Some(&slot) = self.by_path.get(key) {
            return Ok(slot);
        }
        match self.by_link_id.get(key).map(Vec::as_slice) {
            Some([slot]) => Ok(*slot),
            Some(slots) if slots.len() > 1 => Err(EngineError::AmbiguousLinkId {
                key: key.to_string(),
                count: slots.len(),
            }),
            _ if self.groups.contains(key) => {
                Err(EngineError::GroupNotAnswerable(key.to_string()))
            }
            _ => Err(EngineError::UnknownItem(key.to_string())),
        }
    }

    /// Record user input for a leaf. Single-answer items are overwritten,
    /// repeating items gain another answer.
    pub fn set_answer(
        &mut self,
        key: &str,
        input: impl Into<AnswerInput>,
    ) -> Result<(), EngineError> {
        let slot = self.locate(key)?;
        let leaf = &mut self.leaves[slot];
        match leaf.coerce(input.into())? {
            None => leaf.answers.clear(),
            Some(value) if leaf.repeats => {
                if !(leaf.kind.is_choice() && leaf.holds_option(&value)) {
                    leaf.answers.push(value);
                }
            }
            Some(value) => leaf.answers = vec![value],
        }
        debug!(path = %leaf.path, answers = leaf.answers.len(), "answer set");
        Ok(())
    }

    /// Replace the answer at `index`; `index == len` appends. Blank text removes it.
    pub fn set_answer_at(
        &mut self,
        key: &str,
        index: usize,
        input: impl Into<AnswerInput>,
    ) -> Result<(), EngineError> {
        let slot = self.locate(key)?;
        let leaf = &mut self.leaves[slot];
        let len = leaf.answers.len();
        let last_allowed = if leaf.repeats { len } else { 0 };
        if index > last_allowed {
            return Err(EngineError::IndexOutOfRange {
                key: key.to_string(),
                index,
                len,
            });
        }
        match leaf.coerce(input.into())? {
            None if index < len => {
                leaf.answers.remove(index);
            }
            None => {}
            Some(value) if index < len => leaf.answers[index] = value,
            Some(value) => leaf.answers.push(value),
        }
        debug!(path = %leaf.path, index, answers = leaf.answers.len(), "answer set at index");
        Ok(())
    }

    /// Checkbox interaction for boolean items.
    pub fn set_checked(&mut self, key: &str, checked: bool) -> Result<(), EngineError> {
        self.set_answer(key, AnswerInput::Checked(checked))
    }

    /// Drop every answer and any pending rejection for a leaf.
    pub fn clear_answer(&mut self, key: &str) -> Result<(), EngineError> {
        let slot = self.locate(key)?;
        let leaf = &mut self.leaves[slot];
        leaf.answers.clear();
        leaf.rejection = None;
        debug!(path = %leaf.path, "answer cleared");
        Ok(())
    }

    /// Select or deselect one option of a choice item. Non-repeating items
    /// keep at most one selection.
    pub fn toggle_option(
        &mut self,
        key: &str,
        value: impl Into<AnswerValue>,
        selected: bool,
    ) -> Result<(), EngineError> {
        let slot = self.locate(key)?;
        let leaf = &mut self.leaves[slot];
        if !leaf.kind.is_choice() {
            return Err(EngineError::NotAChoice {
                key: key.to_string(),
                kind: leaf.kind,
            });
        }
        let value = value.into();
        let option = match find_option(&leaf.options, &value) {
            Some(option) => option.value.clone(),
            None if leaf.kind == ItemType::OpenChoice && matches!(value, AnswerValue::String(_)) => {
                value
            }
            None => {
                return Err(EngineError::UnknownOption {
                    key: key.to_string(),
                    value: value.label(),
                });
            }
        };

        leaf.rejection = None;
        if selected {
            if !leaf.repeats {
                leaf.answers.clear();
            }
            if !leaf.holds_option(&option) {
                leaf.answers.push(option);
            }
        } else {
            leaf.answers.retain(|answer| !answer.same_option(&option));
        }
        debug!(path = %leaf.path, selected, answers = leaf.answers.len(), "option toggled");
        Ok(())
    }

    /// Hand a file to the upload collaborator and store the attachment it returns.
    pub fn attach_upload(
        &mut self,
        key: &str,
        resolver: &dyn UploadResolver,
        upload: &FileUpload,
    ) -> Result<(), EngineError> {
        self.expect_kind(key, ItemType::Attachment)?;
        let attachment = resolver.resolve(upload)?;
        self.set_answer(key, AnswerValue::Attachment(attachment))
    }

    /// Ask the reference collaborator for a canonical reference and store it.
    pub fn resolve_reference(
        &mut self,
        key: &str,
        resolver: &dyn ReferenceResolver,
        resource_type: &str,
        input: &str,
    ) -> Result<(), EngineError> {
        self.expect_kind(key, ItemType::Reference)?;
        let reference = resolver.resolve(resource_type, input)?;
        self.set_answer(key, AnswerValue::Reference(Reference::new(reference)))
    }

    fn expect_kind(&self, key: &str, expected: ItemType) -> Result<(), EngineError> {
        let kind = self.leaves[self.locate(key)?].kind;
        if kind == expected {
            Ok(())
        } else {
            Err(EngineError::WrongItemType {
                key: key.to_string(),
                kind,
                expected,
            })
        }
    }

    /// Current (first) answer for controlled inputs.
    pub fn answer(&self, key: &str) -> Option<&AnswerValue> {
        self.answers(key).first()
    }

    pub fn answers(&self, key: &str) -> &[AnswerValue] {
        self.locate(key)
            .map(|slot| self.leaves[slot].answers())
            .unwrap_or(&[])
    }

    pub fn leaf(&self, key: &str) -> Result<&Leaf, EngineError> {
        self.locate(key).map(|slot| &self.leaves[slot])
    }

    pub fn rejection(&self, key: &str) -> Option<&Rejection> {
        self.leaf(key).ok().and_then(Leaf::rejection)
    }

    pub fn rejections(&self) -> impl Iterator<Item = &Rejection> {
        self.leaves.iter().filter_map(Leaf::rejection)
    }

    /// Leaves in schema order.
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn source(&self) -> Option<&Reference> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Option<Reference>) {
        self.source = source;
    }

    pub fn with_source(mut self, source: Reference) -> Self {
        self.source = Some(source);
        self
    }

    /// First leaf carrying `link_id`; the one `enableWhen` conditions read.
    pub fn leaf_for_link_id(&self, link_id: &str) -> Option<&Leaf> {
        self.by_link_id
            .get(link_id)
            .and_then(|slots| slots.first())
            .map(|slot| &self.leaves[*slot])
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Completed response reflecting the current state.
    pub fn submit(&self) -> ResponseDocument {
        self.snapshot(ResponseStatus::Completed)
    }

    /// Same snapshot as [`FormEngine::submit`], marked in-progress.
    pub fn draft(&self) -> ResponseDocument {
        self.snapshot(ResponseStatus::InProgress)
    }

    fn snapshot(&self, status: ResponseStatus) -> ResponseDocument {
        let enablement = resolve_enablement(self);
        let item = self.collect(&self.nodes, &enablement);
        debug!(status = status.as_str(), top_level = item.len(), "response assembled");
        ResponseDocument {
            resource_type: RESPONSE_RESOURCE_TYPE.to_string(),
            questionnaire: self.questionnaire.reference(),
            source: self.source.clone(),
            status,
            item,
        }
    }

    // Groups without an emitted descendant are left out.
    fn collect(&self, nodes: &[Node], enablement: &EnablementMap) -> Vec<ResponseItem> {
        nodes
            .iter()
            .filter(|node| is_enabled(enablement, node.path(&self.leaves)))
            .filter_map(|node| match node {
                Node::Group {
                    link_id,
                    text,
                    children,
                    ..
                } => {
                    let children = self.collect(children, enablement);
                    (!children.is_empty())
                        .then(|| ResponseItem::group(link_id.clone(), text.clone(), children))
                }
                Node::Leaf { slot, .. } => {
                    let leaf = &self.leaves[*slot];
                    let answers = leaf.effective_answers();
                    (!answers.is_empty()).then(|| {
                        ResponseItem::leaf(leaf.link_id.clone(), leaf.text.clone(), answers.to_vec())
                    })
                }
            })
            .collect()
    }

    /// Checks the current submission and reports pending rejections.
    pub fn validation(&self) -> ValidationResult {
        let mut result = validate(&self.questionnaire, &self.submit());
        let rejected: Vec<ValidationError> = self
            .rejections()
            .map(Rejection::to_validation_error)
            .collect();
        if !rejected.is_empty() {
            result.errors.extend(rejected);
            result.valid = false;
        }
        result
    }
}
