use serde_json::{Map, Value, json};

use crate::enablement::{EnablementMap, is_enabled, resolve_enablement};
use crate::engine::{FormEngine, Node};
use crate::spec::ItemType;
use crate::value::AnswerValue;

/// One collectible item as the engine currently sees it.
#[derive(Debug, Clone)]
pub struct OutlineEntry {
    pub path: String,
    pub link_id: String,
    pub kind: ItemType,
    pub text: Option<String>,
    pub depth: usize,
    pub required: bool,
    pub enabled: bool,
    pub answers: Vec<AnswerValue>,
    pub rejection: Option<String>,
}

/// Snapshot of the whole form for text and JSON views.
#[derive(Debug, Clone)]
pub struct Outline {
    pub title: Option<String>,
    pub questionnaire: Option<String>,
    pub answered: usize,
    pub total: usize,
    pub entries: Vec<OutlineEntry>,
}

pub fn build_outline(engine: &FormEngine) -> Outline {
    let enablement = resolve_enablement(engine);
    let mut entries = Vec::new();
    push_entries(engine, engine.nodes(), &enablement, &mut entries);

    let leaves = entries.iter().filter(|entry| !entry.kind.is_group());
    let total = leaves.clone().filter(|entry| entry.enabled).count();
    let answered = leaves
        .filter(|entry| entry.enabled && !entry.answers.is_empty() && entry.rejection.is_none())
        .count();

    Outline {
        title: engine.questionnaire().title.clone(),
        questionnaire: engine.questionnaire().reference(),
        answered,
        total,
        entries,
    }
}

fn push_entries(
    engine: &FormEngine,
    nodes: &[Node],
    enablement: &EnablementMap,
    entries: &mut Vec<OutlineEntry>,
) {
    for node in nodes {
        let path = node.path(engine.leaves());
        let enabled = is_enabled(enablement, path);
        match node {
            Node::Group {
                link_id,
                text,
                required,
                children,
                ..
            } => {
                entries.push(OutlineEntry {
                    path: path.to_string(),
                    link_id: link_id.clone(),
                    kind: ItemType::Group,
                    text: text.clone(),
                    depth: path.depth(),
                    required: *required,
                    enabled,
                    answers: Vec::new(),
                    rejection: None,
                });
                push_entries(engine, children, enablement, entries);
            }
            Node::Leaf { slot, .. } => {
                let leaf = &engine.leaves()[*slot];
                entries.push(OutlineEntry {
                    path: path.to_string(),
                    link_id: leaf.link_id().to_string(),
                    kind: leaf.kind(),
                    text: leaf.text().map(str::to_string),
                    depth: path.depth(),
                    required: leaf.required(),
                    enabled,
                    answers: leaf.answers().to_vec(),
                    rejection: leaf.rejection().map(|rejection| rejection.error.to_string()),
                });
            }
        }
    }
}

/// Render the outline as indented human-friendly text.
pub fn render_text(outline: &Outline) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Form: {} ({})",
        outline.title.as_deref().unwrap_or("untitled"),
        outline.questionnaire.as_deref().unwrap_or("no id")
    ));
    lines.push(format!("Answered: {}/{}", outline.answered, outline.total));

    for entry in &outline.entries {
        let indent = "  ".repeat(entry.depth.saturating_sub(1));
        let mut line = format!(
            "{}- {} [{}] {}",
            indent,
            entry.link_id,
            entry.kind,
            entry.text.as_deref().unwrap_or("")
        );
        if entry.required {
            line.push_str(" *");
        }
        if !entry.enabled {
            line.push_str(" (disabled)");
        }
        if !entry.answers.is_empty() {
            let values = entry
                .answers
                .iter()
                .map(AnswerValue::to_string)
                .collect::<Vec<_>>();
            line.push_str(&format!(" = {}", values.join(", ")));
        }
        if let Some(rejection) = &entry.rejection {
            line.push_str(&format!(" !! {}", rejection));
        }
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

/// Render the outline as a JSON value.
pub fn render_json(outline: &Outline) -> Value {
    let entries = outline
        .entries
        .iter()
        .map(|entry| {
            let mut map = Map::new();
            map.insert("path".into(), Value::String(entry.path.clone()));
            map.insert("linkId".into(), Value::String(entry.link_id.clone()));
            map.insert("type".into(), Value::String(entry.kind.as_str().into()));
            if let Some(text) = &entry.text {
                map.insert("text".into(), Value::String(text.clone()));
            }
            map.insert("required".into(), Value::Bool(entry.required));
            map.insert("enabled".into(), Value::Bool(entry.enabled));
            if !entry.answers.is_empty() {
                map.insert(
                    "answer".into(),
                    serde_json::to_value(&entry.answers).unwrap_or(Value::Null),
                );
            }
            if let Some(rejection) = &entry.rejection {
                map.insert("rejection".into(), Value::String(rejection.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "title": outline.title,
        "questionnaire": outline.questionnaire,
        "progress": {
            "answered": outline.answered,
            "total": outline.total,
        },
        "items": entries,
    })
}
