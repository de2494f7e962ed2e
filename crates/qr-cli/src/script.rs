//! Answer scripts: JSON arrays of operations replayed against a form engine.

use std::fs;
use std::path::{Path, PathBuf};

use qr_spec::{
    AnswerValue, EngineError, FileUpload, FormEngine, ReferenceResolver, Rejection, UploadResolver,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::CliResult;

/// One scripted interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Typed text, coerced by item type. With `index`, edits one answer of a repeating item.
    Set {
        key: String,
        text: String,
        #[serde(default)]
        index: Option<usize>,
    },
    /// Already-typed answer such as `{"valueCoding": {...}}`.
    Value { key: String, value: AnswerValue },
    Check { key: String, checked: bool },
    Toggle {
        key: String,
        option: OptionRef,
        #[serde(default = "selected_by_default")]
        selected: bool,
    },
    Clear { key: String },
    Attach {
        key: String,
        path: PathBuf,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        content_type: Option<String>,
    },
    Reference {
        key: String,
        resource_type: String,
        id: String,
    },
}

fn selected_by_default() -> bool {
    true
}

/// Option named either by a typed value or by its plain label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionRef {
    Value(AnswerValue),
    Label(String),
}

impl From<OptionRef> for AnswerValue {
    fn from(option: OptionRef) -> Self {
        match option {
            OptionRef::Value(value) => value,
            OptionRef::Label(label) => AnswerValue::String(label),
        }
    }
}

pub fn load_script(path: &Path) -> CliResult<Vec<ScriptOp>> {
    let raw = fs::read_to_string(path)?;
    let ops: Vec<ScriptOp> = serde_json::from_str(&raw)?;
    debug!(path = %path.display(), ops = ops.len(), "script loaded");
    Ok(ops)
}

/// Collaborators available to scripted operations.
pub struct Collaborators<'a> {
    pub uploads: &'a dyn UploadResolver,
    pub references: &'a dyn ReferenceResolver,
}

/// Replay `ops` in order. Rejected input is collected and replay continues;
/// any other engine error stops the run.
pub fn apply(
    engine: &mut FormEngine,
    ops: Vec<ScriptOp>,
    collaborators: &Collaborators<'_>,
) -> CliResult<Vec<Rejection>> {
    let mut rejected = Vec::new();
    for (step, op) in ops.into_iter().enumerate() {
        match apply_one(engine, op, collaborators) {
            Ok(()) => {}
            Err(ApplyError::Engine(EngineError::Rejected(rejection))) => {
                info!(step, %rejection, "input rejected");
                rejected.push(rejection);
            }
            Err(ApplyError::Engine(err)) => {
                return Err(format!("script step {}: {}", step + 1, err).into());
            }
            Err(ApplyError::Io(path, err)) => {
                return Err(format!(
                    "script step {}: cannot read '{}': {}",
                    step + 1,
                    path.display(),
                    err
                )
                .into());
            }
        }
    }
    Ok(rejected)
}

enum ApplyError {
    Engine(EngineError),
    Io(PathBuf, std::io::Error),
}

impl From<EngineError> for ApplyError {
    fn from(err: EngineError) -> Self {
        ApplyError::Engine(err)
    }
}

fn apply_one(
    engine: &mut FormEngine,
    op: ScriptOp,
    collaborators: &Collaborators<'_>,
) -> Result<(), ApplyError> {
    match op {
        ScriptOp::Set {
            key,
            text,
            index: Some(index),
        } => engine.set_answer_at(&key, index, text)?,
        ScriptOp::Set { key, text, .. } => engine.set_answer(&key, text)?,
        ScriptOp::Value { key, value } => engine.set_answer(&key, value)?,
        ScriptOp::Check { key, checked } => engine.set_checked(&key, checked)?,
        ScriptOp::Toggle {
            key,
            option,
            selected,
        } => engine.toggle_option(&key, option, selected)?,
        ScriptOp::Clear { key } => engine.clear_answer(&key)?,
        ScriptOp::Attach {
            key,
            path,
            title,
            content_type,
        } => {
            let data = fs::read(&path).map_err(|err| ApplyError::Io(path.clone(), err))?;
            let upload = FileUpload {
                title: title.unwrap_or_else(|| file_name(&path)),
                content_type: content_type.unwrap_or_else(|| guess_content_type(&path).to_string()),
                data,
            };
            engine.attach_upload(&key, collaborators.uploads, &upload)?
        }
        ScriptOp::Reference {
            key,
            resource_type,
            id,
        } => engine.resolve_reference(&key, collaborators.references, &resource_type, &id)?,
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
