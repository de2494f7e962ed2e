#![allow(missing_docs)]

pub mod answers;
pub mod coerce;
pub mod enablement;
pub mod engine;
pub mod outline;
pub mod path;
pub mod resolver;
pub mod response;
pub mod schema;
pub mod spec;
pub mod validate;
pub mod value;

pub use answers::{ValidationError, ValidationResult};
pub use coerce::{AnswerInput, CoercionError};
pub use enablement::{EnablementMap, resolve_enablement};
pub use engine::{EngineError, FormEngine, Leaf, Rejection};
pub use outline::{Outline, OutlineEntry, build_outline, render_json, render_text};
pub use path::ItemPath;
pub use resolver::{
    FileUpload, LiteralReferenceResolver, ReferenceResolver, ResolveError, UploadResolver,
};
pub use response::{ResponseDocument, ResponseItem, ResponseStatus};
pub use spec::{
    AnswerOption, EnableBehavior, EnableOperator, EnableWhen, Item, ItemType, Questionnaire,
};
pub use validate::validate;
pub use value::{AnswerValue, Attachment, Coding, Quantity, Reference};
