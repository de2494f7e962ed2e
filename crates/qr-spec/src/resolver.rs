//! Seams for the external collaborators that turn raw uploads and
//! identifiers into storable answer values.

use thiserror::Error;

use crate::value::Attachment;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("upload of '{title}' failed: {reason}")]
    Upload { title: String, reason: String },
    #[error("cannot resolve {resource_type} reference from '{input}'")]
    Reference {
        resource_type: String,
        input: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Raw file handed to an [`UploadResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub title: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Stores file bytes somewhere and reports where they ended up.
pub trait UploadResolver {
    fn resolve(&self, upload: &FileUpload) -> Result<Attachment, ResolveError>;
}

/// Turns a resource type plus identifier into a canonical reference string.
pub trait ReferenceResolver {
    fn resolve(&self, resource_type: &str, input: &str) -> Result<String, ResolveError>;
}

/// Builds `{resourceType}/{id}` without consulting any server.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralReferenceResolver;

impl ReferenceResolver for LiteralReferenceResolver {
    fn resolve(&self, resource_type: &str, input: &str) -> Result<String, ResolveError> {
        let resource_type = resource_type.trim();
        let id = input.trim();
        let well_formed = |part: &str| {
            !part.is_empty() && !part.contains(char::is_whitespace) && !part.contains('/')
        };
        if !well_formed(resource_type) || !well_formed(id) {
            return Err(ResolveError::Reference {
                resource_type: resource_type.to_string(),
                input: input.to_string(),
            });
        }
        Ok(format!("{}/{}", resource_type, id))
    }
}
