use std::fs;
use std::path::{Path, PathBuf};

use qr_spec::{Attachment, FileUpload, ResolveError, UploadResolver};
use tracing::debug;
use url::Url;

/// Stores uploads as files in a local directory and answers with `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalUploadResolver {
    dir: PathBuf,
}

impl LocalUploadResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target_for(&self, title: &str) -> PathBuf {
        let name = sanitize(title);
        let mut candidate = self.dir.join(&name);
        let mut counter = 1;
        while candidate.exists() {
            candidate = self.dir.join(format!("{}-{}", counter, name));
            counter += 1;
        }
        candidate
    }
}

impl UploadResolver for LocalUploadResolver {
    fn resolve(&self, upload: &FileUpload) -> Result<Attachment, ResolveError> {
        if upload.title.trim().is_empty() {
            return Err(ResolveError::Upload {
                title: upload.title.clone(),
                reason: "upload has no file name".into(),
            });
        }
        fs::create_dir_all(&self.dir)?;
        let target = self.target_for(&upload.title);
        fs::write(&target, &upload.data)?;
        let stored = fs::canonicalize(&target)?;
        let url = Url::from_file_path(&stored).map_err(|()| ResolveError::Upload {
            title: upload.title.clone(),
            reason: format!("'{}' has no file URL", stored.display()),
        })?;
        debug!(%url, bytes = upload.data.len(), "upload stored");

        Ok(Attachment {
            title: Some(upload.title.clone()),
            content_type: Some(upload.content_type.clone()),
            url: Some(url.into()),
        })
    }
}

/// File name safe to place in the upload directory.
fn sanitize(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => ch,
            _ => '_',
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
