//! Upload area: `api/files`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::client::{decode, AptlyClient};
use crate::error::ApiError;
use crate::escape;
use crate::http::Attachment;

/// One file of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// A local file, sent under its base name.
    Path(PathBuf),
    /// In-memory content.
    Content {
        filename: String,
        content: Vec<u8>,
        content_type: Option<String>,
    },
}

impl UploadSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        UploadSource::Path(path.into())
    }

    pub fn content(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        UploadSource::Content {
            filename: filename.into(),
            content: content.into(),
            content_type: None,
        }
    }
}

fn unreadable(path: &Path) -> ApiError {
    ApiError::Usage(format!(
        "File to upload {} can't be opened or read",
        path.display()
    ))
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

enum Opened<'a> {
    File(&'a Path, File),
    Content(&'a str, &'a [u8], Option<&'a str>),
}

/// Turn sources into multipart attachments.
///
/// Every path is opened before any content is read, so a missing file fails
/// the whole upload without partial work. The handles are dropped when this
/// returns.
fn attachments(sources: &[UploadSource]) -> Result<Vec<Attachment>, ApiError> {
    let opened = sources
        .iter()
        .map(|source| match source {
            UploadSource::Path(path) => File::open(path)
                .map(|file| Opened::File(path, file))
                .map_err(|_| unreadable(path)),
            UploadSource::Content {
                filename,
                content,
                content_type,
            } => Ok(Opened::Content(filename, content, content_type.as_deref())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    opened
        .into_iter()
        .map(|entry| -> Result<Attachment, ApiError> {
            match entry {
                Opened::File(path, mut file) => {
                    let mut content = Vec::new();
                    file.read_to_end(&mut content).map_err(|_| unreadable(path))?;
                    trace!(file = %path.display(), bytes = content.len(), "read upload");
                    Ok(Attachment::new("file", content).with_filename(base_name(path)))
                }
                Opened::Content(filename, content, content_type) => {
                    let attachment = Attachment::new("file", content.to_vec()).with_filename(filename);
                    Ok(match content_type {
                        Some(content_type) => attachment.with_content_type(content_type),
                        None => attachment,
                    })
                }
            }
        })
        .collect()
}

fn files_path(path: Option<&str>) -> String {
    match path.map(escape::path).filter(|p| !p.is_empty()) {
        Some(path) => format!("api/files/{path}"),
        None => "api/files".to_string(),
    }
}

/// `api/files`
pub struct FilesApi<'a> {
    client: &'a AptlyClient,
}

impl<'a> FilesApi<'a> {
    pub(crate) fn new(client: &'a AptlyClient) -> Self {
        Self { client }
    }

    /// Upload directories, or the files in `directory`.
    pub fn list(&self, directory: Option<&str>) -> Result<Vec<String>, ApiError> {
        let response = self.client.get(&files_path(directory), &[])?;
        let names: Option<Vec<String>> = decode(&response)?;
        Ok(names.unwrap_or_default())
    }

    /// Upload `sources` into `destination` in one request.
    pub fn upload(&self, destination: &str, sources: &[UploadSource]) -> Result<Vec<String>, ApiError> {
        let files = attachments(sources)?;
        let path = format!("api/files/{}", escape::path(destination));
        let response = self.client.post(&path, &[], None, files)?;
        let names: Option<Vec<String>> = decode(&response)?;
        Ok(names.unwrap_or_default())
    }

    /// Delete an upload directory or a single uploaded file.
    pub fn delete(&self, path: Option<&str>) -> Result<(), ApiError> {
        self.client.delete(&files_path(path), &[], None)?;
        Ok(())
    }
}
