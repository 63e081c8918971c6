//! `multipart/form-data` encoding for file uploads.

use uuid::Uuid;

use crate::http::{Attachment, EncodedBody};

const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Encode text fields followed by file parts under a fresh random boundary.
pub(crate) fn encode(fields: &[(String, String)], files: &[Attachment]) -> EncodedBody {
    let boundary = format!("aptly-client-{}", Uuid::new_v4().simple());
    encode_with_boundary(&boundary, fields, files)
}

fn encode_with_boundary(
    boundary: &str,
    fields: &[(String, String)],
    files: &[Attachment],
) -> EncodedBody {
    let mut bytes = Vec::new();

    for (name, value) in fields {
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", quote(name)).as_bytes(),
        );
        bytes.extend_from_slice(value.as_bytes());
        bytes.extend_from_slice(b"\r\n");
    }

    for file in files {
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", quote(&file.field));
        if let Some(filename) = &file.filename {
            disposition.push_str(&format!("; filename=\"{}\"", quote(filename)));
        }
        bytes.extend_from_slice(disposition.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_FILE_TYPE);
        bytes.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        bytes.extend_from_slice(&file.content);
        bytes.extend_from_slice(b"\r\n");
    }

    bytes.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    EncodedBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        bytes,
    }
}

/// Escape quotes and line breaks inside a quoted header parameter.
fn quote(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
