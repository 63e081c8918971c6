//! HTTP request and response types exchanged with a `Transport`.
//!
//! # Design
//! Requests and responses are plain data. Resource sections build
//! `HttpRequest` values and parse `HttpResponse` values; only the transport
//! touches the network. This keeps every mapper testable without a server:
//! a test transport records the request and hands back a canned response.
//!
//! All fields use owned types so values can be stored, compared and replayed
//! without lifetime concerns.

use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::multipart;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Body of a request, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Raw(Vec<u8>),
    Form(Vec<(String, String)>),
    Json(Value),
}

/// One file part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field: String,
    pub content: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(field: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            content,
            filename: None,
            content_type: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A fully encoded body, ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries percent-encoded path segments;
/// `query` is appended form-urlencoded by `full_url`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub files: Vec<Attachment>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            files: Vec::new(),
        }
    }

    /// Absolute URL including the query string.
    pub fn full_url(&self) -> Result<String, ApiError> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| ApiError::Config(format!("invalid request URL {}: {e}", self.url)))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url.into())
    }

    /// The JSON body, if this request carries one.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Some(RequestBody::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Look up a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Encode the body for the wire. Attachments turn the request into a
    /// multipart form; form fields travel alongside them as text parts.
    pub fn encode_body(&self) -> Result<Option<EncodedBody>, ApiError> {
        if !self.files.is_empty() {
            let fields: &[(String, String)] = match &self.body {
                Some(RequestBody::Form(fields)) => fields,
                None => &[],
                Some(_) => {
                    return Err(ApiError::Usage(
                        "multipart uploads only accept form fields alongside files".to_string(),
                    ))
                }
            };
            return Ok(Some(multipart::encode(fields, &self.files)));
        }

        let encoded = match &self.body {
            None => return Ok(None),
            Some(RequestBody::Raw(bytes)) => EncodedBody {
                content_type: "application/octet-stream".to_string(),
                bytes: bytes.clone(),
            },
            Some(RequestBody::Form(fields)) => EncodedBody {
                content_type: "application/x-www-form-urlencoded".to_string(),
                bytes: url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish()
                    .into_bytes(),
            },
            Some(RequestBody::Json(value)) => EncodedBody {
                content_type: "application/json".to_string(),
                bytes: serde_json::to_vec(value)
                    .map_err(|e| ApiError::Usage(format!("serialization failed: {e}")))?,
            },
        };
        Ok(Some(encoded))
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: String::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::MalformedResponse {
            status: self.status,
            message: format!("server returned invalid JSON ({e}):\n{}", self.body),
        })
    }
}
