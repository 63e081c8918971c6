//! Request execution and error normalization for the aptly API.
//!
//! # Design
//! `AptlyClient` holds the normalized base URL, an optional authenticator
//! and a `Transport`. It carries no state between calls. Every outbound call
//! goes through `send`, which is the one place where
//! - paths are joined onto the base URL,
//! - credentials are attached,
//! - status codes are classified: [200, 300) succeeds for every method, and
//!   GET also passes 503 through so the readiness endpoint can report "not
//!   ready" as data. Anything else becomes `ApiError::Http` with a message
//!   rendered from aptly's error body.
//!
//! Resource sections (`repos()`, `snapshots()`, ...) borrow the client and
//! only build requests and parse responses.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::files::FilesApi;
use crate::http::{Attachment, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::misc::MiscApi;
use crate::mirrors::MirrorsApi;
use crate::packages::PackagesApi;
use crate::publish::PublishApi;
use crate::repos::ReposApi;
use crate::snapshots::SnapshotsApi;
use crate::transport::{Transport, UreqTransport};

/// Synchronous client for one aptly server.
pub struct AptlyClient {
    base_url: String,
    auth: Option<Arc<dyn Authenticator>>,
    transport: Box<dyn Transport>,
}

impl AptlyClient {
    /// Client with default settings: verified TLS, no credentials, 60s timeout.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::from_config(ClientConfig::new(base_url))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(&config)?;
        let mut client = Self::with_transport(&config.base_url, transport)?;
        client.auth = config.auth.map(|auth| auth.into_authenticator());
        Ok(client)
    }

    /// Client that sends every request through `transport`.
    pub fn with_transport(base_url: &str, transport: impl Transport + 'static) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL {base_url}: {e}")))?;
        Ok(Self {
            base_url,
            auth: None,
            transport: Box::new(transport),
        })
    }

    pub fn with_auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn repos(&self) -> ReposApi<'_> {
        ReposApi::new(self)
    }

    pub fn snapshots(&self) -> SnapshotsApi<'_> {
        SnapshotsApi::new(self)
    }

    pub fn publish(&self) -> PublishApi<'_> {
        PublishApi::new(self)
    }

    pub fn mirrors(&self) -> MirrorsApi<'_> {
        MirrorsApi::new(self)
    }

    pub fn packages(&self) -> PackagesApi<'_> {
        PackagesApi::new(self)
    }

    pub fn files(&self) -> FilesApi<'_> {
        FilesApi::new(self)
    }

    pub fn misc(&self) -> MiscApi<'_> {
        MiscApi::new(self)
    }

    /// Absolute URL of `path`, which is relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn build_request(&self, method: HttpMethod, path: &str, query: &[(String, String)]) -> HttpRequest {
        let mut request = HttpRequest::new(method, self.url(path));
        request.query = query.to_vec();
        request
    }

    pub fn get(&self, path: &str, query: &[(String, String)]) -> Result<HttpResponse, ApiError> {
        self.send(self.build_request(HttpMethod::Get, path, query))
    }

    pub fn post(
        &self,
        path: &str,
        query: &[(String, String)],
        body: Option<RequestBody>,
        files: Vec<Attachment>,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = self.build_request(HttpMethod::Post, path, query);
        request.body = body;
        request.files = files;
        self.send(request)
    }

    pub fn put(
        &self,
        path: &str,
        query: &[(String, String)],
        body: Option<RequestBody>,
        files: Vec<Attachment>,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = self.build_request(HttpMethod::Put, path, query);
        request.body = body;
        request.files = files;
        self.send(request)
    }

    /// DELETE may carry a body: aptly removes packages from a repository
    /// with a JSON list of keys.
    pub fn delete(
        &self,
        path: &str,
        query: &[(String, String)],
        body: Option<RequestBody>,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = self.build_request(HttpMethod::Delete, path, query);
        request.body = body;
        self.send(request)
    }

    /// Execute `request` and classify the response status.
    pub fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        if let Some(auth) = &self.auth {
            auth.authorize(&mut request.headers);
        }
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            "received response"
        );
        check_status(request.method, response)
    }
}

impl fmt::Debug for AptlyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AptlyClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AptlyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client (Aptly API Client) <{}/>", self.base_url)
    }
}

/// Whether `status` counts as success for `method`.
pub fn is_success(method: HttpMethod, status: u16) -> bool {
    (200..300).contains(&status) || (method == HttpMethod::Get && status == 503)
}

fn check_status(method: HttpMethod, response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if is_success(method, response.status) {
        return Ok(response);
    }
    Err(ApiError::Http {
        status: response.status,
        message: error_message(&response),
    })
}

/// Render aptly's error body. The server sends either `{"error", "meta"}` or
/// a one-element list of it; either key may be missing.
pub fn error_message(response: &HttpResponse) -> String {
    if response.status == 200 {
        return "no error (status 200)".to_string();
    }

    let plain = || format!("{} {} {}", response.status, response.reason, response.body);
    let parsed: Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(_) => return plain(),
    };
    let content = match &parsed {
        Value::Object(map) => map,
        Value::Array(items) => match items.first().and_then(Value::as_object) {
            Some(map) => map,
            None => return plain(),
        },
        _ => return plain(),
    };

    let mut message = format!("{} - {} -", response.status, response.reason);
    if let Some(error) = content.get("error") {
        message.push(' ');
        message.push_str(&render_value(error));
    }
    if let Some(meta) = content.get("meta") {
        message.push_str(&format!(" ({})", render_value(meta)));
    }
    message
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode a JSON response into `T`, attributing contract violations to the
/// response status.
pub(crate) fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    let value = response.json()?;
    T::deserialize(&value).map_err(|e| ApiError::MalformedResponse {
        status: response.status,
        message: format!("unexpected response ({e}): {value}"),
    })
}

pub(crate) fn json_body(value: Value) -> Option<RequestBody> {
    Some(RequestBody::Json(value))
}
