//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. `UreqTransport` is the
//! default: one blocking round trip per call, bounded by the configured
//! timeout, with status codes handed back as data so the client core can
//! classify them. Tests substitute their own implementation.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::trace;
use ureq::tls::{Certificate, ClientCert, PemItem, PrivateKey, RootCerts, TlsConfig};

use crate::config::{ClientConfig, TlsVerify};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs a single HTTP round trip.
///
/// Implementations return non-2xx responses as `Ok`; only failures that
/// produced no response at all are `Err`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .tls_config(tls_config(config)?)
            .build()
            .new_agent();
        Ok(Self { agent })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.full_url()?;
        let body = request.encode_body()?;

        let result = match (request.method, body) {
            (HttpMethod::Get, None) => with_headers(self.agent.get(&url), request).call(),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(&url), request).call(),
            (HttpMethod::Get, Some(body)) => with_headers(self.agent.get(&url), request)
                .force_send_body()
                .content_type(body.content_type.as_str())
                .send(&body.bytes[..]),
            (HttpMethod::Delete, Some(body)) => with_headers(self.agent.delete(&url), request)
                .force_send_body()
                .content_type(body.content_type.as_str())
                .send(&body.bytes[..]),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(&url), request)
                .content_type(body.content_type.as_str())
                .send(&body.bytes[..]),
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(&url), request)
                .content_type(body.content_type.as_str())
                .send(&body.bytes[..]),
            (HttpMethod::Put, None) => with_headers(self.agent.put(&url), request).send_empty(),
        };

        let mut response = result.map_err(|e| ApiError::Transport(format!("{} {url}: {e}", request.method.as_str())))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        // ureq caps read_to_string at 10 MiB; package listings can exceed that
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| ApiError::Transport(format!("reading response from {url}: {e}")))?;
        trace!(status = status.as_u16(), bytes = body.len(), "response body read");

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn tls_config(config: &ClientConfig) -> Result<TlsConfig, ApiError> {
    let mut tls = TlsConfig::builder();

    match &config.verify {
        TlsVerify::Flag(true) => {}
        TlsVerify::Flag(false) => tls = tls.disable_verification(true),
        TlsVerify::CaBundle(path) => {
            let roots = read_certificates(path)?;
            tls = tls.root_certs(RootCerts::Specific(Arc::new(roots)));
        }
    }

    if let Some(paths) = &config.client_cert {
        let chain = read_certificates(&paths.cert)?;
        let key_pem = read_pem(&paths.key)?;
        let key = PrivateKey::from_pem(&key_pem).map_err(|e| {
            ApiError::Config(format!("invalid private key {}: {e}", paths.key.display()))
        })?;
        tls = tls.client_cert(Some(ClientCert::new_with_certs(&chain, key)));
    }

    Ok(tls.build())
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ApiError> {
    fs::read(path).map_err(|e| ApiError::Config(format!("cannot read {}: {e}", path.display())))
}

fn read_certificates(path: &Path) -> Result<Vec<Certificate<'static>>, ApiError> {
    let pem = read_pem(path)?;
    let mut certs = Vec::new();
    for item in ureq::tls::parse_pem(&pem) {
        match item {
            Ok(PemItem::Certificate(cert)) => certs.push(cert.to_owned()),
            Ok(_) => {}
            Err(e) => {
                return Err(ApiError::Config(format!(
                    "invalid certificate file {}: {e}",
                    path.display()
                )))
            }
        }
    }
    if certs.is_empty() {
        return Err(ApiError::Config(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn default_config_builds_a_transport() {
        assert!(UreqTransport::new(&ClientConfig::new("http://localhost")).is_ok());
    }

    #[test]
    fn missing_ca_bundle_is_a_config_error() {
        let config = ClientConfig::new("https://localhost")
            .with_verify(TlsVerify::CaBundle("/nonexistent/ca.pem".into()));
        let err = UreqTransport::new(&config).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn bundle_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();
        let err = read_certificates(file.path()).unwrap_err();
        assert!(err.to_string().contains("no certificates"));
    }

    #[test]
    fn connection_refused_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = UreqTransport::new(&ClientConfig::new("http://localhost")).unwrap();
        let request = HttpRequest::new(HttpMethod::Get, format!("http://{addr}/api/version"));
        let err = transport.execute(&request).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.status_code(), 0);
    }

    #[test]
    fn large_bodies_are_read_whole() {
        let keys: Vec<String> = (0..400_000)
            .map(|i| format!("Pamd64 package-{i:06} 1.0-1 {i:016x}"))
            .collect();
        let payload = serde_json::to_string(&keys).unwrap();
        assert!(payload.len() > 12 * 1024 * 1024);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = payload.clone();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reply.len()
            )
            .unwrap();
            stream.write_all(reply.as_bytes()).unwrap();
        });

        let transport = UreqTransport::new(&ClientConfig::new("http://localhost")).unwrap();
        let request = HttpRequest::new(HttpMethod::Get, format!("http://{addr}/api/packages"));
        let response = transport.execute(&request).unwrap();
        server.join().unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), payload.len());
        let parsed: Vec<String> = serde_json::from_str(&response.body).unwrap();
        assert_eq!(parsed.len(), 400_000);
    }

    #[test]
    fn zero_timeout_is_refused() {
        let config = ClientConfig::new("http://localhost").with_timeout(std::time::Duration::ZERO);
        let err = UreqTransport::new(&config).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
