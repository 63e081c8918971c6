//! Server meta endpoints: version, health, readiness and metrics.

use serde::Deserialize;

use crate::client::{decode, error_message, AptlyClient};
use crate::error::ApiError;
use crate::http::HttpResponse;

#[derive(Deserialize)]
struct VersionReply {
    #[serde(rename = "Version")]
    version: String,
}

#[derive(Deserialize)]
struct StatusReply {
    #[serde(rename = "Status")]
    status: String,
}

/// `api/version`, `api/healthy`, `api/ready`, `api/metrics`
pub struct MiscApi<'a> {
    client: &'a AptlyClient,
}

impl<'a> MiscApi<'a> {
    pub(crate) fn new(client: &'a AptlyClient) -> Self {
        Self { client }
    }

    pub fn version(&self) -> Result<String, ApiError> {
        let response = self.client.get("api/version", &[])?;
        let reply: VersionReply = decode(&response)?;
        Ok(reply.version)
    }

    /// GET an endpoint that older servers lack. 404 means the server
    /// predates it; any status other than 200 and 503 is an error.
    fn get_optional(&self, path: &str, accept: &[u16]) -> Result<HttpResponse, ApiError> {
        let response = match self.client.get(path, &[]) {
            Err(ApiError::Http { status: 404, message }) => {
                return Err(ApiError::Unsupported {
                    status: 404,
                    message: format!("{path} is not supported by this server: {message}"),
                })
            }
            other => other?,
        };
        if !accept.contains(&response.status) {
            return Err(ApiError::Http {
                status: response.status,
                message: error_message(&response),
            });
        }
        Ok(response)
    }

    /// The server's health status.
    pub fn healthy(&self) -> Result<String, ApiError> {
        let response = self.get_optional("api/healthy", &[200, 503])?;
        let reply: StatusReply = decode(&response)?;
        Ok(reply.status)
    }

    /// The server's readiness status. A 503 answer still carries a status
    /// and is returned as such.
    pub fn ready(&self) -> Result<String, ApiError> {
        let response = self.get_optional("api/ready", &[200, 503])?;
        let reply: StatusReply = decode(&response)?;
        Ok(reply.status)
    }

    /// Prometheus exposition text.
    pub fn metrics(&self) -> Result<String, ApiError> {
        let response = self.get_optional("api/metrics", &[200])?;
        Ok(response.body)
    }

    /// Rendering the package graph is not supported.
    pub fn graph(&self, ext: &str, layout: &str) -> Result<(), ApiError> {
        Err(ApiError::Unsupported {
            status: 0,
            message: format!("the graph API is not supported (requested {ext} in {layout} layout)"),
        })
    }
}
