//! Error types for the aptly API client.
//!
//! # Design
//! Every failure surfaces as one `ApiError`. Callers that only care about
//! "did the HTTP exchange go wrong, and how" match on `status_code()`; the
//! variants exist so that validation failures, old servers and contract
//! violations can be told apart without string matching. `status_code()` is
//! 0 whenever no HTTP exchange took place.

use thiserror::Error;

/// Errors returned by `AptlyClient` and its resource sections.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller input rejected before any request was sent.
    #[error("{0}")]
    Usage(String),

    /// The server answered with a status outside the accepted range.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The server (or this client) does not support the requested endpoint.
    #[error("{message}")]
    Unsupported { status: u16, message: String },

    /// The server answered successfully but the body broke the API contract.
    #[error("{message}")]
    MalformedResponse { status: u16, message: String },

    /// No HTTP response was obtained: connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Client configuration could not be loaded or applied.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// The HTTP status carried by this error, 0 if none.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Http { status, .. }
            | ApiError::Unsupported { status, .. }
            | ApiError::MalformedResponse { status, .. } => *status,
            ApiError::Usage(_) | ApiError::Transport(_) | ApiError::Config(_) => 0,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ApiError::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_carry_no_status() {
        let err = ApiError::Usage("bad input".to_string());
        assert_eq!(err.status_code(), 0);
        assert_eq!(err.to_string(), "bad input");
    }

    #[test]
    fn http_errors_carry_their_status() {
        let err = ApiError::Http {
            status: 409,
            message: "409 - Conflict -".to_string(),
        };
        assert_eq!(err.status_code(), 409);
        assert!(!err.is_unsupported());
    }
}
