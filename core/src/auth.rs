//! Authentication strategies applied to every outgoing request.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

/// Adds credentials to a request's headers before it is sent.
pub trait Authenticator: Send + Sync {
    fn authorize(&self, headers: &mut Vec<(String, String)>);
}

/// HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Authenticator for BasicAuth {
    fn authorize(&self, headers: &mut Vec<(String, String)>) {
        let credentials = STANDARD.encode(format!("{}:{}", self.username, self.password));
        headers.push(("authorization".to_string(), format!("Basic {credentials}")));
    }
}

/// Bearer token authentication, for aptly instances behind a token proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

impl Authenticator for BearerToken {
    fn authorize(&self, headers: &mut Vec<(String, String)>) {
        headers.push(("authorization".to_string(), format!("Bearer {}", self.0)));
    }
}

/// Credentials as they appear in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuthConfig {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl AuthConfig {
    pub fn into_authenticator(self) -> Arc<dyn Authenticator> {
        match self {
            AuthConfig::Basic { username, password } => Arc::new(BasicAuth { username, password }),
            AuthConfig::Bearer { token } => Arc::new(BearerToken(token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_sets_header() {
        let mut headers = Vec::new();
        BasicAuth::new("aladdin", "opensesame").authorize(&mut headers);
        assert_eq!(
            headers,
            vec![(
                "authorization".to_string(),
                "Basic YWxhZGRpbjpvcGVuc2VzYW1l".to_string()
            )]
        );
    }

    #[test]
    fn bearer_token_sets_header() {
        let mut headers = Vec::new();
        AuthConfig::Bearer {
            token: "abc".to_string(),
        }
        .into_authenticator()
        .authorize(&mut headers);
        assert_eq!(headers[0].1, "Bearer abc");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", BasicAuth::new("u", "hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(!format!("{:?}", BearerToken("s3cr3t".to_string())).contains("s3cr3t"));
    }
}
