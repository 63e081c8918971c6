//! Client configuration.
//!
//! # Design
//! `ClientConfig` is set once and never mutated by the client. It can be
//! built in code with the `with_*` setters or deserialized from TOML, e.g.:
//!
//! ```toml
//! base_url = "https://aptly.example.com/"
//! verify = "/etc/ssl/certs/internal-ca.pem"
//! timeout_secs = 2.5
//!
//! [client_cert]
//! cert = "/etc/aptly/client.pem"
//! key = "/etc/aptly/client.key"
//!
//! [auth]
//! kind = "basic"
//! username = "deploy"
//! password = "secret"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::auth::AuthConfig;
use crate::error::ApiError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Server certificate verification mode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TlsVerify {
    /// `true` verifies against the built-in roots, `false` disables checks.
    Flag(bool),
    /// Verify against the certificates in this PEM bundle only.
    CaBundle(PathBuf),
}

impl Default for TlsVerify {
    fn default() -> Self {
        TlsVerify::Flag(true)
    }
}

/// PEM files presented as the client certificate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientCertPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub verify: TlsVerify,
    #[serde(default)]
    pub client_cert: Option<ClientCertPaths>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// Read from `timeout_secs`, which may be fractional.
    #[serde(rename = "timeout_secs", default = "default_timeout", deserialize_with = "seconds")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            verify: TlsVerify::default(),
            client_cert: None,
            auth: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ApiError> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| ApiError::Config(format!("invalid client configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ApiError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn with_verify(mut self, verify: TlsVerify) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_client_cert(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(ClientCertPaths {
            cert: cert.into(),
            key: key.into(),
        });
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Settings the transport can't honour, currently only a zero timeout.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.timeout.is_zero() {
            return Err(ApiError::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_minimal_toml() {
        let config = ClientConfig::from_toml_str(r#"base_url = "http://aptly:8080/""#).unwrap();
        assert_eq!(config.base_url, "http://aptly:8080/");
        assert_eq!(config.verify, TlsVerify::Flag(true));
        assert!(config.client_cert.is_none());
        assert!(config.auth.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn verify_accepts_flag_or_bundle_path() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://aptly"
            verify = false
            "#,
        )
        .unwrap();
        assert_eq!(config.verify, TlsVerify::Flag(false));

        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://aptly"
            verify = "/etc/ssl/ca.pem"
            "#,
        )
        .unwrap();
        assert_eq!(config.verify, TlsVerify::CaBundle(PathBuf::from("/etc/ssl/ca.pem")));
    }

    #[test]
    fn full_toml_parses() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://aptly"
            timeout_secs = 5

            [client_cert]
            cert = "/c.pem"
            key = "/k.pem"

            [auth]
            kind = "bearer"
            token = "t0ken"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.client_cert,
            Some(ClientCertPaths {
                cert: PathBuf::from("/c.pem"),
                key: PathBuf::from("/k.pem"),
            })
        );
        assert_eq!(
            config.auth,
            Some(AuthConfig::Bearer {
                token: "t0ken".to_string()
            })
        );
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let err = ClientConfig::from_toml_str("timeout_secs = 1").unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert_eq!(err.status_code(), 0);
    }

    #[test]
    fn builder_setters() {
        let config = ClientConfig::new("http://aptly")
            .with_client_cert("/c.pem", "/k.pem")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.client_cert.is_some());
    }

    #[test]
    fn sub_second_timeouts_keep_their_precision() {
        let config = ClientConfig::new("http://aptly").with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert!(config.validate().is_ok());

        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://aptly"
            timeout_secs = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = ClientConfig::new("http://aptly").with_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ApiError::Config(_))));

        let err = ClientConfig::from_toml_str(
            r#"
            base_url = "https://aptly"
            timeout_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));

        let err = ClientConfig::from_toml_str(
            r#"
            base_url = "https://aptly"
            timeout_secs = -1.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
