//! Directory client configuration.
//!
//! The service endpoint and request timeout come from the environment with
//! production defaults; the account credentials always come from the caller.

use url::Url;
use zeroize::Zeroizing;

/// Default AT Protocol service (PDS entryway).
pub const DEFAULT_SERVICE_URL: &str = "https://bsky.social";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to an AT Protocol service.
///
/// Custom `Debug` implementation redacts the `password` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Service base URL. Default: <https://bsky.social>
    pub service_url: Url,
    /// Account handle or email used to create the session.
    pub identifier: String,
    /// Account (app) password.
    pub password: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("service_url", &self.service_url)
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DirectoryConfig {
    /// Build a configuration for the given credentials.
    ///
    /// Variables:
    /// - `SKYMOD_SERVICE_URL` (default: `https://bsky.social`)
    /// - `SKYMOD_TIMEOUT_SECS` (default: 30)
    pub fn new(
        identifier: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(ConfigError::MissingIdentifier);
        }
        let password = Zeroizing::new(password.into());
        if password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }

        Ok(Self {
            service_url: env_url("SKYMOD_SERVICE_URL", DEFAULT_SERVICE_URL)?,
            identifier,
            password,
            timeout_secs: std::env::var("SKYMOD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Override the service URL.
    pub fn with_service_url(mut self, url: Url) -> Self {
        self.service_url = url;
        self
    }

    /// Create a configuration pointing at a local mock server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `uri` cannot be parsed.
    pub fn local_mock(uri: &str, identifier: &str, password: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            service_url: Url::parse(uri)
                .map_err(|e| ConfigError::InvalidUrl(uri.to_string(), e.to_string()))?,
            identifier: identifier.to_string(),
            password: Zeroizing::new(password.to_string()),
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("account identifier is required")]
    MissingIdentifier,
    #[error("account password is required")]
    MissingPassword,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
