//! Client configuration
//!
//! The configuration is an immutable value built once at startup and shared
//! by every component through an `Arc`. Nothing reads it from global state.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Environment variable holding the trust service base URL
pub const ENV_BASE_URL: &str = "CAPTURE_TRUST_BASE_URL";
/// Environment variable holding the publisher identifier
pub const ENV_PUBLISHER_ID: &str = "CAPTURE_TRUST_PUBLISHER_ID";
/// Environment variable holding the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "CAPTURE_TRUST_TIMEOUT_SECS";

/// Configuration for talking to the trust service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the trust service (e.g. "https://trust.example.com")
    pub base_url: String,

    /// Publisher identifier sent as `X-Publisher-ID` at registration
    pub publisher_id: String,

    /// Per-request timeout applied by the HTTP transport, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ClientConfig {
    /// Create a new configuration without a transport timeout
    pub fn new(base_url: impl Into<String>, publisher_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            publisher_id: publisher_id.into(),
            timeout_ms: None,
        }
    }

    /// Set the per-request timeout
    ///
    /// Kept at millisecond precision; anything finer is rounded up so a
    /// non-zero duration never becomes zero.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    /// Load configuration from `CAPTURE_TRUST_*` environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = env::var(ENV_BASE_URL)
            .map_err(|_| ClientError::Config(format!("{} is not set", ENV_BASE_URL)))?;
        let publisher_id = env::var(ENV_PUBLISHER_ID)
            .map_err(|_| ClientError::Config(format!("{} is not set", ENV_PUBLISHER_ID)))?;

        let timeout_ms = match env::var(ENV_TIMEOUT_SECS) {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    ClientError::Config(format!(
                        "{} must be a whole number of seconds",
                        ENV_TIMEOUT_SECS
                    ))
                })?;
                Some(secs.saturating_mul(1000))
            }
            Err(_) => None,
        };

        let config = Self {
            base_url,
            publisher_id,
            timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.publisher_id.trim().is_empty() {
            return Err(ClientError::Config("publisher id cannot be empty".into()));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ClientError::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(ClientError::Config("timeout must be greater than zero".into()));
        }
        Ok(())
    }

    /// Per-request timeout, if any
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
