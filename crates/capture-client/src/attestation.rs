//! Device attestation providers
//!
//! An attestation token is third-party proof of device/app integrity that is
//! forwarded opaquely at registration. Obtaining one is best-effort: a
//! failure never blocks registration.

use async_trait::async_trait;

use crate::error::Result;

/// Source of device integrity tokens
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Fetch the current attestation token, if one is available
    async fn current_token(&self) -> Result<Option<String>>;

    /// Get a description of this provider (for logging)
    fn description(&self) -> &str {
        "attestation provider"
    }
}

/// Provider for platforms without attestation support
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttestation;

#[async_trait]
impl AttestationProvider for NoAttestation {
    async fn current_token(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn description(&self) -> &str {
        "no attestation"
    }
}

/// Provider returning a fixed token (for testing)
#[derive(Debug, Clone)]
pub struct StaticAttestation {
    token: String,
}

impl StaticAttestation {
    /// Create a provider that always returns `token`
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AttestationProvider for StaticAttestation {
    async fn current_token(&self) -> Result<Option<String>> {
        Ok(Some(self.token.clone()))
    }

    fn description(&self) -> &str {
        "static attestation"
    }
}
