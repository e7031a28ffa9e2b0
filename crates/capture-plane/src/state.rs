//! Shared application state and configuration

use std::env;
use std::sync::Arc;

use crate::keys::TrustTokenSigner;
use crate::storage::DeviceStore;

/// Default capture session lifetime
pub const DEFAULT_SESSION_TTL_SECS: i64 = 300;

/// Trust service configuration
#[derive(Debug, Clone)]
pub struct PlaneConfig {
    /// `iss` claim of issued trust tokens
    pub issuer: String,
    /// Accepted publisher ids; empty accepts any non-empty id
    pub allowed_publishers: Vec<String>,
    /// Lifetime of a capture session
    pub session_ttl: chrono::Duration,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            issuer: "capture-plane".into(),
            allowed_publishers: Vec::new(),
            session_ttl: chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl PlaneConfig {
    /// Read `CAPTURE_PLANE_ISSUER`, `CAPTURE_PLANE_PUBLISHERS` (comma
    /// separated) and `CAPTURE_PLANE_SESSION_TTL_SECS`, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let issuer = env::var("CAPTURE_PLANE_ISSUER").unwrap_or(defaults.issuer);
        let allowed_publishers = env::var("CAPTURE_PLANE_PUBLISHERS")
            .map(|raw| {
                raw.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let session_ttl = env::var("CAPTURE_PLANE_SESSION_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(chrono::Duration::seconds)
            .unwrap_or(defaults.session_ttl);

        Self {
            issuer,
            allowed_publishers,
            session_ttl,
        }
    }

    /// Add an accepted publisher id
    pub fn with_publisher(mut self, publisher_id: impl Into<String>) -> Self {
        self.allowed_publishers.push(publisher_id.into());
        self
    }

    /// Set the capture session lifetime
    pub fn with_session_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Whether `publisher_id` may register devices
    pub fn accepts_publisher(&self, publisher_id: &str) -> bool {
        if publisher_id.trim().is_empty() {
            return false;
        }
        self.allowed_publishers.is_empty()
            || self.allowed_publishers.iter().any(|p| p == publisher_id)
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Signs trust tokens
    pub issuer: Arc<dyn TrustTokenSigner>,
    /// Devices and capture sessions
    pub store: Arc<dyn DeviceStore>,
    /// Service configuration
    pub config: PlaneConfig,
}
