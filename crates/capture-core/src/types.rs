//! Common types used across the capture attestation protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered identity of this device with the trust service
///
/// Only a fully registered identity is represented: `device_id` and
/// `device_token` always travel together, and a `device_id` without its
/// token is never surfaced.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Client-generated stable UUID, created once and persisted
    pub external_id: String,

    /// Server-assigned device UUID
    pub device_id: String,

    /// Server-issued bearer credential (opaque)
    pub device_token: String,
}

impl DeviceIdentity {
    /// Create a new device identity
    pub fn new(
        external_id: impl Into<String>,
        device_id: impl Into<String>,
        device_token: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            device_id: device_id.into(),
            device_token: device_token.into(),
        }
    }

    /// Short, non-reversible hint of the token, safe for log output
    pub fn token_hint(&self) -> String {
        redact(&self.device_token)
    }
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("external_id", &self.external_id)
            .field("device_id", &self.device_id)
            .field("device_token", &"[redacted]")
            .finish()
    }
}

/// Render a credential as its first four characters followed by an ellipsis.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{}…", prefix)
}

/// A single-use, time-bounded capture session issued by the trust service
///
/// A session is consumed by at most one trust exchange and is logically
/// invalid once `now >= expires_at`. It intentionally does not implement
/// `Clone`: callers hand it over by value when redeeming the nonce.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSession {
    /// Server-assigned capture UUID
    pub capture_id: String,

    /// Single-use nonce, opaque to the client
    pub nonce: String,

    /// Absolute expiry of the session
    pub expires_at: DateTime<Utc>,
}

impl CaptureSession {
    /// Create a new capture session
    pub fn new(
        capture_id: impl Into<String>,
        nonce: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            capture_id: capture_id.into(),
            nonce: nonce.into(),
            expires_at,
        }
    }

    /// Whether the session is expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the session is expired now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before expiry, or `None` once expired
    pub fn time_remaining(&self) -> Option<chrono::Duration> {
        let remaining = self.expires_at - Utc::now();
        if remaining > chrono::Duration::zero() {
            Some(remaining)
        } else {
            None
        }
    }
}

/// Device-issued proof binding content, session and capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaIntegrity {
    /// Lowercase hex SHA-256 of the exact persisted bytes (64 chars)
    pub content_hash: String,

    /// Base64 signature over the canonical message
    pub signature: String,

    /// Base64 uncompressed P-256 point (0x04 || X || Y)
    pub public_key: String,

    /// Capture session this proof is bound to
    pub capture_id: String,

    /// ISO-8601 UTC, whole seconds, `Z` suffix
    pub captured_at: String,
}

/// Opaque signed token issued by the trust service for one nonce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustToken(String);

impl TrustToken {
    /// Wrap a raw token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the raw token
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for TrustToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}
