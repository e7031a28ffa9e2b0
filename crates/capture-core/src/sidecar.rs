//! Sidecar artifact
//!
//! The sidecar is stored next to the captured media and carries both the
//! server-issued trust token and the device-issued integrity proof.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::integrity::verify_integrity;
use crate::types::{MediaIntegrity, TrustToken};

/// Current sidecar schema version
pub const SIDECAR_VERSION: &str = "1.0";

/// Server-issued half of the sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTrust {
    /// Trust token for the capture session's nonce
    pub jwt: TrustToken,
}

/// Versioned proof bundle persisted alongside captured media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    /// Schema version
    pub version: String,

    /// Trust service proof
    pub capture_trust: CaptureTrust,

    /// Device proof
    pub media_integrity: MediaIntegrity,
}

impl Sidecar {
    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a sidecar from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Capture session both proofs belong to
    pub fn capture_id(&self) -> &str {
        &self.media_integrity.capture_id
    }

    /// Check the device proof against the media bytes
    ///
    /// The trust token is opaque here and is not inspected.
    pub fn verify_media(&self, content: &[u8]) -> Result<bool> {
        verify_integrity(&self.media_integrity, content)
    }
}

/// Packages a trust token and an integrity proof into a sidecar
///
/// Assembly is pure. The assembler cannot read the token, so pairing a token
/// and a proof from the same capture session is the caller's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarAssembler;

impl SidecarAssembler {
    /// Build a sidecar at the current schema version
    pub fn assemble(trust_token: TrustToken, media_integrity: MediaIntegrity) -> Sidecar {
        Sidecar {
            version: SIDECAR_VERSION.to_string(),
            capture_trust: CaptureTrust { jwt: trust_token },
            media_integrity,
        }
    }
}
