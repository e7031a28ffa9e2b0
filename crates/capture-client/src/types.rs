//! Wire types for the trust service contract
//!
//! ```text
//! POST /devices          {external_id}  -> 201 {device_id, publisher_id, external_id, device_token, created_at}
//! POST /capture/session                 -> 201 {capture_id, nonce, expires_at}
//! POST /capture/trust    {nonce}        -> 200 {trust_token}
//! ```

use serde::{Deserialize, Serialize};

/// Device registration endpoint
pub const DEVICES_PATH: &str = "/devices";
/// Capture session endpoint
pub const SESSION_PATH: &str = "/capture/session";
/// Trust exchange endpoint
pub const TRUST_PATH: &str = "/capture/trust";

/// Publisher identifier header (registration only)
pub const PUBLISHER_HEADER: &str = "X-Publisher-ID";
/// Optional attestation token header (registration only)
pub const ATTESTATION_HEADER: &str = "X-Attestation-Token";
/// Bearer credential header
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Body of `POST /devices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub external_id: String,
}

/// 201 body of `POST /devices`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    pub device_id: String,
    pub publisher_id: String,
    pub external_id: String,
    pub device_token: String,
    pub created_at: String,
}

impl std::fmt::Debug for RegisterDeviceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterDeviceResponse")
            .field("device_id", &self.device_id)
            .field("publisher_id", &self.publisher_id)
            .field("external_id", &self.external_id)
            .field("device_token", &"[redacted]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Body of `POST /capture/trust`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustExchangeRequest {
    pub nonce: String,
}

/// 200 body of `POST /capture/trust`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustExchangeResponse {
    pub trust_token: String,
}
