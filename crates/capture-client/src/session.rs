//! Capture Session Manager
//!
//! Requests single-use, time-bounded capture sessions. Sessions are never
//! refreshed or retried here: callers observe expiry and ask for a new one.

use std::sync::Arc;

use tracing::{debug, info, warn};

use capture_core::CaptureSession;

use crate::error::{ClientError, Result};
use crate::identity::DeviceIdentityManager;
use crate::transport::{ApiRequest, Transport};
use crate::types::SESSION_PATH;

/// Opens capture sessions for a registered device
pub struct CaptureSessionManager {
    identity: Arc<DeviceIdentityManager>,
    transport: Arc<dyn Transport>,
}

impl CaptureSessionManager {
    /// Create a new session manager
    pub fn new(identity: Arc<DeviceIdentityManager>, transport: Arc<dyn Transport>) -> Self {
        Self { identity, transport }
    }

    /// Request a new capture session
    ///
    /// Fails with `DeviceNotRegistered` without any network call when no
    /// device token is stored.
    pub async fn create_session(&self) -> Result<CaptureSession> {
        let device_token = self
            .identity
            .device_token()?
            .ok_or(ClientError::DeviceNotRegistered)?;

        let request = ApiRequest::post(SESSION_PATH).with_bearer(&device_token);
        let response = self.transport.post(request).await?;

        match response.status {
            201 => {
                let session: CaptureSession = response.parse()?;
                if session.nonce.is_empty() || session.capture_id.is_empty() {
                    return Err(ClientError::InvalidResponse(
                        "session response without capture id or nonce".into(),
                    ));
                }
                info!(
                    capture_id = %session.capture_id,
                    expires_at = %session.expires_at,
                    "Capture session opened"
                );
                if session.is_expired() {
                    debug!(capture_id = %session.capture_id, "Session arrived already expired");
                }
                Ok(session)
            }
            401 => {
                warn!("Device credential rejected while opening session");
                Err(ClientError::Unauthorized)
            }
            _ => Err(response.into_http_error()),
        }
    }
}
