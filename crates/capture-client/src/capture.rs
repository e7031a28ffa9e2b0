//! Capture orchestration
//!
//! Drives one capture attempt end to end:
//!
//! ```text
//! register once -> open session -> caller captures -> sign content
//!               -> redeem nonce -> assemble sidecar -> caller persists
//! ```
//!
//! The content is signed *before* the nonce is redeemed, so a hardware
//! failure leaves the session unspent. The token and the proof placed in a
//! sidecar always come from the same session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use capture_core::{
    CaptureSession, DeviceIdentity, HardwareSigner, MediaIntegrityGenerator, Sidecar,
    SidecarAssembler,
};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::exchange::TrustExchangeClient;
use crate::identity::DeviceIdentityManager;
use crate::session::CaptureSessionManager;
use crate::store::CredentialStore;
use crate::transport::{HttpTransport, Transport};

/// Entry point wiring the device-side protocol components together
pub struct CaptureClient {
    identity: Arc<DeviceIdentityManager>,
    sessions: CaptureSessionManager,
    exchange: TrustExchangeClient,
    integrity: MediaIntegrityGenerator,
}

impl CaptureClient {
    /// Create a client over an arbitrary transport
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        signer: Arc<dyn HardwareSigner>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let identity = Arc::new(DeviceIdentityManager::new(
            config,
            store,
            transport.clone(),
        ));

        Ok(Self {
            sessions: CaptureSessionManager::new(identity.clone(), transport.clone()),
            exchange: TrustExchangeClient::new(identity.clone(), transport),
            integrity: MediaIntegrityGenerator::new(signer),
            identity,
        })
    }

    /// Create a client talking HTTP to the configured trust service
    pub fn with_http(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        signer: Arc<dyn HardwareSigner>,
    ) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::new(config, store, signer, transport)
    }

    /// The identity manager
    pub fn identity(&self) -> &DeviceIdentityManager {
        &self.identity
    }

    /// The session manager
    pub fn sessions(&self) -> &CaptureSessionManager {
        &self.sessions
    }

    /// The trust exchange client
    pub fn exchange(&self) -> &TrustExchangeClient {
        &self.exchange
    }

    /// Create the hardware signing key if it does not exist yet
    pub fn prepare_signing_key(&self) -> Result<()> {
        Ok(self.integrity.prepare_key()?)
    }

    /// Register the device unless a credential is already stored
    pub async fn ensure_registered(&self, attestation_token: Option<String>) -> Result<DeviceIdentity> {
        self.identity.ensure_registered(attestation_token).await
    }

    /// Open a capture session for the next photo
    pub async fn begin_capture(&self) -> Result<CaptureSession> {
        self.sessions.create_session().await
    }

    /// Sign `content`, redeem the session and assemble the sidecar
    ///
    /// `content` must be the exact bytes that will be persisted. The session
    /// is consumed whatever the outcome; on any error the caller starts over
    /// with a new session and must not persist the content as attested.
    pub async fn complete_capture(
        &self,
        session: CaptureSession,
        content: &[u8],
        captured_at: DateTime<Utc>,
    ) -> Result<Sidecar> {
        let capture_id = session.capture_id.clone();

        let integrity = self
            .integrity
            .generate(content, &capture_id, captured_at)
            .map_err(|e| {
                warn!(capture_id = %capture_id, error = %e, "Capture aborted: no integrity proof");
                e
            })?;

        let trust_token = self.exchange.redeem(session).await?;
        let sidecar = SidecarAssembler::assemble(trust_token, integrity);

        info!(
            capture_id = %capture_id,
            content_hash = %sidecar.media_integrity.content_hash,
            "Capture attested"
        );

        Ok(sidecar)
    }
}
