//! Device Identity Manager
//!
//! Owns the device's registration state and bearer credential, mirrored
//! into the secure credential store under three keys:
//!
//! - `external_id`: client-generated UUID, created once and persisted
//! - `device_id`: server-assigned id, written only on a 201
//! - `device_token`: bearer credential, written only on a 201
//!
//! A stored token is the sole definition of "registered".
//!
//! ## Conflict recovery
//!
//! A 409 at registration usually means an earlier install used the same
//! `external_id` and the local token was lost. The manager clears local
//! credentials, generates a fresh `external_id` and retries exactly once. A
//! second 409 is terminal.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use capture_core::DeviceIdentity;

use crate::attestation::AttestationProvider;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::store::CredentialStore;
use crate::transport::{ApiRequest, Transport};
use crate::types::{
    RegisterDeviceRequest, RegisterDeviceResponse, ATTESTATION_HEADER, DEVICES_PATH,
    PUBLISHER_HEADER,
};

/// Credential store key for the bearer credential
pub const DEVICE_TOKEN_KEY: &str = "capture_trust.device_token";
/// Credential store key for the server-assigned device id
pub const DEVICE_ID_KEY: &str = "capture_trust.device_id";
/// Credential store key for the client-generated external id
pub const EXTERNAL_ID_KEY: &str = "capture_trust.external_id";

/// Outcome of a single registration request
enum RegistrationAttempt {
    Registered(DeviceIdentity),
    Conflict { external_id: String },
}

/// Registers the device and guards its credentials
pub struct DeviceIdentityManager {
    config: Arc<ClientConfig>,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    /// Serializes the read-id / request / persist sequence
    registration: Mutex<()>,
}

impl DeviceIdentityManager {
    /// Create a new identity manager
    pub fn new(
        config: Arc<ClientConfig>,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            registration: Mutex::new(()),
        }
    }

    /// Whether a device token is present in the credential store
    pub fn is_registered(&self) -> Result<bool> {
        self.store.exists(DEVICE_TOKEN_KEY)
    }

    /// The stored bearer credential, if registered
    pub fn device_token(&self) -> Result<Option<String>> {
        self.store.read_string(DEVICE_TOKEN_KEY)
    }

    /// The stored identity, if registered
    ///
    /// A stored `device_id` without a token is ignored.
    pub fn current_identity(&self) -> Result<Option<DeviceIdentity>> {
        let device_token = match self.store.read_string(DEVICE_TOKEN_KEY)? {
            Some(token) => token,
            None => return Ok(None),
        };
        let device_id = self.store.read_string(DEVICE_ID_KEY)?;
        let external_id = self.store.read_string(EXTERNAL_ID_KEY)?;

        match (device_id, external_id) {
            (Some(device_id), Some(external_id)) => Ok(Some(DeviceIdentity {
                external_id,
                device_id,
                device_token,
            })),
            _ => Err(ClientError::Storage(
                "device token stored without its device id or external id".into(),
            )),
        }
    }

    /// Register this device with the trust service
    ///
    /// The attestation token, when present, is forwarded as-is.
    pub async fn register_device(&self, attestation_token: Option<String>) -> Result<DeviceIdentity> {
        let _guard = self.registration.lock().await;
        self.register_locked(attestation_token.as_deref()).await
    }

    /// Register with a token fetched from `provider`
    ///
    /// Attestation is best-effort: if the provider fails, registration
    /// proceeds without a token.
    pub async fn register_with_provider(
        &self,
        provider: &dyn AttestationProvider,
    ) -> Result<DeviceIdentity> {
        let attestation_token = match provider.current_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    provider = provider.description(),
                    error = %e,
                    "Attestation unavailable, registering without it"
                );
                None
            }
        };
        self.register_device(attestation_token).await
    }

    /// Return the stored identity, registering first if there is none
    ///
    /// The check and the registration happen under the same lock, so
    /// concurrent callers register at most once.
    pub async fn ensure_registered(&self, attestation_token: Option<String>) -> Result<DeviceIdentity> {
        let _guard = self.registration.lock().await;
        if let Some(identity) = self.current_identity()? {
            debug!(device_id = %identity.device_id, "Device already registered");
            return Ok(identity);
        }
        self.register_locked(attestation_token.as_deref()).await
    }

    /// Delete the stored token, device id and external id
    ///
    /// Every deletion is attempted; the first failure is returned afterwards.
    pub async fn reset_credentials(&self) -> Result<()> {
        let _guard = self.registration.lock().await;
        self.clear_credentials()?;
        info!("Device credentials reset");
        Ok(())
    }

    async fn register_locked(&self, attestation_token: Option<&str>) -> Result<DeviceIdentity> {
        match self.attempt(attestation_token, false).await? {
            RegistrationAttempt::Registered(identity) => Ok(identity),
            RegistrationAttempt::Conflict { external_id } => {
                warn!(
                    external_id = %external_id,
                    "Registration conflict, retrying once with a new external id"
                );
                self.clear_credentials()?;

                match self.attempt(attestation_token, true).await? {
                    RegistrationAttempt::Registered(identity) => Ok(identity),
                    RegistrationAttempt::Conflict { external_id } => {
                        warn!(external_id = %external_id, "Registration conflict persisted after retry");
                        Err(ClientError::AlreadyRegistered)
                    }
                }
            }
        }
    }

    async fn attempt(&self, attestation_token: Option<&str>, is_retry: bool) -> Result<RegistrationAttempt> {
        let external_id = self.read_or_create_external_id()?;

        let mut request = ApiRequest::post(DEVICES_PATH)
            .with_header(PUBLISHER_HEADER, self.config.publisher_id.as_str())
            .with_json(&RegisterDeviceRequest {
                external_id: external_id.clone(),
            })?;
        if let Some(token) = attestation_token {
            request = request.with_header(ATTESTATION_HEADER, token);
        }

        debug!(
            external_id = %external_id,
            is_retry = is_retry,
            attested = attestation_token.is_some(),
            "Registering device"
        );

        let response = self.transport.post(request).await?;

        match response.status {
            201 => {
                let body: RegisterDeviceResponse = response.parse()?;
                if body.device_token.is_empty() || body.device_id.is_empty() {
                    return Err(ClientError::InvalidResponse(
                        "registration response without device credentials".into(),
                    ));
                }
                if body.external_id != external_id {
                    warn!(
                        sent = %external_id,
                        received = %body.external_id,
                        "Trust service echoed a different external id"
                    );
                }

                self.persist_credentials(&body.device_id, &body.device_token)?;
                let identity = DeviceIdentity::new(external_id, body.device_id, body.device_token);

                info!(
                    device_id = %identity.device_id,
                    external_id = %identity.external_id,
                    token = %identity.token_hint(),
                    is_retry = is_retry,
                    "Device registered"
                );

                Ok(RegistrationAttempt::Registered(identity))
            }
            400 => {
                warn!(publisher_id = %self.config.publisher_id, "Publisher rejected");
                Err(ClientError::InvalidPublisher)
            }
            409 => Ok(RegistrationAttempt::Conflict { external_id }),
            _ => Err(response.into_http_error()),
        }
    }

    fn read_or_create_external_id(&self) -> Result<String> {
        if let Some(existing) = self.store.read_string(EXTERNAL_ID_KEY)? {
            return Ok(existing);
        }
        let external_id = Uuid::new_v4().to_string();
        self.store.save(EXTERNAL_ID_KEY, external_id.as_bytes())?;
        debug!(external_id = %external_id, "Generated external id");
        Ok(external_id)
    }

    /// Write device id then token; the token write is what flips the device
    /// to registered, so a failed token write rolls back the id.
    fn persist_credentials(&self, device_id: &str, device_token: &str) -> Result<()> {
        self.store.save(DEVICE_ID_KEY, device_id.as_bytes())?;
        if let Err(e) = self.store.save(DEVICE_TOKEN_KEY, device_token.as_bytes()) {
            if let Err(rollback) = self.store.delete(DEVICE_ID_KEY) {
                warn!(error = %rollback, "Failed to roll back device id");
            }
            return Err(e);
        }
        Ok(())
    }

    fn clear_credentials(&self) -> Result<()> {
        let mut first_error = None;
        for key in [DEVICE_TOKEN_KEY, DEVICE_ID_KEY, EXTERNAL_ID_KEY] {
            if let Err(e) = self.store.delete(key) {
                warn!(key = %key, error = %e, "Failed to delete credential");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
