//! Trust Exchange Client
//!
//! Exchanges a capture session's nonce for a server-signed trust token.
//! Exactly one request is made per call: the nonce is single-use, so a blind
//! retry would only come back as 400 or 410.

use std::sync::Arc;

use tracing::{info, warn};

use capture_core::{CaptureSession, TrustToken};

use crate::error::{ClientError, Result};
use crate::identity::DeviceIdentityManager;
use crate::transport::{ApiRequest, Transport};
use crate::types::{TrustExchangeRequest, TrustExchangeResponse, TRUST_PATH};

/// Redeems session nonces for trust tokens
pub struct TrustExchangeClient {
    identity: Arc<DeviceIdentityManager>,
    transport: Arc<dyn Transport>,
}

impl TrustExchangeClient {
    /// Create a new trust exchange client
    pub fn new(identity: Arc<DeviceIdentityManager>, transport: Arc<dyn Transport>) -> Self {
        Self { identity, transport }
    }

    /// Exchange `nonce` for a trust token
    ///
    /// Status mapping:
    /// - 200 -> trust token
    /// - 400 -> `InvalidNonce` (unknown, malformed or already used)
    /// - 401 -> `Unauthorized` (device needs re-registration)
    /// - 410 -> `SessionExpired` (restart the capture session)
    pub async fn exchange_trust_token(&self, nonce: &str) -> Result<TrustToken> {
        let device_token = self
            .identity
            .device_token()?
            .ok_or(ClientError::DeviceNotRegistered)?;

        let request = ApiRequest::post(TRUST_PATH)
            .with_bearer(&device_token)
            .with_json(&TrustExchangeRequest {
                nonce: nonce.to_string(),
            })?;
        let response = self.transport.post(request).await?;

        match response.status {
            200 => {
                let body: TrustExchangeResponse = response.parse()?;
                if body.trust_token.is_empty() {
                    return Err(ClientError::InvalidResponse("empty trust token".into()));
                }
                info!("Trust token issued");
                Ok(TrustToken::new(body.trust_token))
            }
            400 => {
                warn!("Nonce rejected");
                Err(ClientError::InvalidNonce)
            }
            401 => {
                warn!("Device credential rejected during trust exchange");
                Err(ClientError::Unauthorized)
            }
            410 => {
                warn!("Capture session expired before trust exchange");
                Err(ClientError::SessionExpired)
            }
            _ => Err(response.into_http_error()),
        }
    }

    /// Consume `session` and exchange its nonce
    ///
    /// Expiry is left to the trust service so a skewed device clock cannot
    /// reject a still-valid session.
    pub async fn redeem(&self, session: CaptureSession) -> Result<TrustToken> {
        self.exchange_trust_token(&session.nonce).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::identity::{DEVICE_ID_KEY, DEVICE_TOKEN_KEY, EXTERNAL_ID_KEY};
    use crate::store::{CredentialStore, MemoryCredentialStore};
    use crate::transport::MockTransport;
    use crate::types::AUTHORIZATION_HEADER;
    use serde_json::json;

    fn setup(registered: bool) -> (TrustExchangeClient, Arc<MockTransport>) {
        let store = Arc::new(MemoryCredentialStore::new());
        if registered {
            store.save(EXTERNAL_ID_KEY, b"ext-1").unwrap();
            store.save(DEVICE_ID_KEY, b"dev-1").unwrap();
            store.save(DEVICE_TOKEN_KEY, b"token-1").unwrap();
        }
        let transport = Arc::new(MockTransport::new());
        let identity = Arc::new(DeviceIdentityManager::new(
            Arc::new(ClientConfig::new("https://trust.example.com", "pub-1")),
            store,
            transport.clone(),
        ));
        (TrustExchangeClient::new(identity, transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_exchange_success() {
        let (client, transport) = setup(true);
        transport.respond(200, json!({"trust_token": "eyJ.a.b"}));

        let token = client.exchange_trust_token("nonce-1").await.unwrap();

        assert_eq!(token.as_str(), "eyJ.a.b");
        let request = &transport.requests()[0];
        assert_eq!(request.path, TRUST_PATH);
        assert_eq!(request.header(AUTHORIZATION_HEADER), Some("Bearer token-1"));
        assert_eq!(request.body["nonce"], "nonce-1");
    }

    #[tokio::test]
    async fn test_requires_registration() {
        let (client, transport) = setup(false);
        let result = client.exchange_trust_token("nonce-1").await;

        assert!(matches!(result, Err(ClientError::DeviceNotRegistered)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for status in [400u16, 401, 410] {
            let (client, transport) = setup(true);
            transport.respond(status, json!({"detail": "nope"}));

            let err = client.exchange_trust_token("nonce-1").await.unwrap_err();
            match status {
                400 => assert!(matches!(err, ClientError::InvalidNonce)),
                401 => assert!(matches!(err, ClientError::Unauthorized)),
                410 => assert!(matches!(err, ClientError::SessionExpired)),
                _ => unreachable!(),
            }
            assert_eq!(transport.request_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_expired_is_distinct_from_invalid() {
        let (client, transport) = setup(true);
        transport.respond_empty(410).respond_empty(400);

        let expired = client.exchange_trust_token("n").await.unwrap_err();
        let invalid = client.exchange_trust_token("n").await.unwrap_err();

        assert!(matches!(expired, ClientError::SessionExpired));
        assert!(matches!(invalid, ClientError::InvalidNonce));
        assert!(!matches!(expired, ClientError::Http { .. }));
    }

    #[tokio::test]
    async fn test_unmapped_status() {
        let (client, transport) = setup(true);
        transport.respond(429, json!({"detail": "slow down"}));

        let err = client.exchange_trust_token("nonce-1").await.unwrap_err();
        assert!(matches!(err, ClientError::Http { status: 429, .. }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_redeem_consumes_session() {
        let (client, transport) = setup(true);
        transport.respond(200, json!({"trust_token": "tok"}));

        let session = CaptureSession::new("cap-1", "nonce-9", chrono::Utc::now());
        let token = client.redeem(session).await.unwrap();

        assert_eq!(token.as_str(), "tok");
        assert_eq!(transport.requests()[0].body["nonce"], "nonce-9");
    }
}
