//! Trust Exchange Handler
//!
//! POST /capture/trust
//!
//! Redeems a session nonce for an ES256 trust token. Unknown, foreign and
//! already-redeemed nonces are 400; a nonce past its session expiry is 410.
//!
//! The token is signed before the nonce is consumed, so a signing failure
//! (500) leaves the session redeemable. Consumption stays the atomic step:
//! if a concurrent exchange wins, the token signed here is discarded.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::authenticate;
use crate::api::error::ApiError;
use crate::state::AppState;
use crate::storage::StorageError;

/// Request to exchange a nonce
#[derive(Debug, Deserialize)]
pub struct TrustExchangeRequest {
    pub nonce: String,
}

/// Response carrying the trust token
#[derive(Debug, Serialize)]
pub struct TrustExchangeResponse {
    pub trust_token: String,
}

/// Exchange a nonce for a trust token
pub async fn exchange_trust(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<TrustExchangeRequest>,
) -> Result<Json<TrustExchangeResponse>, ApiError> {
    let device = authenticate(&state, &headers).await?;

    if request.nonce.is_empty() {
        return Err(ApiError::InvalidNonce("nonce must not be empty".into()));
    }

    let now = Utc::now();
    let reject = |e: StorageError| {
        warn!(device_id = %device.device_id, error = %e, "Trust exchange rejected");
        ApiError::from(e)
    };

    let pending = state
        .store
        .check_nonce(&request.nonce, &device.device_id, now)
        .await
        .map_err(reject)?;

    let trust_token = state
        .issuer
        .issue(&device.device_id, &pending.capture_id, &device.publisher_id, now)
        .map_err(|e| {
            error!(capture_id = %pending.capture_id, error = %e, "Trust token signing failed");
            ApiError::from(e)
        })?;

    let session = state
        .store
        .consume_nonce(&request.nonce, &device.device_id, now)
        .await
        .map_err(reject)?;

    info!(
        capture_id = %session.capture_id,
        device_id = %device.device_id,
        "Trust token issued"
    );

    Ok(Json(TrustExchangeResponse { trust_token }))
}
