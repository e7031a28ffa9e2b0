//! Capture Session Handler
//!
//! POST /capture/session

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use capture_core::CaptureSession;

use super::{authenticate, random_token};
use crate::api::error::ApiError;
use crate::state::AppState;
use crate::storage::SessionRecord;

/// Open a capture session for the authenticated device
///
/// The request body is ignored.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<CaptureSession>), ApiError> {
    let device = authenticate(&state, &headers).await?;

    let record = SessionRecord {
        capture_id: uuid::Uuid::new_v4().to_string(),
        nonce: random_token(),
        device_id: device.device_id.clone(),
        expires_at: Utc::now() + state.config.session_ttl,
        consumed_at: None,
    };
    state.store.insert_session(record.clone()).await?;

    info!(
        capture_id = %record.capture_id,
        device_id = %device.device_id,
        expires_at = %record.expires_at,
        "Capture session opened"
    );

    Ok((
        StatusCode::CREATED,
        Json(CaptureSession::new(record.capture_id, record.nonce, record.expires_at)),
    ))
}
