//! Device Registration Handler
//!
//! POST /devices
//!
//! Publisher checks come before the uniqueness check, so an unknown
//! publisher always sees 400 even for a taken external id.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{header_str, random_token, ATTESTATION_HEADER, PUBLISHER_HEADER};
use crate::api::error::ApiError;
use crate::state::AppState;
use crate::storage::{DeviceRecord, StorageError};

/// Request to register a device
#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub external_id: String,
}

/// Response from device registration
#[derive(Debug, Serialize)]
pub struct RegisterDeviceResponse {
    pub device_id: String,
    pub publisher_id: String,
    pub external_id: String,
    pub device_token: String,
    pub created_at: String,
}

/// Register a device under the calling publisher
pub async fn register_device(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<(StatusCode, Json<RegisterDeviceResponse>), ApiError> {
    let publisher_id = header_str(&headers, PUBLISHER_HEADER).unwrap_or_default().trim();
    if !state.config.accepts_publisher(publisher_id) {
        warn!(publisher = %publisher_id, "Registration from unknown publisher");
        return Err(ApiError::InvalidPublisher(format!(
            "publisher '{}' is not accepted",
            publisher_id
        )));
    }

    let external_id = request.external_id.trim();
    if external_id.is_empty() {
        return Err(ApiError::BadRequest("external_id must not be empty".into()));
    }

    let record = DeviceRecord {
        device_id: uuid::Uuid::new_v4().to_string(),
        publisher_id: publisher_id.to_string(),
        external_id: external_id.to_string(),
        device_token: random_token(),
        attestation_token: header_str(&headers, ATTESTATION_HEADER).map(str::to_string),
        created_at: Utc::now(),
    };

    match state.store.insert_device(record.clone()).await {
        Ok(()) => {}
        Err(StorageError::AlreadyExists(id)) => {
            info!(external_id = %id, "Registration conflict");
            return Err(ApiError::Conflict(id));
        }
        Err(e) => return Err(e.into()),
    }

    info!(
        device_id = %record.device_id,
        publisher = %record.publisher_id,
        attested = record.attestation_token.is_some(),
        "Device registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterDeviceResponse {
            device_id: record.device_id,
            publisher_id: record.publisher_id,
            external_id: record.external_id,
            device_token: record.device_token,
            created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }),
    ))
}
