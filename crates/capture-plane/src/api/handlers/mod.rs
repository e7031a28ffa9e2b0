//! API request handlers

pub mod devices;
pub mod session;
pub mod trust;

pub use devices::register_device;
pub use session::create_session;
pub use trust::exchange_trust;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use tracing::warn;

use crate::api::error::ApiError;
use crate::state::AppState;
use crate::storage::DeviceRecord;

/// Publisher identifier header
pub const PUBLISHER_HEADER: &str = "x-publisher-id";
/// Optional platform attestation header
pub const ATTESTATION_HEADER: &str = "x-attestation-token";

/// Read a header as UTF-8, treating unreadable values as absent
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract the token from `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, AUTHORIZATION.as_str())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the calling device from its bearer token
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<DeviceRecord, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    match state.store.find_by_token(token).await? {
        Some(device) => Ok(device),
        None => {
            warn!("Unknown device token presented");
            Err(ApiError::Unauthorized("unknown device token".into()))
        }
    }
}

/// 256 bits of randomness, URL-safe base64
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_random_token_shape() {
        let a = random_token();
        let b = random_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));
    }
}
