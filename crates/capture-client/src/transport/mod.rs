//! Transport abstraction for the trust service
//!
//! Components build requests and interpret status codes themselves; the
//! transport only moves bytes. A transport error means no definitive answer
//! was received (unreachable host, timeout, cancelled connection).

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, Result};
use crate::types::AUTHORIZATION_HEADER;

/// A JSON POST to the trust service
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Endpoint path, e.g. "/devices"
    pub path: String,

    /// Extra request headers
    pub headers: Vec<(String, String)>,

    /// JSON body
    pub body: serde_json::Value,
}

impl ApiRequest {
    /// Create a POST request with an empty JSON object body
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: Vec::new(),
            body: serde_json::json!({}),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add an `Authorization: Bearer` header
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header(AUTHORIZATION_HEADER, format!("Bearer {}", token))
    }

    /// Set the JSON body
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidResponse(format!("unserializable request: {}", e)))?;
        Ok(self)
    }

    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A definitive answer from the trust service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,

    /// Raw response body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Create a response with a JSON body
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Create a response with an empty body
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    /// Decode the body as JSON
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::InvalidResponse(format!("unexpected body for status {}: {}", self.status, e))
        })
    }

    /// Human-readable message from an error body, if one is present
    ///
    /// Looks at `detail`, `error` and `message`, in that order.
    pub fn error_message(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        ["detail", "error", "message"]
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
    }

    /// Convert into the generic HTTP error for unmapped statuses
    pub fn into_http_error(self) -> ClientError {
        ClientError::Http {
            status: self.status,
            message: self.error_message(),
        }
    }
}

/// Carries requests to the trust service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a JSON POST and return whatever status the service answered with
    async fn post(&self, request: ApiRequest) -> Result<ApiResponse>;

    /// Get a description of this transport (for logging)
    fn description(&self) -> &str {
        "transport"
    }
}
