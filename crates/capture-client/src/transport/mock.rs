//! Mock transport
//!
//! For testing purposes - replays scripted responses and records requests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, ApiResponse, Transport};

enum Scripted {
    Reply(ApiResponse),
    NetworkFailure(String),
}

/// Transport that answers from a queue of scripted responses
///
/// Every request is recorded, including ones that hit an empty queue. An
/// empty queue answers with a network error.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Create a mock with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response
    pub fn respond(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(Scripted::Reply(ApiResponse::json(status, body)))
    }

    /// Queue a response with an empty body
    pub fn respond_empty(&self, status: u16) -> &Self {
        self.push(Scripted::Reply(ApiResponse::empty(status)))
    }

    /// Queue a network failure
    pub fn fail_network(&self, message: impl Into<String>) -> &Self {
        self.push(Scripted::NetworkFailure(message.into()))
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, entry: Scripted) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(entry);
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::NetworkFailure(message)) => Err(ClientError::Network(message)),
            None => Err(ClientError::Network("no scripted response".into())),
        }
    }

    fn description(&self) -> &str {
        "mock transport"
    }
}
