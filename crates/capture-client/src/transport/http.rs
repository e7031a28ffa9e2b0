//! HTTP transport backed by reqwest

use async_trait::async_trait;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// JSON-over-HTTPS transport
pub struct HttpTransport {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the configured trust service
    ///
    /// The configured timeout, if any, bounds each request end to end.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.config.endpoint(&request.path);
        debug!(url = %url, "POST");

        let mut builder = self.http_client.post(&url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(url = %url, status = status, "Trust service responded");

        Ok(ApiResponse { status, body })
    }

    fn description(&self) -> &str {
        "reqwest HTTP transport"
    }
}
