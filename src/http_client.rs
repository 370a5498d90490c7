use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// reqwest-backed transport with connection pooling
///
/// Timeouts live here: the authenticated client itself never cancels or retries a
/// transport call on its own.
#[derive(Clone)]
pub struct ReqwestTransport {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl ReqwestTransport {
    /// Create a new pooled transport
    pub fn new(max_connections: usize, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        let mut builder = self
            .client
            .request(method, url.clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            let err = categorize(&e);
            tracing::warn!(
                error = %e,
                url = %url,
                "HTTP request error"
            );
            err
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        tracing::debug!(
            status = %status,
            body_len = body.len(),
            "Received HTTP response"
        );

        Ok(ApiResponse::new(status, headers, body))
    }
}

/// Categorize a reqwest error for better debugging
fn categorize(e: &reqwest::Error) -> TransportError {
    let message = e.to_string();
    if e.is_timeout() {
        TransportError::Timeout(message)
    } else if e.is_connect() {
        TransportError::Connect(message)
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(message)
    } else {
        TransportError::Request(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    #[test]
    fn test_transport_builds() {
        let transport = ReqwestTransport::new(20, 30, 300);
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_connect_error() {
        let transport = ReqwestTransport::new(1, 1, 2).unwrap();
        // Port 9 (discard) is closed on loopback in test environments
        let request = ApiRequest::get(Url::parse("http://127.0.0.1:9/health").unwrap());

        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect(_) | TransportError::Timeout(_) | TransportError::Request(_)
        ));
    }
}
