//! HTTP client for the canteen redemption endpoint.
//!
//! The relay is deliberately dumb: the request body goes upstream byte for
//! byte, and the upstream status and body come back unmodified. The scanner
//! never interprets tokens or outcomes.

use std::time::Duration;

use axum::body::Bytes;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, instrument};
use url::Url;

use crate::error::RelayError;

/// What the canteen answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// Upstream HTTP status.
    pub status: StatusCode,
    /// Upstream JSON body, untouched.
    pub body: Bytes,
}

/// Client that forwards scans to the canteen.
#[derive(Debug, Clone)]
pub struct RelayClient {
    /// HTTP client (carries the timeout).
    client: Client,
    /// Canteen redemption endpoint.
    redeem_url: Url,
}

impl RelayClient {
    /// Create a new relay client.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Client` if the HTTP client cannot be built.
    pub fn new(redeem_url: Url, timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;

        Ok(Self { client, redeem_url })
    }

    /// Upstream endpoint.
    #[must_use]
    pub const fn redeem_url(&self) -> &Url {
        &self.redeem_url
    }

    /// Forward a scan body to the canteen.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Request` if the canteen cannot be reached in
    /// time, and `RelayError::Response` if it answers with anything that is
    /// not JSON.
    #[instrument(skip(self, body), fields(upstream = %self.redeem_url, bytes = body.len()))]
    pub async fn forward(&self, body: Bytes) -> Result<UpstreamResponse, RelayError> {
        let response = self
            .client
            .post(self.redeem_url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::Response(e.to_string()))?;

        serde_json::from_slice::<serde_json::Value>(&body)
            .map_err(|e| RelayError::Response(format!("status {status}, body is not JSON: {e}")))?;

        debug!(%status, "Canteen answered");
        Ok(UpstreamResponse { status, body })
    }
}
