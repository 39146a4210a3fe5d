//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, ureq, a browser bridge, etc.). This module
//! only owns the JSON encoding and the mapping from HTTP outcomes to the
//! engine's error taxonomy.

use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::protocol::{PushRequest, PushResponse};
use crate::transport::SyncTransport;

/// Response returned by an [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An
/// implementation must enforce `timeout` itself; the engine adds no
/// timeout of its own, and a request that never resolves would leave the
/// session reporting `Running` indefinitely.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a bearer credential.
    ///
    /// `Err` means the request never produced an HTTP response
    /// (connection refused, timeout); `Ok` carries whatever status the
    /// server answered with.
    fn post(
        &self,
        url: &str,
        auth_token: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse, String>;
}

/// JSON-over-HTTP sync transport.
pub struct HttpTransport<C> {
    /// Base URL of the save endpoint (e.g. "https://studio.example.com/api/documents").
    base_url: String,
    /// Session auth credential, sent as a bearer token.
    auth_token: String,
    /// HTTP client implementation.
    client: C,
    /// Per-request timeout handed to the client.
    timeout: Duration,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport with a 30 second request timeout.
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: auth_token.into(),
            client,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse> {
        let body = serde_json::to_vec(request)
            .map_err(|e| EngineError::Protocol(format!("failed to encode request: {e}")))?;

        let url = format!("{}/push", self.base_url);
        let response = self
            .client
            .post(&url, &self.auth_token, body, self.timeout)
            .map_err(EngineError::transport_retryable)?;

        if !(200..300).contains(&response.status) {
            return Err(EngineError::Http {
                status: response.status,
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| EngineError::Protocol(format!("failed to decode response: {e}")))
    }
}
