//! HTTP transport to the trainer backend
//!
//! [`BackendTransport`] is the seam between the pipeline and the network.
//! [`HttpTransport`] is the reqwest implementation; [`BackendClient`] bundles a
//! transport with the API base URL and the optional bearer token.

use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as lossy UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Issues GET requests against the backend
///
/// Implementations return `Ok` for any completed response regardless of status;
/// `Err` means the request never completed.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// GET `url`, attaching `Authorization: Bearer <token>` when a token is given
    async fn get(&self, url: &str, token: Option<&str>) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport with reqwest defaults (no timeouts)
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport with a connect timeout
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn get(&self, url: &str, token: Option<&str>) -> Result<TransportResponse> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        trace!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(TransportResponse { status, body })
    }
}

/// Transport plus backend address and credentials
#[derive(Clone)]
pub struct BackendClient {
    transport: Arc<dyn BackendTransport>,
    api_base: String,
    token: Option<String>,
}

impl BackendClient {
    /// Client over `transport`; a trailing `/` on `api_base` is removed
    pub fn new(
        transport: Arc<dyn BackendTransport>,
        api_base: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            transport,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Client over a fresh [`HttpTransport`]
    pub fn http(api_base: impl Into<String>, token: Option<String>) -> Self {
        Self::new(Arc::new(HttpTransport::new()), api_base, token)
    }

    /// Backend base URL without trailing slash
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Bearer token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Underlying transport
    pub fn transport(&self) -> &Arc<dyn BackendTransport> {
        &self.transport
    }

    /// Authenticated GET
    pub async fn get(&self, url: &str) -> Result<TransportResponse> {
        self.transport.get(url, self.token()).await
    }
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
