//! Transport and credential collaborators.
//!
//! The orchestrator is agnostic to how bytes move: anything implementing
//! [`Transport`] works (the bundled [`HttpTransport`] uses reqwest). Tests
//! inject scripted transports.

use crate::error::Error;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One wire-level request, already credentialed.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

/// One wire-level response. Status classification happens in the retry layer.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Best-effort parsing of `Retry-After`.
    ///
    /// Only the common `Retry-After: <seconds>` form is supported.
    pub fn retry_after_ms(&self) -> Option<u64> {
        let raw = self.header("retry-after")?;
        let secs: u64 = raw.trim().parse().ok()?;
        Some(secs.saturating_mul(1000))
    }
}

/// Asynchronous transport collaborator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one attempt. Implementations must abort promptly when the
    /// cancellation token fires and surface it as [`Error::Cancelled`].
    async fn send(
        &self,
        request: &TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse>;
}

/// Supplies a bearer token on demand. The orchestrator treats a missing or
/// placeholder token as an immediate terminal failure without consuming a
/// retry or queue slot.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, e.g. loaded once from the environment.
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CredentialProvider for StaticCredential {
    fn bearer_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

/// Tokens that are clearly unconfigured rather than merely invalid.
pub(crate) fn is_placeholder_token(token: &str) -> bool {
    let t = token.trim();
    if t.is_empty() {
        return true;
    }
    let lower = t.to_lowercase();
    lower == "your_api_key"
        || lower == "your-api-key"
        || lower.contains("placeholder")
        || lower.contains("changeme")
}

/// reqwest-backed [`Transport`].
///
/// No client-level timeout: per-attempt deadlines are enforced by the
/// orchestrator so retry accounting stays in one place.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| {
                Error::configuration(format!("unsupported HTTP method: {}", request.method))
            })?;
        let mut req = self.client.request(method, &request.url);

        for (k, v) in &request.headers {
            req = req.header(k, v);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            resp = req.send() => {
                resp.map_err(|e| Error::network(e.to_string()))?
            }
        };

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            text = response.text() => text.unwrap_or_default(),
        };

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
