use thiserror::Error;

/// Unified error type for the orchestrator.
///
/// Every variant carries its own retry/breaker classification so that policy
/// decisions have a single source of truth. Infra-level failures (network,
/// timeout, 5xx) are evidence of upstream unhealthiness and count toward the
/// circuit breaker; caller-side errors (bad auth, bad request) and upstream
/// rate limiting do not.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failure, abort, or attempt timeout.
    #[error("network error: {message}")]
    Network { message: String },

    /// HTTP 429. An upstream throttling signal, not a health signal.
    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited { retry_after_ms: Option<u64> },

    /// HTTP 4xx other than 429. Auth/validation errors are never retried.
    #[error("client error: HTTP {status}: {message}")]
    Client { status: u16, message: String },

    /// HTTP 5xx.
    #[error("server error: HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The circuit breaker gate rejected the call.
    #[error("circuit breaker open; retry in ~{retry_after_ms}ms")]
    CircuitOpen { retry_after_ms: u64 },

    /// The queue was force-drained before this entry was dispatched.
    #[error("queue cleared before dispatch")]
    QueueCleared,

    /// Explicit caller-initiated cancellation.
    #[error("request cancelled")]
    Cancelled,

    /// No usable bearer token was available at submission time.
    #[error("missing or placeholder API credential")]
    MissingCredential,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    pub fn network(message: impl Into<String>) -> Self {
        Error::Network {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Whether another attempt at the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network { .. } | Error::RateLimited { .. } | Error::Server { .. }
        )
    }

    /// Whether this failure counts toward circuit breaker health.
    ///
    /// 429 is deliberately excluded: being throttled means the upstream is
    /// alive and enforcing its quota.
    pub fn is_breaker_relevant(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::Server { .. })
    }

    /// Upstream-provided wait hint, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Error::RateLimited { retry_after_ms } => *retry_after_ms,
            Error::CircuitOpen { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
