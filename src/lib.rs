//! # llm-orchestrator
//!
//! Resilient outbound-request orchestrator for long-lived clients of
//! rate-limited, sometimes-unreliable LLM APIs.
//!
//! ## Overview
//!
//! Every outbound call goes through one [`Orchestrator`], which bounds
//! concurrency, absorbs transient failures, respects caller timeouts and
//! cancellation, and degrades to a deterministic fallback result rather than
//! surfacing raw errors to end users.
//!
//! ## Core Philosophy
//!
//! - **One design, many configurations**: thresholds, intervals, and retry
//!   math are configuration instances of a single policy, not separate code
//!   paths
//! - **Health vs. throttling**: infra-level failures (network, 5xx) feed the
//!   circuit breaker; rate limiting (429) and caller errors (4xx) never do
//! - **Degraded-but-present**: an open circuit or exhausted retries produce a
//!   fallback result, not a hard error, unless the caller opts into strict
//!   mode
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_orchestrator::{Orchestrator, RequestDescriptor, SubmitOptions};
//!
//! #[tokio::main]
//! async fn main() -> llm_orchestrator::Result<()> {
//!     let orchestrator = Orchestrator::builder().build()?;
//!
//!     let request = RequestDescriptor::post_json(
//!         "https://api.example.com/v1/chat/completions",
//!         serde_json::json!({"model": "gpt-4o-mini", "messages": []}),
//!     );
//!
//!     let outcome = orchestrator.submit(request, SubmitOptions::new()).await?;
//!     // Upstream response or deterministic fallback; inspect outcome.is_fallback().
//!     let _ = outcome;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`orchestrator`] | Composition root: submit, cancel, stats, reset |
//! | [`resilience`] | Circuit breaker, rate limiter, backoff policy |
//! | [`queue`] | Bounded-concurrency admission queue with priority tiers |
//! | [`retry`] | Attempt classification and the bounded retry loop |
//! | [`transport`] | Transport / credential collaborators, reqwest implementation |
//! | [`fallback`] | Deterministic degraded-result provider |
//! | [`metrics`] | Passive counters and latency window |
//! | [`request`] | Request descriptors and per-submission options |
//! | [`config`] | Configuration surface with documented defaults |

pub mod config;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod request;
pub mod resilience;
pub mod retry;
pub mod transport;

// Re-export main types for convenience
pub use config::{OrchestratorConfig, RetryPolicy};
pub use error::Error;
pub use fallback::{FallbackProvider, StaticFallback};
pub use metrics::MetricsSnapshot;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorStats, SubmitOutcome};
pub use request::{Priority, RequestDescriptor, SubmitOptions};
pub use transport::{
    CredentialProvider, HttpTransport, StaticCredential, Transport, TransportRequest,
    TransportResponse,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
