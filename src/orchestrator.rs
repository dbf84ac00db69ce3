//! Composition root: wires the breaker, rate limiter, queue, retry executor,
//! metrics, and the transport/fallback/credential collaborators behind one
//! `submit` entry point.
//!
//! One orchestrator instance is meant to be owned by the application's
//! composition root and shared by reference; the breaker, queue, and metrics
//! inside it are process-wide singletons for every caller.

use crate::config::OrchestratorConfig;
use crate::error::Error;
use crate::fallback::{FallbackProvider, StaticFallback};
use crate::metrics::{MetricsRegister, MetricsSnapshot};
use crate::queue::{ConcurrencyQueue, QueueEntry, QueueSnapshot};
use crate::request::{RequestDescriptor, SubmitOptions};
use crate::resilience::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot,
};
use crate::resilience::rate_limiter::{RateLimiter, RateLimiterSnapshot};
use crate::retry::RetryExecutor;
use crate::transport::{
    is_placeholder_token, CredentialProvider, HttpTransport, Transport, TransportRequest,
    TransportResponse,
};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the caller ultimately receives: either the upstream response or the
/// deterministic degraded result. Raw errors are rare by design.
#[derive(Debug)]
pub enum SubmitOutcome {
    Upstream(TransportResponse),
    Fallback(serde_json::Value),
}

impl SubmitOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SubmitOutcome::Fallback(_))
    }
}

/// Read-only view over all runtime state.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    pub breaker: CircuitBreakerSnapshot,
    pub queue: QueueSnapshot,
    pub rate_limiter: RateLimiterSnapshot,
    pub metrics: MetricsSnapshot,
}

struct Inner {
    config: OrchestratorConfig,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    queue: ConcurrencyQueue,
    metrics: MetricsRegister,
    transport: Arc<dyn Transport>,
    fallback: Arc<dyn FallbackProvider>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

/// Resilient outbound-request orchestrator. Cheap to clone; all clones share
/// the same breaker, queue, limiter, and metrics.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Submit one request. Resolves with the upstream response, the fallback
    /// result (open circuit or exhausted retries), or an error in strict
    /// mode / on cancellation.
    pub async fn submit(
        &self,
        descriptor: RequestDescriptor,
        options: SubmitOptions,
    ) -> Result<SubmitOutcome> {
        let inner = &self.inner;
        inner.metrics.record_submitted();

        let mut descriptor = descriptor;
        descriptor.priority = options.priority;
        descriptor.timeout = options.timeout.unwrap_or(inner.config.request_timeout);

        // Credential gate: a missing/placeholder token fails before consuming
        // a retry or a queue slot.
        if let Some(credentials) = &inner.credentials {
            match credentials.bearer_token() {
                Some(token) if !is_placeholder_token(&token) => {
                    descriptor
                        .headers
                        .insert("authorization".to_string(), format!("Bearer {}", token));
                }
                _ => {
                    warn!(request_id = %descriptor.id, "no usable credential configured");
                    inner.metrics.record_failure();
                    return self.resolve_failure(Error::MissingCredential, &descriptor, &options);
                }
            }
        }

        // Breaker gate. An open circuit degrades to the fallback instead of
        // rejecting, unless the caller asked for strict mode.
        if !inner.breaker.can_execute() {
            inner.metrics.record_breaker_rejection();
            let retry_after_ms = inner
                .breaker
                .open_remaining()
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            if options.bypass_circuit_breaker {
                return Err(Error::CircuitOpen { retry_after_ms });
            }
            debug!(request_id = %descriptor.id, retry_after_ms, "circuit open, serving fallback");
            inner.metrics.record_fallback();
            return Ok(SubmitOutcome::Fallback(inner.fallback.produce(&descriptor)));
        }

        let (tx, rx) = oneshot::channel();
        let entry = QueueEntry {
            descriptor: descriptor.clone(),
            completion: tx,
            cancel: CancellationToken::new(),
        };
        inner.queue.enqueue(entry);
        self.pump();

        match rx.await {
            Ok(Ok(response)) => Ok(SubmitOutcome::Upstream(response)),
            Ok(Err(err)) => {
                // An admission that ended with no success and no
                // breaker-relevant failure gave the breaker no verdict; hand
                // any half-open probe slot it held back.
                if !err.is_breaker_relevant() {
                    inner.breaker.on_probe_abandoned();
                }
                self.resolve_failure(err, &descriptor, &options)
            }
            // Dispatch task dropped the sender without completing.
            Err(_) => {
                inner.breaker.on_probe_abandoned();
                Err(Error::Cancelled)
            }
        }
    }

    /// Submit many requests concurrently. Results preserve input order.
    pub async fn submit_batch(
        &self,
        requests: Vec<(RequestDescriptor, SubmitOptions)>,
    ) -> Vec<Result<SubmitOutcome>> {
        use futures::StreamExt;

        let n = requests.len();
        if n == 0 {
            return Vec::new();
        }

        let mut out: Vec<Option<Result<SubmitOutcome>>> = (0..n).map(|_| None).collect();
        let results: Vec<(usize, Result<SubmitOutcome>)> =
            futures::stream::iter(requests.into_iter().enumerate())
                .map(|(idx, (descriptor, options))| async move {
                    (idx, self.submit(descriptor, options).await)
                })
                .buffer_unordered(n)
                .collect()
                .await;

        for (idx, r) in results {
            out[idx] = Some(r);
        }
        out.into_iter()
            .map(|o| o.unwrap_or_else(|| Err(Error::Cancelled)))
            .collect()
    }

    /// Cancel by descriptor id. A queued entry is rejected with
    /// [`Error::Cancelled`]; an in-flight one has its attempt aborted.
    pub fn cancel(&self, id: Uuid) -> bool {
        let cancelled = self.inner.queue.cancel(id);
        if cancelled {
            self.inner.metrics.record_cancelled();
        }
        cancelled
    }

    /// Reject every still-queued request with [`Error::QueueCleared`].
    pub fn clear_queue(&self) {
        self.inner.queue.clear();
    }

    pub fn stats(&self) -> OrchestratorStats {
        let inner = &self.inner;
        OrchestratorStats {
            breaker: inner.breaker.snapshot(),
            queue: inner.queue.snapshot(),
            rate_limiter: inner.limiter.snapshot(),
            metrics: inner.metrics.snapshot(),
        }
    }

    /// Clear breaker state, pending queue, and counters. Administrative and
    /// test use only.
    pub fn reset(&self) {
        info!("orchestrator reset");
        self.inner.breaker.reset();
        self.inner.queue.clear();
        self.inner.metrics.reset();
    }

    fn resolve_failure(
        &self,
        err: Error,
        descriptor: &RequestDescriptor,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome> {
        match err {
            // Cancellation and teardown always propagate; a fallback result
            // for a request nobody wants anymore would be misleading.
            Error::Cancelled | Error::QueueCleared => Err(err),
            err if options.no_fallback || options.bypass_circuit_breaker => Err(err),
            err => {
                debug!(request_id = %descriptor.id, error = %err, "degrading to fallback result");
                self.inner.metrics.record_fallback();
                Ok(SubmitOutcome::Fallback(
                    self.inner.fallback.produce(descriptor),
                ))
            }
        }
    }

    /// Dispatch pump: admit entries while slots are free, one spawned task
    /// per admission. Runs on every enqueue and every completion; admission
    /// re-checks the slot count inside the queue, so concurrent pumps are
    /// harmless.
    fn pump(&self) {
        while let Some(entry) = self.inner.queue.admit() {
            let this = self.clone();
            tokio::spawn(async move {
                this.run_entry(entry).await;
                // Slot freed; dispatch anything still pending.
                this.pump();
            });
        }
    }

    async fn run_entry(&self, entry: QueueEntry) {
        let inner = &self.inner;
        let QueueEntry {
            descriptor,
            completion,
            cancel,
        } = entry;
        let id = descriptor.id;

        let result = if cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            inner.limiter.acquire().await;

            let start = Instant::now();
            let request = TransportRequest {
                url: descriptor.target.clone(),
                method: descriptor.method.clone(),
                headers: descriptor.headers.clone(),
                body: descriptor.body.clone(),
            };
            let executor = RetryExecutor::new(inner.config.retry.clone());
            let transport = inner.transport.clone();
            let timeout = descriptor.timeout;

            let result = executor
                .execute(&inner.breaker, &inner.metrics, |_attempt| {
                    let transport = transport.clone();
                    let request = request.clone();
                    let cancel = cancel.clone();
                    async move {
                        tokio::select! {
                            _ = cancel.cancelled() => Err(Error::Cancelled),
                            attempt = tokio::time::timeout(timeout, transport.send(&request, &cancel)) => {
                                match attempt {
                                    Ok(result) => result,
                                    // Attempt deadline expired; abort the call
                                    // and let the retry loop classify it as a
                                    // transient network failure.
                                    Err(_) => Err(Error::network(format!(
                                        "attempt timed out after {}ms",
                                        timeout.as_millis()
                                    ))),
                                }
                            }
                        }
                    }
                })
                .await;

            let duration_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(response) => {
                    inner.metrics.record_success();
                    inner.metrics.record_latency(start.elapsed());
                    info!(
                        request_id = %id,
                        http_status = response.status,
                        duration_ms,
                        "request completed"
                    );
                }
                Err(err) => {
                    inner.metrics.record_failure();
                    warn!(request_id = %id, error = %err, duration_ms, "request failed");
                }
            }
            result
        };

        inner.queue.release(id);
        let _ = completion.send(result);
    }
}

/// Builder for [`Orchestrator`]. Transport defaults to [`HttpTransport`],
/// fallback to a null [`StaticFallback`]; credentials are optional (some
/// transports carry their own auth).
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    transport: Option<Arc<dyn Transport>>,
    fallback: Option<Arc<dyn FallbackProvider>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            transport: None,
            fallback: None,
            credentials: None,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };
        let fallback = self
            .fallback
            .unwrap_or_else(|| Arc::new(StaticFallback::default()));

        let config = self.config;
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(config.failure_threshold)
                .with_recovery_timeout(config.recovery_timeout)
                .with_half_open_probe_limit(config.half_open_probe_limit),
        );
        let limiter = RateLimiter::new(config.min_request_interval);
        let queue = ConcurrencyQueue::new(config.max_concurrent);

        Ok(Orchestrator {
            inner: Arc::new(Inner {
                breaker,
                limiter,
                queue,
                metrics: MetricsRegister::new(),
                transport,
                fallback,
                credentials: self.credentials,
                config,
            }),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
