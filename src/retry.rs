//! Attempt classification and the bounded retry loop.

use crate::config::RetryPolicy;
use crate::error::Error;
use crate::metrics::MetricsRegister;
use crate::resilience::backoff;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::transport::TransportResponse;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How much response body to carry into error messages.
const ERROR_BODY_LIMIT: usize = 512;

/// Tagged result of one attempt.
#[derive(Debug)]
pub enum Outcome {
    Success(TransportResponse),
    /// Transient; another attempt may succeed.
    Retryable(Error),
    /// Propagate immediately; retrying cannot help.
    Terminal(Error),
}

fn truncated_body(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        body.to_string()
    } else {
        let mut end = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

/// Classify the result of one transport attempt.
///
/// - 2xx: success
/// - 429: retryable, carries any `Retry-After` hint; never breaker-relevant
/// - other 4xx (and any non-2xx below 500): terminal
/// - 5xx, network error, timeout: retryable and breaker-relevant
/// - cancellation: terminal, propagates as-is
pub fn classify(result: Result<TransportResponse>) -> Outcome {
    match result {
        Ok(resp) => match resp.status {
            200..=299 => Outcome::Success(resp),
            429 => Outcome::Retryable(Error::RateLimited {
                retry_after_ms: resp.retry_after_ms(),
            }),
            500..=599 => Outcome::Retryable(Error::Server {
                status: resp.status,
                message: truncated_body(&resp.body),
            }),
            status => Outcome::Terminal(Error::Client {
                status,
                message: truncated_body(&resp.body),
            }),
        },
        Err(err) => {
            if err.is_retryable() {
                Outcome::Retryable(err)
            } else {
                Outcome::Terminal(err)
            }
        }
    }
}

/// Wraps one logical call with bounded retries and backoff.
///
/// Breaker accounting happens here, per attempt: only breaker-relevant
/// failures are recorded, so the circuit opens on bad service, never on bad
/// input or upstream throttling.
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn execute<F, Fut>(
        &self,
        breaker: &CircuitBreaker,
        metrics: &MetricsRegister,
        mut attempt_fn: F,
    ) -> Result<TransportResponse>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<TransportResponse>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match classify(attempt_fn(attempt).await) {
                Outcome::Success(resp) => {
                    breaker.on_success();
                    return Ok(resp);
                }
                Outcome::Terminal(err) => {
                    // Caller-relevant only; the breaker never hears about it.
                    return Err(err);
                }
                Outcome::Retryable(err) => {
                    if err.is_breaker_relevant() && breaker.on_failure() {
                        metrics.record_breaker_trip();
                    }
                    if attempt >= self.policy.max_retries {
                        return Err(err);
                    }
                    metrics.record_retry();
                    let retry_after = err.retry_after_ms().map(Duration::from_millis);
                    let delay = backoff::retry_delay(attempt, &self.policy, retry_after);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
