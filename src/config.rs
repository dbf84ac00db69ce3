use std::time::Duration;

/// Retry/backoff policy. Immutable configuration consumed by the retry
/// executor and the pure backoff function.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (3 means up to 4 attempts total).
    pub max_retries: u32,
    /// Explicit per-attempt base delays; attempts past the end of the table
    /// extend the last entry geometrically by `backoff_multiplier`.
    pub base_delays: Vec<Duration>,
    pub backoff_multiplier: f64,
    /// Uniform jitter applied as `delay * (1 ± jitter_fraction)`.
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delays: vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ],
            backoff_multiplier: 2.0,
            jitter_fraction: 0.25,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delays(mut self, delays: Vec<Duration>) -> Self {
        self.base_delays = delays;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }
}

/// Full orchestrator configuration.
///
/// Defaults are the conservative values of the two source policies this
/// design unifies; treat differing thresholds as instances of this one
/// config, not as separate designs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum simultaneously dispatched requests.
    pub max_concurrent: usize,
    /// Consecutive breaker-relevant failures before the circuit opens.
    pub failure_threshold: u32,
    /// Cool-down before an open circuit admits half-open probes.
    pub recovery_timeout: Duration,
    /// Probe admissions (and required successes) in the half-open state.
    pub half_open_probe_limit: u32,
    /// Minimum spacing between dispatched calls, independent of concurrency.
    pub min_request_interval: Duration,
    /// Default per-attempt timeout when the submission does not override it.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_probe_limit: 2,
            min_request_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_half_open_probe_limit(mut self, limit: u32) -> Self {
        self.half_open_probe_limit = limit.max(1);
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
