use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: BreakerState,
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub consecutive_failures: u32,
    pub half_open_probes_used: u32,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_probe_limit: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_probe_limit: 2,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
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
}

#[derive(Debug)]
enum State {
    Closed {
        consecutive_failures: u32,
    },
    Open {
        opened_at: Instant,
    },
    HalfOpen {
        probes_used: u32,
        probe_successes: u32,
    },
}

/// Tri-state circuit breaker.
///
/// - Closed: all calls pass; consecutive failures count toward the threshold
/// - Open: calls are rejected until the recovery timeout elapses
/// - Half-open: a bounded number of probe calls test recovery; one failed
///   probe reopens immediately, `half_open_probe_limit` successes close
///
/// All state lives behind the breaker's own methods; callers never mutate it
/// directly.
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    state: std::sync::Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            state: std::sync::Mutex::new(State::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gate check. May transition Open -> HalfOpen when the cool-down has
    /// elapsed; in that case the admitted call is the first recovery probe.
    /// Each half-open admission consumes one probe slot.
    pub fn can_execute(&self) -> bool {
        let mut st = self.lock();
        match *st {
            State::Closed { .. } => true,
            State::Open { opened_at } => {
                if opened_at.elapsed() >= self.cfg.recovery_timeout {
                    info!("circuit breaker half-open, probing recovery");
                    *st = State::HalfOpen {
                        probes_used: 1,
                        probe_successes: 0,
                    };
                    true
                } else {
                    false
                }
            }
            State::HalfOpen {
                ref mut probes_used,
                ..
            } => {
                if *probes_used < self.cfg.half_open_probe_limit {
                    *probes_used += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn on_success(&self) {
        let mut st = self.lock();
        match *st {
            State::Closed { .. } => {
                *st = State::Closed {
                    consecutive_failures: 0,
                };
            }
            State::HalfOpen {
                probes_used,
                probe_successes,
            } => {
                let probe_successes = probe_successes + 1;
                if probe_successes >= self.cfg.half_open_probe_limit {
                    info!("circuit breaker closed after successful probes");
                    *st = State::Closed {
                        consecutive_failures: 0,
                    };
                } else {
                    *st = State::HalfOpen {
                        probes_used,
                        probe_successes,
                    };
                }
            }
            State::Open { .. } => {}
        }
    }

    /// Record a breaker-relevant failure. Returns true when this failure
    /// tripped the circuit (Closed -> Open or HalfOpen -> Open).
    pub fn on_failure(&self) -> bool {
        let mut st = self.lock();
        match *st {
            State::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures.saturating_add(1);
                if failures >= self.cfg.failure_threshold {
                    warn!(
                        consecutive_failures = failures,
                        "circuit breaker opened"
                    );
                    *st = State::Open {
                        opened_at: Instant::now(),
                    };
                    true
                } else {
                    *st = State::Closed {
                        consecutive_failures: failures,
                    };
                    false
                }
            }
            // A single failed probe aborts recovery.
            State::HalfOpen { .. } => {
                warn!("probe failed, circuit breaker reopened");
                *st = State::Open {
                    opened_at: Instant::now(),
                };
                true
            }
            State::Open { .. } => false,
        }
    }

    /// Hand back a half-open probe slot whose call ended without a verdict
    /// (cancelled, queue teardown, or a caller-relevant error). Without this
    /// the probe budget drains with no success or failure ever recorded and
    /// the breaker wedges half-open.
    pub fn on_probe_abandoned(&self) {
        let mut st = self.lock();
        if let State::HalfOpen {
            ref mut probes_used,
            probe_successes,
        } = *st
        {
            // Never drop below the successes already recorded.
            *probes_used = probes_used.saturating_sub(1).max(probe_successes);
        }
    }

    /// Remaining cool-down, if currently open. Non-mutating.
    pub fn open_remaining(&self) -> Option<Duration> {
        let st = self.lock();
        match *st {
            State::Open { opened_at } => self
                .cfg
                .recovery_timeout
                .checked_sub(opened_at.elapsed())
                .filter(|d| !d.is_zero()),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let st = self.lock();
        let (state, consecutive_failures, half_open_probes_used, open_remaining_ms) = match *st {
            State::Closed {
                consecutive_failures,
            } => (BreakerState::Closed, consecutive_failures, 0, None),
            State::Open { opened_at } => {
                let remaining = self
                    .cfg
                    .recovery_timeout
                    .checked_sub(opened_at.elapsed())
                    .filter(|d| !d.is_zero())
                    .map(|d| d.as_millis() as u64);
                (BreakerState::Open, 0, 0, remaining)
            }
            State::HalfOpen { probes_used, .. } => (BreakerState::HalfOpen, 0, probes_used, None),
        };
        CircuitBreakerSnapshot {
            state,
            failure_threshold: self.cfg.failure_threshold,
            recovery_timeout_ms: self.cfg.recovery_timeout.as_millis() as u64,
            consecutive_failures,
            half_open_probes_used,
            open_remaining_ms,
        }
    }

    /// Force the breaker back to a pristine closed state. Administrative use.
    pub fn reset(&self) {
        *self.lock() = State::Closed {
            consecutive_failures: 0,
        };
    }
}
