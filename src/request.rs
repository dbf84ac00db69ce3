use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Two-tier dispatch priority. `High` jumps the queue; `Normal` and `Low`
/// are appended in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

/// Description of one outbound call. Immutable once enqueued.
///
/// The id is generated at construction and never reused; callers keep it for
/// later [`cancel`](crate::Orchestrator::cancel).
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub id: Uuid,
    pub target: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub priority: Priority,
    pub timeout: Duration,
    pub submitted_at: Instant,
}

impl RequestDescriptor {
    pub fn new(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            method: method.into(),
            headers: HashMap::new(),
            body: None,
            priority: Priority::Normal,
            timeout: Duration::from_secs(30),
            submitted_at: Instant::now(),
        }
    }

    /// Shorthand for the common JSON POST case.
    pub fn post_json(target: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(target, "POST").with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Per-submission options.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub priority: Priority,
    /// Per-attempt timeout; falls back to the configured `request_timeout`.
    pub timeout: Option<Duration>,
    /// Strict mode: raise `Error::CircuitOpen` instead of serving a fallback
    /// when the breaker gate rejects the call.
    pub bypass_circuit_breaker: bool,
    /// Propagate the final error instead of degrading to the fallback result.
    pub no_fallback: bool,
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_bypass_circuit_breaker(mut self, bypass: bool) -> Self {
        self.bypass_circuit_breaker = bypass;
        self
    }

    pub fn with_no_fallback(mut self, no_fallback: bool) -> Self {
        self.no_fallback = no_fallback;
        self
    }
}
