use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Latency samples retained for the rolling average.
const LATENCY_WINDOW: usize = 100;

/// Passive counters for the orchestrator. Counters are monotonically
/// non-decreasing (until an explicit [`reset`](MetricsRegister::reset));
/// the latency ring is bounded and overwrites oldest samples.
#[derive(Debug, Default)]
pub struct MetricsRegister {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
    breaker_trips: AtomicU64,
    breaker_rejections: AtomicU64,
    fallbacks: AtomicU64,
    cancelled: AtomicU64,
    latencies_ms: Mutex<VecDeque<u64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retries: u64,
    pub breaker_trips: u64,
    pub breaker_rejections: u64,
    pub fallbacks: u64,
    pub cancelled: u64,
    pub latency_samples: usize,
    pub avg_latency_ms: Option<f64>,
}

impl MetricsRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_breaker_trip(&self) {
        self.breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_breaker_rejection(&self) {
        self.breaker_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, latency: Duration) {
        let mut ring = self.latencies_ms.lock().unwrap_or_else(|e| e.into_inner());
        if ring.len() == LATENCY_WINDOW {
            ring.pop_front();
        }
        ring.push_back(latency.as_millis() as u64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let ring = self.latencies_ms.lock().unwrap_or_else(|e| e.into_inner());
        let avg_latency_ms = if ring.is_empty() {
            None
        } else {
            Some(ring.iter().sum::<u64>() as f64 / ring.len() as f64)
        };
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            breaker_trips: self.breaker_trips.load(Ordering::Relaxed),
            breaker_rejections: self.breaker_rejections.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            latency_samples: ring.len(),
            avg_latency_ms,
        }
    }

    /// Zero all counters and drop latency samples. Administrative use.
    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.breaker_trips.store(0, Ordering::Relaxed);
        self.breaker_rejections.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
        self.cancelled.store(0, Ordering::Relaxed);
        self.latencies_ms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
