use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterSnapshot {
    pub min_interval_ms: u64,
    /// Estimated wait until the next dispatch slot (ms), if currently spaced.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug)]
struct State {
    /// Earliest instant the next dispatch may start.
    next_slot: Option<Instant>,
}

/// Global minimum spacing between dispatched calls.
///
/// Independent of the concurrency cap: concurrency bounds parallelism, this
/// bounds call frequency even with idle slots. Acquirers reserve the next
/// slot under the lock and then sleep outside it, so two concurrent callers
/// never start closer together than `min_interval`.
pub struct RateLimiter {
    min_interval: Duration,
    state: std::sync::Mutex<State>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: std::sync::Mutex::new(State { next_slot: None }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait for the next dispatch slot. Resolves immediately when at least
    /// `min_interval` has passed since the previous dispatch.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut st = self.lock();
            let now = Instant::now();
            let slot = match st.next_slot {
                Some(t) if t > now => t,
                _ => now,
            };
            st.next_slot = Some(slot + self.min_interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            tokio::time::sleep(slot - now).await;
        }
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let st = self.lock();
        let now = Instant::now();
        let estimated_wait_ms = st
            .next_slot
            .filter(|t| *t > now)
            .map(|t| (t - now).as_millis() as u64);
        RateLimiterSnapshot {
            min_interval_ms: self.min_interval.as_millis() as u64,
            estimated_wait_ms,
        }
    }
}
