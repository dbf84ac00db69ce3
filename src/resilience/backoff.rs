//! Exponential backoff with jitter as a pure numeric policy.
//!
//! Delay computation is a function of `(attempt, policy)` so schedules are
//! testable without timers; only the jitter draw touches an RNG.

use crate::config::RetryPolicy;
use rand::Rng;
use std::time::Duration;

/// Upper bound on any computed delay, so geometric extension of the delay
/// table cannot grow without limit.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Deterministic base delay for a 0-based retry attempt.
///
/// Attempts inside the configured table use it directly; attempts past the
/// end extend the last entry by `backoff_multiplier^(attempt - len + 1)`.
pub fn base_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let delays = &policy.base_delays;
    if delays.is_empty() {
        return Duration::ZERO;
    }
    let idx = attempt as usize;
    if idx < delays.len() {
        return delays[idx].min(MAX_DELAY);
    }
    let last = delays[delays.len() - 1];
    let extra = (idx - delays.len() + 1) as i32;
    let factor = policy.backoff_multiplier.max(1.0).powi(extra);
    let extended = last.as_secs_f64() * factor;
    Duration::from_secs_f64(extended.min(MAX_DELAY.as_secs_f64()))
}

/// Apply uniform ±`jitter_fraction` to a delay.
pub fn jittered(delay: Duration, jitter_fraction: f64) -> Duration {
    if jitter_fraction <= 0.0 || delay.is_zero() {
        return delay;
    }
    let fraction = jitter_fraction.min(1.0);
    let factor = 1.0 + rand::thread_rng().gen_range(-fraction..=fraction);
    Duration::from_secs_f64((delay.as_secs_f64() * factor).max(0.0))
}

/// Delay before the next attempt after a retryable failure.
///
/// An explicit upstream `Retry-After` wins over the local schedule and is
/// used verbatim (the upstream already told us when to come back).
pub fn retry_delay(attempt: u32, policy: &RetryPolicy, retry_after: Option<Duration>) -> Duration {
    if let Some(after) = retry_after {
        return after.min(MAX_DELAY);
    }
    jittered(base_delay(attempt, policy), policy.jitter_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new()
            .with_base_delays(vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ])
            .with_backoff_multiplier(2.0)
            .with_jitter_fraction(0.25)
    }

    #[test]
    fn test_base_delay_follows_table() {
        let p = policy();
        assert_eq!(base_delay(0, &p), Duration::from_millis(1000));
        assert_eq!(base_delay(1, &p), Duration::from_millis(2000));
        assert_eq!(base_delay(2, &p), Duration::from_millis(4000));
    }

    #[test]
    fn test_base_delay_extends_geometrically() {
        let p = policy();
        assert_eq!(base_delay(3, &p), Duration::from_millis(8000));
        assert_eq!(base_delay(4, &p), Duration::from_millis(16000));
    }

    #[test]
    fn test_base_delay_capped() {
        let p = policy();
        assert_eq!(base_delay(30, &p), MAX_DELAY);
    }

    #[test]
    fn test_empty_table_means_no_delay() {
        let p = RetryPolicy::new().with_base_delays(vec![]);
        assert_eq!(base_delay(0, &p), Duration::ZERO);
        assert_eq!(retry_delay(0, &p, None), Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_within_fraction() {
        let base = Duration::from_millis(1000);
        for _ in 0..200 {
            let d = jittered(base, 0.25);
            assert!(d >= Duration::from_millis(750), "jittered too low: {:?}", d);
            assert!(d <= Duration::from_millis(1250), "jittered too high: {:?}", d);
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let base = Duration::from_millis(1500);
        assert_eq!(jittered(base, 0.0), base);
    }

    #[test]
    fn test_retry_after_wins_over_schedule() {
        let p = policy();
        let d = retry_delay(0, &p, Some(Duration::from_millis(250)));
        assert_eq!(d, Duration::from_millis(250));
    }

    #[test]
    fn test_retry_delay_bounds_around_table_entry() {
        let p = policy();
        // Attempt 2 has a 4000ms base; jitter is ±25%.
        for _ in 0..100 {
            let d = retry_delay(2, &p, None);
            assert!(d >= Duration::from_millis(3000));
            assert!(d <= Duration::from_millis(5000));
        }
    }
}
