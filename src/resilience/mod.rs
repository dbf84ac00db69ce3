//! Resilience primitives protecting the upstream API and the caller.
//!
//! ## Overview
//!
//! These patterns keep a long-lived client healthy against a rate-limited,
//! sometimes-unreliable upstream:
//! - Prevent cascade failures when the upstream is unavailable
//! - Respect upstream throttling without marking the service unhealthy
//! - Spread retries out to avoid synchronized retry storms
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`circuit_breaker`] | Tri-state circuit breaker (closed / open / half-open) |
//! | [`rate_limiter`] | Global minimum spacing between dispatched calls |
//! | [`backoff`] | Pure exponential-backoff-with-jitter delay function |
//!
//! ## Circuit Breaker
//!
//! ```rust
//! use llm_orchestrator::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::new()
//!         .with_failure_threshold(5)
//!         .with_recovery_timeout(Duration::from_secs(30)),
//! );
//!
//! if breaker.can_execute() {
//!     // make the call...
//!     breaker.on_success();
//! }
//! ```
//!
//! ## Rate Limiter
//!
//! The limiter bounds call *frequency*; the concurrency cap bounds
//! parallelism. Both apply independently.
//!
//! ```rust,no_run
//! use llm_orchestrator::resilience::rate_limiter::RateLimiter;
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let limiter = RateLimiter::new(Duration::from_millis(500));
//! limiter.acquire().await; // resolves once the next dispatch slot is due
//! # }
//! ```

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limiter;
