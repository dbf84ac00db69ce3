//! Demonstrates the breaker lifecycle against a deliberately unhealthy
//! upstream: consecutive failures trip the circuit, subsequent submissions
//! get the fallback result without touching the network, and the circuit
//! recovers once the upstream heals.
//!
//! Run with:
//!
//! ```sh
//! RUST_LOG=llm_orchestrator=debug cargo run --example breaker_fallback
//! ```

use async_trait::async_trait;
use llm_orchestrator::{
    Orchestrator, OrchestratorConfig, RequestDescriptor, RetryPolicy, StaticFallback,
    SubmitOptions, SubmitOutcome, Transport, TransportRequest, TransportResponse,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fails every call until `heal_after` calls have been made, then succeeds.
struct FlakyUpstream {
    calls: AtomicU32,
    heal_after: u32,
}

#[async_trait]
impl Transport for FlakyUpstream {
    async fn send(
        &self,
        _request: &TransportRequest,
        _cancel: &CancellationToken,
    ) -> llm_orchestrator::Result<TransportResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if n < self.heal_after {
            Ok(TransportResponse {
                status: 503,
                headers: HashMap::new(),
                body: r#"{"error":"upstream overloaded"}"#.to_string(),
            })
        } else {
            Ok(TransportResponse {
                status: 200,
                headers: HashMap::new(),
                body: r#"{"choices":[{"message":{"content":"hello"}}]}"#.to_string(),
            })
        }
    }
}

#[tokio::main]
async fn main() -> llm_orchestrator::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llm_orchestrator=info".into()),
        )
        .init();

    let upstream = Arc::new(FlakyUpstream {
        calls: AtomicU32::new(0),
        heal_after: 3,
    });

    let orchestrator = Orchestrator::builder()
        .with_transport(upstream.clone())
        .with_fallback(Arc::new(StaticFallback::new(serde_json::json!({
            "choices": [{"message": {"content": "service busy, showing cached suggestions"}}],
            "degraded": true,
        }))))
        .with_config(
            OrchestratorConfig::new()
                .with_failure_threshold(3)
                .with_recovery_timeout(Duration::from_secs(2))
                .with_min_request_interval(Duration::from_millis(100))
                .with_retry_policy(
                    RetryPolicy::new()
                        .with_max_retries(0)
                        .with_base_delays(vec![Duration::from_millis(200)]),
                ),
        )
        .build()?;

    // Phase 1: the upstream is down. The first three submissions fail over to
    // the fallback and trip the circuit.
    println!("--- upstream unhealthy ---");
    for i in 1..=3 {
        let outcome = orchestrator
            .submit(
                RequestDescriptor::post_json(
                    "https://api.example.com/v1/chat/completions",
                    serde_json::json!({"model": "gpt-4o-mini", "messages": []}),
                ),
                SubmitOptions::new(),
            )
            .await?;
        println!("submission {}: fallback = {}", i, outcome.is_fallback());
    }

    // Phase 2: circuit is open. This submission never reaches the transport.
    println!("--- circuit open ---");
    let calls_before = upstream.calls.load(Ordering::SeqCst);
    let outcome = orchestrator
        .submit(
            RequestDescriptor::post_json(
                "https://api.example.com/v1/chat/completions",
                serde_json::json!({"model": "gpt-4o-mini", "messages": []}),
            ),
            SubmitOptions::new(),
        )
        .await?;
    let calls_after = upstream.calls.load(Ordering::SeqCst);
    match outcome {
        SubmitOutcome::Fallback(value) => println!(
            "served fallback without a network call ({} == {}): {}",
            calls_before, calls_after, value
        ),
        SubmitOutcome::Upstream(_) => unreachable!("circuit is open"),
    }

    // Phase 3: wait out the cool-down; the upstream has healed and the first
    // probe closes the circuit again.
    println!("--- waiting for recovery ---");
    tokio::time::sleep(Duration::from_millis(2100)).await;
    let outcome = orchestrator
        .submit(
            RequestDescriptor::post_json(
                "https://api.example.com/v1/chat/completions",
                serde_json::json!({"model": "gpt-4o-mini", "messages": []}),
            ),
            SubmitOptions::new(),
        )
        .await?;
    println!("after recovery: fallback = {}", outcome.is_fallback());

    let stats = orchestrator.stats();
    println!("--- stats ---");
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
