//! Retry semantics: attempt counting, propagation, backoff timing.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use guardrail::{GuardError, Retry, RetryBudget, RetryPolicy};

mod common;
use common::{classify, failing_op, flaky_op, TestError};

fn policy(max_attempts: u32, base_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(base_ms),
        max_delay: Duration::from_millis(2000),
        jitter: false,
    }
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_after_transient_failures() {
    let (calls, op) = flaky_op(2, TestError::Unavailable, "ok");
    let retry = Retry::new(policy(3, 10));

    let result = retry.call(classify, op).await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_last_error_after_exact_attempts() {
    let (calls, op) = failing_op(TestError::Unavailable);
    let retry = Retry::new(policy(3, 10));

    let result = retry.call(classify, op).await;

    match result {
        Err(GuardError::Operation(TestError::Unavailable)) => {}
        other => panic!("expected the original error, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3, "no extra attempt after the last failure");
}

#[tokio::test(start_paused = true)]
async fn test_permanent_error_is_not_retried() {
    let (calls, op) = failing_op(TestError::Invalid);
    let retry = Retry::new(policy(5, 10));

    let result = retry.call(classify, op).await;

    assert!(matches!(
        result,
        Err(GuardError::Operation(TestError::Invalid))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_propagates_without_retry() {
    let (calls, op) = failing_op(TestError::Interrupted);
    let retry = Retry::new(policy(5, 10));

    let result = retry.call(classify, op).await;

    // The caller observes the original cancellation error, unchanged.
    assert!(matches!(
        result,
        Err(GuardError::Operation(TestError::Interrupted))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_double() {
    let (_, op) = flaky_op(2, TestError::Unavailable, "ok");
    let retry = Retry::new(policy(3, 100));

    let started = tokio::time::Instant::now();
    retry.call(classify, op).await.unwrap();

    // 100ms after attempt 1, 200ms after attempt 2.
    assert_eq!(started.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhaustion_stops_the_loop() {
    let budget = Arc::new(RetryBudget::new(0.0, 1));
    let (calls, op) = failing_op(TestError::Unavailable);
    let retry = Retry::new(policy(5, 10)).with_budget(budget);

    let result = retry.call(classify, op).await;

    assert!(matches!(
        result,
        Err(GuardError::Operation(TestError::Unavailable))
    ));
    // One retry withdrawn from the budget, then the loop gives up.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_token_cancels_backoff_sleep() {
    let token = CancellationToken::new();
    token.cancel();

    let (calls, op) = failing_op(TestError::Unavailable);
    let retry = Retry::new(policy(5, 1000)).with_cancellation(token);

    let result = retry.call(classify, op).await;

    assert!(matches!(result, Err(GuardError::Cancelled)));
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no attempt after cancellation");
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_sleeps() {
    let (calls, op) = failing_op(TestError::Unavailable);
    let retry = Retry::new(policy(1, 1000));

    let started = tokio::time::Instant::now();
    let result = retry.call(classify, op).await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}
