//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;

use guardrail::FailureKind;

/// Error type standing in for a real service's failure modes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TestError {
    #[error("service unavailable")]
    Unavailable,
    #[error("invalid request")]
    Invalid,
    #[error("interrupted")]
    Interrupted,
}

/// The classification a caller of guardrail would supply.
pub fn classify(err: &TestError) -> FailureKind {
    match err {
        TestError::Unavailable => FailureKind::Transient,
        TestError::Invalid => FailureKind::Permanent,
        TestError::Interrupted => FailureKind::Cancelled,
    }
}

/// Operation that fails `failures` times with `err`, then keeps returning
/// `value`. The counter tracks invocations.
pub fn flaky_op(
    failures: u32,
    err: TestError,
    value: &'static str,
) -> (
    Arc<AtomicU32>,
    impl FnMut() -> Ready<Result<&'static str, TestError>>,
) {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let op = move || {
        let n = seen.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            ready(Err(err.clone()))
        } else {
            ready(Ok(value))
        }
    };
    (calls, op)
}

/// Operation that always fails with `err`.
pub fn failing_op(
    err: TestError,
) -> (
    Arc<AtomicU32>,
    impl FnMut() -> Ready<Result<&'static str, TestError>>,
) {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let op = move || {
        seen.fetch_add(1, Ordering::SeqCst);
        ready(Err(err.clone()))
    };
    (calls, op)
}
