//! Error taxonomy for guarded operations.
//!
//! # Responsibilities
//! - Distinguish wrapper-produced errors (rejection, timeout, cancellation)
//!   from the guarded operation's own errors
//! - Classify operation errors so every wrapper agrees on what is
//!   retryable, what is fatal, and what is cancellation
//!
//! # Design Decisions
//! - The original operation error is carried verbatim; exhausting retries
//!   returns the last error unchanged
//! - Cancellation classified on an operation error is propagated as that
//!   error; `GuardError::Cancelled` is reserved for the wrapper's own
//!   cancellation token firing

use std::time::Duration;
use thiserror::Error;

/// Classification of a guarded operation's failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient failure. Retried, counted by the breaker, eligible for
    /// fallback.
    Transient,
    /// Permanent failure. Counted by the breaker but never retried;
    /// propagated immediately.
    Permanent,
    /// Cooperative cancellation. Propagated untouched by every wrapper.
    Cancelled,
}

impl FailureKind {
    /// Whether another attempt is worth making.
    pub fn should_retry(&self) -> bool {
        matches!(self, FailureKind::Transient)
    }

    /// Whether the breaker counts this outcome against the threshold.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, FailureKind::Cancelled)
    }
}

/// Errors produced by the wrappers themselves, around the operation's `E`.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The circuit breaker rejected the call without invoking the
    /// operation. Control-flow signal, not an operation failure.
    #[error("circuit open; next probe allowed in {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    /// The wrapper's cancellation token fired while the call was held
    /// (in-flight attempt or backoff sleep).
    #[error("operation cancelled")]
    Cancelled,

    /// A single attempt exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The guarded operation failed. The original error, unwrapped.
    #[error("{0}")]
    Operation(E),
}

impl<E> GuardError<E> {
    /// True if this is a breaker rejection rather than an operation error.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::CircuitOpen { .. })
    }

    /// Recover the operation's own error, if that is what this is.
    pub fn into_operation(self) -> Option<E> {
        match self {
            GuardError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Classifier that treats every error as transient.
///
/// The permissive default: everything is retried and counted.
pub fn always_transient<E>(_err: &E) -> FailureKind {
    FailureKind::Transient
}

/// Build a classifier from a retry predicate.
///
/// Errors matching the predicate are transient; everything else is
/// permanent and propagates immediately.
pub fn retry_if<E, P>(pred: P) -> impl Fn(&E) -> FailureKind
where
    P: Fn(&E) -> bool,
{
    move |err| {
        if pred(err) {
            FailureKind::Transient
        } else {
            FailureKind::Permanent
        }
    }
}
