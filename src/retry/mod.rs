//! Retry with exponential backoff.
//!
//! # Data Flow
//! ```text
//! call:
//!     → run operation
//!     → success: return immediately
//!     → cancellation: propagate, never retried
//!     → permanent failure: propagate, never retried
//!     → transient failure: consume budget, sleep backoff, run again
//!     → attempts exhausted: return the last error verbatim
//! ```
//!
//! # Design Decisions
//! - The backoff sleep is raced against the cancellation token; a token
//!   fired mid-sleep aborts the whole loop
//! - Budget exhaustion ends the loop early with the last error

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{FailureKind, GuardError};
use crate::observability::metrics;

pub mod backoff;
pub mod budget;
pub mod policy;

use budget::RetryBudget;
use policy::RetryPolicy;

/// Retry wrapper around a fallible async operation.
#[derive(Debug, Default, Clone)]
pub struct Retry {
    policy: RetryPolicy,
    budget: Option<Arc<RetryBudget>>,
    cancel: Option<CancellationToken>,
}

impl Retry {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            budget: None,
            cancel: None,
        }
    }

    /// Share a retry budget across call sites.
    pub fn with_budget(mut self, budget: Arc<RetryBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Observe a cancellation token during backoff sleeps.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Invoke `op` up to `max_attempts` times.
    ///
    /// `classify` decides which errors are worth another attempt. Errors
    /// classified [`FailureKind::Cancelled`] or [`FailureKind::Permanent`]
    /// propagate immediately; when attempts run out the last transient
    /// error is returned unchanged.
    pub async fn call<T, E, C, F, Fut>(&self, classify: C, mut op: F) -> Result<T, GuardError<E>>
    where
        E: std::fmt::Display,
        C: Fn(&E) -> FailureKind,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        if let Some(budget) = &self.budget {
            budget.record_request();
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            metrics::record_attempt();

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "operation recovered after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let kind = classify(&err);
                    if !kind.should_retry() {
                        // Cancellation and permanent failures pass through
                        // unchanged.
                        return Err(GuardError::Operation(err));
                    }
                    if attempt >= max_attempts {
                        tracing::debug!(attempt, error = %err, "retries exhausted");
                        return Err(GuardError::Operation(err));
                    }
                    if let Some(budget) = &self.budget {
                        if !budget.try_consume() {
                            tracing::warn!(attempt, "retry budget exhausted");
                            metrics::record_budget_exhausted();
                            return Err(GuardError::Operation(err));
                        }
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::debug!(attempt, delay = ?delay, error = %err, "retrying after backoff");
                    metrics::record_retry();

                    if !self.sleep(delay).await {
                        tracing::debug!(attempt, "cancelled during backoff");
                        return Err(GuardError::Cancelled);
                    }
                }
            }
        }
    }

    /// Sleep for `delay`, returning false if the token fired first.
    async fn sleep(&self, delay: Duration) -> bool {
        match &self.cancel {
            None => {
                tokio::time::sleep(delay).await;
                true
            }
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => true,
                    _ = token.cancelled() => false,
                }
            }
        }
    }
}
