//! Composed resilience guard.
//!
//! # Data Flow
//! ```text
//! call:
//!     → budget records the incoming call
//!     → breaker admission (fail fast while open)
//!     → attempt, bounded by the per-attempt timeout and raced against
//!       the cancellation token
//!     → success: breaker closes, value returned
//!     → cancellation: propagated, nothing counted
//!     → permanent failure: breaker counts it, error returned
//!     → transient failure or timeout: breaker counts it, budget-checked
//!       backoff, next attempt
//!     → attempts or budget exhausted: last error returned verbatim
//! ```
//!
//! # Design Decisions
//! - One classification vocabulary across breaker, retry and fallback
//! - The breaker is consulted before every attempt, not once per call, so
//!   a circuit opened mid-loop stops the remaining attempts

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::breaker::registry::BreakerRegistry;
use crate::breaker::{BreakerPolicy, CircuitBreaker};
use crate::config::GuardConfig;
use crate::error::{FailureKind, GuardError};
use crate::observability::metrics;
use crate::retry::budget::RetryBudget;
use crate::retry::policy::RetryPolicy;

/// Breaker admission, per-attempt timeout, retry with backoff, budget and
/// optional fallback, composed into a single guarded call.
#[derive(Debug, Clone)]
pub struct Guard {
    label: String,
    retry: RetryPolicy,
    attempt_timeout: Option<Duration>,
    breaker: Option<Arc<CircuitBreaker>>,
    budget: Option<Arc<RetryBudget>>,
    cancel: Option<CancellationToken>,
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

impl Guard {
    pub fn new() -> Self {
        Self::named("guard")
    }

    /// Guard with a label used in logs.
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            retry: RetryPolicy::default(),
            attempt_timeout: None,
            breaker: None,
            budget: None,
            cancel: None,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Deadline applied to every individual attempt.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = Some(limit);
        self
    }

    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_budget(mut self, budget: Arc<RetryBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Race attempts and backoff sleeps against a cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Guard assembled from the global sections of a config.
    pub fn from_config(config: &GuardConfig) -> Self {
        let mut guard = Self::new().with_retry(RetryPolicy::from(&config.retry));
        if config.timeout.enabled {
            guard = guard.with_timeout(Duration::from_millis(config.timeout.attempt_timeout_ms));
        }
        if config.breaker.enabled {
            guard = guard.with_breaker(Arc::new(CircuitBreaker::new(BreakerPolicy::from(
                &config.breaker,
            ))));
        }
        if config.budget.enabled {
            guard = guard.with_budget(Arc::new(RetryBudget::new(
                config.budget.ratio,
                config.budget.min_retries,
            )));
        }
        guard
    }

    /// Guard for a named target: per-target config overrides applied, the
    /// breaker shared through the registry.
    pub fn for_target(config: &GuardConfig, target: &str, registry: &BreakerRegistry) -> Self {
        let resolved = config.resolve_target(target);
        let mut guard = Self::named(target).with_retry(RetryPolicy::from(&resolved.retry));
        if resolved.timeout.enabled {
            guard = guard.with_timeout(Duration::from_millis(resolved.timeout.attempt_timeout_ms));
        }
        if resolved.breaker.enabled {
            guard = guard.with_breaker(
                registry.get_or_register(target, BreakerPolicy::from(&resolved.breaker)),
            );
        }
        if config.budget.enabled {
            guard = guard.with_budget(Arc::new(RetryBudget::new(
                config.budget.ratio,
                config.budget.min_retries,
            )));
        }
        guard
    }

    pub fn breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.breaker.as_ref()
    }

    /// Run `op` under the full guard stack.
    pub async fn call<T, E, C, F, Fut>(&self, classify: C, mut op: F) -> Result<T, GuardError<E>>
    where
        E: std::fmt::Display,
        C: Fn(&E) -> FailureKind,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(budget) = &self.budget {
            budget.record_request();
        }
        let max_attempts = self.retry.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;

            if let Some(breaker) = &self.breaker {
                if let Err(retry_after) = breaker.try_acquire() {
                    tracing::debug!(
                        guard = %self.label,
                        retry_after = ?retry_after,
                        "call rejected, circuit open"
                    );
                    metrics::record_breaker_rejected(breaker.label());
                    return Err(GuardError::CircuitOpen { retry_after });
                }
            }

            metrics::record_attempt();
            let pending = match self.run_attempt(op()).await {
                Ok(value) => {
                    if let Some(breaker) = &self.breaker {
                        breaker.record_success();
                    }
                    if attempt > 1 {
                        tracing::debug!(guard = %self.label, attempt, "recovered after retry");
                    }
                    return Ok(value);
                }
                // Token fired mid-attempt: not a failure of the operation.
                Err(GuardError::Cancelled) => return Err(GuardError::Cancelled),
                Err(GuardError::Timeout(limit)) => {
                    if let Some(breaker) = &self.breaker {
                        breaker.record_failure();
                    }
                    GuardError::Timeout(limit)
                }
                Err(GuardError::Operation(err)) => match classify(&err) {
                    FailureKind::Cancelled => return Err(GuardError::Operation(err)),
                    FailureKind::Permanent => {
                        if let Some(breaker) = &self.breaker {
                            breaker.record_failure();
                        }
                        return Err(GuardError::Operation(err));
                    }
                    FailureKind::Transient => {
                        if let Some(breaker) = &self.breaker {
                            breaker.record_failure();
                        }
                        GuardError::Operation(err)
                    }
                },
                Err(other) => return Err(other),
            };

            if attempt >= max_attempts {
                tracing::debug!(guard = %self.label, attempt, "attempts exhausted");
                return Err(pending);
            }
            if let Some(budget) = &self.budget {
                if !budget.try_consume() {
                    tracing::warn!(guard = %self.label, attempt, "retry budget exhausted");
                    metrics::record_budget_exhausted();
                    return Err(pending);
                }
            }

            let delay = self.retry.delay_for_attempt(attempt);
            tracing::debug!(guard = %self.label, attempt, delay = ?delay, "retrying after backoff");
            metrics::record_retry();
            if !self.sleep(delay).await {
                tracing::debug!(guard = %self.label, attempt, "cancelled during backoff");
                return Err(GuardError::Cancelled);
            }
        }
    }

    /// Like [`Guard::call`], diverting to `fallback` once the guard gives
    /// up on a recoverable path (transient exhaustion, timeout, open
    /// circuit). Permanent errors and cancellation propagate.
    pub async fn call_with_fallback<T, E, C, F, Fut, S, SFut>(
        &self,
        classify: C,
        op: F,
        fallback: S,
    ) -> Result<T, GuardError<E>>
    where
        E: std::fmt::Display,
        C: Fn(&E) -> FailureKind,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        S: FnOnce() -> SFut,
        SFut: Future<Output = Result<T, E>>,
    {
        let recover = match self.call(&classify, op).await {
            Ok(value) => return Ok(value),
            Err(GuardError::Cancelled) => return Err(GuardError::Cancelled),
            Err(GuardError::Operation(err)) => match classify(&err) {
                FailureKind::Transient => GuardError::Operation(err),
                FailureKind::Permanent | FailureKind::Cancelled => {
                    return Err(GuardError::Operation(err))
                }
            },
            Err(open_or_timeout) => open_or_timeout,
        };

        tracing::debug!(guard = %self.label, cause = %recover, "invoking fallback");
        metrics::record_fallback();
        fallback().await.map_err(GuardError::Operation)
    }

    /// One attempt: optional deadline, raced against the token.
    async fn run_attempt<T, E, Fut>(&self, fut: Fut) -> Result<T, GuardError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let timed = async {
            match self.attempt_timeout {
                Some(limit) => crate::timeout::with_timeout(limit, fut).await,
                None => fut.await.map_err(GuardError::Operation),
            }
        };
        match &self.cancel {
            None => timed.await,
            Some(token) => {
                tokio::select! {
                    result = timed => result,
                    _ = token.cancelled() => Err(GuardError::Cancelled),
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
