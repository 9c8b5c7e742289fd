//! Circuit breaker for protecting a failing operation.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: operation assumed down, calls fail fast
//! - Half-Open: testing whether the operation recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: after recovery timeout
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails
//! ```
//!
//! # Design Decisions
//! - Per-target breakers (not global); share one instance via `Arc`
//! - Fail fast in Open state: the operation is never invoked
//! - Single probe in Half-Open, claimed by compare-and-swap, so concurrent
//!   callers cannot hammer a recovering target
//! - Cancellation is not a failure: no counting, no transition
//! - State lives in atomics; no lock is held across the operation

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::error::{FailureKind, GuardError};
use crate::observability::metrics;

pub mod registry;
pub mod state;

use state::BreakerState;

/// Thresholds governing one breaker.
#[derive(Debug, Clone)]
pub struct BreakerPolicy {
    /// Consecutive failures that trip the circuit.
    pub failure_threshold: u32,
    /// Cooldown before a probe call is allowed through.
    pub recovery_timeout: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&BreakerConfig> for BreakerPolicy {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            recovery_timeout: Duration::from_millis(config.recovery_timeout_ms),
        }
    }
}

/// Guard around a fallible operation that fails fast once the operation
/// keeps failing.
#[derive(Debug)]
pub struct CircuitBreaker {
    label: String,
    policy: BreakerPolicy,
    /// Current state (0=Closed, 1=Open, 2=HalfOpen).
    state: AtomicU8,
    /// Consecutive guarded failures.
    consecutive_failures: AtomicU32,
    /// Construction instant; open timestamps are millisecond offsets from it.
    epoch: Instant,
    /// When the circuit last opened, in ms since `epoch`.
    opened_at_ms: AtomicU64,
    /// Times the circuit has tripped open.
    trips: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self::named("default", policy)
    }

    /// Breaker with a label used in logs and metrics.
    pub fn named(label: impl Into<String>, policy: BreakerPolicy) -> Self {
        Self {
            label: label.into(),
            policy,
            state: AtomicU8::new(BreakerState::Closed as u8),
            consecutive_failures: AtomicU32::new(0),
            epoch: Instant::now(),
            opened_at_ms: AtomicU64::new(0),
            trips: AtomicU64::new(0),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> BreakerState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Times the circuit has transitioned to Open.
    pub fn trip_count(&self) -> u64 {
        self.trips.load(Ordering::Relaxed)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn cooldown_remaining(&self) -> Duration {
        let elapsed = self.now_ms().saturating_sub(self.opened_at_ms.load(Ordering::Acquire));
        Duration::from_millis(
            (self.policy.recovery_timeout.as_millis() as u64).saturating_sub(elapsed),
        )
    }

    /// Admission check. `Err` carries the remaining cooldown.
    ///
    /// While Open, the first caller after the recovery timeout claims the
    /// Half-Open probe; everyone else is rejected until the probe resolves.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        match self.state() {
            BreakerState::Closed => Ok(()),
            BreakerState::HalfOpen => Err(self.cooldown_remaining()),
            BreakerState::Open => {
                if self.cooldown_remaining() > Duration::ZERO {
                    return Err(self.cooldown_remaining());
                }
                match self.state.compare_exchange(
                    BreakerState::Open as u8,
                    BreakerState::HalfOpen as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        tracing::info!(breaker = %self.label, "circuit half-open, probing");
                        metrics::record_breaker_transition(&self.label, BreakerState::HalfOpen);
                        Ok(())
                    }
                    // Lost the probe race.
                    Err(_) => Err(self.cooldown_remaining()),
                }
            }
        }
    }

    /// Record a successful guarded call: counter resets, circuit closes.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        let prev = self.state.swap(BreakerState::Closed as u8, Ordering::AcqRel);
        if prev != BreakerState::Closed as u8 {
            tracing::info!(breaker = %self.label, "circuit closed");
            metrics::record_breaker_transition(&self.label, BreakerState::Closed);
        }
    }

    /// Record a guarded failure. Cancellation must not be reported here.
    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;

        let should_open = match self.state() {
            // Any failure during the probe re-opens.
            BreakerState::HalfOpen => true,
            BreakerState::Closed => failures >= self.policy.failure_threshold,
            BreakerState::Open => false,
        };

        if should_open {
            self.opened_at_ms.store(self.now_ms(), Ordering::Release);
            let prev = self.state.swap(BreakerState::Open as u8, Ordering::AcqRel);
            if prev != BreakerState::Open as u8 {
                self.trips.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    breaker = %self.label,
                    consecutive_failures = failures,
                    cooldown = ?self.policy.recovery_timeout,
                    "circuit opened"
                );
                metrics::record_breaker_transition(&self.label, BreakerState::Open);
            }
        }
    }

    /// Run `op` under the breaker.
    ///
    /// Rejected calls return [`GuardError::CircuitOpen`] without invoking
    /// the operation. Errors classified [`FailureKind::Cancelled`] pass
    /// through without counting or changing state.
    pub async fn call<T, E, C, F, Fut>(&self, classify: C, op: F) -> Result<T, GuardError<E>>
    where
        C: Fn(&E) -> FailureKind,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(retry_after) = self.try_acquire() {
            tracing::debug!(breaker = %self.label, retry_after = ?retry_after, "call rejected, circuit open");
            metrics::record_breaker_rejected(&self.label);
            return Err(GuardError::CircuitOpen { retry_after });
        }

        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                if classify(&err).counts_as_failure() {
                    self.record_failure();
                }
                Err(GuardError::Operation(err))
            }
        }
    }
}
