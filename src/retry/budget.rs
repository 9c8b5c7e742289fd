//! Retry budget: bound retries to a fraction of observed traffic.
//!
//! # Responsibilities
//! - Track how many calls a wrapper has seen
//! - Allow retries only while they stay under `ratio` of those calls,
//!   plus a fixed floor so low-traffic call sites can still retry
//!
//! # Design Decisions
//! - Lock-free counters; an occasional over-admit under contention is
//!   acceptable, a retry storm is not

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared budget limiting the ratio of retries to first attempts.
#[derive(Debug)]
pub struct RetryBudget {
    /// Fraction of observed calls that may be retries.
    ratio: f32,
    /// Retries always permitted regardless of traffic.
    min_retries: u64,
    requests: AtomicU64,
    retries: AtomicU64,
}

impl RetryBudget {
    pub fn new(ratio: f32, min_retries: u64) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
            min_retries,
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Record an incoming call (the first attempt, not a retry).
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Try to withdraw one retry from the budget.
    pub fn try_consume(&self) -> bool {
        let requests = self.requests.load(Ordering::Relaxed);
        let allowed = (requests as f64 * self.ratio as f64) as u64 + self.min_retries;

        let mut used = self.retries.load(Ordering::Relaxed);
        loop {
            if used >= allowed {
                return false;
            }
            match self.retries.compare_exchange_weak(
                used,
                used + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(x) => used = x,
            }
        }
    }

    /// Retries still available at current traffic levels.
    pub fn remaining(&self) -> u64 {
        let requests = self.requests.load(Ordering::Relaxed);
        let allowed = (requests as f64 * self.ratio as f64) as u64 + self.min_retries;
        allowed.saturating_sub(self.retries.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_allows_retries_without_traffic() {
        let budget = RetryBudget::new(0.1, 3);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
    }

    #[test]
    fn test_ratio_scales_with_traffic() {
        let budget = RetryBudget::new(0.5, 0);
        assert!(!budget.try_consume());

        for _ in 0..10 {
            budget.record_request();
        }
        assert_eq!(budget.remaining(), 5);
        for _ in 0..5 {
            assert!(budget.try_consume());
        }
        assert!(!budget.try_consume());
    }

    #[test]
    fn test_zero_budget_blocks_all_retries() {
        let budget = RetryBudget::new(0.0, 0);
        budget.record_request();
        assert!(!budget.try_consume());
    }
}
