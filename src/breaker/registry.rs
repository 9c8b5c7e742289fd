//! Named breaker registry.
//!
//! # Responsibilities
//! - Hand out one shared breaker per protected target
//! - Apply per-target policy overrides from configuration
//!
//! # Design Decisions
//! - Breakers are per-target, not global; two call sites naming the same
//!   target share state
//! - Lookup is lock-free for the common hit path

use std::sync::Arc;

use dashmap::DashMap;

use crate::breaker::state::BreakerState;
use crate::breaker::{BreakerPolicy, CircuitBreaker};

/// Collection of breakers keyed by target name.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_policy: BreakerPolicy,
}

impl BreakerRegistry {
    pub fn new(default_policy: BreakerPolicy) -> Self {
        Self {
            breakers: DashMap::new(),
            default_policy,
        }
    }

    /// Register a breaker with an explicit policy, replacing any existing
    /// breaker for the target.
    pub fn register(&self, target: impl Into<String>, policy: BreakerPolicy) -> Arc<CircuitBreaker> {
        let target = target.into();
        let breaker = Arc::new(CircuitBreaker::named(target.clone(), policy));
        self.breakers.insert(target, breaker.clone());
        breaker
    }

    /// Shared breaker for `target`, created with the default policy on
    /// first use.
    pub fn get_or_create(&self, target: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(target.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::named(target, self.default_policy.clone()))
            })
            .clone()
    }

    /// Shared breaker for `target`, created with `policy` on first use.
    /// An existing breaker keeps its state and original policy.
    pub fn get_or_register(&self, target: &str, policy: BreakerPolicy) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::named(target, policy)))
            .clone()
    }

    /// Current state of a target's breaker, if one exists.
    pub fn state_of(&self, target: &str) -> Option<BreakerState> {
        self.breakers.get(target).map(|b| b.state())
    }

    /// Targets whose circuits are currently open.
    pub fn open_circuits(&self) -> Vec<String> {
        self.breakers
            .iter()
            .filter(|entry| entry.value().state() == BreakerState::Open)
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_shares_instances() {
        let registry = BreakerRegistry::new(BreakerPolicy::default());
        let a = registry.get_or_create("payments");
        let b = registry.get_or_create("payments");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_open_circuits_listing() {
        let registry = BreakerRegistry::new(BreakerPolicy {
            failure_threshold: 1,
            recovery_timeout: std::time::Duration::from_secs(30),
        });
        registry.get_or_create("search");
        let payments = registry.get_or_create("payments");
        payments.record_failure();

        assert_eq!(registry.open_circuits(), vec!["payments".to_string()]);
        assert_eq!(registry.state_of("search"), Some(BreakerState::Closed));
        assert_eq!(registry.state_of("unknown"), None);
    }
}
