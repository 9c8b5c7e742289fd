//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! resilience policies. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for guarded call sites.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Retry settings.
    pub retry: RetryConfig,

    /// Circuit breaker settings.
    pub breaker: BreakerConfig,

    /// Per-attempt timeout settings.
    pub timeout: TimeoutConfig,

    /// Retry budget settings.
    pub budget: BudgetConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Per-target overrides of the sections above.
    pub targets: Vec<TargetConfig>,
}

impl GuardConfig {
    /// Effective per-target settings: the target's overrides where present,
    /// the global sections otherwise.
    pub fn resolve_target(&self, name: &str) -> ResolvedTargetConfig {
        let target = self.targets.iter().find(|t| t.name == name);
        ResolvedTargetConfig {
            retry: target
                .and_then(|t| t.retry.clone())
                .unwrap_or_else(|| self.retry.clone()),
            breaker: target
                .and_then(|t| t.breaker.clone())
                .unwrap_or_else(|| self.breaker.clone()),
            timeout: target
                .and_then(|t| t.timeout.clone())
                .unwrap_or_else(|| self.timeout.clone()),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            jitter: true,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Enable circuit breaking.
    pub enabled: bool,

    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Cooldown before a probe call is allowed, in milliseconds.
    pub recovery_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
        }
    }
}

/// Per-attempt timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Enable per-attempt deadlines.
    pub enabled: bool,

    /// Deadline for a single attempt, in milliseconds.
    pub attempt_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attempt_timeout_ms: 30_000,
        }
    }
}

/// Retry budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Enable the retry budget.
    pub enabled: bool,

    /// Fraction of observed calls that may be retries.
    /// e.g., 0.1 for a 10% budget.
    pub ratio: f32,

    /// Retries always permitted regardless of traffic.
    pub min_retries: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ratio: 0.1,
            min_retries: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Overrides for one named target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Unique target identifier; also the breaker label.
    pub name: String,

    /// Retry override for this target.
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// Breaker override for this target.
    #[serde(default)]
    pub breaker: Option<BreakerConfig>,

    /// Timeout override for this target.
    #[serde(default)]
    pub timeout: Option<TimeoutConfig>,
}

/// Fully resolved settings for one target.
#[derive(Debug, Clone)]
pub struct ResolvedTargetConfig {
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub timeout: TimeoutConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();
        assert!(config.retry.enabled);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.recovery_timeout_ms, 30_000);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_resolve_target_prefers_overrides() {
        let mut config = GuardConfig::default();
        config.targets.push(TargetConfig {
            name: "payments".to_string(),
            retry: Some(RetryConfig {
                max_attempts: 5,
                ..RetryConfig::default()
            }),
            breaker: None,
            timeout: None,
        });

        let resolved = config.resolve_target("payments");
        assert_eq!(resolved.retry.max_attempts, 5);
        assert_eq!(resolved.breaker.failure_threshold, 5);

        let other = config.resolve_target("search");
        assert_eq!(other.retry.max_attempts, 3);
    }
}
