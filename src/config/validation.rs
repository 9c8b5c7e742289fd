//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, delays ordered, ratio in range)
//! - Detect duplicate target names
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config
//! - Runs before a config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{BreakerConfig, GuardConfig, RetryConfig, TimeoutConfig};

/// A single semantic violation in a config.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{scope}: retry.max_attempts must be at least 1")]
    ZeroAttempts { scope: String },

    #[error("{scope}: retry.base_delay_ms ({base}) exceeds retry.max_delay_ms ({max})")]
    DelayOrdering { scope: String, base: u64, max: u64 },

    #[error("{scope}: breaker.failure_threshold must be at least 1")]
    ZeroThreshold { scope: String },

    #[error("{scope}: breaker.recovery_timeout_ms must be greater than 0")]
    ZeroRecoveryTimeout { scope: String },

    #[error("{scope}: timeout.attempt_timeout_ms must be greater than 0")]
    ZeroAttemptTimeout { scope: String },

    #[error("budget.ratio ({0}) must be within 0.0..=1.0")]
    BudgetRatioOutOfRange(f32),

    #[error("target name must not be empty")]
    EmptyTargetName,

    #[error("duplicate target name: {0}")]
    DuplicateTarget(String),
}

/// Check every section and target override, collecting all violations.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_retry(&config.retry, "global", &mut errors);
    validate_breaker(&config.breaker, "global", &mut errors);
    validate_timeout(&config.timeout, "global", &mut errors);

    if !(0.0..=1.0).contains(&config.budget.ratio) {
        errors.push(ValidationError::BudgetRatioOutOfRange(config.budget.ratio));
    }

    let mut seen = HashSet::new();
    for target in &config.targets {
        if target.name.is_empty() {
            errors.push(ValidationError::EmptyTargetName);
        } else if !seen.insert(target.name.clone()) {
            errors.push(ValidationError::DuplicateTarget(target.name.clone()));
        }

        let scope = format!("target '{}'", target.name);
        if let Some(retry) = &target.retry {
            validate_retry(retry, &scope, &mut errors);
        }
        if let Some(breaker) = &target.breaker {
            validate_breaker(breaker, &scope, &mut errors);
        }
        if let Some(timeout) = &target.timeout {
            validate_timeout(timeout, &scope, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_retry(retry: &RetryConfig, scope: &str, errors: &mut Vec<ValidationError>) {
    if retry.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts {
            scope: scope.to_string(),
        });
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::DelayOrdering {
            scope: scope.to_string(),
            base: retry.base_delay_ms,
            max: retry.max_delay_ms,
        });
    }
}

fn validate_breaker(breaker: &BreakerConfig, scope: &str, errors: &mut Vec<ValidationError>) {
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            scope: scope.to_string(),
        });
    }
    if breaker.enabled && breaker.recovery_timeout_ms == 0 {
        errors.push(ValidationError::ZeroRecoveryTimeout {
            scope: scope.to_string(),
        });
    }
}

fn validate_timeout(timeout: &TimeoutConfig, scope: &str, errors: &mut Vec<ValidationError>) {
    if timeout.enabled && timeout.attempt_timeout_ms == 0 {
        errors.push(ValidationError::ZeroAttemptTimeout {
            scope: scope.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TargetConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut config = GuardConfig::default();
        config.retry.max_attempts = 0;
        config.breaker.failure_threshold = 0;
        config.budget.ratio = 1.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_target_overrides_are_validated() {
        let mut config = GuardConfig::default();
        config.targets.push(TargetConfig {
            name: "payments".to_string(),
            retry: Some(RetryConfig {
                base_delay_ms: 5000,
                max_delay_ms: 100,
                ..RetryConfig::default()
            }),
            breaker: None,
            timeout: None,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("target 'payments'"));
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let mut config = GuardConfig::default();
        for _ in 0..2 {
            config.targets.push(TargetConfig {
                name: "payments".to_string(),
                retry: None,
                breaker: None,
                timeout: None,
            });
        }

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateTarget("payments".to_string())]
        );
    }
}
