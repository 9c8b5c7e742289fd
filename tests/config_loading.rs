//! Configuration loading, validation, and target resolution from disk.

use std::io::Write;

use guardrail::config::{load_config, ConfigError};

#[test]
fn test_load_full_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [retry]
        max_attempts = 5
        base_delay_ms = 50
        max_delay_ms = 1000
        jitter = false

        [breaker]
        failure_threshold = 2
        recovery_timeout_ms = 10000

        [timeout]
        attempt_timeout_ms = 2000

        [budget]
        ratio = 0.2
        min_retries = 5

        [[targets]]
        name = "payments"

        [targets.retry]
        max_attempts = 1
        "#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.retry.max_attempts, 5);
    assert!(!config.retry.jitter);
    assert_eq!(config.breaker.failure_threshold, 2);
    assert_eq!(config.budget.min_retries, 5);

    let resolved = config.resolve_target("payments");
    assert_eq!(resolved.retry.max_attempts, 1);
    assert_eq!(resolved.timeout.attempt_timeout_ms, 2000);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = load_config(std::path::Path::new("/nonexistent/guardrail.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[retry\nmax_attempts = ").unwrap();

    let result = load_config(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_semantic_violations_are_all_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [retry]
        max_attempts = 0

        [breaker]
        failure_threshold = 0

        [budget]
        ratio = 2.0
        "#
    )
    .unwrap();

    match load_config(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 3);
        }
        other => panic!("expected a validation failure, got {:?}", other),
    }
}
