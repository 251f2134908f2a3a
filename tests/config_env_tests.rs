//! Environment-driven configuration.
//!
//! The process environment is shared, so every test here is serialized.

use std::env;
use std::time::Duration;

use kafkaesque_admin::constants::{DEFAULT_CLIENT_ID, DEFAULT_MAX_RETRIES};
use kafkaesque_admin::prelude::*;
use serial_test::serial;

const VARS: &[&str] = &[
    "KAFKA_ADMIN_CLIENT_ID",
    "KAFKA_ADMIN_REQUEST_TIMEOUT_MS",
    "KAFKA_ADMIN_OPERATION_TIMEOUT_MS",
    "KAFKA_ADMIN_MAX_RETRIES",
    "KAFKA_ADMIN_RETRY_BACKOFF_MIN_MS",
    "KAFKA_ADMIN_RETRY_BACKOFF_MAX_MS",
    "KAFKA_ADMIN_MAX_RESPONSE_SIZE",
];

/// Run `f` with `vars` set and every other admin variable cleared, then
/// restore whatever was there before.
fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let saved: Vec<(&str, Option<String>)> =
        VARS.iter().map(|name| (*name, env::var(name).ok())).collect();

    unsafe {
        for name in VARS {
            env::remove_var(name);
        }
        for (name, value) in vars {
            env::set_var(name, value);
        }
    }

    f();

    unsafe {
        for (name, value) in saved {
            match value {
                Some(v) => env::set_var(name, v),
                None => env::remove_var(name),
            }
        }
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    with_env(&[], || {
        let config = AdminClientConfig::from_env().unwrap();
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config, AdminClientConfig::default());
    });
}

#[test]
#[serial]
fn test_from_env_overrides() {
    with_env(
        &[
            ("KAFKA_ADMIN_CLIENT_ID", "ops-tool"),
            ("KAFKA_ADMIN_REQUEST_TIMEOUT_MS", "2500"),
            ("KAFKA_ADMIN_OPERATION_TIMEOUT_MS", "10000"),
            ("KAFKA_ADMIN_MAX_RETRIES", "9"),
            ("KAFKA_ADMIN_RETRY_BACKOFF_MIN_MS", "20"),
            ("KAFKA_ADMIN_RETRY_BACKOFF_MAX_MS", "400"),
            ("KAFKA_ADMIN_MAX_RESPONSE_SIZE", "65536"),
        ],
        || {
            let config = AdminClientConfig::from_env().unwrap();
            assert_eq!(config.client_id, "ops-tool");
            assert_eq!(config.request_timeout, Duration::from_millis(2500));
            assert_eq!(config.operation_timeout_ms, 10_000);
            assert_eq!(config.max_retries, 9);
            assert_eq!(config.retry_backoff_min, Duration::from_millis(20));
            assert_eq!(config.retry_backoff_max, Duration::from_millis(400));
            assert_eq!(config.max_response_size, 65_536);
        },
    );
}

#[test]
#[serial]
fn test_from_env_rejects_unparsable_value() {
    with_env(&[("KAFKA_ADMIN_MAX_RETRIES", "many")], || {
        match AdminClientConfig::from_env() {
            Err(Error::Config(msg)) => assert!(msg.contains("KAFKA_ADMIN_MAX_RETRIES")),
            other => panic!("expected config error, got {:?}", other),
        }
    });
}

#[test]
#[serial]
fn test_from_env_rejects_inverted_backoff() {
    with_env(
        &[
            ("KAFKA_ADMIN_RETRY_BACKOFF_MIN_MS", "5000"),
            ("KAFKA_ADMIN_RETRY_BACKOFF_MAX_MS", "100"),
        ],
        || {
            assert!(matches!(
                AdminClientConfig::from_env(),
                Err(Error::Config(_))
            ));
        },
    );
}

#[test]
#[serial]
fn test_from_env_rejects_zero_timeout() {
    with_env(&[("KAFKA_ADMIN_REQUEST_TIMEOUT_MS", "0")], || {
        match AdminClientConfig::from_env() {
            Err(Error::Config(msg)) => assert!(msg.contains("request_timeout")),
            other => panic!("expected config error, got {:?}", other),
        }
    });
}
