//! Admin client configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CLIENT_ID, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_MAX_RETRIES,
    DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RETRY_BACKOFF_MAX_MS,
    DEFAULT_RETRY_BACKOFF_MIN_MS, MAX_STRING_SIZE,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminClientConfig {
    /// Sent as `client_id` in every request header.
    pub client_id: String,
    /// Overall deadline for one admin call, retries included.
    pub request_timeout: Duration,
    /// Broker-side operation timeout for topic operations, in ms.
    pub operation_timeout_ms: i32,
    /// Resends allowed for a retriable error before it is surfaced.
    pub max_retries: usize,
    pub retry_backoff_min: Duration,
    pub retry_backoff_max: Duration,
    /// Responses larger than this are rejected as malformed.
    pub max_response_size: usize,
    /// Longest string the request builders will encode.
    pub max_string_size: usize,
}

impl Default for AdminClientConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_min: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MIN_MS),
            retry_backoff_max: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MAX_MS),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            max_string_size: MAX_STRING_SIZE,
        }
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

impl AdminClientConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// - `KAFKA_ADMIN_CLIENT_ID`
    /// - `KAFKA_ADMIN_REQUEST_TIMEOUT_MS`
    /// - `KAFKA_ADMIN_OPERATION_TIMEOUT_MS`
    /// - `KAFKA_ADMIN_MAX_RETRIES`
    /// - `KAFKA_ADMIN_RETRY_BACKOFF_MIN_MS`
    /// - `KAFKA_ADMIN_RETRY_BACKOFF_MAX_MS`
    /// - `KAFKA_ADMIN_MAX_RESPONSE_SIZE`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let client_id = std::env::var("KAFKA_ADMIN_CLIENT_ID").unwrap_or(defaults.client_id);
        let request_timeout_ms: u64 =
            env_or("KAFKA_ADMIN_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;
        let operation_timeout_ms =
            env_or("KAFKA_ADMIN_OPERATION_TIMEOUT_MS", defaults.operation_timeout_ms)?;
        let max_retries = env_or("KAFKA_ADMIN_MAX_RETRIES", defaults.max_retries)?;
        let backoff_min_ms: u64 =
            env_or("KAFKA_ADMIN_RETRY_BACKOFF_MIN_MS", DEFAULT_RETRY_BACKOFF_MIN_MS)?;
        let backoff_max_ms: u64 =
            env_or("KAFKA_ADMIN_RETRY_BACKOFF_MAX_MS", DEFAULT_RETRY_BACKOFF_MAX_MS)?;
        let max_response_size =
            env_or("KAFKA_ADMIN_MAX_RESPONSE_SIZE", defaults.max_response_size)?;

        let config = Self {
            client_id,
            request_timeout: Duration::from_millis(request_timeout_ms),
            operation_timeout_ms,
            max_retries,
            retry_backoff_min: Duration::from_millis(backoff_min_ms),
            retry_backoff_max: Duration::from_millis(backoff_max_ms),
            max_response_size,
            max_string_size: defaults.max_string_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints, reporting every violation at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.client_id.len() > self.max_string_size {
            errors.push(format!(
                "client_id ({} bytes) exceeds max_string_size ({})",
                self.client_id.len(),
                self.max_string_size
            ));
        }

        if self.request_timeout.is_zero() {
            errors.push("request_timeout must be greater than zero".to_string());
        }

        if self.operation_timeout_ms < 0 {
            errors.push(format!(
                "operation_timeout_ms ({}) must be non-negative",
                self.operation_timeout_ms
            ));
        }

        if self.retry_backoff_min > self.retry_backoff_max {
            errors.push(format!(
                "retry_backoff_min ({:?}) must not exceed retry_backoff_max ({:?})",
                self.retry_backoff_min, self.retry_backoff_max
            ));
        }

        if self.max_response_size == 0 {
            errors.push("max_response_size must be greater than zero".to_string());
        }

        if self.max_string_size > MAX_STRING_SIZE {
            errors.push(format!(
                "max_string_size ({}) exceeds protocol limit ({})",
                self.max_string_size, MAX_STRING_SIZE
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }
}
