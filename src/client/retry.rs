//! Backoff policy for retriable admin requests.
//!
//! Built on `backon`'s exponential backoff with jitter. The dispatcher pulls
//! delays from the policy one retry at a time; running out of delays means
//! the retry budget is spent.
//!
//! | Policy | Min Delay | Max Delay | Retries |
//! |--------|-----------|-----------|---------|
//! | `admin_policy` (defaults) | 100ms | 1s | 5 |

use backon::{BackoffBuilder, ExponentialBuilder};

use super::config::AdminClientConfig;

/// Policy for admin request retries, sized from `config`.
pub fn admin_policy(config: &AdminClientConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(config.retry_backoff_min)
        .with_max_delay(config.retry_backoff_max)
        .with_max_times(config.max_retries)
        .with_jitter()
}

/// A fresh sequence of retry delays for one admin call.
pub fn admin_backoff(config: &AdminClientConfig) -> impl Iterator<Item = std::time::Duration> {
    admin_policy(config).build()
}
