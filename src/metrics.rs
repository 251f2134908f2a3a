//! Prometheus metrics for the admin client.
//!
//! Metrics cover:
//! - Admin requests (count and latency per API, by outcome)
//! - Retries and metadata refreshes triggered by broker errors
//! - Throttled responses
//! - Requests currently awaiting a broker response
//!
//! All metrics are registered to a custom registry with the
//! "kafkaesque_admin" prefix to avoid name collisions with other libraries
//! using the default Prometheus registry. Registration errors are logged and
//! the metric is used unregistered instead of panicking.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder, opts,
};
use tracing::warn;

/// Custom Prometheus registry for admin client metrics.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("kafkaesque_admin".to_string()), None)
        .unwrap_or_else(|_| Registry::new())
});

// =============================================================================
// Metric Declaration Macros
// =============================================================================

/// Declare an IntGauge metric.
macro_rules! define_gauge {
    ($name:ident, $metric_name:expr, $help:expr) => {
        #[doc = $help]
        pub static $name: Lazy<IntGauge> =
            Lazy::new(|| register_int_gauge_safe(&REGISTRY, $metric_name, $help));
    };
}

/// Declare an IntCounterVec metric with labels.
macro_rules! define_counter_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<IntCounterVec> = Lazy::new(|| {
            register_int_counter_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+])
        });
    };
}

/// Declare a HistogramVec metric with labels and buckets.
macro_rules! define_histogram_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?], [$($bucket:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<HistogramVec> = Lazy::new(|| {
            register_histogram_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+], vec![$($bucket),+])
        });
    };
}

// =============================================================================
// Request metrics
// =============================================================================

define_counter_vec!(
    ADMIN_REQUESTS,
    "requests_total",
    "Total number of admin calls by terminal outcome",
    ["api", "outcome"]
);
define_histogram_vec!(
    REQUEST_DURATION,
    "request_duration_seconds",
    "Admin call duration in seconds, retries included",
    ["api"],
    [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0
    ]
);
define_gauge!(
    IN_FLIGHT_REQUESTS,
    "in_flight_requests",
    "Requests sent and awaiting a broker response"
);

// =============================================================================
// Error handling metrics
// =============================================================================

define_counter_vec!(
    RETRIES,
    "retries_total",
    "Requests resent after a retriable error",
    ["api", "error"]
);
define_counter_vec!(
    METADATA_REFRESHES,
    "metadata_refreshes_total",
    "Metadata refreshes requested after a broker error",
    ["api"]
);
define_counter_vec!(
    THROTTLED_RESPONSES,
    "throttled_responses_total",
    "Responses reporting a non-zero throttle time",
    ["api"]
);

// =============================================================================
// Registration helpers
// =============================================================================

/// Register an IntGauge safely, returning a fallback on error.
fn register_int_gauge_safe(registry: &Registry, name: &str, help: &str) -> IntGauge {
    let gauge = IntGauge::new(name, help).expect("metric name/help should be valid");
    match registry.register(Box::new(gauge.clone())) {
        Ok(()) => gauge,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntGauge metric, using unregistered fallback");
            gauge
        }
    }
}

/// Register an IntCounterVec safely, returning a fallback on error.
fn register_int_counter_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntCounterVec {
    let counter =
        IntCounterVec::new(opts!(name, help), labels).expect("metric opts should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounterVec metric, using unregistered fallback");
            counter
        }
    }
}

/// Register a HistogramVec safely, returning a fallback on error.
fn register_histogram_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
    buckets: Vec<f64>,
) -> HistogramVec {
    let histogram = HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets), labels)
        .expect("histogram opts should be valid");
    match registry.register(Box::new(histogram.clone())) {
        Ok(()) => histogram,
        Err(e) => {
            warn!(name, error = %e, "Failed to register HistogramVec metric, using unregistered fallback");
            histogram
        }
    }
}

// =============================================================================
// Recording
// =============================================================================

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record the terminal outcome of an admin call.
pub fn record_request(api: &str, outcome: &str, duration_secs: f64) {
    ADMIN_REQUESTS.with_label_values(&[api, outcome]).inc();
    REQUEST_DURATION
        .with_label_values(&[api])
        .observe(duration_secs);
}

pub fn record_retry(api: &str, error: &str) {
    RETRIES.with_label_values(&[api, error]).inc();
}

pub fn record_metadata_refresh(api: &str) {
    METADATA_REFRESHES.with_label_values(&[api]).inc();
}

pub fn record_throttle(api: &str) {
    THROTTLED_RESPONSES.with_label_values(&[api]).inc();
}

/// Tracks one in-flight request for as long as the guard lives.
pub struct InFlightGuard(());

impl InFlightGuard {
    pub fn track() -> Self {
        IN_FLIGHT_REQUESTS.inc();
        Self(())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        IN_FLIGHT_REQUESTS.dec();
    }
}
