//! Prometheus metrics for the queue gateway.
//!
//! Every metric lives in [`PROMETHEUS_REGISTRY`] under the `queue_gateway`
//! namespace and is labelled by provider where that makes sense.
//!
//! # Example
//! ```no_run
//! use queue_gateway::metrics::MESSAGES_PUBLISHED_TOTAL;
//!
//! MESSAGES_PUBLISHED_TOTAL.with_label_values(&["SQS"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "queue_gateway";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Messages accepted by a backend
    ///
    /// Labels: provider
    pub static ref MESSAGES_PUBLISHED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("messages_published_total", "Total number of messages published")
            .namespace(NAMESPACE),
        &["provider"]
    ).expect("Failed to create MESSAGES_PUBLISHED_TOTAL metric");

    /// Publish attempts that failed inside an adapter
    ///
    /// Labels: provider
    pub static ref PUBLISH_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("publish_failures_total", "Total number of failed publish attempts")
            .namespace(NAMESPACE),
        &["provider"]
    ).expect("Failed to create PUBLISH_FAILURES_TOTAL metric");

    /// Messages handed back to callers
    ///
    /// Labels: provider
    pub static ref MESSAGES_RECEIVED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("messages_received_total", "Total number of messages delivered to callers")
            .namespace(NAMESPACE),
        &["provider"]
    ).expect("Failed to create MESSAGES_RECEIVED_TOTAL metric");

    /// Subscribe calls that faulted inside an adapter
    ///
    /// Labels: provider
    pub static ref SUBSCRIBE_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("subscribe_failures_total", "Total number of failed subscribe calls")
            .namespace(NAMESPACE),
        &["provider"]
    ).expect("Failed to create SUBSCRIBE_FAILURES_TOTAL metric");

    /// Publish latency per adapter in seconds
    ///
    /// Labels: provider
    pub static ref PUBLISH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("publish_duration_seconds", "Adapter publish latency in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["provider"]
    ).expect("Failed to create PUBLISH_DURATION_SECONDS metric");

    /// Buffered messages dropped because the local buffer was full
    ///
    /// Labels: provider
    pub static ref BUFFER_EVICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("buffer_evictions_total", "Total number of buffered messages evicted")
            .namespace(NAMESPACE),
        &["provider"]
    ).expect("Failed to create BUFFER_EVICTIONS_TOTAL metric");

    /// Broker connection attempts
    ///
    /// Labels: provider, outcome
    pub static ref CONNECTION_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("connection_attempts_total", "Total number of broker connection attempts")
            .namespace(NAMESPACE),
        &["provider", "outcome"]
    ).expect("Failed to create CONNECTION_ATTEMPTS_TOTAL metric");

    /// 1 when the broker connection is established, 0 otherwise
    ///
    /// Labels: provider
    pub static ref CONNECTION_UP: GaugeVec = GaugeVec::new(
        Opts::new("connection_up", "Whether the broker connection is established")
            .namespace(NAMESPACE),
        &["provider"]
    ).expect("Failed to create CONNECTION_UP metric");

    /// Build information
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Build information").namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register all metrics with the global registry
///
/// Call once at startup; a second call returns `AlreadyReg`.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(MESSAGES_PUBLISHED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PUBLISH_FAILURES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(MESSAGES_RECEIVED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SUBSCRIBE_FAILURES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PUBLISH_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BUFFER_EVICTIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(CONNECTION_ATTEMPTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(CONNECTION_UP.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Render the registry in the Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        // Global registry: a previous test may already have registered everything
        let _ = init_metrics();
        assert!(matches!(init_metrics(), Err(prometheus::Error::AlreadyReg)));
    }

    #[test]
    fn test_publish_counter() {
        MESSAGES_PUBLISHED_TOTAL.with_label_values(&["SQS"]).inc();

        let value = MESSAGES_PUBLISHED_TOTAL.with_label_values(&["SQS"]).get();
        assert!(value >= 1.0);
    }

    #[test]
    fn test_gather_metrics() {
        let _ = init_metrics();
        MESSAGES_RECEIVED_TOTAL.with_label_values(&["RABBITMQ"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("queue_gateway_messages_received_total"));
    }
}
