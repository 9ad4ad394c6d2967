//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for HTTP requests, aggregator operations
//! and the resolution cache, with standardized naming conventions.

use crate::aggregator::{OperationObserver, Outcome};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::{Duration, Instant};

/// Metrics prefix for all Swai metrics
pub const METRICS_PREFIX: &str = "swai";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms, cache hit
    0.005,
    0.010,
    0.025,
    0.050,
    0.100,
    0.250,
    0.500,
    1.000,
    2.500,
    5.000,
    10.00, // default upstream timeout
    30.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Aggregator metrics
    describe_counter!(
        format!("{}_operations_total", METRICS_PREFIX),
        Unit::Count,
        "Total aggregator operations by outcome"
    );

    describe_histogram!(
        format!("{}_operation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Aggregator operation latency in seconds"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total resolution cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total resolution cache misses"
    );

    // Assistant metrics
    describe_counter!(
        format!("{}_assistant_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total assistant requests"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record aggregator operation metrics
pub fn record_operation(operation: &'static str, elapsed: Duration, outcome: Outcome) {
    counter!(
        format!("{}_operations_total", METRICS_PREFIX),
        "operation" => operation,
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        format!("{}_operation_duration_seconds", METRICS_PREFIX),
        "operation" => operation
    )
    .record(elapsed.as_secs_f64());
}

/// Helper to record assistant metrics
pub fn record_assistant(model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_assistant_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Observer feeding operation boundaries into the metrics recorder
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl OperationObserver for MetricsObserver {
    fn on_start(&self, _operation: &'static str, _argument: Option<&str>) {}

    fn on_complete(
        &self,
        operation: &'static str,
        _argument: Option<&str>,
        elapsed: Duration,
        outcome: Outcome,
    ) {
        record_operation(operation, elapsed, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // Default upstream timeout must land on a bucket edge
        assert!(LATENCY_BUCKETS.contains(&10.0));
    }

    fn rendered(record: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, record);
        handle.render()
    }

    fn sample<'a>(rendered: &'a str, name: &str, labels: &[&str]) -> Option<&'a str> {
        rendered
            .lines()
            .filter(|l| l.starts_with(name))
            .find(|l| labels.iter().all(|label| l.contains(label)))
    }

    #[test]
    fn test_request_metrics() {
        let output = rendered(|| {
            RequestMetrics::start("GET", "/films").finish(200);
            RequestMetrics::start("GET", "/films").finish(200);
            RequestMetrics::start("GET", "/films").finish(404);
        });

        let ok = sample(&output, "swai_requests_total", &["endpoint=\"/films\"", "status=\"200\""]);
        assert!(ok.unwrap().ends_with(" 2"), "{}", output);
        let missing = sample(&output, "swai_requests_total", &["status=\"404\""]);
        assert!(missing.unwrap().ends_with(" 1"));
        assert!(output.contains("swai_request_duration_seconds"));
    }

    #[test]
    fn test_metrics_observer_counts_outcomes() {
        let output = rendered(|| {
            let observer = MetricsObserver;
            observer.on_start("find_films", None);
            observer.on_complete("find_films", None, Duration::from_millis(3), Outcome::Success);
            observer.on_complete(
                "find_planets_by_film",
                Some("99"),
                Duration::from_millis(3),
                Outcome::NotFound,
            );
        });

        let success = sample(
            &output,
            "swai_operations_total",
            &["operation=\"find_films\"", "outcome=\"success\""],
        );
        assert!(success.unwrap().ends_with(" 1"), "{}", output);
        assert!(sample(&output, "swai_operations_total", &["outcome=\"not_found\""]).is_some());
        assert!(output.contains("swai_operation_duration_seconds"));
    }

    #[test]
    fn test_assistant_requests_are_labelled_by_status() {
        let output = rendered(|| record_assistant("gpt-4o-mini", false));

        let failed = sample(
            &output,
            "swai_assistant_requests_total",
            &["model=\"gpt-4o-mini\"", "status=\"error\""],
        );
        assert!(failed.unwrap().ends_with(" 1"), "{}", output);
    }
}
