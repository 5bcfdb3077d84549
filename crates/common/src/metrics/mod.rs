//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ParkForge metrics
pub const METRICS_PREFIX: &str = "parkforge";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
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

    // Session lifecycle metrics
    describe_counter!(
        format!("{}_sessions_started_total", METRICS_PREFIX),
        Unit::Count,
        "Total parking sessions opened"
    );

    describe_counter!(
        format!("{}_sessions_closed_total", METRICS_PREFIX),
        Unit::Count,
        "Total parking sessions closed"
    );

    describe_histogram!(
        format!("{}_session_duration_minutes", METRICS_PREFIX),
        Unit::Count,
        "Closed session duration in minutes"
    );

    describe_gauge!(
        format!("{}_slots_occupied", METRICS_PREFIX),
        Unit::Count,
        "Currently occupied slots"
    );

    // Settlement metrics
    describe_counter!(
        format!("{}_payments_recorded_total", METRICS_PREFIX),
        Unit::Count,
        "Total payments settled"
    );

    describe_counter!(
        format!("{}_offline_codes_issued_total", METRICS_PREFIX),
        Unit::Count,
        "Total offline redemption codes minted"
    );

    describe_counter!(
        format!("{}_offline_redemptions_total", METRICS_PREFIX),
        Unit::Count,
        "Total offline code redemption attempts"
    );

    describe_histogram!(
        format!("{}_settled_amount", METRICS_PREFIX),
        Unit::Count,
        "Settled fee amounts"
    );

    // Dependency metrics
    describe_counter!(
        format!("{}_dependency_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Outbound dependency calls"
    );

    describe_counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        Unit::Count,
        "Fire-and-forget notifications attempted"
    );

    // Database metrics
    describe_histogram!(
        format!("{}_db_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Database query latency in seconds"
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

/// Record a session start
pub fn record_session_start(slot_id: i32) {
    counter!(format!("{}_sessions_started_total", METRICS_PREFIX)).increment(1);

    gauge!(
        format!("{}_slots_occupied", METRICS_PREFIX),
        "slot" => slot_id.to_string()
    )
    .set(1.0);
}

/// Record a session close with its billed duration
pub fn record_session_close(slot_id: i32, minutes: f64) {
    counter!(format!("{}_sessions_closed_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_session_duration_minutes", METRICS_PREFIX)).record(minutes);

    gauge!(
        format!("{}_slots_occupied", METRICS_PREFIX),
        "slot" => slot_id.to_string()
    )
    .set(0.0);
}

/// Record a settled payment
pub fn record_payment(method: &str, amount: f64) {
    counter!(
        format!("{}_payments_recorded_total", METRICS_PREFIX),
        "method" => method.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_settled_amount", METRICS_PREFIX),
        "method" => method.to_string()
    )
    .record(amount);
}

/// Record an offline code lifecycle event
pub fn record_offline(event: &'static str) {
    match event {
        "issued" => {
            counter!(format!("{}_offline_codes_issued_total", METRICS_PREFIX)).increment(1)
        }
        outcome => counter!(
            format!("{}_offline_redemptions_total", METRICS_PREFIX),
            "outcome" => outcome.to_string()
        )
        .increment(1),
    }
}

/// Record an outbound dependency call outcome
pub fn record_dependency(service: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };

    counter!(
        format!("{}_dependency_requests_total", METRICS_PREFIX),
        "service" => service.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a fire-and-forget notification attempt
pub fn record_notification(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };

    counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        // Verify buckets are sorted and contain SLO targets
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // P50 target (50ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.050));
        // P99 target (150ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.150));
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/sessions:start");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
