//! Metrics definitions for the dashboard.
//!
//! All metrics follow Prometheus naming conventions:
//! - `dashboard_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the four routes plus `/other`
//! - `source`: probe names (`slp`, `fallback`, `mock`)
//! - `outcome`: `success` or a `ProbeError` kind
//! - `kind`: `join` or `leave`
//!
//! Player names are never used as labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used to render
/// `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("dashboard_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Probe buckets span up to the default 3 s query timeout
        .set_buckets_for_metric(
            Matcher::Prefix("dashboard_probe".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 3.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set probe buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `dashboard_http_requests_total`, `dashboard_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("dashboard_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("dashboard_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path to a bounded label.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/healthz" => "/healthz",
        "/v1/status" => "/v1/status",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Probe Metrics
// ============================================================================

/// Record one probe attempt.
///
/// Metric: `dashboard_probes_total`, `dashboard_probe_duration_seconds`
/// Labels: `source`, `outcome`
pub fn record_probe(source: &'static str, outcome: &'static str, duration: Duration) {
    histogram!("dashboard_probe_duration_seconds",
        "source" => source,
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());

    counter!("dashboard_probes_total",
        "source" => source,
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// Server State Metrics
// ============================================================================

/// Metric: `dashboard_server_online` (1 online, 0 offline)
pub fn set_server_online(online: bool) {
    gauge!("dashboard_server_online").set(if online { 1.0 } else { 0.0 });
}

/// Metric: `dashboard_players_online`
///
/// Size of the presence set, which keeps its last value while offline.
pub fn set_players_online(count: usize) {
    gauge!("dashboard_players_online").set(count as f64);
}

/// Metric: `dashboard_presence_events_total`
/// Labels: `kind`
pub fn record_presence_events(joins: usize, leaves: usize) {
    if joins > 0 {
        counter!("dashboard_presence_events_total", "kind" => "join").increment(joins as u64);
    }
    if leaves > 0 {
        counter!("dashboard_presence_events_total", "kind" => "leave").increment(leaves as u64);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // These run against the global no-op recorder; they only check that the
    // recording functions never panic.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/", 200, Duration::from_millis(5));
        record_http_request("GET", "/v1/status", 200, Duration::from_millis(2));
        record_http_request("GET", "/missing", 404, Duration::from_millis(1));
        record_http_request("GET", "/", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(404), "error");
        assert_eq!(categorize_status_code(500), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/healthz"), "/healthz");
        assert_eq!(normalize_endpoint("/v1/status"), "/v1/status");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/v1/status/extra"), "/other");
        assert_eq!(normalize_endpoint("/wp-admin"), "/other");
    }

    #[test]
    fn test_probe_and_state_metrics() {
        record_probe("slp", "success", Duration::from_millis(42));
        record_probe("fallback", "timeout", Duration::from_secs(3));
        set_server_online(true);
        set_server_online(false);
        set_players_online(3);
        record_presence_events(2, 0);
        record_presence_events(0, 1);
    }
}
