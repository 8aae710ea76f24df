//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated so Prometheus can scrape it. Player names never appear
//! in labels.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// ```text
/// # TYPE dashboard_server_online gauge
/// dashboard_server_online 1
/// ```
#[tracing::instrument(skip_all, name = "dashboard.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
