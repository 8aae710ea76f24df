//! HTTP routes for the dashboard.
//!
//! Defines the Axum router and application state.

use crate::errors::DashboardError;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::models::Snapshot;
use crate::render::DashboardView;
use crate::tasks::SnapshotReceiver;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Static page settings.
    pub view: DashboardView,

    /// Latest snapshot published by the poller.
    pub snapshots: SnapshotReceiver,
}

impl AppState {
    pub fn new(view: DashboardView, snapshots: SnapshotReceiver) -> Self {
        Self { view, snapshots }
    }

    /// Latest published snapshot.
    ///
    /// Fails once the poller has gone away, so a stale snapshot is never
    /// served as current.
    pub fn latest_snapshot(&self) -> Result<Arc<Snapshot>, DashboardError> {
        if self.snapshots.has_changed().is_err() {
            return Err(DashboardError::ServiceUnavailable(
                "Poller is not running".to_string(),
            ));
        }
        Ok(Arc::clone(&self.snapshots.borrow()))
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - HTML dashboard
/// - `/v1/status` - latest snapshot as JSON
/// - `/healthz` - liveness, plain `ok`
/// - `/metrics` - Prometheus metrics
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - HTTP metrics middleware (outermost)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let dashboard_routes = Router::new()
        .route("/", get(handlers::dashboard_page))
        .route("/v1/status", get(handlers::status_json))
        .with_state(state);

    let operational_routes = Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer
    // 2. TraceLayer
    // 3. http_metrics_middleware - records every response, including 404s
    dashboard_routes
        .merge(operational_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
