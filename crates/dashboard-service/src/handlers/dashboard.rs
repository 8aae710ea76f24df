//! Dashboard handlers.
//!
//! Both handlers read the latest published snapshot and never trigger a
//! poll themselves.

use crate::errors::DashboardError;
use crate::models::Snapshot;
use crate::render;
use crate::routes::AppState;
use axum::extract::State;
use axum::response::Html;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /
///
/// Renders the latest snapshot as an HTML page that reloads itself every
/// poll interval.
#[instrument(skip_all, name = "dashboard.page")]
pub async fn dashboard_page(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, DashboardError> {
    let snapshot = state.latest_snapshot()?;

    let html = render::render_dashboard(&snapshot, &state.view, Utc::now())
        .map_err(|e| DashboardError::Internal(format!("Failed to render dashboard: {e}")))?;

    Ok(Html(html))
}

/// Handler for GET /v1/status
///
/// ## Example Response
///
/// ```json
/// {
///   "online": true,
///   "confidence": "direct",
///   "uptime_seconds": 120,
///   "participants": ["Alice"],
///   "latency_history": [{"at": "2024-01-01T00:00:00Z", "millis": 42}],
///   "recent_events": [{"at": "2024-01-01T00:00:00Z", "name": "Alice", "kind": "join"}],
///   "server": {"version": "Paper 1.20.4", "players_online": 1, "players_max": 20},
///   "last_poll_at": "2024-01-01T00:02:00Z"
/// }
/// ```
#[instrument(skip_all, name = "dashboard.status")]
pub async fn status_json(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Snapshot>, DashboardError> {
    let snapshot = state.latest_snapshot()?;
    Ok(Json(Snapshot::clone(&snapshot)))
}
