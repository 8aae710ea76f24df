//! Liveness handler.

use tracing::instrument;

/// Handler for GET /healthz
///
/// Reports that the process is serving HTTP. Says nothing about the
/// monitored server and has no side effects.
#[instrument(skip_all, name = "dashboard.health.check")]
pub async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        assert_eq!(health_check().await, "ok");
    }
}
