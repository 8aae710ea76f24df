//! Test server harness for E2E testing
//!
//! Provides `TestDashboardServer` for spawning the real dashboard routes in
//! tests, either with hand-published snapshots or with a live poller.

use chrono::Utc;
use dashboard_service::config::Config;
use dashboard_service::models::Snapshot;
use dashboard_service::observability::metrics::init_metrics_recorder;
use dashboard_service::poller::PollOrchestrator;
use dashboard_service::probe::StatusProbe;
use dashboard_service::routes::{self, AppState};
use dashboard_service::tasks::{snapshot_channel, start_poller, SnapshotReceiver, SnapshotSender};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Global metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the dashboard in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_healthz() -> Result<()> {
///     let server = TestDashboardServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/healthz", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestDashboardServer {
    addr: SocketAddr,
    config: Config,
    snapshot_tx: Option<SnapshotSender>,
    snapshot_rx: SnapshotReceiver,
    poller_cancel_token: CancellationToken,
    _poller: Option<JoinHandle<()>>,
    _handle: JoinHandle<()>,
}

impl TestDashboardServer {
    /// Spawn a server that serves the initial (offline) snapshot until a
    /// test publishes another one with [`Self::publish`].
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let config = test_config(&[])?;
        let (tx, rx) = snapshot_channel(Utc::now());
        Self::serve(config, Some(tx), rx, None, CancellationToken::new()).await
    }

    /// Spawn a server already serving `snapshot`.
    pub async fn spawn_with_snapshot(snapshot: Snapshot) -> Result<Self, anyhow::Error> {
        let server = Self::spawn().await?;
        server.publish(snapshot)?;
        Ok(server)
    }

    /// Spawn a server backed by a live poller using `probe`.
    pub async fn spawn_with_probe(
        probe: Arc<dyn StatusProbe>,
        refresh_interval: Duration,
    ) -> Result<Self, anyhow::Error> {
        let refresh_ms = refresh_interval.as_millis().max(1).to_string();
        let config = test_config(&[("REFRESH_MS", refresh_ms.as_str())])?;

        let orchestrator = PollOrchestrator::new(config.poller_settings(), probe, Utc::now());
        let (tx, rx) = snapshot_channel(Utc::now());
        let cancel_token = CancellationToken::new();
        let poller = tokio::spawn(start_poller(
            orchestrator,
            config.refresh_interval,
            tx,
            cancel_token.clone(),
        ));

        Self::serve(config, None, rx, Some(poller), cancel_token).await
    }

    async fn serve(
        config: Config,
        snapshot_tx: Option<SnapshotSender>,
        snapshot_rx: SnapshotReceiver,
        poller: Option<JoinHandle<()>>,
        poller_cancel_token: CancellationToken,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::new(config.dashboard_view(), snapshot_rx.clone()));

        // Build routes using the service's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            snapshot_tx,
            snapshot_rx,
            poller_cancel_token,
            _poller: poller,
            _handle: handle,
        })
    }

    /// Publish a snapshot as if a poll cycle had produced it.
    ///
    /// Fails for servers driven by a live poller.
    pub fn publish(&self, snapshot: Snapshot) -> Result<(), anyhow::Error> {
        let tx = self
            .snapshot_tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Snapshots are published by the poller"))?;
        tx.send(Arc::new(snapshot))
            .map_err(|_| anyhow::anyhow!("No snapshot receivers left"))
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for_snapshot<F>(&self, predicate: F) -> Result<Arc<Snapshot>, anyhow::Error>
    where
        F: FnMut(&Arc<Snapshot>) -> bool,
    {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out waiting for snapshot"))?
            .map_err(|_| anyhow::anyhow!("Snapshot channel closed"))?;
        Ok(Arc::clone(&snapshot))
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestDashboardServer {
    fn drop(&mut self) {
        self.poller_cancel_token.cancel();
        self._handle.abort();
    }
}

/// Test configuration: fixed zone and a short probe timeout.
fn test_config(overrides: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
    let mut vars = HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("SERVER_HOST".to_string(), "127.0.0.1".to_string()),
        ("SERVER_TZ".to_string(), "UTC".to_string()),
        ("QUERY_TIMEOUT_MS".to_string(), "1000".to_string()),
        ("DASHBOARD_TITLE".to_string(), "Test Dashboard".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_service::probe::MockStatusProbe;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestDashboardServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/healthz", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_rejected_for_poller_driven_server() -> Result<(), anyhow::Error> {
        let probe = Arc::new(MockStatusProbe::online(Some(5), &[]));
        let server = TestDashboardServer::spawn_with_probe(probe, Duration::from_secs(60)).await?;

        assert!(server.publish(Snapshot::initial(Utc::now())).is_err());
        Ok(())
    }
}
