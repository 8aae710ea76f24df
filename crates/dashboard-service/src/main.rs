//! Minecraft Server Dashboard
//!
//! Entry point: loads configuration, starts the poller task and serves the
//! dashboard until SIGINT/SIGTERM.

use chrono::Utc;
use dashboard_service::config::Config;
use dashboard_service::observability::metrics::init_metrics_recorder;
use dashboard_service::poller::PollOrchestrator;
use dashboard_service::probe::{FallbackProbe, SlpProbe};
use dashboard_service::routes::{self, AppState};
use dashboard_service::tasks::{snapshot_channel, start_poller};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Minecraft Server Dashboard");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!(target: "dashboard.config", "Failed to load configuration: {}", e);
        e
    })?;

    info!(
        target: "dashboard.config",
        server = %format!("{}:{}", config.server_host, config.server_port),
        refresh_ms = config.refresh_interval.as_millis() as u64,
        query_timeout_ms = config.query_timeout.as_millis() as u64,
        display_tz = config.display_tz.name(),
        bind_address = %config.bind_address,
        fallback = config.fallback_status_url.is_some(),
        "Configuration loaded successfully"
    );

    // Install the recorder before anything records a metric
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Assemble the poller
    let mut orchestrator = PollOrchestrator::new(
        config.poller_settings(),
        Arc::new(SlpProbe::new()),
        Utc::now(),
    );
    if let Some(url) = &config.fallback_status_url {
        let fallback = FallbackProbe::new(url.clone()).map_err(|e| {
            error!(target: "dashboard.config", "Failed to create fallback probe: {}", e);
            e
        })?;
        orchestrator = orchestrator.with_fallback(Arc::new(fallback));
    }

    let (snapshot_tx, snapshot_rx) = snapshot_channel(Utc::now());
    let poller_cancel_token = CancellationToken::new();
    let poller_handle = tokio::spawn(start_poller(
        orchestrator,
        config.refresh_interval,
        snapshot_tx,
        poller_cancel_token.clone(),
    ));

    // Build application routes
    let state = Arc::new(AppState::new(config.dashboard_view(), snapshot_rx));
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Dashboard listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.drain_seconds))
        .await?;

    // Stop polling once HTTP is down
    poller_cancel_token.cancel();
    if let Err(e) = poller_handle.await {
        warn!("Poller task did not shut down cleanly: {}", e);
    }

    info!("Dashboard shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_secs: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DASHBOARD_DRAIN_SECONDS=0)");
    }
}
