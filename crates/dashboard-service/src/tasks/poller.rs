//! Poller background task.
//!
//! Runs one poll cycle per refresh interval and publishes the resulting
//! snapshot on a watch channel. Readers always see a complete snapshot:
//! either the previous one or the new one.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is triggered. A cycle that is
//! already running completes and is published first.

use crate::models::Snapshot;
use crate::poller::PollOrchestrator;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Publishing side of the snapshot channel.
pub type SnapshotSender = watch::Sender<Arc<Snapshot>>;

/// Reading side of the snapshot channel.
pub type SnapshotReceiver = watch::Receiver<Arc<Snapshot>>;

/// Create a snapshot channel seeded with the pre-poll snapshot.
pub fn snapshot_channel(now: DateTime<Utc>) -> (SnapshotSender, SnapshotReceiver) {
    watch::channel(Arc::new(Snapshot::initial(now)))
}

/// Start the poller background task.
///
/// The first cycle runs immediately, then once per `refresh_interval`. A
/// cycle slower than the interval delays the next tick instead of causing a
/// burst, so cycles never overlap.
///
/// Returns when the cancellation token is triggered.
#[instrument(skip_all, name = "dashboard.task.poller")]
pub async fn start_poller(
    mut orchestrator: PollOrchestrator,
    refresh_interval: Duration,
    sender: SnapshotSender,
    cancel_token: CancellationToken,
) {
    info!(
        target: "dashboard.poller",
        address = %orchestrator.settings().target.address(),
        refresh_ms = refresh_interval.as_millis() as u64,
        "Starting poller task"
    );

    let mut interval = tokio::time::interval(refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let snapshot = orchestrator.run_poll_cycle().await;
                debug!(
                    target: "dashboard.poller",
                    online = snapshot.online,
                    players = snapshot.participants.len(),
                    "Poll cycle complete"
                );
                // Only fails once every receiver is gone; keep polling for metrics
                let _ = sender.send(Arc::new(snapshot));
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "dashboard.poller",
                    "Poller task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "dashboard.poller", "Poller task stopped");
}
