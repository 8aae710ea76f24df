//! Poll cycle orchestration.
//!
//! The orchestrator owns every piece of derived state (history, presence,
//! availability) and is the only thing that mutates it. Cycles take
//! `&mut self`, so two cycles can never interleave on the same state.

use super::availability::AvailabilityTracker;
use super::history::HistoryStore;
use super::presence::{self, ParticipantSet};
use crate::models::{
    Confidence, LatencySample, PresenceEvent, PresenceKind, ServerDetails, Snapshot,
};
use crate::observability::metrics;
use crate::probe::{ProbeError, ProbeResult, ProbeSuccess, ProbeTarget, StatusProbe};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Values the orchestrator needs, injected by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerSettings {
    /// Server to probe.
    pub target: ProbeTarget,

    /// Latency samples kept.
    pub latency_capacity: usize,

    /// Presence events kept.
    pub event_capacity: usize,
}

/// Runs poll cycles and produces snapshots.
pub struct PollOrchestrator {
    settings: PollerSettings,
    probe: Arc<dyn StatusProbe>,
    fallback: Option<Arc<dyn StatusProbe>>,
    history: HistoryStore,
    participants: ParticipantSet,
    availability: AvailabilityTracker,
    details: ServerDetails,
    confidence: Option<Confidence>,
    last_error: Option<String>,
}

impl PollOrchestrator {
    /// Create an orchestrator with empty state, Offline since `started_at`.
    pub fn new(
        settings: PollerSettings,
        probe: Arc<dyn StatusProbe>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let history = HistoryStore::new(settings.latency_capacity, settings.event_capacity);
        Self {
            settings,
            probe,
            fallback: None,
            history,
            participants: ParticipantSet::new(),
            availability: AvailabilityTracker::new(started_at),
            details: ServerDetails::default(),
            confidence: None,
            last_error: None,
        }
    }

    /// Query `fallback` whenever the primary probe fails.
    pub fn with_fallback(mut self, fallback: Arc<dyn StatusProbe>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn participants(&self) -> &ParticipantSet {
        &self.participants
    }

    pub fn availability(&self) -> &AvailabilityTracker {
        &self.availability
    }

    /// Run one cycle stamped with the wall clock at probe completion.
    pub async fn run_poll_cycle(&mut self) -> Snapshot {
        let result = self.probe_once().await;
        self.apply(result, Utc::now())
    }

    /// Run one cycle stamped with `now`.
    pub async fn run_poll_cycle_at(&mut self, now: DateTime<Utc>) -> Snapshot {
        let result = self.probe_once().await;
        self.apply(result, now)
    }

    /// Fold a probe result into the state and return the new snapshot.
    ///
    /// A failure only moves availability to Offline; history and the
    /// participant set keep the values of the last successful cycle.
    pub fn apply(&mut self, result: ProbeResult, now: DateTime<Utc>) -> Snapshot {
        match result {
            ProbeResult::Success(success) => self.apply_success(success, now),
            ProbeResult::Failure(error) => self.apply_failure(&error, now),
        }

        metrics::set_server_online(self.availability.is_online());
        metrics::set_players_online(self.participants.len());

        self.snapshot(now)
    }

    /// Assemble a snapshot of the current state.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let online = self.availability.is_online();
        Snapshot {
            online,
            confidence: if online { self.confidence } else { None },
            uptime_seconds: self.availability.uptime(now).as_secs(),
            online_since: self.availability.online_since(),
            last_success_at: self.availability.last_success_at(),
            latency_history: self.history.latency().to_vec(),
            participants: self.participants.names().to_vec(),
            recent_events: self.history.events().to_vec(),
            server: self.details.clone(),
            last_error: self.last_error.clone(),
            last_poll_at: now,
        }
    }

    /// Probe the primary, then the fallback if the primary failed.
    ///
    /// Never retries the same probe. When both fail the primary's error is
    /// kept, since it describes the server rather than the status API.
    async fn probe_once(&self) -> ProbeResult {
        let target = &self.settings.target;

        let started = Instant::now();
        let primary = self.probe.probe(target).await;
        metrics::record_probe(self.probe.source(), primary.outcome(), started.elapsed());

        let primary_error = match primary {
            ProbeResult::Success(_) => return primary,
            ProbeResult::Failure(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return ProbeResult::Failure(primary_error);
        };

        let started = Instant::now();
        let secondary = fallback.probe(target).await;
        metrics::record_probe(fallback.source(), secondary.outcome(), started.elapsed());

        match secondary {
            ProbeResult::Success(success) => {
                debug!(
                    target: "dashboard.poller",
                    primary_error = %primary_error,
                    "Primary probe failed, fallback reports server online"
                );
                ProbeResult::Success(success)
            }
            ProbeResult::Failure(fallback_error) => {
                debug!(
                    target: "dashboard.poller",
                    primary_error = %primary_error,
                    fallback_error = %fallback_error,
                    "Primary and fallback probes both failed"
                );
                ProbeResult::Failure(primary_error)
            }
        }
    }

    fn apply_success(&mut self, success: ProbeSuccess, now: DateTime<Utc>) {
        let diff = presence::diff(&self.participants, &success.participant_names);

        metrics::record_presence_events(diff.joins.len(), diff.leaves.len());

        for name in diff.joins {
            info!(target: "dashboard.poller", player = %name, "Player joined");
            self.history.record_event(PresenceEvent {
                at: now,
                name,
                kind: PresenceKind::Join,
            });
        }
        for name in diff.leaves {
            info!(target: "dashboard.poller", player = %name, "Player left");
            self.history.record_event(PresenceEvent {
                at: now,
                name,
                kind: PresenceKind::Leave,
            });
        }

        self.history.record_latency(LatencySample {
            at: now,
            millis: success.latency_ms,
        });
        self.participants = diff.new_set;
        self.details = success.details;
        self.confidence = Some(success.confidence);
        self.last_error = None;

        if self.availability.record_success(now) {
            info!(
                target: "dashboard.poller",
                address = %self.settings.target.address(),
                state = self.availability.state().as_str(),
                confidence = success.confidence.as_str(),
                "Server is online"
            );
        }
    }

    fn apply_failure(&mut self, error: &ProbeError, now: DateTime<Utc>) {
        if self.availability.record_failure(now) {
            warn!(
                target: "dashboard.poller",
                address = %self.settings.target.address(),
                state = self.availability.state().as_str(),
                error = %error,
                "Server went offline"
            );
        } else {
            debug!(
                target: "dashboard.poller",
                error = %error,
                "Server still offline"
            );
        }
        self.last_error = Some(error.to_string());
    }
}
