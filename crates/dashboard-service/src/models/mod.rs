//! Dashboard models.
//!
//! Contains the data types shared by the poller and the rendering layer.
//! Everything here is plain data; the poller owns the mutable state and
//! hands out immutable [`Snapshot`] values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of presence change observed between two successful polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceKind {
    /// Player appeared in the sample list.
    Join,

    /// Player disappeared from the sample list.
    Leave,
}

impl PresenceKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceKind::Join => "join",
            PresenceKind::Leave => "leave",
        }
    }
}

/// One latency measurement, recorded on every successful poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySample {
    /// When the poll completed.
    pub at: DateTime<Utc>,

    /// Round-trip time in milliseconds, `None` if the server did not answer the ping.
    pub millis: Option<u64>,
}

/// A join or leave observed between two successful polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// When the change was observed.
    pub at: DateTime<Utc>,

    /// Player name.
    pub name: String,

    /// Join or leave.
    pub kind: PresenceKind,
}

/// How trustworthy a successful status is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// The server answered the status protocol itself.
    Direct,

    /// A third-party status API reported the server online.
    BestEffort,
}

impl Confidence {
    /// Returns the string representation of the confidence level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Direct => "direct",
            Confidence::BestEffort => "best_effort",
        }
    }
}

/// Informational server fields from the latest successful probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDetails {
    /// Version name reported by the server (e.g. "Paper 1.20.4").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Player count reported by the server. May exceed the sample list length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players_online: Option<u32>,

    /// Player slots reported by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players_max: Option<u32>,
}

/// Immutable result of one poll cycle.
///
/// Returned by the `/v1/status` endpoint and rendered by `/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whether the latest poll reached the server.
    pub online: bool,

    /// Where the online status came from. `None` while offline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,

    /// Seconds since the server came online, zero while offline.
    pub uptime_seconds: u64,

    /// When the server last came online. `None` while offline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_since: Option<DateTime<Utc>>,

    /// When a poll last succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,

    /// Latency samples, oldest first.
    pub latency_history: Vec<LatencySample>,

    /// Players seen by the latest successful poll.
    pub participants: Vec<String>,

    /// Join/leave events, oldest first.
    pub recent_events: Vec<PresenceEvent>,

    /// Server fields from the latest successful poll.
    pub server: ServerDetails,

    /// Failure reason of the latest poll, for diagnostics only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// When this snapshot was assembled.
    pub last_poll_at: DateTime<Utc>,
}

impl Snapshot {
    /// Snapshot published before the first poll completes.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            online: false,
            confidence: None,
            uptime_seconds: 0,
            online_since: None,
            last_success_at: None,
            latency_history: Vec::new(),
            participants: Vec::new(),
            recent_events: Vec::new(),
            server: ServerDetails::default(),
            last_error: None,
            last_poll_at: now,
        }
    }

    /// Uptime as of the poll that produced this snapshot.
    pub fn uptime(&self) -> Duration {
        Duration::from_secs(self.uptime_seconds)
    }

    /// Uptime as of `now`, for rendering between polls.
    ///
    /// Never smaller than the uptime recorded at poll time.
    pub fn uptime_at(&self, now: DateTime<Utc>) -> Duration {
        match self.online_since {
            Some(since) if self.online => {
                let live = (now - since).to_std().unwrap_or_default();
                live.max(self.uptime())
            }
            _ => Duration::ZERO,
        }
    }
}
