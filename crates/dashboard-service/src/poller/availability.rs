//! Online/offline state machine.
//!
//! ```text
//! Offline --success--> Online    transition = now, last success = now
//! Online  --success--> Online    last success = now
//! Online  --failure--> Offline   transition = now
//! Offline --failure--> Offline   no change
//! ```
//!
//! The machine starts Offline and has no terminal state.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Availability of the monitored server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Online,
    Offline,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Online => "online",
            Availability::Offline => "offline",
        }
    }
}

/// Availability plus the timestamps derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityTracker {
    state: Availability,
    last_transition_at: DateTime<Utc>,
    last_success_at: Option<DateTime<Utc>>,
}

impl AvailabilityTracker {
    /// Start Offline, with `started_at` as the initial transition time.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            state: Availability::Offline,
            last_transition_at: started_at,
            last_success_at: None,
        }
    }

    /// Apply a successful probe. Returns true if the state flipped.
    pub fn record_success(&mut self, now: DateTime<Utc>) -> bool {
        self.last_success_at = Some(now);
        match self.state {
            Availability::Offline => {
                self.state = Availability::Online;
                self.last_transition_at = now;
                true
            }
            Availability::Online => false,
        }
    }

    /// Apply a failed probe. Returns true if the state flipped.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            Availability::Online => {
                self.state = Availability::Offline;
                self.last_transition_at = now;
                true
            }
            Availability::Offline => false,
        }
    }

    pub fn state(&self) -> Availability {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == Availability::Online
    }

    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.last_transition_at
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.last_success_at
    }

    /// Time since the server came online; zero while Offline.
    ///
    /// A clock that moved backwards yields zero rather than a negative value.
    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            Availability::Online => (now - self.last_transition_at)
                .to_std()
                .unwrap_or_default(),
            Availability::Offline => Duration::ZERO,
        }
    }

    /// When the server came online, if it is online.
    pub fn online_since(&self) -> Option<DateTime<Utc>> {
        self.is_online().then_some(self.last_transition_at)
    }
}
