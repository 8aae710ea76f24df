//! Poll state and orchestration.
//!
//! # Components
//!
//! - `presence` - participant set and join/leave diffing
//! - `history` - bounded latency and event buffers
//! - `availability` - online/offline state machine
//! - `orchestrator` - one poll cycle end to end

pub mod availability;
pub mod history;
pub mod orchestrator;
pub mod presence;

pub use availability::{Availability, AvailabilityTracker};
pub use history::{BoundedHistory, HistoryStore, DEFAULT_EVENT_CAPACITY, DEFAULT_LATENCY_CAPACITY};
pub use orchestrator::{PollOrchestrator, PollerSettings};
pub use presence::{ParticipantSet, PresenceDiff};
