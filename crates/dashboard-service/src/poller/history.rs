//! Bounded history buffers.
//!
//! Entries are appended at the tail; once a buffer holds more than its
//! capacity the oldest entries are dropped from the head. Nothing else ever
//! removes an entry.

use crate::models::{LatencySample, PresenceEvent};
use std::collections::VecDeque;

/// Default number of latency samples kept.
pub const DEFAULT_LATENCY_CAPACITY: usize = 15;

/// Default number of presence events kept.
pub const DEFAULT_EVENT_CAPACITY: usize = 20;

/// FIFO buffer with a fixed capacity.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty buffer holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest ones past capacity.
    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copy the entries out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

/// Latency samples and presence events of the running process.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    latency: BoundedHistory<LatencySample>,
    events: BoundedHistory<PresenceEvent>,
}

impl HistoryStore {
    pub fn new(latency_capacity: usize, event_capacity: usize) -> Self {
        Self {
            latency: BoundedHistory::new(latency_capacity),
            events: BoundedHistory::new(event_capacity),
        }
    }

    pub fn record_latency(&mut self, sample: LatencySample) {
        self.latency.push(sample);
    }

    pub fn record_event(&mut self, event: PresenceEvent) {
        self.events.push(event);
    }

    pub fn latency(&self) -> &BoundedHistory<LatencySample> {
        &self.latency
    }

    pub fn events(&self) -> &BoundedHistory<PresenceEvent> {
        &self.events
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_CAPACITY, DEFAULT_EVENT_CAPACITY)
    }
}
