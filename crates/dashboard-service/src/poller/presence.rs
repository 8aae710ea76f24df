//! Player presence tracking.
//!
//! Presence is derived by diffing the player names of two consecutive
//! successful polls. Diffing against the previous set is what guarantees that
//! a player never joins twice without leaving in between.

use std::collections::HashSet;

/// Players seen by the latest successful poll.
///
/// Duplicate-free, iterated in first-observed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantSet {
    names: Vec<String>,
    index: HashSet<String>,
}

impl ParticipantSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from names, keeping the first occurrence of duplicates.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for name in names {
            set.insert(name.into());
        }
        set
    }

    fn insert(&mut self, name: String) -> bool {
        if self.index.contains(&name) {
            return false;
        }
        self.index.insert(name.clone());
        self.names.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in first-observed order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }
}

/// Result of comparing two observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceDiff {
    /// Names present now but not before, in current order.
    pub joins: Vec<String>,

    /// Names present before but not now, in previous order.
    pub leaves: Vec<String>,

    /// The current observation as a set.
    pub new_set: ParticipantSet,
}

/// Compare the previous set against the names observed now.
///
/// Pure: identical inputs always give identical output. On the first
/// successful poll `previous` is empty and every name joins.
pub fn diff(previous: &ParticipantSet, current: &[String]) -> PresenceDiff {
    let new_set = ParticipantSet::from_names(current.iter().cloned());

    let joins = new_set
        .iter()
        .filter(|name| !previous.contains(name))
        .cloned()
        .collect();

    let leaves = previous
        .iter()
        .filter(|name| !new_set.contains(name))
        .cloned()
        .collect();

    PresenceDiff {
        joins,
        leaves,
        new_set,
    }
}
