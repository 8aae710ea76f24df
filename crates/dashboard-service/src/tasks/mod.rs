//! Background tasks for the dashboard.
//!
//! # Tasks
//!
//! - `poller` - runs a poll cycle per refresh interval and publishes snapshots

pub mod poller;

pub use poller::{snapshot_channel, start_poller, SnapshotReceiver, SnapshotSender};
