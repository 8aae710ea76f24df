//! Minecraft Server Dashboard Library
//!
//! Polls a Minecraft server with the Server List Ping protocol, derives
//! availability, uptime, latency history and player join/leave events from
//! consecutive polls, and serves the latest snapshot over HTTP.
//!
//! # Architecture
//!
//! ```text
//! tasks/poller.rs -> poller/orchestrator.rs -> probe/*.rs
//!        |                    |
//!        v                    v
//!   watch channel      presence, history, availability
//!        |
//!        v
//! routes/mod.rs -> handlers/*.rs -> render/mod.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - HTTP error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Snapshot and history types
//! - `observability` - Prometheus metrics
//! - `poller` - Poll state and orchestration
//! - `probe` - Status probes and the SLP codec
//! - `render` - HTML dashboard
//! - `routes` - Axum router setup
//! - `tasks` - Background poller task

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod poller;
pub mod probe;
pub mod render;
pub mod routes;
pub mod tasks;
