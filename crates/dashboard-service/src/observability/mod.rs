//! Observability for the dashboard.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;
