//! HTTP request handlers for the dashboard.

pub mod dashboard;
pub mod health;
pub mod metrics;

pub use dashboard::{dashboard_page, status_json};
pub use health::health_check;
pub use metrics::metrics_handler;
