//! # Dashboard Test Utilities
//!
//! Shared test utilities for the dashboard service.
//!
//! This crate provides:
//! - Fake SLP server (`FakeStatusServer` for probe and poller tests)
//! - Server test harness (`TestDashboardServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dashboard_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestDashboardServer::spawn().await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .get(format!("{}/v1/status", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod fake_server;
pub mod server_harness;

// Re-export commonly used items
pub use fake_server::*;
pub use server_harness::*;
