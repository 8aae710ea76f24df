//! Mock status probe for testing.
//!
//! Plays back a scripted sequence of results, one per call, then keeps
//! returning the last one.

use super::{ProbeError, ProbeResult, ProbeSuccess, ProbeTarget, StatusProbe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock probe for unit and integration tests.
#[derive(Debug)]
pub struct MockStatusProbe {
    /// Results to return, in order.
    results: Vec<ProbeResult>,
    /// Number of calls made.
    call_count: AtomicUsize,
}

impl MockStatusProbe {
    /// Create a mock that returns `results` in sequence.
    pub fn with_results(results: Vec<ProbeResult>) -> Self {
        Self {
            results,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always reports the given players and latency.
    pub fn online(latency_ms: Option<u64>, names: &[&str]) -> Self {
        let names = names.iter().map(|n| (*n).to_string()).collect();
        Self::with_results(vec![ProbeResult::Success(ProbeSuccess::direct(
            latency_ms, names,
        ))])
    }

    /// Create a mock that always fails to connect.
    pub fn offline() -> Self {
        Self::with_results(vec![ProbeResult::Failure(ProbeError::Connection(
            "Connection refused".to_string(),
        ))])
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusProbe for MockStatusProbe {
    async fn probe(&self, _target: &ProbeTarget) -> ProbeResult {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let idx = count.min(self.results.len().saturating_sub(1));

        self.results.get(idx).cloned().unwrap_or_else(|| {
            ProbeResult::Failure(ProbeError::Connection(
                "Mock probe has no scripted results".to_string(),
            ))
        })
    }

    fn source(&self) -> &'static str {
        "mock"
    }
}
