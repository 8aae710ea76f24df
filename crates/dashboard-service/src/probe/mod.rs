//! Status probes.
//!
//! A probe performs one bounded query against the monitored server and
//! normalizes whatever comes back into a [`ProbeResult`]. Downstream code
//! depends only on `ProbeResult`, never on wire or JSON shapes.
//!
//! # Components
//!
//! - `codec` - Server List Ping packet codec
//! - `slp` - native Server List Ping probe over TCP
//! - `fallback` - public status API probe (best-effort)
//! - `mock` - scripted probe for tests

pub mod codec;
pub mod fallback;
pub mod mock;
pub mod slp;

use crate::models::{Confidence, ServerDetails};
use codec::CodecError;
use std::time::Duration;
use thiserror::Error;

pub use fallback::FallbackProbe;
pub use mock::MockStatusProbe;
pub use slp::SlpProbe;

/// Default probe timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Where and how long to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// Host name or IP address of the monitored server.
    pub host: String,

    /// Port of the monitored server.
    pub port: u16,

    /// Upper bound for the whole exchange.
    pub timeout: Duration,
}

impl ProbeTarget {
    /// Create a target with the default timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port` form used in logs and URLs.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout in whole milliseconds, saturating at `u64::MAX`.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Normalized successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSuccess {
    /// Round-trip time rounded to the nearest millisecond, if measured.
    pub latency_ms: Option<u64>,

    /// Player names from the sample list, in server order.
    pub participant_names: Vec<String>,

    /// Informational server fields.
    pub details: ServerDetails,

    /// Where the answer came from.
    pub confidence: Confidence,
}

impl ProbeSuccess {
    /// Success reported by the server itself.
    pub fn direct(latency_ms: Option<u64>, participant_names: Vec<String>) -> Self {
        Self {
            latency_ms,
            participant_names,
            details: ServerDetails::default(),
            confidence: Confidence::Direct,
        }
    }

    /// Success reported by a third-party status API.
    pub fn best_effort(participant_names: Vec<String>) -> Self {
        Self {
            latency_ms: None,
            participant_names,
            details: ServerDetails::default(),
            confidence: Confidence::BestEffort,
        }
    }

    /// Attach server details.
    pub fn with_details(mut self, details: ServerDetails) -> Self {
        self.details = details;
        self
    }
}

/// Why a probe failed.
///
/// Every variant means "unavailable" to the availability state machine;
/// the message is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Fallback status unavailable: {0}")]
    Fallback(String),
}

impl ProbeError {
    /// Bounded label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Connection(_) => "connection",
            ProbeError::Protocol(_) => "protocol",
            ProbeError::Fallback(_) => "fallback",
        }
    }
}

impl From<CodecError> for ProbeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(io) => ProbeError::Connection(io.to_string()),
            other => ProbeError::Protocol(other.to_string()),
        }
    }
}

/// Outcome of one probe: tagged success or failure, never a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Success(ProbeSuccess),
    Failure(ProbeError),
}

impl ProbeResult {
    /// Returns true for a successful probe.
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success(_))
    }

    /// Bounded label for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProbeResult::Success(_) => "success",
            ProbeResult::Failure(e) => e.kind(),
        }
    }
}

impl From<Result<ProbeSuccess, ProbeError>> for ProbeResult {
    fn from(result: Result<ProbeSuccess, ProbeError>) -> Self {
        match result {
            Ok(success) => ProbeResult::Success(success),
            Err(e) => ProbeResult::Failure(e),
        }
    }
}

/// One query against the monitored server.
///
/// Implementations must return within `target.timeout` (plus scheduling
/// slack) and must not mutate shared state.
#[async_trait::async_trait]
pub trait StatusProbe: Send + Sync {
    /// Query the server once.
    async fn probe(&self, target: &ProbeTarget) -> ProbeResult;

    /// Short name of the probe for logs and metric labels.
    fn source(&self) -> &'static str;
}

/// Round a duration to the nearest whole millisecond.
pub(crate) fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}
