//! Public status API probe.
//!
//! Used only after the native probe fails, to avoid reporting a server as
//! offline when the dashboard host merely cannot reach it directly. The API
//! is expected to answer `GET {base_url}/{host}:{port}` with a document
//! shaped like the mcsrvstat.us v3 response.
//!
//! Results are always marked [`Confidence::BestEffort`] and never carry a
//! latency value: the round trip measured here is to the API, not the server.
//!
//! [`Confidence::BestEffort`]: crate::models::Confidence::BestEffort

use super::{ProbeError, ProbeResult, ProbeSuccess, ProbeTarget, StatusProbe};
use crate::models::ServerDetails;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Connect timeout for the status API.
const FALLBACK_CONNECT_TIMEOUT_SECS: u64 = 2;

/// User agent sent to the status API (some APIs reject requests without one).
const USER_AGENT: &str = concat!("dashboard-service/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct FallbackDocument {
    #[serde(default)]
    online: bool,
    version: Option<String>,
    players: Option<FallbackPlayers>,
}

#[derive(Debug, Deserialize)]
struct FallbackPlayers {
    online: Option<i64>,
    max: Option<i64>,
    list: Option<Vec<FallbackPlayer>>,
}

#[derive(Debug, Deserialize)]
struct FallbackPlayer {
    name: Option<String>,
}

/// HTTP probe against a public status API.
#[derive(Debug, Clone)]
pub struct FallbackProbe {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL, without trailing slash.
    base_url: String,
}

impl FallbackProbe {
    /// Create a new fallback probe.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Status API base URL (e.g., "https://api.mcsrvstat.us/3")
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::Fallback` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(FALLBACK_CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                error!(target: "dashboard.probe.fallback", error = %e, "Failed to build HTTP client");
                ProbeError::Fallback("HTTP client unavailable".to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL queried for `target`.
    pub fn status_url(&self, target: &ProbeTarget) -> String {
        format!("{}/{}", self.base_url, target.address())
    }

    async fn fetch(&self, target: &ProbeTarget) -> Result<ProbeSuccess, ProbeError> {
        let timeout_ms = target.timeout_ms();

        let response = self
            .client
            .get(self.status_url(target))
            .timeout(target.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout(timeout_ms)
                } else {
                    warn!(target: "dashboard.probe.fallback", error = %e, "Status API request failed");
                    ProbeError::Fallback("Status API is unreachable".to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "dashboard.probe.fallback", status = %status, "Status API returned an error");
            return Err(ProbeError::Fallback(format!("Status API returned {status}")));
        }

        let document: FallbackDocument = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(timeout_ms)
            } else {
                ProbeError::Fallback(format!("Malformed status API response: {e}"))
            }
        })?;

        if !document.online {
            return Err(ProbeError::Fallback(
                "Status API reports the server offline".to_string(),
            ));
        }

        let players = document.players;
        let names = players
            .as_ref()
            .and_then(|p| p.list.as_ref())
            .map(|list| list.iter().filter_map(|p| p.name.clone()).collect())
            .unwrap_or_default();

        let details = ServerDetails {
            version: document.version,
            players_online: players
                .as_ref()
                .and_then(|p| p.online)
                .and_then(|n| u32::try_from(n).ok()),
            players_max: players
                .as_ref()
                .and_then(|p| p.max)
                .and_then(|n| u32::try_from(n).ok()),
        };

        Ok(ProbeSuccess::best_effort(names).with_details(details))
    }
}

#[async_trait::async_trait]
impl StatusProbe for FallbackProbe {
    #[instrument(skip_all, name = "dashboard.probe.fallback", fields(address = %target.address()))]
    async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        self.fetch(target).await.into()
    }

    fn source(&self) -> &'static str {
        "fallback"
    }
}
