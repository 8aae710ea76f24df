//! Native Server List Ping probe.
//!
//! Opens one TCP connection per probe, performs the status exchange and then
//! a ping/pong to measure round-trip latency. The whole exchange shares a
//! single deadline derived from the target timeout.
//!
//! A failed or timed-out ping after a good status response still counts as a
//! success, only without a latency value.

use super::codec;
use super::{round_millis, ProbeError, ProbeResult, ProbeSuccess, ProbeTarget, StatusProbe};
use crate::models::ServerDetails;
use serde::Deserialize;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, instrument};

/// Status document sent by the server. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct StatusDocument {
    version: Option<VersionDocument>,
    players: Option<PlayersDocument>,
}

#[derive(Debug, Deserialize)]
struct VersionDocument {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayersDocument {
    max: Option<i64>,
    online: Option<i64>,
    sample: Option<Vec<SampleEntry>>,
}

#[derive(Debug, Deserialize)]
struct SampleEntry {
    name: Option<String>,
}

/// Server List Ping probe.
#[derive(Debug, Clone, Default)]
pub struct SlpProbe;

impl SlpProbe {
    /// Create a new probe.
    pub fn new() -> Self {
        Self
    }

    async fn exchange(&self, target: &ProbeTarget) -> Result<ProbeSuccess, ProbeError> {
        let deadline = Instant::now() + target.timeout;
        let timeout_ms = target.timeout_ms();

        let (mut stream, document) = timeout_at(deadline, query_status(target))
            .await
            .map_err(|_| ProbeError::Timeout(timeout_ms))??;

        let (participant_names, details) = normalize_status(&document)?;

        let latency_ms = match timeout_at(deadline, ping(&mut stream)).await {
            Ok(Ok(rtt)) => Some(round_millis(rtt)),
            Ok(Err(e)) => {
                debug!(target: "dashboard.probe.slp", error = %e, "Ping failed, reporting no latency");
                None
            }
            Err(_) => {
                debug!(target: "dashboard.probe.slp", "Ping ran out of time, reporting no latency");
                None
            }
        };

        Ok(ProbeSuccess::direct(latency_ms, participant_names).with_details(details))
    }
}

#[async_trait::async_trait]
impl StatusProbe for SlpProbe {
    #[instrument(skip_all, name = "dashboard.probe.slp", fields(address = %target.address()))]
    async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        self.exchange(target).await.into()
    }

    fn source(&self) -> &'static str {
        "slp"
    }
}

/// Connect, handshake and fetch the status document.
async fn query_status(target: &ProbeTarget) -> Result<(TcpStream, String), ProbeError> {
    let mut stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;
    // Small request packets; don't wait for Nagle
    stream
        .set_nodelay(true)
        .map_err(|e| ProbeError::Connection(e.to_string()))?;

    let handshake = codec::encode_handshake(&target.host, target.port)?;
    stream
        .write_all(&handshake)
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;
    stream
        .write_all(&codec::encode_status_request())
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;

    let (packet_id, body) = codec::read_packet(&mut stream).await?;
    let document = codec::decode_status_response(packet_id, body)?;

    Ok((stream, document))
}

/// Send a ping and wait for the matching pong.
async fn ping(stream: &mut TcpStream) -> Result<Duration, ProbeError> {
    let payload = chrono::Utc::now().timestamp_millis();
    let started = Instant::now();

    stream
        .write_all(&codec::encode_ping(payload))
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;

    let (packet_id, body) = codec::read_packet(stream).await?;
    let echoed = codec::decode_pong(packet_id, body)?;
    if echoed != payload {
        return Err(ProbeError::Protocol(
            "Pong payload does not match ping".to_string(),
        ));
    }

    Ok(started.elapsed())
}

/// Map the server's JSON status document onto player names and details.
///
/// Sample entries without a name are skipped. A missing sample list means
/// no names, not an error.
fn normalize_status(document: &str) -> Result<(Vec<String>, ServerDetails), ProbeError> {
    let parsed: StatusDocument = serde_json::from_str(document)
        .map_err(|e| ProbeError::Protocol(format!("Malformed status document: {e}")))?;

    let players = parsed.players;
    let participant_names = players
        .as_ref()
        .and_then(|p| p.sample.as_ref())
        .map(|sample| sample.iter().filter_map(|entry| entry.name.clone()).collect())
        .unwrap_or_default();

    let details = ServerDetails {
        version: parsed.version.and_then(|v| v.name),
        players_online: players
            .as_ref()
            .and_then(|p| p.online)
            .and_then(|n| u32::try_from(n).ok()),
        players_max: players
            .as_ref()
            .and_then(|p| p.max)
            .and_then(|n| u32::try_from(n).ok()),
    };

    Ok((participant_names, details))
}
