//! Fake Minecraft server speaking the Server List Ping protocol.
//!
//! Binds 127.0.0.1:0 and answers every connection according to the current
//! [`FakeBehavior`], which tests can swap between poll cycles.

use dashboard_service::probe::codec;
use dashboard_service::probe::ProbeTarget;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How the fake server answers a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Send `status_json`; answer the ping only if `answer_ping` is set.
    Status {
        status_json: String,
        answer_ping: bool,
    },

    /// Accept the connection and never write anything.
    Silent,

    /// Close the connection right after accepting it.
    Hangup,

    /// Send a status packet whose payload is not JSON.
    MalformedJson,
}

impl FakeBehavior {
    /// Online server with the given sample names and a working ping.
    pub fn online(names: &[&str]) -> Self {
        FakeBehavior::Status {
            status_json: status_json(names, 20),
            answer_ping: true,
        }
    }

    /// Online server that never answers the ping.
    pub fn online_without_pong(names: &[&str]) -> Self {
        FakeBehavior::Status {
            status_json: status_json(names, 20),
            answer_ping: false,
        }
    }
}

/// Build a vanilla-shaped status document.
pub fn status_json(names: &[&str], max: u32) -> String {
    let sample: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            serde_json::json!({
                "name": name,
                "id": format!("00000000-0000-4000-8000-{:012}", i),
            })
        })
        .collect();

    serde_json::json!({
        "version": {"name": "Paper 1.20.4", "protocol": 765},
        "players": {"max": max, "online": names.len(), "sample": sample},
        "description": {"text": "A Minecraft Server"},
    })
    .to_string()
}

/// Fake SLP server for probe and poller tests.
///
/// # Example
/// ```rust,ignore
/// let server = FakeStatusServer::spawn(FakeBehavior::online(&["Alice"])).await?;
/// let result = SlpProbe::new().probe(&server.target(Duration::from_secs(1))).await;
/// assert!(result.is_success());
/// ```
pub struct FakeStatusServer {
    addr: SocketAddr,
    behavior: Arc<Mutex<FakeBehavior>>,
    connections: Arc<AtomicUsize>,
    cancel_token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl FakeStatusServer {
    /// Spawn a fake server on a random local port.
    pub async fn spawn(behavior: FakeBehavior) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind fake server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let behavior = Arc::new(Mutex::new(behavior));
        let connections = Arc::new(AtomicUsize::new(0));
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&behavior),
            Arc::clone(&connections),
            cancel_token.clone(),
        ));

        Ok(Self {
            addr,
            behavior,
            connections,
            cancel_token,
            _handle: handle,
        })
    }

    /// Change how subsequent connections are answered.
    pub fn set_behavior(&self, behavior: FakeBehavior) {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Probe target pointing at this server.
    pub fn target(&self, timeout: Duration) -> ProbeTarget {
        ProbeTarget::new(self.addr.ip().to_string(), self.addr.port()).with_timeout(timeout)
    }
}

impl Drop for FakeStatusServer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self._handle.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    behavior: Arc<Mutex<FakeBehavior>>,
    connections: Arc<AtomicUsize>,
    cancel_token: CancellationToken,
) {
    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(_) => continue,
            },
            _ = cancel_token.cancelled() => break,
        };

        connections.fetch_add(1, Ordering::SeqCst);
        let current = behavior.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let token = cancel_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = serve_connection(stream, current) => {}
                _ = token.cancelled() => {}
            }
        });
    }
}

async fn serve_connection(mut stream: TcpStream, behavior: FakeBehavior) {
    match behavior {
        FakeBehavior::Hangup => {}
        FakeBehavior::Silent => hold_open(&mut stream).await,
        FakeBehavior::MalformedJson => {
            if read_status_request(&mut stream).await.is_err() {
                return;
            }
            if let Ok(packet) = codec::encode_status_response("this is not json") {
                let _ = stream.write_all(&packet).await;
                hold_open(&mut stream).await;
            }
        }
        FakeBehavior::Status {
            status_json,
            answer_ping,
        } => {
            if read_status_request(&mut stream).await.is_err() {
                return;
            }
            let Ok(packet) = codec::encode_status_response(&status_json) else {
                return;
            };
            if stream.write_all(&packet).await.is_err() {
                return;
            }

            if !answer_ping {
                hold_open(&mut stream).await;
                return;
            }

            if let Ok((packet_id, body)) = codec::read_packet(&mut stream).await {
                if packet_id == codec::PING_PACKET_ID && body.len() == 8 {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(&body);
                    let _ = stream
                        .write_all(&codec::encode_pong(i64::from_be_bytes(raw)))
                        .await;
                }
            }
        }
    }
}

/// Read the handshake and the status request.
async fn read_status_request(stream: &mut TcpStream) -> Result<(), anyhow::Error> {
    let (packet_id, body) = codec::read_packet(stream).await?;
    let handshake = codec::decode_handshake(packet_id, body)?;
    anyhow::ensure!(
        handshake.next_state == codec::NEXT_STATE_STATUS,
        "unexpected next state {}",
        handshake.next_state
    );

    let (packet_id, _) = codec::read_packet(stream).await?;
    anyhow::ensure!(
        packet_id == codec::STATUS_PACKET_ID,
        "unexpected packet {}",
        packet_id
    );
    Ok(())
}

/// Drain and ignore input until the peer closes.
async fn hold_open(stream: &mut TcpStream) {
    let mut buf = [0u8; 256];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
}
