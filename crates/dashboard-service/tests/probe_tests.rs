//! Server List Ping probe integration tests.
//!
//! Runs `SlpProbe` against `FakeStatusServer` over real TCP.

use dashboard_service::models::Confidence;
use dashboard_service::probe::{ProbeError, ProbeResult, ProbeTarget, SlpProbe, StatusProbe};
use dashboard_test_utils::{FakeBehavior, FakeStatusServer};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_probe_reports_players_and_latency() -> Result<(), anyhow::Error> {
    let server = FakeStatusServer::spawn(FakeBehavior::online(&["Alice", "Bob"])).await?;

    let result = SlpProbe::new()
        .probe(&server.target(Duration::from_secs(2)))
        .await;

    let ProbeResult::Success(success) = result else {
        anyhow::bail!("expected success, got {result:?}");
    };
    assert_eq!(success.participant_names, vec!["Alice", "Bob"]);
    assert!(success.latency_ms.is_some());
    assert_eq!(success.confidence, Confidence::Direct);
    assert_eq!(success.details.version.as_deref(), Some("Paper 1.20.4"));
    assert_eq!(success.details.players_online, Some(2));
    assert_eq!(success.details.players_max, Some(20));

    Ok(())
}

#[tokio::test]
async fn test_missing_pong_still_succeeds_without_latency() -> Result<(), anyhow::Error> {
    let server = FakeStatusServer::spawn(FakeBehavior::online_without_pong(&["Alice"])).await?;

    let result = SlpProbe::new()
        .probe(&server.target(Duration::from_millis(300)))
        .await;

    let ProbeResult::Success(success) = result else {
        anyhow::bail!("expected success, got {result:?}");
    };
    assert_eq!(success.participant_names, vec!["Alice"]);
    assert_eq!(success.latency_ms, None);

    Ok(())
}

#[tokio::test]
async fn test_silent_server_times_out_within_bound() -> Result<(), anyhow::Error> {
    let server = FakeStatusServer::spawn(FakeBehavior::Silent).await?;

    let started = Instant::now();
    let result = SlpProbe::new()
        .probe(&server.target(Duration::from_millis(200)))
        .await;

    assert_eq!(result, ProbeResult::Failure(ProbeError::Timeout(200)));
    assert!(started.elapsed() < Duration::from_secs(2));

    Ok(())
}

#[tokio::test]
async fn test_closed_port_is_connection_failure() -> Result<(), anyhow::Error> {
    // Reserve a port, then free it so nothing listens there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let target = ProbeTarget::new("127.0.0.1", port).with_timeout(Duration::from_secs(1));
    let result = SlpProbe::new().probe(&target).await;

    assert!(
        matches!(result, ProbeResult::Failure(ProbeError::Connection(_))),
        "expected connection failure, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn test_hangup_is_connection_failure() -> Result<(), anyhow::Error> {
    let server = FakeStatusServer::spawn(FakeBehavior::Hangup).await?;

    let result = SlpProbe::new()
        .probe(&server.target(Duration::from_secs(1)))
        .await;

    assert!(
        matches!(result, ProbeResult::Failure(ProbeError::Connection(_))),
        "expected connection failure, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_protocol_failure() -> Result<(), anyhow::Error> {
    let server = FakeStatusServer::spawn(FakeBehavior::MalformedJson).await?;

    let result = SlpProbe::new()
        .probe(&server.target(Duration::from_secs(1)))
        .await;

    assert!(
        matches!(result, ProbeResult::Failure(ProbeError::Protocol(_))),
        "expected protocol failure, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn test_one_connection_per_probe() -> Result<(), anyhow::Error> {
    let server = FakeStatusServer::spawn(FakeBehavior::online(&[])).await?;
    let probe = SlpProbe::new();
    let target = server.target(Duration::from_secs(1));

    probe.probe(&target).await;
    probe.probe(&target).await;

    assert_eq!(server.connection_count(), 2);

    Ok(())
}
