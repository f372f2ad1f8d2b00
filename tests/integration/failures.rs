//! Failure paths: dead peers, eviction, and a missing directory.

use std::time::Duration;

use crate::*;

#[tokio::test]
async fn test_peer_without_directory_fails_to_start() -> Result<()> {
    // Bind and drop to get a port nobody listens on.
    let closed = bind_ephemeral().await?.local_addr()?.port();
    let mut config = test_config(closed);
    config.directory.register_attempts = 2;

    let started = start_peer_with(config, "p1", "Alice").await;
    assert!(started.is_err());
    Ok(())
}

#[tokio::test]
async fn test_vanished_peer_is_unreachable() -> Result<()> {
    let directory = start_directory().await?;
    let alice = start_peer(directory.port(), "p1", "Alice").await?;
    let bob = start_peer(directory.port(), "p2", "Bob").await?;
    let bob_port = bob.port();
    bob.stop().await?;

    // Re-list Bob without a server behind him.
    let (status, _) = api_post(
        directory.port(),
        "/clients/register",
        &json!({ "id": "p2", "http_port": bob_port, "name": "Bob" }),
    )
    .await?;
    assert_eq!(status, 200);

    let (status, body) = api_post(
        alice.port(),
        "/clients/message?report=true",
        &json!({ "ids": ["p2"], "text": "still there?" }),
    )
    .await?;
    assert_eq!(status, 200);
    let report: Value = serde_json::from_str(&body)?;
    assert_eq!(report["delivered"], 0);
    assert_eq!(report["outcomes"][0]["status"], "unreachable");

    alice.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_unreachable_peer_is_evicted() -> Result<()> {
    let directory = start_directory().await?;
    let mut config = test_config(directory.port());
    config.relay.evict_after_failures = 2;
    let alice = start_peer_with(config, "p1", "Alice").await?;

    let closed = bind_ephemeral().await?.local_addr()?.port();
    api_post(
        directory.port(),
        "/clients/register",
        &json!({ "id": "ghost", "http_port": closed, "name": "Ghost" }),
    )
    .await?;

    for _ in 0..2 {
        api_post(
            alice.port(),
            "/clients/message",
            &json!({ "ids": ["ghost"], "text": "hello?" }),
        )
        .await?;
    }

    let registry = directory.registry().context("directory owns the registry")?;
    wait_until(Duration::from_secs(2), || registry.resolve("ghost").is_err()).await?;
    assert_eq!(connected_ids(directory.port()).await?, vec!["p1".to_string()]);

    alice.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_peer_listing_fails_when_directory_is_gone() -> Result<()> {
    let directory = start_directory().await?;
    let alice = start_peer(directory.port(), "p1", "Alice").await?;
    directory.stop().await?;

    let resp = reqwest::get(url(alice.port(), "/clients/connected")).await?;
    assert_eq!(resp.status().as_u16(), 502);

    // Deregistration is best effort, so stopping still succeeds.
    alice.stop().await
}
