//! Relaying messages between peers through POST /clients/message.

use std::time::Duration;

use crate::*;

#[tokio::test]
async fn test_alice_messages_bob() -> Result<()> {
    let directory = start_directory().await?;
    let alice = start_peer(directory.port(), "p1", "Alice").await?;
    let bob = start_peer(directory.port(), "p2", "Bob").await?;

    let (status, body) = api_post(
        alice.port(),
        "/clients/message",
        &json!({ "ids": ["p2"], "text": "Hello from Alice" }),
    )
    .await?;
    assert_eq!(status, 200);
    assert!(body.is_empty(), "plain relay answers with an empty body");

    let received = bob.inbox().all();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].text, "Hello from Alice");
    assert_eq!(received[0].from.as_deref(), Some("p1"));
    assert_eq!(alice.inbox().count(), 0);

    let (status, inbox) = api_get(bob.port(), "/clients/inbox").await?;
    assert_eq!(status, 200);
    assert_eq!(inbox["messages"][0]["text"], "Hello from Alice");

    bob.stop().await?;
    alice.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_directory_relays_too() -> Result<()> {
    let directory = start_directory().await?;
    let bob = start_peer(directory.port(), "p2", "Bob").await?;

    let (status, _) = api_post(
        directory.port(),
        "/clients/message",
        &json!({ "ids": ["p2"], "text": "from the directory" }),
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(bob.inbox().count(), 1);

    bob.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_unknown_target_is_reported_not_fatal() -> Result<()> {
    let directory = start_directory().await?;
    let alice = start_peer(directory.port(), "p1", "Alice").await?;
    let bob = start_peer(directory.port(), "p2", "Bob").await?;

    let (status, body) = api_post(
        alice.port(),
        "/clients/message?report=true",
        &json!({ "ids": ["p2", "ghost"], "text": "anyone there?" }),
    )
    .await?;
    assert_eq!(status, 200);

    let report: Value = serde_json::from_str(&body)?;
    assert_eq!(report["delivered"], 1);
    assert_eq!(report["failed"], 1);
    let outcomes = report["outcomes"].as_array().context("outcomes")?;
    let ghost = outcomes
        .iter()
        .find(|o| o["id"] == "ghost")
        .context("ghost outcome")?;
    assert_eq!(ghost["status"], "not_found");
    assert_eq!(bob.inbox().count(), 1);

    bob.stop().await?;
    alice.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_every_target_failing_still_answers_ok() -> Result<()> {
    let directory = start_directory().await?;
    let alice = start_peer(directory.port(), "p1", "Alice").await?;

    let (status, body) = api_post(
        alice.port(),
        "/clients/message?report=true",
        &json!({ "ids": ["ghost-1", "ghost-2"], "text": "hello?" }),
    )
    .await?;
    assert_eq!(status, 200);
    let report: Value = serde_json::from_str(&body)?;
    assert_eq!(report["delivered"], 0);
    assert_eq!(report["failed"], 2);

    alice.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_malformed_requests_are_rejected() -> Result<()> {
    let directory = start_directory().await?;
    let alice = start_peer(directory.port(), "p1", "Alice").await?;

    let (status, _) = api_post(
        alice.port(),
        "/clients/message",
        &json!({ "ids": [], "text": "to nobody" }),
    )
    .await?;
    assert_eq!(status, 400);

    let (status, _) = api_post(alice.port(), "/clients/message", &json!({ "ids": ["p2"] })).await?;
    assert_eq!(status, 400);

    let resp = reqwest::Client::new()
        .post(url(alice.port(), "/clients/message"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);

    alice.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_inbox_notifies_subscribers() -> Result<()> {
    let directory = start_directory().await?;
    let alice = start_peer(directory.port(), "p1", "Alice").await?;
    let bob = start_peer(directory.port(), "p2", "Bob").await?;

    let mut rx = bob.inbox().subscribe();
    api_post(
        alice.port(),
        "/clients/message",
        &json!({ "ids": ["p2"], "text": "ping" }),
    )
    .await?;

    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await??;
    assert_eq!(msg.text, "ping");

    bob.stop().await?;
    alice.stop().await?;
    directory.stop().await
}
