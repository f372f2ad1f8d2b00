//! Directory membership over HTTP: register, list, re-register, deregister.

use switchboard_services::DirectoryClient;

use crate::*;

#[tokio::test]
async fn test_peers_are_listed_after_start() -> Result<()> {
    let directory = start_directory().await?;
    let p1 = start_peer(directory.port(), "p1", "Alice").await?;
    let p2 = start_peer(directory.port(), "p2", "Bob").await?;

    let (status, body) = api_get(directory.port(), "/clients/connected").await?;
    assert_eq!(status, 200);

    let clients = body.as_array().context("array")?;
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0]["id"], "p1");
    assert_eq!(clients[0]["name"], "Alice");
    assert_eq!(clients[0]["http_port"], p1.port());
    assert_eq!(clients[1]["id"], "p2");
    assert_eq!(clients[1]["http_port"], p2.port());
    // Loopback peers are listed without an explicit host.
    assert!(clients[0].get("host").is_none());

    p2.stop().await?;
    p1.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_peer_proxies_connected_listing() -> Result<()> {
    let directory = start_directory().await?;
    let p1 = start_peer(directory.port(), "p1", "Alice").await?;
    let p2 = start_peer(directory.port(), "p2", "Bob").await?;

    let via_peer = connected_ids(p1.port()).await?;
    let via_directory = connected_ids(directory.port()).await?;
    assert_eq!(via_peer, via_directory);

    p2.stop().await?;
    p1.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_reregister_replaces_entry() -> Result<()> {
    let directory = start_directory().await?;
    let p1 = start_peer(directory.port(), "p1", "Alice").await?;

    let (status, body) = api_post(
        directory.port(),
        "/clients/register",
        &json!({ "id": "p1", "http_port": p1.port(), "name": "Alice Renamed" }),
    )
    .await?;
    assert_eq!(status, 200);
    let ack: Value = serde_json::from_str(&body)?;
    assert_eq!(ack["registered"], true);
    assert_eq!(ack["replaced"], true);

    let (_, listing) = api_get(directory.port(), "/clients/connected").await?;
    let clients = listing.as_array().context("array")?;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["name"], "Alice Renamed");

    p1.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_register_rejects_empty_id() -> Result<()> {
    let directory = start_directory().await?;

    let (status, _) = api_post(
        directory.port(),
        "/clients/register",
        &json!({ "id": "", "http_port": 9001, "name": "nobody" }),
    )
    .await?;
    assert_eq!(status, 400);

    let (status, _) = api_post(
        directory.port(),
        "/clients/register",
        &json!({ "id": "p9", "http_port": 0, "name": "nobody" }),
    )
    .await?;
    assert_eq!(status, 400);

    assert!(connected_ids(directory.port()).await?.is_empty());
    directory.stop().await
}

#[tokio::test]
async fn test_register_on_plain_peer_is_not_found() -> Result<()> {
    let directory = start_directory().await?;
    let p1 = start_peer(directory.port(), "p1", "Alice").await?;

    let (status, _) = api_post(
        p1.port(),
        "/clients/register",
        &json!({ "id": "p2", "http_port": 9002, "name": "Bob" }),
    )
    .await?;
    assert_eq!(status, 404);

    p1.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_stopped_peer_is_deregistered() -> Result<()> {
    let directory = start_directory().await?;
    let p1 = start_peer(directory.port(), "p1", "Alice").await?;
    let p2 = start_peer(directory.port(), "p2", "Bob").await?;

    p1.stop().await?;

    assert_eq!(connected_ids(directory.port()).await?, vec!["p2".to_string()]);
    let registry = directory.registry().context("directory owns the registry")?;
    assert!(registry.resolve("p1").is_err());

    p2.stop().await?;
    directory.stop().await
}

#[tokio::test]
async fn test_deregister_is_idempotent() -> Result<()> {
    let directory = start_directory().await?;

    for _ in 0..2 {
        let (status, body) =
            api_post(directory.port(), "/clients/deregister", &json!({ "id": "ghost" })).await?;
        assert_eq!(status, 200);
        let ack: Value = serde_json::from_str(&body)?;
        assert_eq!(ack["removed"], false);
    }

    directory.stop().await
}

#[tokio::test]
async fn test_deregister_removes_exactly_the_named_id() -> Result<()> {
    let directory = start_directory().await?;
    let awkward = ["p1", "p1?x", "inbox", "a/b#c", "connected"];
    for (i, id) in awkward.iter().enumerate() {
        let (status, _) = api_post(
            directory.port(),
            "/clients/register",
            &json!({ "id": id, "http_port": 9001 + i as u16, "name": id }),
        )
        .await?;
        assert_eq!(status, 200, "registering {id}");
    }

    let client = DirectoryClient::new(url(directory.port(), ""));

    let ack = client.deregister("p1?x").await?;
    assert!(ack.removed);
    assert_eq!(connected_ids(directory.port()).await?, ["p1", "inbox", "a/b#c", "connected"]);

    for id in ["inbox", "a/b#c", "connected", "p1"] {
        assert!(client.deregister(id).await?.removed, "deregistering {id}");
    }
    assert!(connected_ids(directory.port()).await?.is_empty());

    directory.stop().await
}
