//! Switchboard integration test harness.
//!
//! Every test starts its own directory and peers in-process on ephemeral
//! loopback ports and talks to them over real HTTP, so tests can run in
//! parallel without sharing state.
//!
//!   cargo test --test integration

mod directory;
mod failures;
mod messaging;

use std::time::Duration;

pub use anyhow::{Context, Result};
pub use serde_json::{json, Value};
pub use switchboard_core::config::SwitchboardConfig;
pub use switchboardd::{Node, Role};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const LOOPBACK: &str = "127.0.0.1";

pub async fn bind_ephemeral() -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((LOOPBACK, 0))
        .await
        .context("failed to bind ephemeral port")
}

/// Config tuned for tests: short timeouts, fast registration retries.
pub fn test_config(directory_port: u16) -> SwitchboardConfig {
    let mut config = SwitchboardConfig::default();
    config.directory.port = directory_port;
    config.directory.register_attempts = 5;
    config.directory.register_backoff_ms = 20;
    config.relay.attempt_timeout_ms = 1_000;
    config
}

pub async fn start_directory() -> Result<Node> {
    let listener = bind_ephemeral().await?;
    let port = listener.local_addr()?.port();
    Node::start_on(listener, &test_config(port), Role::Directory).await
}

pub async fn start_peer(directory_port: u16, id: &str, name: &str) -> Result<Node> {
    start_peer_with(test_config(directory_port), id, name).await
}

pub async fn start_peer_with(mut config: SwitchboardConfig, id: &str, name: &str) -> Result<Node> {
    config.node.id = id.to_string();
    config.node.name = name.to_string();
    Node::start_on(bind_ephemeral().await?, &config, Role::Peer).await
}

pub fn url(port: u16, path: &str) -> String {
    format!("http://{LOOPBACK}:{port}{path}")
}

pub async fn api_get(port: u16, path: &str) -> Result<(u16, Value)> {
    let resp = reqwest::get(url(port, path)).await?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await?))
}

/// POST a JSON body; returns the status and the raw response text.
pub async fn api_post(port: u16, path: &str, body: &Value) -> Result<(u16, String)> {
    let resp = reqwest::Client::new()
        .post(url(port, path))
        .json(body)
        .send()
        .await?;
    let status = resp.status().as_u16();
    Ok((status, resp.text().await?))
}

pub async fn connected_ids(directory_port: u16) -> Result<Vec<String>> {
    let (status, body) = api_get(directory_port, "/clients/connected").await?;
    anyhow::ensure!(status == 200, "unexpected status {status}");
    Ok(body
        .as_array()
        .context("connected clients should be an array")?
        .iter()
        .filter_map(|c| c["id"].as_str().map(str::to_string))
        .collect())
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> Result<()>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    anyhow::bail!("condition not met within {timeout:?}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_directory_reports_status() -> Result<()> {
    let directory = start_directory().await?;
    let (status, body) = api_get(directory.port(), "/status").await?;

    assert_eq!(status, 200);
    assert_eq!(body["role"], "directory");
    assert_eq!(body["registered_peers"], 0);
    assert_eq!(body["http_port"], directory.port());

    directory.stop().await
}

#[tokio::test]
async fn test_peer_reports_status() -> Result<()> {
    let directory = start_directory().await?;
    let peer = start_peer(directory.port(), "p1", "Alice").await?;

    let (status, body) = api_get(peer.port(), "/status").await?;
    assert_eq!(status, 200);
    assert_eq!(body["role"], "peer");
    assert_eq!(body["id"], "p1");
    assert_eq!(body["name"], "Alice");
    assert!(body["registered_peers"].is_null());

    peer.stop().await?;
    directory.stop().await
}
