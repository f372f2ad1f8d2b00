//! Peer directory access — local registry or a remote directory peer.
//!
//! The directory peer owns the `PeerRegistry`; every other peer reaches it
//! over HTTP through `DirectoryClient`. `PeerDirectory` lets the relay and
//! the API treat both the same way.

use std::time::Duration;

use switchboard_core::wire::{
    paths, ClientParams, DeregisterAck, DeregisterRequest, RegisterAck, DEFAULT_HOST,
};
use switchboard_core::SwitchboardError;

use crate::http::exchange;
use crate::registry::{Peer, PeerRegistry};

/// Default timeout for calls into the directory.
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(3);

// ── Remote client ─────────────────────────────────────────────────────────────

/// HTTP client for a directory peer.
#[derive(Clone)]
pub struct DirectoryClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl DirectoryClient {
    /// `base_url` is e.g. `http://127.0.0.1:8081`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: DIRECTORY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register(&self, params: &ClientParams) -> Result<RegisterAck, SwitchboardError> {
        let url = format!("{}{}", self.base_url, paths::REGISTER);
        exchange(self.client.post(&url).json(params), &url, self.timeout).await
    }

    pub async fn deregister(&self, id: &str) -> Result<DeregisterAck, SwitchboardError> {
        let url = format!("{}{}", self.base_url, paths::DEREGISTER);
        let body = DeregisterRequest { id: id.to_string() };
        exchange(self.client.post(&url).json(&body), &url, self.timeout).await
    }

    pub async fn connected(&self) -> Result<Vec<ClientParams>, SwitchboardError> {
        let url = self.connected_url();
        exchange(self.client.get(&url), &url, self.timeout).await
    }

    pub fn connected_url(&self) -> String {
        format!("{}{}", self.base_url, paths::CONNECTED)
    }

    /// Register, retrying until the directory acknowledges.
    ///
    /// Sleeps `backoff * attempt` between tries. Only unreachable and
    /// timed-out attempts are retried; a rejection from the directory is
    /// returned immediately. Returns the last error once `attempts` are exhausted.
    pub async fn register_until_acknowledged(
        &self,
        params: &ClientParams,
        attempts: u32,
        backoff: Duration,
    ) -> Result<RegisterAck, SwitchboardError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.register(params).await {
                Ok(ack) => return Ok(ack),
                Err(e) if attempt < attempts && e.is_transient() => {
                    tracing::debug!(
                        attempt,
                        error = %e,
                        directory = %self.base_url,
                        "registration not acknowledged yet"
                    );
                    tokio::time::sleep(backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ── Unified access ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum PeerDirectory {
    /// This process is the directory.
    Local(PeerRegistry),
    /// The directory lives in another peer.
    Remote(DirectoryClient),
}

impl PeerDirectory {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub async fn list(&self) -> Result<Vec<Peer>, SwitchboardError> {
        match self {
            Self::Local(registry) => Ok(registry.list()),
            Self::Remote(client) => Ok(client
                .connected()
                .await?
                .into_iter()
                .map(|p| Peer::from_params(p, DEFAULT_HOST))
                .collect()),
        }
    }

    /// Resolve each id, in order.
    ///
    /// A remote directory is queried once per call. If that query fails,
    /// every id reports the same error.
    pub async fn resolve_all(&self, ids: &[String]) -> Vec<Result<Peer, SwitchboardError>> {
        match self {
            Self::Local(registry) => ids.iter().map(|id| registry.resolve(id)).collect(),
            Self::Remote(_) => match self.list().await {
                Ok(peers) => ids
                    .iter()
                    .map(|id| {
                        peers
                            .iter()
                            .find(|p| &p.id == id)
                            .cloned()
                            .ok_or_else(|| SwitchboardError::not_found(id.as_str()))
                    })
                    .collect(),
                Err(e) => ids.iter().map(|_| Err(e.clone())).collect(),
            },
        }
    }

    pub async fn deregister(&self, id: &str) -> Result<bool, SwitchboardError> {
        match self {
            Self::Local(registry) => Ok(registry.deregister(id)),
            Self::Remote(client) => Ok(client.deregister(id).await?.removed),
        }
    }

    /// Where lookups go, for error reports.
    pub fn lookup_url(&self) -> String {
        match self {
            Self::Local(_) => "local registry".to_string(),
            Self::Remote(client) => client.connected_url(),
        }
    }

    /// Registered peer count, only known locally.
    pub fn local_len(&self) -> Option<usize> {
        match self {
            Self::Local(registry) => Some(registry.len()),
            Self::Remote(_) => None,
        }
    }
}
