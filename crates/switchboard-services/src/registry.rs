//! Peer registry — the directory's record of connected clients.
//!
//! Mutations take the write lock and are serialized; `list` and `resolve`
//! share the read lock and never block each other. No lock is held across
//! an `.await`, so async handlers can call straight in.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use switchboard_core::wire::{paths, ClientParams, DEFAULT_HOST};
use switchboard_core::SwitchboardError;

/// A registered peer and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Chosen by the peer itself; immutable once registered.
    pub id: String,
    pub host: String,
    pub http_port: u16,
    /// Display label, not unique.
    pub name: String,
}

impl Peer {
    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        http_port: u16,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            http_port,
            name: name.into(),
        }
    }

    /// Build from wire params, using `fallback_host` when none was advertised.
    pub fn from_params(params: ClientParams, fallback_host: &str) -> Self {
        let host = params
            .host
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| fallback_host.to_string());
        Self {
            id: params.id,
            host,
            http_port: params.http_port,
            name: params.name,
        }
    }

    pub fn to_params(&self) -> ClientParams {
        ClientParams {
            id: self.id.clone(),
            http_port: self.http_port,
            name: self.name.clone(),
            host: (self.host != DEFAULT_HOST).then(|| self.host.clone()),
        }
    }

    /// `host:port`.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.http_port)
        } else {
            format!("{}:{}", self.host, self.http_port)
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address())
    }

    /// Where the relay delivers messages for this peer.
    pub fn inbox_url(&self) -> String {
        format!("{}{}", self.base_url(), paths::INBOX)
    }

    fn validate(&self) -> Result<(), SwitchboardError> {
        if self.id.trim().is_empty() {
            return Err(SwitchboardError::validation("peer id must not be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(SwitchboardError::validation("peer host must not be empty"));
        }
        if self.http_port == 0 {
            return Err(SwitchboardError::validation("peer http_port must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Entries {
    /// id -> (insertion sequence, peer)
    peers: HashMap<String, (u64, Peer)>,
    next_seq: u64,
}

/// Shared, cloneable handle to one registry instance.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    entries: Arc<RwLock<Entries>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `peer.id`.
    ///
    /// Returns `true` when an existing entry was replaced. A replaced entry
    /// keeps its original position in `list`.
    pub fn register(&self, peer: Peer) -> Result<bool, SwitchboardError> {
        peer.validate()?;

        let mut guard = self.write();
        let Entries { peers, next_seq } = &mut *guard;
        let replaced = match peers.entry(peer.id.clone()) {
            Entry::Occupied(mut slot) => {
                slot.get_mut().1 = peer.clone();
                true
            }
            Entry::Vacant(slot) => {
                slot.insert((*next_seq, peer.clone()));
                *next_seq += 1;
                false
            }
        };
        drop(guard);

        tracing::info!(
            peer = %peer.id,
            name = %peer.name,
            addr = %peer.address(),
            replaced,
            "peer registered"
        );
        Ok(replaced)
    }

    /// Remove the entry for `id`. Absent ids are not an error.
    pub fn deregister(&self, id: &str) -> bool {
        let removed = self.write().peers.remove(id).is_some();
        if removed {
            tracing::info!(peer = %id, "peer deregistered");
        }
        removed
    }

    /// Snapshot of every registered peer, in registration order.
    pub fn list(&self) -> Vec<Peer> {
        let entries = self.read();
        let mut peers: Vec<&(u64, Peer)> = entries.peers.values().collect();
        peers.sort_by_key(|(seq, _)| *seq);
        peers.into_iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn resolve(&self, id: &str) -> Result<Peer, SwitchboardError> {
        self.read()
            .peers
            .get(id)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| SwitchboardError::not_found(id))
    }

    pub fn len(&self) -> usize {
        self.read().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave `Entries` half-updated,
    // so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
