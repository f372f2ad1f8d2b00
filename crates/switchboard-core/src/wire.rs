//! HTTP + JSON wire format.
//!
//! `ClientParams` and `MessageToClients` are byte-compatible with the
//! existing peer protocol (`{id, http_port, name}` and `{ids, text}`).
//! The remaining types cover registration, inbound delivery, and
//! per-target delivery reports.

use serde::{Deserialize, Serialize};

use crate::error::SwitchboardError;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Well-known port of the directory peer. Other peers listen on
/// `DEFAULT_DIRECTORY_PORT + index`.
pub const DEFAULT_DIRECTORY_PORT: u16 = 8081;

/// Host assumed for peers that do not advertise one.
pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Route paths served by every peer.
pub mod paths {
    pub const CONNECTED: &str = "/clients/connected";
    pub const MESSAGE: &str = "/clients/message";
    pub const REGISTER: &str = "/clients/register";
    pub const DEREGISTER: &str = "/clients/deregister";
    pub const INBOX: &str = "/clients/inbox";
    pub const STATUS: &str = "/status";
}

// ── Directory ─────────────────────────────────────────────────────────────────

/// One entry of `GET /clients/connected`, also the body of
/// `POST /clients/register`.
///
/// `host` is omitted on the wire for loopback peers so listings stay
/// identical to the plain three-field shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientParams {
    pub id: String,
    pub http_port: u16,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl ClientParams {
    pub fn new(id: impl Into<String>, http_port: u16, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            http_port,
            name: name.into(),
            host: None,
        }
    }

    /// Host to dial, falling back to loopback.
    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAck {
    pub registered: bool,
    /// True when an entry with the same id already existed.
    pub replaced: bool,
}

/// Body of `POST /clients/deregister`. The id travels in the body because
/// ids are arbitrary strings and may not survive as a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregisterRequest {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregisterAck {
    pub removed: bool,
}

// ── Messaging ─────────────────────────────────────────────────────────────────

/// Body of `POST /clients/message`: fan `text` out to every id in `ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToClients {
    pub ids: Vec<String>,
    pub text: String,
}

impl MessageToClients {
    pub fn validate(&self) -> Result<(), SwitchboardError> {
        if self.ids.is_empty() {
            return Err(SwitchboardError::validation("ids must not be empty"));
        }
        if self.ids.iter().any(|id| id.trim().is_empty()) {
            return Err(SwitchboardError::validation("ids must not contain blank entries"));
        }
        Ok(())
    }
}

/// Body the relay POSTs to a target's `/clients/inbox`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub text: String,
    /// Id of the relaying peer, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Acknowledgment returned by `/clients/inbox`. The relay treats anything
/// else as a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxAck {
    pub msg_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub msg_id: String,
    #[serde(default)]
    pub from: Option<String>,
    pub text: String,
    /// Unix timestamp in milliseconds.
    pub received_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboxResponse {
    pub messages: Vec<InboxMessage>,
}

/// `hex(blake3(seq_le || from || received_at_le || text))`, truncated to
/// 16 bytes. `seq` is the inbox arrival sequence, so identical messages
/// received in the same millisecond still get distinct ids.
pub fn message_id(seq: u64, from: Option<&str>, received_at: u64, text: &str) -> String {
    let mut h = blake3::Hasher::new();
    h.update(&seq.to_le_bytes());
    h.update(from.unwrap_or_default().as_bytes());
    h.update(&received_at.to_le_bytes());
    h.update(text.as_bytes());
    hex::encode(&h.finalize().as_bytes()[..16])
}

// ── Delivery reports ──────────────────────────────────────────────────────────

/// Per-target outcome as reported by `POST /clients/message?report=true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    pub id: String,
    /// `"delivered"` or the failure kind (`not_found`, `unreachable`, ...).
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReportJson {
    pub delivered: usize,
    pub failed: usize,
    pub outcomes: Vec<TargetReport>,
}

impl DeliveryReportJson {
    pub fn from_failures(failures: &[(String, SwitchboardError)]) -> Self {
        Self {
            delivered: 0,
            failed: failures.len(),
            outcomes: failures
                .iter()
                .map(|(id, e)| TargetReport {
                    id: id.clone(),
                    status: e.kind().to_string(),
                    error: Some(e.to_string()),
                })
                .collect(),
        }
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: String,
    pub name: String,
    /// `"directory"` or `"peer"`.
    pub role: String,
    pub http_port: u16,
    /// Registered peers; only reported by the directory.
    #[serde(default)]
    pub registered_peers: Option<usize>,
    pub inbox_messages: usize,
}
