//! HTTP API handlers — directory, relay, and inbox endpoints.

pub mod clients;
pub mod messages;
pub mod status;

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;

use switchboard_core::SwitchboardError;
use switchboard_services::{Inbox, PeerDirectory, Relay};

/// Identity of the peer serving this API.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: String,
    pub name: String,
    pub http_port: u16,
}

#[derive(Clone)]
pub struct ApiState {
    pub node: NodeInfo,
    /// Local registry when this peer is the directory, a client otherwise.
    pub directory: PeerDirectory,
    pub relay: Relay,
    pub inbox: Inbox,
    /// Overall deadline applied to each relay send.
    pub send_deadline: Option<Duration>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

pub type ApiError = (StatusCode, String);

/// Map a core error onto an HTTP status. Every upstream failure, a
/// timeout included, is a 502.
fn error_response(e: SwitchboardError) -> ApiError {
    let status = match &e {
        SwitchboardError::Validation(_) => StatusCode::BAD_REQUEST,
        SwitchboardError::NotFound { .. } => StatusCode::NOT_FOUND,
        SwitchboardError::Unreachable { .. }
        | SwitchboardError::Timeout { .. }
        | SwitchboardError::Protocol { .. }
        | SwitchboardError::AllTargetsFailed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

/// Unwrap a JSON body, turning any rejection into a 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|r| error_response(SwitchboardError::validation(r.body_text())))
}

/// Endpoints that only the directory peer serves.
fn require_directory(state: &ApiState) -> Result<&switchboard_services::PeerRegistry, ApiError> {
    match &state.directory {
        PeerDirectory::Local(registry) => Ok(registry),
        PeerDirectory::Remote(client) => Err((
            StatusCode::NOT_FOUND,
            format!("not the directory; register with {}", client.base_url()),
        )),
    }
}

// Re-export handler functions for use in router setup.
pub use clients::{handle_connected, handle_deregister, handle_register};
pub use messages::{handle_inbox_deliver, handle_inbox_list, handle_message};
pub use status::handle_status;
