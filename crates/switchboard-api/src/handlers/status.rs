//! /status handler.

use axum::extract::State;
use axum::Json;

use switchboard_core::wire::StatusResponse;

use super::ApiState;

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let role = if state.directory.is_local() {
        "directory"
    } else {
        "peer"
    };

    Json(StatusResponse {
        id: state.node.id.clone(),
        name: state.node.name.clone(),
        role: role.to_string(),
        http_port: state.node.http_port,
        registered_peers: state.directory.local_len(),
        inbox_messages: state.inbox.count(),
    })
}
