//! /clients handlers — directory listing and membership.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::Json;

use switchboard_core::wire::{ClientParams, DeregisterAck, DeregisterRequest, RegisterAck};
use switchboard_services::Peer;

use super::{error_response, json_body, require_directory, ApiError, ApiState};

// ── /clients/connected (GET) ──────────────────────────────────────────────────

pub async fn handle_connected(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ClientParams>>, ApiError> {
    let peers = state.directory.list().await.map_err(error_response)?;
    Ok(Json(peers.iter().map(Peer::to_params).collect()))
}

// ── /clients/register (POST) ──────────────────────────────────────────────────

pub async fn handle_register(
    State(state): State<ApiState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    payload: Result<Json<ClientParams>, JsonRejection>,
) -> Result<Json<RegisterAck>, ApiError> {
    let registry = require_directory(&state)?;
    let params = json_body(payload)?;

    // Peers that don't advertise a host are reached where they called from.
    let peer = Peer::from_params(params, &remote.ip().to_string());
    let replaced = registry.register(peer).map_err(error_response)?;

    Ok(Json(RegisterAck {
        registered: true,
        replaced,
    }))
}

// ── /clients/deregister (POST) ────────────────────────────────────────────────

pub async fn handle_deregister(
    State(state): State<ApiState>,
    payload: Result<Json<DeregisterRequest>, JsonRejection>,
) -> Result<Json<DeregisterAck>, ApiError> {
    let registry = require_directory(&state)?;
    let request = json_body(payload)?;
    Ok(Json(DeregisterAck {
        removed: registry.deregister(&request.id),
    }))
}
