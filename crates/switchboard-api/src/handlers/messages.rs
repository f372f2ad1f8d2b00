//! /clients/message and /clients/inbox handlers — relay and receipt.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use switchboard_core::wire::{
    DeliveryReportJson, InboundMessage, InboxAck, InboxResponse, MessageToClients,
};
use switchboard_core::SwitchboardError;

use super::{error_response, json_body, ApiError, ApiState};

// ── /clients/message (POST) ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    /// Return per-target outcomes instead of an empty body.
    #[serde(default)]
    pub report: bool,
}

/// Fan a message out to the requested ids.
///
/// Accepted requests answer 200 with an empty body, even when some or all
/// targets failed; failures are logged. With `?report=true` the body
/// carries the per-target outcomes.
pub async fn handle_message(
    State(state): State<ApiState>,
    Query(query): Query<MessageQuery>,
    payload: Result<Json<MessageToClients>, JsonRejection>,
) -> Result<Response, ApiError> {
    let msg = json_body(payload)?;
    msg.validate().map_err(error_response)?;

    let result = state
        .relay
        .send(&msg.ids, &msg.text, Some(&state.node.id), state.send_deadline)
        .await;

    let report = match result {
        Ok(report) => report.to_json(),
        Err(SwitchboardError::AllTargetsFailed { failures }) => {
            tracing::warn!(targets = failures.len(), "message reached no targets");
            DeliveryReportJson::from_failures(&failures)
        }
        Err(e) => return Err(error_response(e)),
    };

    if query.report {
        Ok(Json(report).into_response())
    } else {
        Ok(().into_response())
    }
}

// ── /clients/inbox (POST) ─────────────────────────────────────────────────────

pub async fn handle_inbox_deliver(
    State(state): State<ApiState>,
    payload: Result<Json<InboundMessage>, JsonRejection>,
) -> Result<Json<InboxAck>, ApiError> {
    let inbound = json_body(payload)?;
    let stored = state.inbox.receive(inbound);
    tracing::info!(
        from = stored.from.as_deref().unwrap_or("-"),
        text = %stored.text,
        "message delivered to inbox"
    );
    Ok(Json(InboxAck {
        msg_id: stored.msg_id,
    }))
}

// ── /clients/inbox (GET) ──────────────────────────────────────────────────────

pub async fn handle_inbox_list(State(state): State<ApiState>) -> Json<InboxResponse> {
    Json(InboxResponse {
        messages: state.inbox.all(),
    })
}
