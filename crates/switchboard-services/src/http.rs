//! JSON-over-HTTP exchange shared by the relay and the directory client.
//!
//! Maps transport and decoding failures onto the closed error taxonomy so
//! callers never see a raw `reqwest::Error`.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use switchboard_core::wire::CONTENT_TYPE_JSON;
use switchboard_core::SwitchboardError;

/// Send `request` and decode a JSON body, bounded by `timeout`.
///
/// Non-2xx statuses and undecodable bodies are `Protocol` errors; connect
/// failures are `Unreachable`; running past `timeout` is `Timeout`.
pub async fn exchange<R: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
    timeout: Duration,
) -> Result<R, SwitchboardError> {
    match tokio::time::timeout(timeout, exchange_inner(request, url)).await {
        Ok(result) => result,
        Err(_) => Err(SwitchboardError::Timeout {
            url: url.to_string(),
            after_ms: timeout.as_millis() as u64,
        }),
    }
}

async fn exchange_inner<R: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<R, SwitchboardError> {
    let response = request
        .header(ACCEPT, CONTENT_TYPE_JSON)
        .send()
        .await
        .map_err(|e| classify(url, e))?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| classify(url, e))?;

    if !status.is_success() {
        return Err(SwitchboardError::Protocol {
            url: url.to_string(),
            status: Some(status.as_u16()),
            detail: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    serde_json::from_slice(&body).map_err(|e| SwitchboardError::Protocol {
        url: url.to_string(),
        status: Some(status.as_u16()),
        detail: format!("malformed body: {e}"),
    })
}

fn classify(url: &str, err: reqwest::Error) -> SwitchboardError {
    if err.is_timeout() {
        SwitchboardError::Timeout {
            url: url.to_string(),
            after_ms: 0,
        }
    } else if err.is_decode() || err.is_body() {
        SwitchboardError::Protocol {
            url: url.to_string(),
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    } else {
        SwitchboardError::Unreachable {
            url: url.to_string(),
            cause: err.to_string(),
        }
    }
}
