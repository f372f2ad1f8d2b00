//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub fn base_url(host: &str, port: u16) -> String {
    format!("http://{}:{}", host, port)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to {} — is the peer running?", url))?;
    decode(url, resp).await
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to {} — is the peer running?", url))?;
    decode(url, resp).await
}

async fn decode<R: for<'de> Deserialize<'de>>(url: &str, resp: reqwest::Response) -> Result<R> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{} returned {}: {}", url, status, body);
    }
    resp.json::<R>().await.context("failed to parse response")
}
