//! Message relay — fans one text out to a set of peers over HTTP.
//!
//! Each target is resolved through the `PeerDirectory` and delivered with a
//! single `POST /clients/inbox`. Deliveries run concurrently and fail
//! independently: an unknown id, a dead peer, or a slow peer only affects
//! its own outcome.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use switchboard_core::config::RelaySettings;
use switchboard_core::wire::{DeliveryReportJson, InboundMessage, InboxAck, TargetReport};
use switchboard_core::SwitchboardError;

use crate::directory::PeerDirectory;
use crate::http::exchange;
use crate::registry::Peer;

/// Tuning knobs for delivery.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub attempt_timeout: Duration,
    /// Attempts per target, including the first. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Sleep before attempt `n + 1` is `backoff * n`.
    pub backoff: Duration,
    /// Max deliveries in flight per `send`. `None` = one per target.
    pub fanout_limit: Option<usize>,
    /// Deregister a peer after this many consecutive unreachable
    /// deliveries. 0 disables eviction.
    pub evict_after_failures: u32,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::from(&RelaySettings::default())
    }
}

impl From<&RelaySettings> for RelayOptions {
    fn from(s: &RelaySettings) -> Self {
        Self {
            attempt_timeout: s.attempt_timeout(),
            max_attempts: s.max_attempts,
            backoff: s.backoff(),
            fanout_limit: s.fanout_limit(),
            evict_after_failures: s.evict_after_failures,
        }
    }
}

/// A successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Id assigned by the receiving inbox.
    pub msg_id: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub id: String,
    pub result: Result<Delivered, SwitchboardError>,
}

/// Per-target outcomes of one `send`, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.delivered_count()
    }

    /// First outcome recorded for `id`.
    pub fn outcome(&self, id: &str) -> Option<&DeliveryOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    pub fn to_json(&self) -> DeliveryReportJson {
        DeliveryReportJson {
            delivered: self.delivered_count(),
            failed: self.failed_count(),
            outcomes: self
                .outcomes
                .iter()
                .map(|o| match &o.result {
                    Ok(_) => TargetReport {
                        id: o.id.clone(),
                        status: "delivered".to_string(),
                        error: None,
                    },
                    Err(e) => TargetReport {
                        id: o.id.clone(),
                        status: e.kind().to_string(),
                        error: Some(e.to_string()),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct Relay {
    directory: PeerDirectory,
    client: reqwest::Client,
    options: RelayOptions,
    /// Consecutive unreachable deliveries per peer id.
    failures: Arc<DashMap<String, u32>>,
}

impl Relay {
    pub fn new(directory: PeerDirectory, options: RelayOptions) -> Self {
        Self {
            directory,
            client: reqwest::Client::new(),
            options,
            failures: Arc::new(DashMap::new()),
        }
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    /// Deliver `text` to every id in `targets`.
    ///
    /// `sender` is stamped into the delivered message. When `deadline`
    /// elapses, deliveries still in flight are abandoned and reported as
    /// `Timeout`; finished ones keep their outcome.
    ///
    /// Fails with `Validation` for an empty target list and with
    /// `AllTargetsFailed` when no target received the message.
    pub async fn send(
        &self,
        targets: &[String],
        text: &str,
        sender: Option<&str>,
        deadline: Option<Duration>,
    ) -> Result<DeliveryReport, SwitchboardError> {
        if targets.is_empty() {
            return Err(SwitchboardError::validation("target list must not be empty"));
        }

        let deadline = deadline.map(|d| (Instant::now() + d, d));
        let semaphore = self.options.fanout_limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        let body = InboundMessage {
            text: text.to_string(),
            from: sender.map(str::to_string),
        };

        let resolved = self.resolve(targets, deadline).await;

        let deliveries = targets.iter().zip(resolved).map(|(id, peer)| {
            let body = &body;
            let semaphore = semaphore.clone();
            async move {
                let result = match peer {
                    Ok(peer) => {
                        let result = self.deliver(&peer, body, semaphore, deadline).await;
                        self.track_liveness(&peer, &result).await;
                        result
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    tracing::warn!(peer = %id, error = %e, "delivery failed");
                }
                DeliveryOutcome {
                    id: id.clone(),
                    result,
                }
            }
        });

        let report = DeliveryReport {
            outcomes: join_all(deliveries).await,
        };

        tracing::info!(
            targets = targets.len(),
            delivered = report.delivered_count(),
            failed = report.failed_count(),
            "relay send complete"
        );

        if report.delivered_count() == 0 {
            return Err(SwitchboardError::AllTargetsFailed {
                failures: report
                    .outcomes
                    .into_iter()
                    .filter_map(|o| o.result.err().map(|e| (o.id, e)))
                    .collect(),
            });
        }
        Ok(report)
    }

    /// Look up every target. A lookup still running at the caller's deadline
    /// is abandoned and every target reports `Timeout`.
    async fn resolve(
        &self,
        targets: &[String],
        deadline: Option<(Instant, Duration)>,
    ) -> Vec<Result<Peer, SwitchboardError>> {
        let Some((at, total)) = deadline else {
            return self.directory.resolve_all(targets).await;
        };
        match tokio::time::timeout_at(at, self.directory.resolve_all(targets)).await {
            Ok(resolved) => resolved,
            Err(_) => {
                let err = SwitchboardError::Timeout {
                    url: self.directory.lookup_url(),
                    after_ms: total.as_millis() as u64,
                };
                tracing::warn!(error = %err, "target lookup missed the send deadline");
                targets.iter().map(|_| Err(err.clone())).collect()
            }
        }
    }

    /// One target: wait for a fan-out slot, then deliver with retries,
    /// all bounded by the caller's deadline.
    async fn deliver(
        &self,
        peer: &Peer,
        body: &InboundMessage,
        semaphore: Option<Arc<Semaphore>>,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<Delivered, SwitchboardError> {
        let url = peer.inbox_url();
        let work = async {
            // Never closed; a failed acquire would only lift the limit.
            let _permit = match &semaphore {
                Some(s) => s.acquire().await.ok(),
                None => None,
            };
            self.deliver_with_retry(&url, body).await
        };

        match deadline {
            Some((at, total)) => tokio::time::timeout_at(at, work)
                .await
                .unwrap_or_else(|_| {
                    Err(SwitchboardError::Timeout {
                        url: url.clone(),
                        after_ms: total.as_millis() as u64,
                    })
                }),
            None => work.await,
        }
    }

    async fn deliver_with_retry(
        &self,
        url: &str,
        body: &InboundMessage,
    ) -> Result<Delivered, SwitchboardError> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let request = self.client.post(url).json(body);
            match exchange::<InboxAck>(request, url, self.options.attempt_timeout).await {
                Ok(ack) => {
                    tracing::debug!(url, attempt, msg_id = %ack.msg_id, "delivered");
                    return Ok(Delivered {
                        msg_id: ack.msg_id,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::debug!(url, attempt, error = %e, "delivery attempt failed, retrying");
                    tokio::time::sleep(self.options.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Count consecutive unreachable deliveries and evict the peer once the
    /// configured threshold is hit.
    async fn track_liveness(&self, peer: &Peer, result: &Result<Delivered, SwitchboardError>) {
        let threshold = self.options.evict_after_failures;
        if threshold == 0 {
            return;
        }

        match result {
            Err(SwitchboardError::Unreachable { .. }) => {
                let count = {
                    let mut entry = self.failures.entry(peer.id.clone()).or_insert(0);
                    *entry += 1;
                    *entry
                };
                if count >= threshold {
                    self.failures.remove(&peer.id);
                    match self.directory.deregister(&peer.id).await {
                        Ok(_) => tracing::warn!(
                            peer = %peer.id,
                            failures = count,
                            "evicted unreachable peer"
                        ),
                        Err(e) => tracing::warn!(
                            peer = %peer.id,
                            error = %e,
                            "failed to evict unreachable peer"
                        ),
                    }
                }
            }
            Ok(_) => {
                self.failures.remove(&peer.id);
            }
            Err(_) => {}
        }
    }
}
