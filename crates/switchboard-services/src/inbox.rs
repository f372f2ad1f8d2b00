use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use switchboard_core::wire::{message_id, InboundMessage, InboxMessage};

/// Capacity of the receipt notification channel. Slow subscribers lag
/// rather than block delivery.
const NOTIFY_CAPACITY: usize = 64;

/// Key for messages that arrived without a sender id.
const ANONYMOUS: &str = "";

/// In-memory store of messages delivered to this peer.
#[derive(Clone)]
pub struct Inbox {
    /// Messages per sender id: sender -> Vec<(arrival sequence, message)>
    messages: Arc<DashMap<String, Vec<(u64, InboxMessage)>>>,
    seq: Arc<AtomicU64>,
    notify: broadcast::Sender<InboxMessage>,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            messages: Arc::new(DashMap::new()),
            seq: Arc::new(AtomicU64::new(0)),
            notify,
        }
    }

    /// Store an inbound message and announce it to subscribers.
    pub fn receive(&self, inbound: InboundMessage) -> InboxMessage {
        let received_at = unix_millis();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let msg = InboxMessage {
            msg_id: message_id(seq, inbound.from.as_deref(), received_at, &inbound.text),
            from: inbound.from,
            text: inbound.text,
            received_at,
        };

        let key = msg.from.clone().unwrap_or_else(|| ANONYMOUS.to_string());
        self.messages
            .entry(key)
            .or_default()
            .push((seq, msg.clone()));

        tracing::debug!(
            msg_id = %msg.msg_id,
            from = msg.from.as_deref().unwrap_or("-"),
            "message received"
        );
        let _ = self.notify.send(msg.clone());
        msg
    }

    /// Every stored message, in arrival order.
    pub fn all(&self) -> Vec<InboxMessage> {
        let mut all: Vec<(u64, InboxMessage)> = self
            .messages
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, m)| m).collect()
    }

    /// Messages relayed by one sender
    pub fn from_sender(&self, sender: &str) -> Vec<InboxMessage> {
        self.messages
            .get(sender)
            .map(|msgs| msgs.iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.messages.iter().map(|e| e.value().len()).sum()
    }

    /// Receive notifications for messages stored after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<InboxMessage> {
        self.notify.subscribe()
    }

    pub fn clear(&self) {
        self.messages.clear();
    }
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
