//! Real-time notification relay.
//!
//! Connected clients subscribe to a channel keyed by their own user id;
//! the message write path publishes an event to the recipient's channel.
//! Delivery is best-effort and at-most-once per connected subscriber:
//! there is no queuing, replay, or acknowledgment. A recipient that is
//! not connected sees the message on its next conversation fetch.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Payload pushed to the recipient when a message is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePush {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub timestamp: String,
}

struct Subscriber {
    conn_id: u64,
    tx: mpsc::UnboundedSender<MessagePush>,
}

#[derive(Default)]
struct Registry {
    next_conn_id: u64,
    channels: HashMap<String, Vec<Subscriber>>,
}

/// Concurrency-safe mapping from subscriber identifier to live connection
/// handles. Registry operations are short and never block, so a sync mutex
/// is safe to take inside async handlers.
#[derive(Clone, Default)]
pub struct Relay {
    registry: Arc<Mutex<Registry>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the channel keyed by `user_id`. The subscription leaves the
    /// registry when the returned value is dropped.
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let conn_id = {
            let mut registry = self.registry.lock().expect("relay registry poisoned");
            let conn_id = registry.next_conn_id;
            registry.next_conn_id += 1;
            registry
                .channels
                .entry(user_id.to_string())
                .or_default()
                .push(Subscriber { conn_id, tx });
            conn_id
        };

        Subscription {
            user_id: user_id.to_string(),
            conn_id,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Push an event to every live subscriber of `user_id`'s channel.
    /// Returns how many subscribers received it; closed handles are pruned.
    pub fn publish(&self, user_id: &str, push: MessagePush) -> usize {
        let mut registry = self.registry.lock().expect("relay registry poisoned");

        let Some(subscribers) = registry.channels.get_mut(user_id) else {
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|sub| match sub.tx.send(push.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });

        if subscribers.is_empty() {
            registry.channels.remove(user_id);
        }

        delivered
    }

    /// Number of live subscribers on a channel. Used by tests and logging.
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        let registry = self.registry.lock().expect("relay registry poisoned");
        registry
            .channels
            .get(user_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

/// One live subscription. Streams pushes for the subscribed channel and
/// unsubscribes on drop.
pub struct Subscription {
    user_id: String,
    conn_id: u64,
    rx: mpsc::UnboundedReceiver<MessagePush>,
    registry: Arc<Mutex<Registry>>,
}

impl Stream for Subscription {
    type Item = MessagePush;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut registry = match self.registry.lock() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(subscribers) = registry.channels.get_mut(&self.user_id) {
            subscribers.retain(|sub| sub.conn_id != self.conn_id);
            if subscribers.is_empty() {
                registry.channels.remove(&self.user_id);
            }
        }
    }
}
