//! Broadcast hub fanning the inbound message stream out to subscribers.
//!
//! A single owner task serializes every hub operation through its mailbox,
//! so the registry needs no locking and all subscribers observe published
//! messages in the same relative order. A subscriber that stops draining
//! its bounded queue is evicted rather than allowed to stall delivery to
//! the publisher or to anyone else.

use std::collections::HashMap;

use haptic_proto::ServerMessage;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::error::HubError;

/// Messages buffered per subscription before it is considered unresponsive
/// and evicted.
pub const SUBSCRIPTION_BUFFER: usize = 10;

enum HubOp {
    Publish(ServerMessage),
    Subscribe(oneshot::Sender<Result<(u64, mpsc::Receiver<ServerMessage>), HubError>>),
    Unsubscribe(u64),
    Stop,
    SubscriberCount(oneshot::Sender<usize>),
}

/// Handle to the hub's owner task. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    ops: mpsc::UnboundedSender<HubOp>,
}

/// A consumer's private, ordered view onto the hub's stream.
///
/// Dropping the subscription unregisters it, so every exit path of a
/// waiting consumer cleans up after itself.
#[derive(Debug)]
pub struct Subscription {
    key: u64,
    receiver: mpsc::Receiver<ServerMessage>,
    ops: mpsc::UnboundedSender<HubOp>,
}

impl Hub {
    /// Start the owner task and return a handle to it.
    pub fn new() -> Self {
        let (ops, ops_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(ops_rx));
        Self { ops }
    }

    /// Deliver `message` to every live subscription, in publish order.
    ///
    /// Never blocks on a slow consumer: a subscription whose buffer is full
    /// is closed and removed instead. No-op once the hub is stopped.
    pub fn publish(&self, message: ServerMessage) {
        let _ = self.ops.send(HubOp::Publish(message));
    }

    /// Register a new subscription.
    ///
    /// Fails with [`HubError::Stopped`] once [`stop`](Hub::stop) has run.
    pub async fn subscribe(&self) -> Result<Subscription, HubError> {
        let (reply, response) = oneshot::channel();
        self.ops
            .send(HubOp::Subscribe(reply))
            .map_err(|_| HubError::Stopped)?;
        let (key, receiver) = response.await.map_err(|_| HubError::Stopped)??;
        Ok(Subscription {
            key,
            receiver,
            ops: self.ops.clone(),
        })
    }

    /// Close every live subscription and refuse new ones. Idempotent.
    pub fn stop(&self) {
        let _ = self.ops.send(HubOp::Stop);
    }

    /// Number of currently registered subscriptions, for diagnostics.
    pub async fn subscriber_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        if self.ops.send(HubOp::SubscriberCount(reply)).is_err() {
            return 0;
        }
        response.await.unwrap_or(0)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    /// Next message, in publish order.
    ///
    /// `None` means the hub closed this subscription: either a hub-wide
    /// stop or a slow-consumer eviction. The two are indistinguishable to
    /// the consumer.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.ops.send(HubOp::Unsubscribe(self.key));
    }
}

/// Owner task: processes one operation at a time until every handle and
/// subscription is gone.
async fn run(mut ops: mpsc::UnboundedReceiver<HubOp>) {
    let mut registry: HashMap<u64, mpsc::Sender<ServerMessage>> = HashMap::new();
    let mut next_key: u64 = 0;
    let mut stopped = false;

    while let Some(op) = ops.recv().await {
        match op {
            HubOp::Publish(message) => {
                if stopped {
                    continue;
                }
                registry.retain(|key, queue| match queue.try_send(message.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(subscription = *key, "evicting unresponsive subscriber");
                        false
                    }
                    Err(TrySendError::Closed(_)) => false,
                });
            }
            HubOp::Subscribe(reply) => {
                if stopped {
                    let _ = reply.send(Err(HubError::Stopped));
                    continue;
                }
                let (queue, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
                let key = next_key;
                next_key += 1;
                // Register only if the subscriber is still waiting.
                if reply.send(Ok((key, receiver))).is_ok() {
                    registry.insert(key, queue);
                }
            }
            HubOp::Unsubscribe(key) => {
                registry.remove(&key);
            }
            HubOp::Stop => {
                if !stopped {
                    tracing::debug!(subscribers = registry.len(), "stopping hub");
                }
                stopped = true;
                registry.clear();
            }
            HubOp::SubscriberCount(reply) => {
                let _ = reply.send(registry.len());
            }
        }
    }
}
