//! Error types for the haptic-stream crate.

/// Errors from the transport primitives.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is closed, whether cleanly or underneath us. Fatal to
    /// the session; workers seeing it exit instead of retrying.
    #[error("connection closed")]
    Closed,

    /// The transport failed mid-operation.
    #[error("transport error: {0}")]
    Io(String),
}

/// Errors from [`OutboundQueue::send`](crate::OutboundQueue::send).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The bounded write buffer is saturated. The message was not queued;
    /// the caller decides whether to retry or drop.
    #[error("outbound queue full")]
    QueueFull,

    /// Shutdown has begun; no further messages are accepted.
    #[error("sender stopped")]
    Stopped,
}

/// Errors from [`Hub`](crate::Hub) operations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub has been stopped and accepts no new subscriptions.
    #[error("hub stopped")]
    Stopped,
}
