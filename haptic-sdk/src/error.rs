//! Error types for the haptic-sdk crate.

use haptic_stream::{SendError, TransportError};

/// Errors surfaced by [`Client`](crate::Client) and
/// [`Device`](crate::Device) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server address could not be parsed.
    #[error("invalid server address: {0}")]
    Address(#[from] url::ParseError),

    /// The transport failed. Fatal for the session.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The outbound queue is saturated; the message was not sent. The
    /// caller decides whether to retry or drop.
    #[error("outbound queue full")]
    QueueFull,

    /// The operation was attempted after session shutdown began.
    #[error("session stopped")]
    Stopped,

    /// No correlated reply arrived within the deadline.
    #[error("request timed out")]
    Timeout,

    /// The wait was interrupted by session shutdown.
    #[error("request cancelled by session shutdown")]
    Cancelled,

    /// The connection closed while waiting for a reply.
    #[error("connection closed")]
    ConnectionClosed,

    /// The server replied with something other than the expected message
    /// kind, or with neither Ok nor Error.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The server explicitly rejected the request. Surfaced verbatim,
    /// never retried.
    #[error("server error: {0}")]
    Server(String),

    /// The device does not advertise support for the command.
    #[error("command not supported by device: {0}")]
    Unsupported(&'static str),

    /// A command argument is outside its valid range; nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<SendError> for ClientError {
    fn from(error: SendError) -> Self {
        match error {
            SendError::QueueFull => ClientError::QueueFull,
            SendError::Stopped => ClientError::Stopped,
        }
    }
}
