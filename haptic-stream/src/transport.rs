//! Transport seam between the session workers and the wire.
//!
//! The workers only ever see ordered, reliable, framed text delivery. The
//! read and write halves are separate traits because they end up owned by
//! different tasks: the read loop owns the source, the write worker owns
//! the sink.

use async_trait::async_trait;

use crate::error::TransportError;

/// Read half of a framed duplex connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Block until the next text frame arrives.
    ///
    /// Returns [`TransportError::Closed`] once the peer is gone; any error
    /// is terminal for the connection.
    async fn next_frame(&mut self) -> Result<String, TransportError>;
}

/// Write half of a framed duplex connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one text frame.
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError>;

    /// Send a transport-level close to the peer and flush it.
    async fn close(&mut self) -> Result<(), TransportError>;
}
