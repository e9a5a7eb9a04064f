//! Websocket implementation of the transport traits.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::TransportError;
use crate::transport::{FrameSink, FrameSource};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a connected websocket.
pub struct WsFrameSink {
    sink: SplitSink<WsStream, Message>,
}

/// Read half of a connected websocket.
pub struct WsFrameSource {
    stream: SplitStream<WsStream>,
}

/// Dial `addr` (a `ws://` URL) and split the socket into its two halves.
///
/// One connection attempt; a failure here is terminal for the session.
pub async fn connect(addr: &str) -> Result<(WsFrameSink, WsFrameSource), TransportError> {
    let (socket, _response) = connect_async(addr).await.map_err(map_ws_error)?;
    tracing::debug!(addr, "websocket connected");
    let (sink, stream) = socket.split();
    Ok((WsFrameSink { sink }, WsFrameSource { stream }))
}

fn map_ws_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Io(other.to_string()),
    }
}

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                None => return Err(TransportError::Closed),
                Some(Err(error)) => return Err(map_ws_error(error)),
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(_))) => return Err(TransportError::Closed),
                Some(Ok(other)) => {
                    // Pings and pongs are answered by the library; binary
                    // frames have no meaning in this protocol.
                    tracing::debug!(len = other.len(), "ignoring non-text frame");
                }
            }
        }
    }
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(frame.into()))
            .await
            .map_err(map_ws_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(map_ws_error)
    }
}
