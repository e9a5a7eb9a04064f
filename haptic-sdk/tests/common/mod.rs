//! Test helpers: a channel-backed transport pair and a scriptable mock
//! server speaking the framed JSON protocol from the other end.

#![allow(dead_code)]

use async_trait::async_trait;
use haptic_proto::{
    ClientMessage, DeviceInfo, DeviceList, Empty, ErrorMessage, ServerInfo, ServerMessage,
};
use haptic_sdk::{Client, ClientError, ConnectOptions};
use haptic_stream::{FrameSink, FrameSource, TransportError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Write half handed to the client; frames land at the mock server.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

/// Read half handed to the client; frames come from the mock server.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<String, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }
}

#[derive(Clone)]
pub struct MockServerConfig {
    /// Advertised maximum ping interval in milliseconds.
    pub max_ping_time: u32,
    /// Device-list snapshot returned during session setup.
    pub devices: Vec<DeviceInfo>,
    /// Message kinds the server never answers.
    pub ignore: Vec<&'static str>,
    /// Message kinds the server answers with an Error reply.
    pub reject: Vec<&'static str>,
    /// Inject unrelated replies before each genuine one.
    pub stray_replies: bool,
    /// Answer the handshake with a plain Ok instead of ServerInfo.
    pub bad_handshake: bool,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            max_ping_time: 0,
            devices: Vec::new(),
            ignore: Vec::new(),
            reject: Vec::new(),
            stray_replies: false,
            bad_handshake: false,
        }
    }
}

/// Handle to the running mock server; used to inject events and to drop
/// the connection.
pub struct MockServer {
    to_client: mpsc::UnboundedSender<String>,
    stop: CancellationToken,
}

impl MockServer {
    /// Push one unsolicited message to the client.
    pub fn send(&self, message: ServerMessage) {
        let frame = serde_json::to_string(&vec![message]).expect("serializable message");
        let _ = self.to_client.send(frame);
    }

    pub fn add_device(&self, info: DeviceInfo) {
        self.send(ServerMessage::DeviceAdded(info));
    }

    pub fn remove_device(&self, index: u32) {
        self.send(ServerMessage::DeviceRemoved(device_info(index, "", &[])));
    }

    pub fn scanning_finished(&self) {
        self.send(ServerMessage::ScanningFinished(Empty { id: 0 }));
    }

    /// Drop the connection from the server side.
    pub fn disconnect(self) {
        self.stop.cancel();
        drop(self.to_client);
    }
}

/// Start a mock server and return the client-side transport halves.
pub fn start(config: MockServerConfig) -> (ChannelSink, ChannelSource, MockServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    let stop = CancellationToken::new();
    tokio::spawn(serve(config, server_rx, server_tx.clone(), stop.clone()));
    (
        ChannelSink { tx: client_tx },
        ChannelSource { rx: client_rx },
        MockServer {
            to_client: server_tx,
            stop,
        },
    )
}

/// Start a mock server and connect a client session over it.
pub async fn connect(
    config: MockServerConfig,
    options: ConnectOptions,
) -> Result<(Client, MockServer), ClientError> {
    let (sink, source, server) = start(config);
    let client = Client::from_transport(sink, source, options).await?;
    Ok((client, server))
}

pub fn device_info(index: u32, name: &str, messages: &[&str]) -> DeviceInfo {
    DeviceInfo {
        id: 0,
        device_name: name.to_string(),
        device_index: index,
        device_messages: messages.iter().map(|m| m.to_string()).collect(),
    }
}

async fn serve(
    config: MockServerConfig,
    mut requests: mpsc::UnboundedReceiver<String>,
    replies: mpsc::UnboundedSender<String>,
    stop: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = stop.cancelled() => return,
            frame = requests.recv() => match frame {
                Some(frame) => frame,
                None => return,
            },
        };
        let messages: Vec<ClientMessage> =
            serde_json::from_str(&frame).expect("client frames decode");
        for message in messages {
            if config.ignore.contains(&message.kind()) {
                continue;
            }
            if config.stray_replies {
                reply(
                    &replies,
                    ServerMessage::Error(ErrorMessage {
                        id: 999_999,
                        error_message: "stray".to_string(),
                    }),
                );
                reply(&replies, ServerMessage::Ok(Empty { id: 999_998 }));
            }
            let id = message.id();
            let response = if config.reject.contains(&message.kind()) {
                ServerMessage::Error(ErrorMessage {
                    id,
                    error_message: "rejected by test server".to_string(),
                })
            } else {
                match &message {
                    ClientMessage::RequestServerInfo(_) if config.bad_handshake => {
                        ServerMessage::Ok(Empty { id })
                    }
                    ClientMessage::RequestServerInfo(_) => ServerMessage::ServerInfo(ServerInfo {
                        id,
                        server_name: "mock-server".to_string(),
                        message_version: 0,
                        major_version: 0,
                        minor_version: 2,
                        build_version: 0,
                        max_ping_time: config.max_ping_time,
                    }),
                    ClientMessage::RequestDeviceList(_) => {
                        ServerMessage::DeviceList(DeviceList {
                            id,
                            devices: config.devices.clone(),
                        })
                    }
                    _ => ServerMessage::Ok(Empty { id }),
                }
            };
            reply(&replies, response);
        }
    }
}

fn reply(tx: &mpsc::UnboundedSender<String>, message: ServerMessage) {
    let frame = serde_json::to_string(&vec![message]).expect("serializable message");
    let _ = tx.send(frame);
}
