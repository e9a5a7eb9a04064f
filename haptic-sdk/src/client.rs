//! Session client: handshake, correlation, keep-alive, device lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use haptic_proto::{
    ClientMessage, DeviceInfo, Empty, MessageId, MessageIdCounter, RequestServerInfo,
    ServerMessage,
};
use haptic_stream::{spawn_reader, ws, FrameSink, FrameSource, Hub, OutboundQueue};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::device::Device;
use crate::error::ClientError;

/// Client name advertised when [`ConnectOptions`] does not override it.
pub const DEFAULT_CLIENT_NAME: &str = "haptic-sdk";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ping interval used when the server does not advertise a maximum.
const FALLBACK_PING_INTERVAL: Duration = Duration::from_secs(1);

/// Session configuration.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Client name sent to the server during the handshake.
    pub client_name: String,
    /// Deadline applied to every request awaiting its correlated reply.
    pub request_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// A session with a haptic device server.
///
/// Cheap to clone; all clones drive the same session. Methods may be called
/// from any task. [`close`](Client::close) is idempotent and safe to call
/// concurrently.
#[derive(Clone)]
pub struct Client {
    inner: Arc<SessionInner>,
}

pub(crate) struct DeviceEntry {
    pub(crate) info: DeviceInfo,
    /// Fires at most once, when the server reports the device removed.
    pub(crate) removed: CancellationToken,
}

pub(crate) struct SessionInner {
    ids: MessageIdCounter,
    pub(crate) hub: Hub,
    outbound: OutboundQueue,
    devices: RwLock<HashMap<u32, DeviceEntry>>,
    /// Session-ended signal: cancelled by the reader on transport failure,
    /// by keep-alive on ping failure, and by explicit close. Every blocking
    /// wait observes it.
    pub(crate) shutdown: CancellationToken,
    teardown_done: Mutex<bool>,
    request_timeout: Duration,
}

impl Client {
    /// Connect to a server and initialize the session: handshake, ping
    /// schedule, device-list snapshot, lifecycle watcher.
    ///
    /// One connection attempt; failure is terminal for this session.
    pub async fn connect(addr: &str, options: ConnectOptions) -> Result<Self, ClientError> {
        let addr = url::Url::parse(addr)?;
        let (sink, source) = ws::connect(addr.as_str()).await?;
        Self::from_transport(sink, source, options).await
    }

    /// Run a session over an already-established transport.
    ///
    /// This is the seam [`connect`](Client::connect) goes through; tests
    /// and alternative transports can drive a session without a socket.
    pub async fn from_transport(
        sink: impl FrameSink,
        source: impl FrameSource,
        options: ConnectOptions,
    ) -> Result<Self, ClientError> {
        let hub = Hub::new();
        let shutdown = CancellationToken::new();
        let outbound = OutboundQueue::new(sink);
        spawn_reader(source, hub.clone(), shutdown.clone());

        let inner = Arc::new(SessionInner {
            ids: MessageIdCounter::new(),
            hub,
            outbound,
            devices: RwLock::new(HashMap::new()),
            shutdown,
            teardown_done: Mutex::new(false),
            request_timeout: options.request_timeout,
        });

        // Whatever raises the session-ended signal, exactly one teardown
        // runs: reader failure and keep-alive failure funnel through here,
        // explicit close tears down directly.
        let watchdog = Arc::clone(&inner);
        tokio::spawn(async move {
            watchdog.shutdown.cancelled().await;
            watchdog.teardown().await;
        });

        let client = Client { inner };
        if let Err(error) = client.init_session(&options.client_name).await {
            client.close().await;
            return Err(error);
        }
        if let Err(error) = client.init_device_list().await {
            client.close().await;
            return Err(error);
        }
        Ok(client)
    }

    /// Handshake: exchange RequestServerInfo/ServerInfo and start the
    /// keep-alive loop at half the advertised max ping interval.
    async fn init_session(&self, client_name: &str) -> Result<(), ClientError> {
        let reply = self
            .inner
            .request(|id| {
                ClientMessage::RequestServerInfo(RequestServerInfo {
                    id,
                    client_name: client_name.to_string(),
                })
            })
            .await?;
        let info = match reply {
            ServerMessage::ServerInfo(info) => info,
            other => {
                return Err(ClientError::ProtocolViolation(format!(
                    "expected ServerInfo, got {}",
                    other.kind()
                )))
            }
        };
        let version = format!(
            "{}.{}.{}",
            info.major_version, info.minor_version, info.build_version
        );
        tracing::info!(
            server = %info.server_name,
            version = %version,
            max_ping_time = info.max_ping_time,
            "connected to server"
        );

        let interval = if info.max_ping_time > 0 {
            Duration::from_millis(u64::from(info.max_ping_time / 2))
        } else {
            FALLBACK_PING_INTERVAL
        };
        tokio::spawn(keepalive_loop(Arc::clone(&self.inner), interval));
        Ok(())
    }

    /// Sync the device table with the server and start the lifecycle
    /// watcher.
    async fn init_device_list(&self) -> Result<(), ClientError> {
        // Subscribe before requesting the snapshot so an add/remove racing
        // the reply is buffered rather than missed.
        let events = self
            .inner
            .hub
            .subscribe()
            .await
            .map_err(|_| ClientError::Stopped)?;

        let reply = self
            .inner
            .request(|id| ClientMessage::RequestDeviceList(Empty { id }))
            .await?;
        let list = match reply {
            ServerMessage::DeviceList(list) => list,
            other => {
                return Err(ClientError::ProtocolViolation(format!(
                    "expected DeviceList, got {}",
                    other.kind()
                )))
            }
        };
        for info in list.devices {
            self.inner.insert_device(info);
        }

        tokio::spawn(lifecycle_loop(Arc::clone(&self.inner), events));
        Ok(())
    }

    /// Ask the server to start scanning for devices on every bus it knows.
    pub async fn start_scanning(&self) -> Result<(), ClientError> {
        self.inner
            .command(|id| ClientMessage::StartScanning(Empty { id }))
            .await
    }

    /// Ask the server to stop scanning. Useful for buses like Bluetooth
    /// that may never time out on their own.
    pub async fn stop_scanning(&self) -> Result<(), ClientError> {
        self.inner
            .command(|id| ClientMessage::StopScanning(Empty { id }))
            .await
    }

    /// Wait until the server reports scanning finished on every bus.
    ///
    /// Observes the event on its own subscription; other waiters see the
    /// same event independently.
    pub async fn wait_on_scanning(&self, timeout: Duration) -> Result<(), ClientError> {
        let mut events = self
            .inner
            .hub
            .subscribe()
            .await
            .map_err(|_| ClientError::Stopped)?;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                message = events.recv() => match message {
                    Some(ServerMessage::ScanningFinished(_)) => return Ok(()),
                    Some(_) => {}
                    None => return Err(ClientError::ConnectionClosed),
                },
                _ = self.inner.shutdown.cancelled() => return Err(ClientError::Cancelled),
                _ = &mut deadline => return Err(ClientError::Timeout),
            }
        }
    }

    /// Tell the server to stop all devices. Useful for emergencies and for
    /// cleanup on shutdown.
    pub async fn stop_all_devices(&self) -> Result<(), ClientError> {
        self.inner
            .command(|id| ClientMessage::StopAllDevices(Empty { id }))
            .await
    }

    /// Handles for every device currently known to the session.
    pub fn devices(&self) -> Vec<Device> {
        self.inner
            .devices
            .read()
            .map(|table| {
                table
                    .values()
                    .map(|entry| Device::new(Arc::clone(&self.inner), entry))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Handle for the device at `index`, if the server still reports it
    /// connected.
    pub fn device(&self, index: u32) -> Option<Device> {
        self.inner
            .devices
            .read()
            .ok()?
            .get(&index)
            .map(|entry| Device::new(Arc::clone(&self.inner), entry))
    }

    /// Number of live hub subscriptions, for diagnostics.
    pub async fn subscription_count(&self) -> usize {
        self.inner.hub.subscriber_count().await
    }

    /// Close the session: stop the writer (draining queued messages and
    /// closing the transport), stop the hub, and wake every waiter.
    ///
    /// Idempotent; concurrent calls all return once the single teardown
    /// has finished.
    pub async fn close(&self) {
        self.inner.teardown().await;
    }
}

impl SessionInner {
    /// Send a request built around a fresh correlation ID and wait for the
    /// reply bearing that ID.
    pub(crate) async fn request<F>(&self, build: F) -> Result<ServerMessage, ClientError>
    where
        F: FnOnce(MessageId) -> ClientMessage,
    {
        let id = self.ids.generate();
        // Subscribe before sending so a fast reply cannot slip past us.
        let mut replies = self
            .hub
            .subscribe()
            .await
            .map_err(|_| ClientError::Stopped)?;
        self.outbound.send(build(id))?;

        let deadline = tokio::time::sleep(self.request_timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                message = replies.recv() => match message {
                    Some(message) if message.id() == id => return Ok(message),
                    Some(_) => {}
                    None => return Err(ClientError::ConnectionClosed),
                },
                _ = self.shutdown.cancelled() => return Err(ClientError::Cancelled),
                _ = &mut deadline => return Err(ClientError::Timeout),
            }
        }
        // The subscription unregisters on drop, on every exit path.
    }

    /// Request expecting a generic acknowledgement: Ok is success, Error is
    /// the server rejecting the request, anything else is a protocol
    /// violation.
    pub(crate) async fn command<F>(&self, build: F) -> Result<(), ClientError>
    where
        F: FnOnce(MessageId) -> ClientMessage,
    {
        match self.request(build).await? {
            ServerMessage::Ok(_) => Ok(()),
            ServerMessage::Error(e) => Err(ClientError::Server(e.error_message)),
            other => Err(ClientError::ProtocolViolation(format!(
                "expected Ok or Error, got {}",
                other.kind()
            ))),
        }
    }

    fn insert_device(&self, info: DeviceInfo) {
        match self.devices.write() {
            Ok(mut table) => {
                tracing::info!(name = %info.device_name, index = info.device_index, "device added");
                table.insert(
                    info.device_index,
                    DeviceEntry {
                        info,
                        removed: CancellationToken::new(),
                    },
                );
            }
            Err(_) => tracing::error!("device table lock poisoned"),
        }
    }

    fn remove_device(&self, index: u32) {
        let entry = match self.devices.write() {
            Ok(mut table) => table.remove(&index),
            Err(_) => {
                tracing::error!("device table lock poisoned");
                return;
            }
        };
        // Signal outside the lock.
        if let Some(entry) = entry {
            tracing::info!(name = %entry.info.device_name, index, "device removed");
            entry.removed.cancel();
        }
    }

    /// The single teardown sequence. Late and concurrent callers wait for
    /// the first one to finish, then return.
    pub(crate) async fn teardown(&self) {
        let mut done = self.teardown_done.lock().await;
        if *done {
            return;
        }
        tracing::info!("closing session");
        // Wake the reader, keep-alive, and every waiter first.
        self.shutdown.cancel();
        // Drain queued messages and close the transport.
        self.outbound.stop().await;
        // Close every subscription; outstanding waiters see the end.
        self.hub.stop();
        *done = true;
        tracing::info!("session closed");
    }
}

/// Periodic liveness probe. A failed ping is fatal to the session; an
/// explicit close ends the loop silently.
async fn keepalive_loop(inner: Arc<SessionInner>, interval: Duration) {
    tracing::debug!(?interval, "keep-alive loop started");
    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        if let Err(error) = inner.command(|id| ClientMessage::Ping(Empty { id })).await {
            if inner.shutdown.is_cancelled() {
                // The session is closing anyway; not an error.
                return;
            }
            tracing::error!(%error, "keep-alive failed, closing session");
            inner.shutdown.cancel();
            return;
        }
    }
}

/// Applies device add/remove events to the table until the hub closes the
/// subscription.
async fn lifecycle_loop(inner: Arc<SessionInner>, mut events: haptic_stream::Subscription) {
    while let Some(message) = events.recv().await {
        match message {
            ServerMessage::DeviceAdded(info) => inner.insert_device(info),
            ServerMessage::DeviceRemoved(info) => inner.remove_device(info.device_index),
            _ => {}
        }
    }
    tracing::debug!("device lifecycle watcher stopped");
}
