//! Client SDK for websocket-controlled haptic device servers.
//!
//! A [`Client`] owns one session over a single persistent connection: it
//! performs the handshake, keeps the session alive with periodic pings,
//! mirrors the server's device list, and correlates every request with its
//! reply by message ID. [`Device`] handles execute per-device commands and
//! observe removal.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use haptic_sdk::{Client, ConnectOptions};
//!
//! let client = Client::connect("ws://127.0.0.1:12345", ConnectOptions::default()).await?;
//! client.start_scanning().await?;
//! client.wait_on_scanning(Duration::from_secs(10)).await?;
//! for device in client.devices() {
//!     println!("found {device}");
//! }
//! client.close().await;
//! ```

mod client;
mod device;
mod error;

pub use client::{Client, ConnectOptions, DEFAULT_CLIENT_NAME};
pub use device::{
    Device, COMMAND_FLESHLIGHT_LAUNCH_FW12, COMMAND_KIIROO, COMMAND_LOVENSE, COMMAND_RAW,
    COMMAND_SINGLE_MOTOR_VIBRATE, COMMAND_STOP_DEVICE, COMMAND_VORZE_A10_CYCLONE,
};
pub use error::ClientError;

pub use haptic_proto as proto;
