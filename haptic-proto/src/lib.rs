//! Wire message model for the haptic control protocol.
//!
//! The protocol is a framed JSON exchange over a single duplex connection:
//! every text frame holds a JSON array of single-key objects, the key naming
//! the message kind. This crate owns the message vocabulary, the frame codec
//! boundary, and the correlation-ID generator. It knows nothing about
//! transports or sessions.

mod id;
mod message;

pub use id::MessageIdCounter;
pub use message::{
    decode_frame, encode_frame, log_level, ClientMessage, DeviceInfo, DeviceList, Empty,
    ErrorMessage, FleshlightLaunchFW12Cmd, KiirooCmd, LogEntry, LovenseCmd, MessageId, RawCmd,
    RequestLog, RequestServerInfo, ServerInfo, ServerMessage, SingleMotorVibrateCmd, Test,
    VorzeA10CycloneCmd,
};
