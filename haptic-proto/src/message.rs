//! Message types and the frame codec boundary.
//!
//! `ServerMessage` and `ClientMessage` are the two halves of the protocol
//! vocabulary. Externally-tagged serde enums reproduce the wire shape
//! exactly: `{"Ok":{"Id":1}}`. A frame is a JSON array of such objects.

use serde::{Deserialize, Serialize};

/// Correlation ID linking a request to its eventual reply.
///
/// 0 is reserved as the "no correlation" sentinel; generated IDs start at 1.
pub type MessageId = u32;

/// Log severity strings understood by `RequestLog`.
pub mod log_level {
    pub const OFF: &str = "Off";
    pub const FATAL: &str = "Fatal";
    pub const ERROR: &str = "Error";
    pub const WARN: &str = "Warn";
    pub const INFO: &str = "Info";
    pub const DEBUG: &str = "Debug";
    pub const TRACE: &str = "Trace";
}

/// Payload for requests and replies that carry nothing but an ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Empty {
    pub id: MessageId,
}

/// The server rejected the correlated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorMessage {
    pub id: MessageId,
    /// Human-readable description of what went wrong on the server.
    pub error_message: String,
}

/// Echo message used for development and testing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Test {
    pub id: MessageId,
    pub test_string: String,
}

/// A forwarded server log line (response to `RequestLog`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    pub id: MessageId,
    pub log_level: String,
    pub log_message: String,
}

/// Ask the server to start forwarding its internal log messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestLog {
    pub id: MessageId,
    /// Highest severity to receive, one of the [`log_level`] strings.
    pub log_level: String,
}

/// Session handshake: register the client and ask for server details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestServerInfo {
    pub id: MessageId,
    /// Client name, for the server to show in its UI if it has one.
    pub client_name: String,
}

/// Server identity and session expectations, sent in reply to
/// [`RequestServerInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    pub id: MessageId,
    pub server_name: String,
    pub message_version: u32,
    pub major_version: u32,
    pub minor_version: u32,
    pub build_version: u32,
    /// Maximum interval between client pings, in milliseconds. 0 means the
    /// server does not enforce pings.
    pub max_ping_time: u32,
}

/// Reply to `RequestDeviceList`: every device the server currently knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceList {
    pub id: MessageId,
    pub devices: Vec<DeviceInfo>,
}

/// A device descriptor, used standalone (`DeviceAdded`, `DeviceRemoved`,
/// `StopDeviceCmd`) and inside a [`DeviceList`] snapshot, where it carries
/// no ID of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "id_is_unset")]
    pub id: MessageId,
    pub device_name: String,
    /// Server-assigned index identifying the device while connected. May be
    /// reused after the device is removed.
    pub device_index: u32,
    /// Command kinds the device accepts, by message name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_messages: Vec<String>,
}

fn id_is_unset(id: &MessageId) -> bool {
    *id == 0
}

/// Send a raw byte string to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCmd {
    pub id: MessageId,
    pub device_index: u32,
    pub command: Vec<u8>,
}

/// Run a vibrating device at a normalized speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SingleMotorVibrateCmd {
    pub id: MessageId,
    pub device_index: u32,
    /// Vibration speed in the range [0.0, 1.0].
    pub speed: f64,
}

/// Kiiroo-style event command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KiirooCmd {
    pub id: MessageId,
    pub device_index: u32,
    /// Command value in the range [0, 4].
    pub command: u8,
}

/// Fleshlight Launch (firmware 1.2) move command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FleshlightLaunchFW12Cmd {
    pub id: MessageId,
    pub device_index: u32,
    /// Target position, range [0, 99].
    pub position: u8,
    /// Movement speed, range [0, 99].
    pub speed: u8,
}

/// Lovense-style text command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LovenseCmd {
    pub id: MessageId,
    pub device_index: u32,
    pub command: String,
}

/// Vorze A10 Cyclone rotation command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VorzeA10CycloneCmd {
    pub id: MessageId,
    pub device_index: u32,
    pub speed: u8,
    /// True for clockwise rotation relative to the device facing the user.
    pub clockwise: bool,
}

/// Every message a server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Ok(Empty),
    Error(ErrorMessage),
    Test(Test),
    Log(LogEntry),
    ServerInfo(ServerInfo),
    ScanningFinished(Empty),
    DeviceList(DeviceList),
    DeviceAdded(DeviceInfo),
    DeviceRemoved(DeviceInfo),
}

impl ServerMessage {
    /// Correlation ID carried by the message. Unsolicited events sent by
    /// the server carry the 0 sentinel.
    pub fn id(&self) -> MessageId {
        match self {
            ServerMessage::Ok(m) => m.id,
            ServerMessage::Error(m) => m.id,
            ServerMessage::Test(m) => m.id,
            ServerMessage::Log(m) => m.id,
            ServerMessage::ServerInfo(m) => m.id,
            ServerMessage::ScanningFinished(m) => m.id,
            ServerMessage::DeviceList(m) => m.id,
            ServerMessage::DeviceAdded(m) => m.id,
            ServerMessage::DeviceRemoved(m) => m.id,
        }
    }

    /// Wire name of the message kind, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Ok(_) => "Ok",
            ServerMessage::Error(_) => "Error",
            ServerMessage::Test(_) => "Test",
            ServerMessage::Log(_) => "Log",
            ServerMessage::ServerInfo(_) => "ServerInfo",
            ServerMessage::ScanningFinished(_) => "ScanningFinished",
            ServerMessage::DeviceList(_) => "DeviceList",
            ServerMessage::DeviceAdded(_) => "DeviceAdded",
            ServerMessage::DeviceRemoved(_) => "DeviceRemoved",
        }
    }
}

/// Every message a server can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Ping(Empty),
    Test(Test),
    RequestLog(RequestLog),
    RequestServerInfo(RequestServerInfo),
    StartScanning(Empty),
    StopScanning(Empty),
    RequestDeviceList(Empty),
    StopDeviceCmd(DeviceInfo),
    StopAllDevices(Empty),
    RawCmd(RawCmd),
    SingleMotorVibrateCmd(SingleMotorVibrateCmd),
    KiirooCmd(KiirooCmd),
    FleshlightLaunchFW12Cmd(FleshlightLaunchFW12Cmd),
    LovenseCmd(LovenseCmd),
    VorzeA10CycloneCmd(VorzeA10CycloneCmd),
}

impl ClientMessage {
    /// Correlation ID carried by the message.
    pub fn id(&self) -> MessageId {
        match self {
            ClientMessage::Ping(m) => m.id,
            ClientMessage::Test(m) => m.id,
            ClientMessage::RequestLog(m) => m.id,
            ClientMessage::RequestServerInfo(m) => m.id,
            ClientMessage::StartScanning(m) => m.id,
            ClientMessage::StopScanning(m) => m.id,
            ClientMessage::RequestDeviceList(m) => m.id,
            ClientMessage::StopDeviceCmd(m) => m.id,
            ClientMessage::StopAllDevices(m) => m.id,
            ClientMessage::RawCmd(m) => m.id,
            ClientMessage::SingleMotorVibrateCmd(m) => m.id,
            ClientMessage::KiirooCmd(m) => m.id,
            ClientMessage::FleshlightLaunchFW12Cmd(m) => m.id,
            ClientMessage::LovenseCmd(m) => m.id,
            ClientMessage::VorzeA10CycloneCmd(m) => m.id,
        }
    }

    /// Wire name of the message kind, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Ping(_) => "Ping",
            ClientMessage::Test(_) => "Test",
            ClientMessage::RequestLog(_) => "RequestLog",
            ClientMessage::RequestServerInfo(_) => "RequestServerInfo",
            ClientMessage::StartScanning(_) => "StartScanning",
            ClientMessage::StopScanning(_) => "StopScanning",
            ClientMessage::RequestDeviceList(_) => "RequestDeviceList",
            ClientMessage::StopDeviceCmd(_) => "StopDeviceCmd",
            ClientMessage::StopAllDevices(_) => "StopAllDevices",
            ClientMessage::RawCmd(_) => "RawCmd",
            ClientMessage::SingleMotorVibrateCmd(_) => "SingleMotorVibrateCmd",
            ClientMessage::KiirooCmd(_) => "KiirooCmd",
            ClientMessage::FleshlightLaunchFW12Cmd(_) => "FleshlightLaunchFW12Cmd",
            ClientMessage::LovenseCmd(_) => "LovenseCmd",
            ClientMessage::VorzeA10CycloneCmd(_) => "VorzeA10CycloneCmd",
        }
    }
}

/// Decode one inbound text frame into its messages.
///
/// A frame is a JSON array; any unrecognized message kind fails the whole
/// frame. Callers treat a failed frame as skippable, not fatal.
pub fn decode_frame(frame: &str) -> Result<Vec<ServerMessage>, serde_json::Error> {
    serde_json::from_str(frame)
}

/// Encode outbound messages into one text frame.
pub fn encode_frame(messages: &[ClientMessage]) -> Result<String, serde_json::Error> {
    serde_json::to_string(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_request_server_info_matches_wire_shape() {
        let frame = encode_frame(&[ClientMessage::RequestServerInfo(RequestServerInfo {
            id: 1,
            client_name: "test-client".to_string(),
        })])
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!([{"RequestServerInfo": {"Id": 1, "ClientName": "test-client"}}])
        );
    }

    #[test]
    fn stop_device_cmd_skips_unset_id_fields() {
        let frame = encode_frame(&[ClientMessage::StopDeviceCmd(DeviceInfo {
            id: 4,
            device_name: String::new(),
            device_index: 2,
            device_messages: Vec::new(),
        })])
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!([{"StopDeviceCmd": {"Id": 4, "DeviceName": "", "DeviceIndex": 2}}])
        );
    }

    #[test]
    fn decode_server_info_frame() {
        let frame = r#"[{"ServerInfo":{"Id":7,"ServerName":"test","MessageVersion":0,
            "MajorVersion":0,"MinorVersion":2,"BuildVersion":1,"MaxPingTime":500}}]"#;
        let messages = decode_frame(frame).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id(), 7);
        match &messages[0] {
            ServerMessage::ServerInfo(si) => {
                assert_eq!(si.server_name, "test");
                assert_eq!(si.max_ping_time, 500);
            }
            other => panic!("expected ServerInfo, got {}", other.kind()),
        }
    }

    #[test]
    fn decode_device_list_entries_without_id() {
        let frame = r#"[{"DeviceList":{"Id":3,"Devices":[
            {"DeviceName":"Launch","DeviceIndex":0,"DeviceMessages":["FleshlightLaunchFW12Cmd"]},
            {"DeviceName":"Hush","DeviceIndex":1}]}}]"#;
        let messages = decode_frame(frame).unwrap();
        match &messages[0] {
            ServerMessage::DeviceList(dl) => {
                assert_eq!(dl.devices.len(), 2);
                assert_eq!(dl.devices[0].id, 0);
                assert_eq!(dl.devices[0].device_index, 0);
                assert_eq!(
                    dl.devices[0].device_messages,
                    vec!["FleshlightLaunchFW12Cmd".to_string()]
                );
                assert!(dl.devices[1].device_messages.is_empty());
            }
            other => panic!("expected DeviceList, got {}", other.kind()),
        }
    }

    #[test]
    fn decode_multiple_messages_preserves_order() {
        let frame = r#"[{"Ok":{"Id":1}},{"ScanningFinished":{"Id":0}}]"#;
        let messages = decode_frame(frame).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind(), "Ok");
        assert_eq!(messages[1].kind(), "ScanningFinished");
        assert_eq!(messages[1].id(), 0);
    }

    #[test]
    fn decode_unknown_kind_fails_whole_frame() {
        let frame = r#"[{"Ok":{"Id":1}},{"Bogus":{"Id":2}}]"#;
        assert!(decode_frame(frame).is_err());
    }

    #[test]
    fn server_error_round_trip() {
        let frame = r#"[{"Error":{"Id":9,"ErrorMessage":"device not connected"}}]"#;
        let messages = decode_frame(frame).unwrap();
        match &messages[0] {
            ServerMessage::Error(e) => assert_eq!(e.error_message, "device not connected"),
            other => panic!("expected Error, got {}", other.kind()),
        }
    }
}
