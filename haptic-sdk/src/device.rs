//! Device handles and the per-device command surface.
//!
//! A handle validates a command locally against the device's advertised
//! capabilities before anything touches the wire, then goes through the
//! session's correlation path like any other request.

use std::fmt;
use std::sync::Arc;

use haptic_proto::{
    ClientMessage, DeviceInfo, FleshlightLaunchFW12Cmd, KiirooCmd, LovenseCmd, RawCmd,
    SingleMotorVibrateCmd, VorzeA10CycloneCmd,
};
use tokio_util::sync::CancellationToken;

use crate::client::{DeviceEntry, SessionInner};
use crate::error::ClientError;

/// Command-kind identifiers as they appear in a device descriptor's
/// supported-message list.
pub const COMMAND_STOP_DEVICE: &str = "StopDeviceCmd";
pub const COMMAND_RAW: &str = "RawCmd";
pub const COMMAND_SINGLE_MOTOR_VIBRATE: &str = "SingleMotorVibrateCmd";
pub const COMMAND_KIIROO: &str = "KiirooCmd";
pub const COMMAND_FLESHLIGHT_LAUNCH_FW12: &str = "FleshlightLaunchFW12Cmd";
pub const COMMAND_LOVENSE: &str = "LovenseCmd";
pub const COMMAND_VORZE_A10_CYCLONE: &str = "VorzeA10CycloneCmd";

/// A connected device, usable to execute commands.
///
/// Holds a copy of the device's last-known descriptor plus a one-shot
/// removal signal; it does not keep the device alive in the session's
/// table. Cheap to clone.
#[derive(Clone)]
pub struct Device {
    session: Arc<SessionInner>,
    info: DeviceInfo,
    removed: CancellationToken,
}

impl Device {
    pub(crate) fn new(session: Arc<SessionInner>, entry: &DeviceEntry) -> Self {
        Self {
            session,
            info: entry.info.clone(),
            removed: entry.removed.clone(),
        }
    }

    /// Display name of the device.
    pub fn name(&self) -> &str {
        &self.info.device_name
    }

    /// Server-assigned index identifying the device while connected.
    pub fn index(&self) -> u32 {
        self.info.device_index
    }

    /// Command kinds the device advertises support for.
    pub fn supported(&self) -> &[String] {
        &self.info.device_messages
    }

    /// Whether the device advertises support for `command`.
    pub fn supports(&self, command: &str) -> bool {
        self.info.device_messages.iter().any(|m| m == command)
    }

    fn ensure_supported(&self, command: &'static str) -> Result<(), ClientError> {
        if self.supports(command) {
            Ok(())
        } else {
            Err(ClientError::Unsupported(command))
        }
    }

    /// Stop the device from whatever it is doing.
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.ensure_supported(COMMAND_STOP_DEVICE)?;
        self.session
            .command(|id| {
                ClientMessage::StopDeviceCmd(DeviceInfo {
                    id,
                    device_name: String::new(),
                    device_index: self.info.device_index,
                    device_messages: Vec::new(),
                })
            })
            .await
    }

    /// Send a raw byte string to the device.
    pub async fn raw(&self, command: Vec<u8>) -> Result<(), ClientError> {
        self.ensure_supported(COMMAND_RAW)?;
        self.session
            .command(|id| {
                ClientMessage::RawCmd(RawCmd {
                    id,
                    device_index: self.info.device_index,
                    command,
                })
            })
            .await
    }

    /// Run a vibrating device at `speed`, a normalized value in
    /// [0.0, 1.0] abstracting over the dynamic range of different devices.
    pub async fn vibrate(&self, speed: f64) -> Result<(), ClientError> {
        self.ensure_supported(COMMAND_SINGLE_MOTOR_VIBRATE)?;
        if !(0.0..=1.0).contains(&speed) {
            return Err(ClientError::InvalidArgument(format!(
                "vibration speed {speed} outside [0.0, 1.0]"
            )));
        }
        self.session
            .command(|id| {
                ClientMessage::SingleMotorVibrateCmd(SingleMotorVibrateCmd {
                    id,
                    device_index: self.info.device_index,
                    speed,
                })
            })
            .await
    }

    /// Run a Kiiroo-style event command, range [0, 4].
    pub async fn kiiroo(&self, command: u8) -> Result<(), ClientError> {
        self.ensure_supported(COMMAND_KIIROO)?;
        if command > 4 {
            return Err(ClientError::InvalidArgument(format!(
                "kiiroo command {command} outside [0, 4]"
            )));
        }
        self.session
            .command(|id| {
                ClientMessage::KiirooCmd(KiirooCmd {
                    id,
                    device_index: self.info.device_index,
                    command,
                })
            })
            .await
    }

    /// Move a Fleshlight Launch (firmware 1.2) to `position` at `speed`,
    /// both in [0, 99].
    pub async fn fleshlight(&self, position: u8, speed: u8) -> Result<(), ClientError> {
        self.ensure_supported(COMMAND_FLESHLIGHT_LAUNCH_FW12)?;
        if position > 99 {
            return Err(ClientError::InvalidArgument(format!(
                "position {position} outside [0, 99]"
            )));
        }
        if speed > 99 {
            return Err(ClientError::InvalidArgument(format!(
                "speed {speed} outside [0, 99]"
            )));
        }
        self.session
            .command(|id| {
                ClientMessage::FleshlightLaunchFW12Cmd(FleshlightLaunchFW12Cmd {
                    id,
                    device_index: self.info.device_index,
                    position,
                    speed,
                })
            })
            .await
    }

    /// Send a Lovense-style text command. The command string is passed
    /// through as-is; the server validates it.
    pub async fn lovense(&self, command: &str) -> Result<(), ClientError> {
        self.ensure_supported(COMMAND_LOVENSE)?;
        self.session
            .command(|id| {
                ClientMessage::LovenseCmd(LovenseCmd {
                    id,
                    device_index: self.info.device_index,
                    command: command.to_string(),
                })
            })
            .await
    }

    /// Rotate a Vorze A10 Cyclone at `speed` in [0, 99], clockwise relative
    /// to the device facing the user.
    pub async fn vorze(&self, speed: u8, clockwise: bool) -> Result<(), ClientError> {
        self.ensure_supported(COMMAND_VORZE_A10_CYCLONE)?;
        if speed > 99 {
            return Err(ClientError::InvalidArgument(format!(
                "speed {speed} outside [0, 99]"
            )));
        }
        self.session
            .command(|id| {
                ClientMessage::VorzeA10CycloneCmd(VorzeA10CycloneCmd {
                    id,
                    device_index: self.info.device_index,
                    speed,
                    clockwise,
                })
            })
            .await
    }

    /// Resolves when the server reports this device removed. Fires at most
    /// once per handle; repeated awaits after that return immediately.
    pub async fn disconnected(&self) {
        self.removed.cancelled().await
    }

    /// Whether the server has reported this device removed.
    pub fn is_disconnected(&self) -> bool {
        self.removed.is_cancelled()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.info.device_name, self.info.device_index)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.info.device_name)
            .field("index", &self.info.device_index)
            .field("supported", &self.info.device_messages)
            .finish()
    }
}
