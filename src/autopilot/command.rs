use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Magic bytes opening every frame on the autopilot stream.
pub const FRAME_HEAD: [u8; 4] = [0x5A; 4];

/// Command byte following the frame head.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
#[repr(u8)]
pub enum AutopilotCommand {
    /// Inbound: the firmware wants to arm.
    ArmRequest = 0xA1,
    ArmPermit = 0xA2,
    ArmForbid = 0xA3,
    PauseFlight = 0xA4,
    ResumeFlight = 0xA5,
    /// Payload: latitude, longitude and altitude as three integers.
    ChangeWaypoint = 0xA6,
    ChangeSpeed = 0xA7,
    ChangeAltitude = 0xA8,
    /// Payload: serialized mission blob.
    SetMission = 0xA9,
    /// Inbound: length-prefixed event blob.
    AutopilotEvent = 0xAA,
}

impl AutopilotCommand {
    pub fn tag(self) -> u8 { self as u8 }

    pub fn from_tag(tag: u8) -> Option<Self> { Self::iter().find(|c| c.tag() == tag) }
}

/// Trailing payload of an outbound frame, chosen by the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPayload {
    None,
    Int(i32),
    Triple(i32, i32, i32),
    /// Appended as is, the receiver knows the blob size from the command.
    Bytes(Vec<u8>),
}

impl CommandPayload {
    fn encoded_len(&self) -> usize {
        match self {
            CommandPayload::None => 0,
            CommandPayload::Int(_) => 4,
            CommandPayload::Triple(..) => 12,
            CommandPayload::Bytes(blob) => blob.len(),
        }
    }
}

/// Serializes one frame: head, command byte, little-endian payload.
pub fn encode_frame(command: AutopilotCommand, payload: &CommandPayload) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEAD.len() + 1 + payload.encoded_len());
    frame.extend_from_slice(&FRAME_HEAD);
    frame.push(command.tag());
    match payload {
        CommandPayload::None => {}
        CommandPayload::Int(v) => frame.extend_from_slice(&v.to_le_bytes()),
        CommandPayload::Triple(a, b, c) => {
            for v in [a, b, c] {
                frame.extend_from_slice(&v.to_le_bytes());
            }
        }
        CommandPayload::Bytes(blob) => frame.extend_from_slice(blob),
    }
    frame
}
