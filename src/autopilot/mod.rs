//! Binary command/event framing towards the autopilot firmware.

mod autopilot_link;
mod command;
mod event;

pub use autopilot_link::AutopilotLink;
pub use command::{AutopilotCommand, CommandPayload, FRAME_HEAD, encode_frame};
pub use event::{AutopilotEvent, AutopilotEventKind};

use async_trait::async_trait;
use strum_macros::Display;

/// Failures on the autopilot byte stream.
#[derive(Debug, Display)]
pub enum FrameError {
    Io(std::io::Error),
    /// An event blob announced more bytes than the frame bound allows.
    Oversized(u32),
    EmptyEvent,
    UnknownEvent(u8),
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(value: std::io::Error) -> Self { FrameError::Io(value) }
}

/// What the flight controller needs from the autopilot side.
#[async_trait]
pub trait Autopilot: Send + Sync {
    /// Takes the pending arm request flag, clearing it.
    fn poll_arm_request(&self) -> bool;

    async fn send_command(&self, command: AutopilotCommand, payload: CommandPayload) -> Result<(), FrameError>;

    async fn permit_arm(&self) -> Result<(), FrameError> {
        self.send_command(AutopilotCommand::ArmPermit, CommandPayload::None).await
    }

    async fn forbid_arm(&self) -> Result<(), FrameError> {
        self.send_command(AutopilotCommand::ArmForbid, CommandPayload::None).await
    }
}
