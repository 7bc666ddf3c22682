use super::FrameError;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Sub-event selected by the first byte of an `AutopilotEvent` blob.
///
/// The `Display` form is the `type=` value published on `api/events`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
#[repr(u8)]
pub enum AutopilotEventKind {
    #[strum(to_string = "info_firmare")]
    FirmwareInfo = 1,
    #[strum(to_string = "info_obstacle")]
    ObstacleInfo = 2,
    #[strum(to_string = "arm")]
    Arm = 3,
    #[strum(to_string = "disarm")]
    Disarm = 4,
    #[strum(to_string = "mission_command")]
    MissionCommand = 5,
    #[strum(to_string = "waypoint")]
    Waypoint = 6,
    #[strum(to_string = "kos_command")]
    KosCommand = 7,
    #[strum(to_string = "obstacle")]
    Obstacle = 8,
}

impl AutopilotEventKind {
    pub fn from_byte(byte: u8) -> Option<Self> { Self::iter().find(|k| *k as u8 == byte) }
}

/// A decoded firmware event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutopilotEvent {
    kind: AutopilotEventKind,
    text: String,
}

impl AutopilotEvent {
    pub fn new(kind: AutopilotEventKind, text: &str) -> Self { Self { kind, text: text.to_string() } }
    pub fn kind(&self) -> AutopilotEventKind { self.kind }
    pub fn text(&self) -> &str { &self.text }

    /// Decodes a blob: kind byte, then text up to the first NUL or the blob end.
    pub fn decode(blob: &[u8]) -> Result<Self, FrameError> {
        let (&kind_byte, rest) = blob.split_first().ok_or(FrameError::EmptyEvent)?;
        let kind = AutopilotEventKind::from_byte(kind_byte).ok_or(FrameError::UnknownEvent(kind_byte))?;
        let text_end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
        Ok(Self { kind, text: String::from_utf8_lossy(&rest[..text_end]).into_owned() })
    }
}
