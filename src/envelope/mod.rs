//! Typed view of the `$<Tag> <fields>#<signature>` envelopes exchanged with the
//! ATM server, plus builders for everything the security module sends back.

mod geo;
mod mission;
pub mod outbound;
mod server_message;
mod zones;

pub use geo::{GeoPoint, GeoPoint3};
pub use mission::{MissionCommand, MissionDocument};
pub use server_message::{
    ArmDecision, FlightStatus, MissionApproval, ServerMessage, parse_delay,
};
pub use zones::NoFlightArea;

use strum_macros::Display;

/// Reasons a received envelope could not be turned into a [`ServerMessage`].
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    Empty,
    MissingStart,
    Unterminated,
    UnknownTag(String),
    Unrecognized,
    Malformed,
}

impl std::error::Error for EnvelopeError {}
