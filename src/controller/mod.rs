//! Authorization state machine gating arming and mission execution behind
//! signed exchanges with the ATM server.

mod flight_controller;
mod security_context;
mod session;

pub use flight_controller::{FlightController, Phase};
pub use security_context::{Collaborators, SecurityContext, SessionDelay};

use crate::collaborators::CollaboratorError;
use crate::envelope::EnvelopeError;
use crate::message_link::LinkError;
use strum_macros::Display;

/// Why a single exchange step did not succeed.
///
/// Inside the retry loops every variant except `Cancelled` only leads to a
/// warning and another attempt.
#[derive(Debug, Display)]
pub enum ControllerError {
    /// Shutdown was requested while waiting.
    Cancelled,
    /// No board identity established yet.
    NotIdentified,
    Link(LinkError),
    /// The server did not answer within the request bound.
    Timeout,
    Collaborator(CollaboratorError),
    /// The envelope signature did not verify.
    Unverified,
    Envelope(EnvelopeError),
    /// A verified envelope of an unexpected kind.
    Unexpected(String),
}

impl std::error::Error for ControllerError {}

impl From<LinkError> for ControllerError {
    fn from(value: LinkError) -> Self { ControllerError::Link(value) }
}

impl From<CollaboratorError> for ControllerError {
    fn from(value: CollaboratorError) -> Self { ControllerError::Collaborator(value) }
}

impl From<EnvelopeError> for ControllerError {
    fn from(value: EnvelopeError) -> Self { ControllerError::Envelope(value) }
}

#[cfg(test)]
mod tests;
