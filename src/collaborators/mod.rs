//! Narrow interfaces to everything the security module does not own:
//! signing, actuators, mission storage, peer readiness and flight control.

mod local;
#[cfg(test)]
pub mod test_doubles;

pub use local::{IdleFlightControl, LocalPeers, LocalPeriphery, MissionStore, OfflineCredentials};

use crate::envelope::{MissionDocument, NoFlightArea};
use async_trait::async_trait;
use strum_macros::{Display, EnumIter};
use tokio_util::sync::CancellationToken;

/// External components that have to report ready before authorization starts.
///
/// Iteration order is the order they are waited for.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Peer {
    Logger,
    PeripheryController,
    AutopilotConnector,
    NavigationSystem,
    ServerConnector,
    CredentialManager,
}

/// Failures reported by an external collaborator.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    NotReady(Peer),
    SigningFailed,
    VerificationFailed,
    Actuator(String),
}

impl std::error::Error for CollaboratorError {}

/// Signs outbound queries and verifies inbound envelopes.
#[async_trait]
pub trait CredentialManager: Send + Sync {
    /// Returns the hex signature of `message`, without `0x`.
    async fn sign_message(&self, message: &str) -> Result<String, CollaboratorError>;

    /// Checks the out-of-band signature of a raw `$…#<sig>` envelope.
    async fn check_signature(&self, envelope: &str) -> Result<bool, CollaboratorError>;
}

#[async_trait]
pub trait PeripheryController: Send + Sync {
    async fn set_kill_switch(&self, enable: bool) -> Result<(), CollaboratorError>;
    async fn enable_buzzer(&self) -> Result<(), CollaboratorError>;
}

/// Storage for the active mission and the no-flight areas.
pub trait NavigationSystem: Send + Sync {
    fn load_mission(&self, mission: MissionDocument) -> Result<(), CollaboratorError>;
    /// Discards every stored area and keeps exactly `areas`.
    fn replace_no_flight_areas(&self, areas: Vec<NoFlightArea>);
    fn mission(&self) -> Option<MissionDocument>;
    fn no_flight_areas(&self) -> Vec<NoFlightArea>;
}

#[async_trait]
pub trait PeerRegistry: Send + Sync {
    /// Succeeds once `peer` reported ready. Does not wait itself.
    async fn check_ready(&self, peer: Peer) -> Result<(), CollaboratorError>;
}

/// Takes over once the aircraft is armed.
#[async_trait]
pub trait FlightControl: Send + Sync {
    async fn take_control(&self, cancel: CancellationToken);
}
