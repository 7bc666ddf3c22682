use super::{
    CollaboratorError, CredentialManager, FlightControl, NavigationSystem, Peer, PeerRegistry,
    PeripheryController,
};
use crate::envelope::{MissionDocument, NoFlightArea};
use crate::{info, log};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

/// Credentials matching the offline fixtures: everything is signed `0` and
/// every envelope verifies.
#[derive(Debug, Default)]
pub struct OfflineCredentials;

#[async_trait]
impl CredentialManager for OfflineCredentials {
    async fn sign_message(&self, _message: &str) -> Result<String, CollaboratorError> { Ok(String::from("0")) }

    async fn check_signature(&self, _envelope: &str) -> Result<bool, CollaboratorError> { Ok(true) }
}

/// Actuator stand-in that only keeps and logs the requested states.
#[derive(Debug, Default)]
pub struct LocalPeriphery {
    kill_switch: AtomicBool,
    buzzer: AtomicBool,
}

impl LocalPeriphery {
    pub fn kill_switch_enabled(&self) -> bool { self.kill_switch.load(Ordering::Acquire) }
    pub fn buzzer_enabled(&self) -> bool { self.buzzer.load(Ordering::Acquire) }
}

#[async_trait]
impl PeripheryController for LocalPeriphery {
    async fn set_kill_switch(&self, enable: bool) -> Result<(), CollaboratorError> {
        self.kill_switch.store(enable, Ordering::Release);
        info!("Kill switch {}", if enable { "enabled" } else { "disabled" });
        Ok(())
    }

    async fn enable_buzzer(&self) -> Result<(), CollaboratorError> {
        self.buzzer.store(true, Ordering::Release);
        info!("Buzzer enabled");
        Ok(())
    }
}

/// In-memory mission and no-flight area storage.
#[derive(Debug, Default)]
pub struct MissionStore {
    mission: RwLock<Option<MissionDocument>>,
    areas: RwLock<Vec<NoFlightArea>>,
}

impl NavigationSystem for MissionStore {
    fn load_mission(&self, mission: MissionDocument) -> Result<(), CollaboratorError> {
        for (i, command) in mission.commands().iter().enumerate() {
            log!("Mission command {i}: {command}");
        }
        *self.mission.write().unwrap_or_else(PoisonError::into_inner) = Some(mission);
        Ok(())
    }

    fn replace_no_flight_areas(&self, areas: Vec<NoFlightArea>) {
        for area in &areas {
            log!("No-flight area '{}' with {} vertices", area.name(), area.vertices().len());
        }
        *self.areas.write().unwrap_or_else(PoisonError::into_inner) = areas;
    }

    fn mission(&self) -> Option<MissionDocument> {
        self.mission.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn no_flight_areas(&self) -> Vec<NoFlightArea> {
        self.areas.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Every peer lives in this process and is ready as soon as it exists.
#[derive(Debug, Default)]
pub struct LocalPeers;

#[async_trait]
impl PeerRegistry for LocalPeers {
    async fn check_ready(&self, _peer: Peer) -> Result<(), CollaboratorError> { Ok(()) }
}

/// Holds control without steering until shutdown.
#[derive(Debug, Default)]
pub struct IdleFlightControl;

#[async_trait]
impl FlightControl for IdleFlightControl {
    async fn take_control(&self, cancel: CancellationToken) {
        info!("Flight control handed over, idling until shutdown");
        cancel.cancelled().await;
    }
}
