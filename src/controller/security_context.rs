use super::ControllerError;
use crate::autopilot::Autopilot;
use crate::collaborators::{
    CredentialManager, FlightControl, NavigationSystem, PeerRegistry, PeripheryController,
};
use crate::message_link::{MessageLink, Topic};
use crate::warn;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Server-directed keepalive interval in seconds.
#[derive(Debug)]
pub struct SessionDelay(AtomicU32);

impl SessionDelay {
    const DEF_SECS: u32 = 1;

    pub fn get(&self) -> u32 { self.0.load(Ordering::Acquire) }
    pub fn set(&self, secs: u32) { self.0.store(secs, Ordering::Release); }

    /// The wait between two pings. A zero delay still waits one second.
    pub fn interval(&self) -> Duration { Duration::from_secs(u64::from(self.get().max(1))) }
}

impl Default for SessionDelay {
    fn default() -> Self { Self(AtomicU32::new(Self::DEF_SECS)) }
}

/// External collaborators the controller drives.
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialManager>,
    pub periphery: Arc<dyn PeripheryController>,
    pub navigation: Arc<dyn NavigationSystem>,
    pub peers: Arc<dyn PeerRegistry>,
    pub flight_control: Arc<dyn FlightControl>,
}

/// Everything the controller and its session tasks share.
///
/// The board identity is written once during identification and only read
/// afterwards.
pub struct SecurityContext {
    link: Arc<dyn MessageLink>,
    autopilot: Arc<dyn Autopilot>,
    collaborators: Collaborators,
    board_id: OnceLock<String>,
    session_delay: SessionDelay,
    cancel: CancellationToken,
}

impl SecurityContext {
    pub fn new(
        link: Arc<dyn MessageLink>,
        autopilot: Arc<dyn Autopilot>,
        collaborators: Collaborators,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            link,
            autopilot,
            collaborators,
            board_id: OnceLock::new(),
            session_delay: SessionDelay::default(),
            cancel,
        }
    }

    pub fn link(&self) -> &dyn MessageLink { self.link.as_ref() }
    pub fn autopilot(&self) -> &dyn Autopilot { self.autopilot.as_ref() }
    pub fn credentials(&self) -> &dyn CredentialManager { self.collaborators.credentials.as_ref() }
    pub fn periphery(&self) -> &dyn PeripheryController { self.collaborators.periphery.as_ref() }
    pub fn navigation(&self) -> &dyn NavigationSystem { self.collaborators.navigation.as_ref() }
    pub fn peers(&self) -> &dyn PeerRegistry { self.collaborators.peers.as_ref() }
    pub fn flight_control(&self) -> &dyn FlightControl { self.collaborators.flight_control.as_ref() }
    pub fn session_delay(&self) -> &SessionDelay { &self.session_delay }
    pub fn cancel(&self) -> &CancellationToken { &self.cancel }

    pub fn board_id(&self) -> Result<&str, ControllerError> {
        self.board_id.get().map(String::as_str).ok_or(ControllerError::NotIdentified)
    }

    pub(super) fn set_board_id(&self, board_id: String) { let _ = self.board_id.set(board_id); }

    /// Sleeps `duration` unless shutdown is requested first.
    pub async fn idle(&self, duration: Duration) -> Result<(), ControllerError> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(ControllerError::Cancelled),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Accepts `envelope` only if its signature positively verifies.
    pub async fn verify(&self, envelope: &str) -> Result<(), ControllerError> {
        match self.credentials().check_signature(envelope).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ControllerError::Unverified),
            Err(e) => Err(e.into()),
        }
    }

    /// Polls `topic` every `interval` until a publication arrives.
    pub async fn poll(&self, topic: Topic, interval: Duration) -> Result<String, ControllerError> {
        loop {
            if let Some(raw) = self.link.receive(topic) {
                return Ok(raw);
            }
            self.idle(interval).await?;
        }
    }

    /// Polls `topic` every `interval` until a publication with a valid signature arrives.
    ///
    /// Publications failing verification are dropped.
    pub async fn poll_verified(&self, topic: Topic, interval: Duration) -> Result<String, ControllerError> {
        loop {
            let raw = self.poll(topic, interval).await?;
            match self.verify(&raw).await {
                Ok(()) => return Ok(raw),
                Err(e) => warn!("Dropping publication on {topic}: {e}"),
            }
            self.idle(interval).await?;
        }
    }
}
