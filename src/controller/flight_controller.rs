use super::{ControllerError, SecurityContext, session};
use crate::collaborators::Peer;
use crate::envelope::outbound::{
    arm_publication, arm_query, auth_query, mission_publication, mission_query, signed_query,
};
use crate::envelope::{ArmDecision, MissionApproval, ServerMessage};
use crate::message_link::{ServerReply, Topic};
use crate::{info, log, warn};
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use strum_macros::Display;

/// Stages of the authorization sequence, entered strictly in this order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitForPeers,
    Identify,
    Authenticate,
    FetchMission,
    ArmNegotiation,
    Armed,
}

/// Drives the aircraft from power-up to an armed, server-authorized session.
///
/// Every step retries until it succeeds; the only way out before `Armed` is
/// cancellation.
#[derive(Clone)]
pub struct FlightController {
    ctx: Arc<SecurityContext>,
}

impl FlightController {
    const RETRY_INTERVAL: Duration = Duration::from_secs(1);
    const ARM_POLL_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(ctx: Arc<SecurityContext>) -> Self { Self { ctx } }

    pub fn context(&self) -> &SecurityContext { &self.ctx }

    /// Runs the whole sequence and then hands control to flight control.
    ///
    /// Returns once flight control gives up control or with
    /// [`ControllerError::Cancelled`] on shutdown.
    pub async fn run(&self) -> Result<(), ControllerError> {
        Self::enter(Phase::WaitForPeers);
        self.wait_for_peers().await?;
        Self::enter(Phase::Identify);
        self.identify().await?;
        Self::enter(Phase::Authenticate);
        self.authenticate().await?;
        Self::enter(Phase::FetchMission);
        self.fetch_mission().await?;
        Self::enter(Phase::ArmNegotiation);
        let delay = self.negotiate_arm().await?;

        Self::enter(Phase::Armed);
        if let Some(secs) = delay {
            self.ctx.session_delay().set(secs);
        }
        session::spawn(Arc::clone(&self.ctx));
        self.ctx.flight_control().take_control(self.ctx.cancel().clone()).await;
        Ok(())
    }

    fn enter(phase: Phase) { info!("Entering {phase}"); }

    async fn wait_for_peers(&self) -> Result<(), ControllerError> {
        for peer in Peer::iter() {
            loop {
                match self.ctx.peers().check_ready(peer).await {
                    Ok(()) => break,
                    Err(e) => warn!("Waiting for {peer}: {e}. Trying again in 1s"),
                }
                self.ctx.idle(Self::RETRY_INTERVAL).await?;
            }
            log!("{peer} is ready");
        }
        Ok(())
    }

    async fn identify(&self) -> Result<(), ControllerError> {
        loop {
            if let Err(e) = self.ctx.link().init().await {
                warn!("Failed to initialize server link: {e}. Trying again in 1s");
            }
            if let Some(board_id) = self.ctx.link().board_id().filter(|id| !id.is_empty()) {
                info!("Board identity is '{board_id}'");
                self.ctx.set_board_id(board_id);
                break;
            }
            self.ctx.idle(Self::RETRY_INTERVAL).await?;
        }
        if let Err(e) = self.ctx.periphery().enable_buzzer().await {
            warn!("Failed to enable buzzer: {e}");
        }
        Ok(())
    }

    async fn authenticate(&self) -> Result<(), ControllerError> {
        loop {
            match self.try_authenticate().await {
                Ok(()) => {
                    info!("Board is authenticated on the ATM server");
                    return Ok(());
                }
                Err(e) => warn!("Authentication failed: {e}. Trying again in 1s"),
            }
            self.ctx.idle(Self::RETRY_INTERVAL).await?;
        }
    }

    async fn try_authenticate(&self) -> Result<(), ControllerError> {
        let board_id = self.ctx.board_id()?;
        let query = auth_query(board_id);
        let signature = self.ctx.credentials().sign_message(&query).await?;
        let raw = match self.ctx.link().request(&signed_query(&query, &signature)).await? {
            ServerReply::Response(raw) => raw,
            ServerReply::Timeout => return Err(ControllerError::Timeout),
        };
        self.ctx.verify(&raw).await?;
        match ServerMessage::parse(&raw)? {
            ServerMessage::Success => Ok(()),
            ServerMessage::Auth { id } if id == board_id => Ok(()),
            _ => Err(ControllerError::Unexpected(raw)),
        }
    }

    async fn fetch_mission(&self) -> Result<(), ControllerError> {
        loop {
            let raw = self.ctx.poll_verified(Topic::FlightMission, Self::RETRY_INTERVAL).await?;
            match ServerMessage::parse(&raw) {
                Ok(ServerMessage::FlightMission(mission)) => {
                    let commands = mission.len();
                    match self.ctx.navigation().load_mission(mission) {
                        Ok(()) => {
                            info!("Mission with {commands} commands loaded");
                            return Ok(());
                        }
                        Err(e) => warn!("Navigation rejected the mission: {e}"),
                    }
                }
                Ok(_) => warn!("Expected a mission, got '{raw}'"),
                Err(e) => warn!("Failed to parse mission: {e}"),
            }
            self.ctx.idle(Self::RETRY_INTERVAL).await?;
        }
    }

    /// Loops over autopilot arm requests until the server grants one.
    ///
    /// Returns the session delay carried by the grant.
    async fn negotiate_arm(&self) -> Result<Option<u32>, ControllerError> {
        loop {
            while !self.ctx.autopilot().poll_arm_request() {
                log!("No arm request from autopilot yet");
                self.ctx.idle(Self::ARM_POLL_INTERVAL).await?;
            }
            info!("Autopilot requested to arm, asking the ATM server");
            let raw = self.request_arm().await?;

            match ServerMessage::parse(&raw) {
                Ok(ServerMessage::Arm(ArmDecision::Granted { delay })) => {
                    info!("Arm request granted");
                    session::set_kill_switch(&self.ctx, true).await?;
                    if let Err(e) = self.ctx.autopilot().permit_arm().await {
                        warn!("Failed to send arm permission to autopilot: {e}");
                    }
                    return Ok(delay);
                }
                Ok(ServerMessage::Arm(ArmDecision::Denied)) => {
                    info!("Arm request denied");
                    if let Err(e) = self.ctx.autopilot().forbid_arm().await {
                        warn!("Failed to send arm denial to autopilot: {e}");
                    }
                }
                _ => warn!("Failed to parse arm response '{raw}'"),
            }
        }
    }

    /// Publishes a signed arm request and waits for the verified response.
    async fn request_arm(&self) -> Result<String, ControllerError> {
        if let Some(stale) = self.ctx.link().receive(Topic::ArmResponse) {
            log!("Discarding stale arm response '{stale}'");
        }
        let signature = self.sign_until_success(&arm_query(self.ctx.board_id()?)).await?;
        let payload = arm_publication(&signature);
        loop {
            match self.ctx.link().publish(Topic::ArmRequest, &payload).await {
                Ok(()) => break,
                Err(e) => warn!("Failed to publish arm request: {e}. Trying again in 1s"),
            }
            self.ctx.idle(Self::RETRY_INTERVAL).await?;
        }
        self.ctx.poll_verified(Topic::ArmResponse, Self::RETRY_INTERVAL).await
    }

    async fn sign_until_success(&self, message: &str) -> Result<String, ControllerError> {
        loop {
            match self.ctx.credentials().sign_message(message).await {
                Ok(signature) => return Ok(signature),
                Err(e) => warn!("Failed to sign '{message}': {e}. Trying again in 1s"),
            }
            self.ctx.idle(Self::RETRY_INTERVAL).await?;
        }
    }

    /// Asks the server to approve a new mission.
    ///
    /// A single exchange: signing, publishing, verification or parsing
    /// failures are returned, not retried. Only the wait for the response
    /// polls every second.
    pub async fn request_mission_approval(&self, mission: &str) -> Result<MissionApproval, ControllerError> {
        let query = mission_query(self.ctx.board_id()?, mission);
        let signature = self.ctx.credentials().sign_message(&query).await?;
        if let Some(stale) = self.ctx.link().receive(Topic::MissionResponse) {
            log!("Discarding stale mission response '{stale}'");
        }
        self.ctx
            .link()
            .publish(Topic::MissionRequest, &mission_publication(mission, &signature))
            .await?;
        let raw = self.ctx.poll(Topic::MissionResponse, Self::RETRY_INTERVAL).await?;
        self.ctx.verify(&raw).await?;
        match ServerMessage::parse(&raw)? {
            ServerMessage::Approve(approval) => {
                info!("Mission '{mission}' {approval}");
                Ok(approval)
            }
            _ => Err(ControllerError::Unexpected(raw)),
        }
    }
}
