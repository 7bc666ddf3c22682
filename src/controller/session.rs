use super::{ControllerError, SecurityContext};
use crate::envelope::{FlightStatus, ServerMessage};
use crate::message_link::Topic;
use crate::{info, log, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const STATUS_INTERVAL: Duration = Duration::from_secs(1);
const ACTUATOR_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Starts the keepalive and the status/zone tasks of an armed session.
///
/// Both run until the context is cancelled.
pub(super) fn spawn(ctx: Arc<SecurityContext>) -> (JoinHandle<()>, JoinHandle<()>) {
    let ping_ctx = Arc::clone(&ctx);
    let ping = tokio::spawn(async move {
        if let Err(e) = run_ping(&ping_ctx).await {
            log!("Session ping stopped: {e}");
        }
    });
    let status = tokio::spawn(async move {
        if let Err(e) = run_status_updates(&ctx).await {
            log!("Status updates stopped: {e}");
        }
    });
    (ping, status)
}

async fn run_ping(ctx: &SecurityContext) -> Result<(), ControllerError> {
    ctx.idle(ctx.session_delay().interval()).await?;
    loop {
        match ctx.link().receive(Topic::Ping) {
            Some(raw) => update_session_delay(ctx, &raw).await,
            // Extension point: pause the flight once the server stays silent past a grace window.
            None => warn!("No response from server"),
        }
        ctx.idle(ctx.session_delay().interval()).await?;
    }
}

async fn update_session_delay(ctx: &SecurityContext, raw: &str) {
    if let Err(e) = ctx.verify(raw).await {
        warn!("Dropping ping response: {e}");
        return;
    }
    match ServerMessage::parse(raw) {
        Ok(ServerMessage::Delay(secs)) => {
            if ctx.session_delay().get() != secs {
                info!("Session delay is now {secs}s");
            }
            ctx.session_delay().set(secs);
        }
        _ => warn!("Failed to parse ping response '{raw}'"),
    }
}

async fn run_status_updates(ctx: &SecurityContext) -> Result<(), ControllerError> {
    loop {
        if let Some(raw) = ctx.link().receive(Topic::FlightStatus) {
            handle_flight_status(ctx, &raw).await?;
        }
        if let Some(raw) = ctx.link().receive(Topic::ForbiddenZones) {
            handle_forbidden_zones(ctx, &raw).await;
        }
        ctx.idle(STATUS_INTERVAL).await?;
    }
}

async fn handle_flight_status(ctx: &SecurityContext, raw: &str) -> Result<(), ControllerError> {
    if let Err(e) = ctx.verify(raw).await {
        warn!("Dropping flight status: {e}");
        return Ok(());
    }
    match ServerMessage::parse(raw) {
        Ok(ServerMessage::Flight(FlightStatus::EmergencyStop)) => {
            warn!("Emergency stop requested by the ATM server");
            if let Err(e) = ctx.periphery().enable_buzzer().await {
                warn!("Failed to enable buzzer: {e}");
            }
            set_kill_switch(ctx, false).await?;
        }
        // Extension point: pausing and resuming the flight is up to flight control.
        Ok(ServerMessage::Flight(status)) => log!("Flight status {status} received, no action taken"),
        _ => warn!("Failed to parse flight status '{raw}'"),
    }
    Ok(())
}

async fn handle_forbidden_zones(ctx: &SecurityContext, raw: &str) {
    if let Err(e) = ctx.verify(raw).await {
        warn!("Dropping forbidden zones: {e}");
        return;
    }
    match ServerMessage::parse(raw) {
        Ok(ServerMessage::ForbiddenZones(areas)) => {
            info!("Replacing no-flight areas with {} received zones", areas.len());
            ctx.navigation().replace_no_flight_areas(areas);
        }
        _ => warn!("Failed to parse forbidden zones '{raw}'"),
    }
}

/// Switches the kill switch, retrying every second until it reports success.
pub(super) async fn set_kill_switch(ctx: &SecurityContext, enable: bool) -> Result<(), ControllerError> {
    loop {
        match ctx.periphery().set_kill_switch(enable).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!("Failed to set kill switch to {enable}: {e}. Trying again in 1s"),
        }
        ctx.idle(ACTUATOR_RETRY_INTERVAL).await?;
    }
}
