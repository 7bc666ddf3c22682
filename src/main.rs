#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod autopilot;
mod collaborators;
mod config;
mod controller;
mod envelope;
mod logger;
mod message_link;

use crate::autopilot::{Autopilot, AutopilotLink};
use crate::collaborators::{
    IdleFlightControl, LocalPeers, LocalPeriphery, MissionStore, OfflineCredentials,
};
use crate::config::{LinkMode, SecurityConfig};
use crate::controller::{Collaborators, ControllerError, FlightController, SecurityContext};
use crate::message_link::{MessageLink, NetworkLink, SimulatedLink};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

const CONNECT_RETRY: Duration = Duration::from_secs(1);

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let config = SecurityConfig::from_env();
    let cancel = CancellationToken::new();
    info!(
        "Starting security module ({} link, autopilot at {})",
        config.link_mode(),
        config.autopilot_addr()
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        shutdown.cancel();
    });

    let Some(controller) = init(&config, cancel.clone()).await else {
        return;
    };
    match controller.run().await {
        Ok(()) => info!("Flight control released the aircraft"),
        Err(ControllerError::Cancelled) => info!("Security module stopped"),
        Err(e) => error!("Security module stopped: {e}"),
    }
    cancel.cancel();
}

fn init_link(config: &SecurityConfig, cancel: CancellationToken) -> Arc<dyn MessageLink> {
    match config.link_mode() {
        LinkMode::Offline => Arc::new(SimulatedLink::new(config.board_id())),
        LinkMode::Online => match NetworkLink::new(config, cancel) {
            Ok(link) => Arc::new(link),
            Err(e) => fatal!("Failed to set up network link: {e}"),
        },
    }
}

/// Wires the server link, the autopilot connection and the local
/// collaborators into a controller. Returns `None` if shutdown was requested
/// while still connecting.
///
/// The server link is initialized before the autopilot listener starts, so
/// events the autopilot sends right after connecting can be republished.
async fn init(config: &SecurityConfig, cancel: CancellationToken) -> Option<FlightController> {
    let link = init_link(config, cancel.clone());
    loop {
        match link.init().await {
            Ok(()) => break,
            Err(e) => warn!("Failed to initialize server link: {e}. Trying again in 1s"),
        }
        tokio::select! {
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(CONNECT_RETRY) => {}
        }
    }

    let (autopilot, reader) = loop {
        match AutopilotLink::connect(config.autopilot_addr(), Arc::clone(&link)).await {
            Ok(connection) => break connection,
            Err(e) => warn!("Failed to connect to autopilot: {e}. Trying again in 1s"),
        }
        tokio::select! {
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(CONNECT_RETRY) => {}
        }
    };
    let autopilot = Arc::new(autopilot);
    let listener = Arc::clone(&autopilot);
    let listener_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = listener.listen(reader, listener_cancel).await {
            error!("Autopilot connection lost: {e}");
        }
    });

    let collaborators = Collaborators {
        credentials: Arc::new(OfflineCredentials),
        periphery: Arc::new(LocalPeriphery::default()),
        navigation: Arc::new(MissionStore::default()),
        peers: Arc::new(LocalPeers),
        flight_control: Arc::new(IdleFlightControl),
    };
    let ctx = SecurityContext::new(link, autopilot as Arc<dyn Autopilot>, collaborators, cancel);
    Some(FlightController::new(Arc::new(ctx)))
}
